//! Fixed-width index keys and key comparison.

use std::cmp::Ordering;
use std::fmt;

/// A key that occupies exactly [`SIZE`](IndexKey::SIZE) bytes inside a page.
pub trait IndexKey: Copy {
    /// Serialized width in bytes.
    const SIZE: usize;

    /// Decode from the first `SIZE` bytes of `data`.
    fn from_bytes(data: &[u8]) -> Self;

    /// Encode into the first `SIZE` bytes of `data`.
    fn write_to(&self, data: &mut [u8]);
}

/// An opaque `N`-byte key.
///
/// # Example
/// ```
/// use pagecache::index::btree::GenericKey8;
///
/// assert!(GenericKey8::from_i64(-1) < GenericKey8::from_i64(1));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenericKey<const N: usize>(pub [u8; N]);

impl<const N: usize> GenericKey<N> {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Encode an integer so that bytewise order equals numeric order.
    ///
    /// The value is written big-endian as a two's complement integer of
    /// `min(N, 8)` bytes with its sign bit flipped, right aligned and
    /// zero-padded on the left. For `N < 8` the value must fit in `N`
    /// signed bytes; wider values wrap.
    pub fn from_i64(value: i64) -> Self {
        let mut bytes = [0u8; N];
        let width = N.min(8);
        if width == 0 {
            return Self(bytes);
        }

        let sign = 1u64 << (8 * width - 1);
        let encoded = ((value as u64) ^ sign).to_be_bytes();
        bytes[N - width..].copy_from_slice(&encoded[8 - width..]);
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Default for GenericKey<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> IndexKey for GenericKey<N> {
    const SIZE: usize = N;

    fn from_bytes(data: &[u8]) -> Self {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&data[..N]);
        Self(bytes)
    }

    fn write_to(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(&self.0);
    }
}

impl<const N: usize> fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key<{}>(", N)?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

pub type GenericKey4 = GenericKey<4>;
pub type GenericKey8 = GenericKey<8>;
pub type GenericKey16 = GenericKey<16>;
pub type GenericKey32 = GenericKey<32>;
pub type GenericKey64 = GenericKey<64>;

/// Three-way comparison of index keys.
///
/// Any `Fn(&K, &K) -> Ordering` is a comparator.
pub trait KeyComparator<K> {
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering;
}

impl<K, F> KeyComparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        self(lhs, rhs)
    }
}

/// Bytewise (memcmp) comparator for [`GenericKey`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericComparator;

impl<const N: usize> KeyComparator<GenericKey<N>> for GenericComparator {
    fn compare(&self, lhs: &GenericKey<N>, rhs: &GenericKey<N>) -> Ordering {
        lhs.0.cmp(&rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_bytes() {
        let key = GenericKey4::new([1, 2, 3, 4]);
        let mut buf = [0u8; 6];
        key.write_to(&mut buf[1..]);

        assert_eq!(buf, [0, 1, 2, 3, 4, 0]);
        assert_eq!(GenericKey4::from_bytes(&buf[1..]), key);
    }

    #[test]
    fn test_from_i64_widths() {
        assert_eq!(GenericKey8::from_i64(0).0, [0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(GenericKey16::from_i64(1).0[15], 1);
        assert_eq!(GenericKey16::from_i64(1).0[..8], [0u8; 8]);
        assert_eq!(GenericKey4::from_i64(258).0, [0x80, 0, 1, 2]);
        assert_eq!(GenericKey4::from_i64(-1).0, [0x7f, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_narrow_keys_order_across_zero() {
        let values = [i32::MIN as i64, -300, -1, 0, 1, 258, i32::MAX as i64];
        for pair in values.windows(2) {
            assert!(GenericKey4::from_i64(pair[0]) < GenericKey4::from_i64(pair[1]));
        }
        assert!(GenericKey4::from_i64(-1) < GenericKey4::from_i64(1));
    }

    #[test]
    fn test_closure_comparator() {
        let reverse = |a: &GenericKey4, b: &GenericKey4| b.cmp(a);
        let lo = GenericKey4::from_i64(1);
        let hi = GenericKey4::from_i64(2);

        assert_eq!(reverse.compare(&lo, &hi), Ordering::Greater);
        assert_eq!(GenericComparator.compare(&lo, &hi), Ordering::Less);
    }

    #[test]
    fn test_debug_format() {
        let key = GenericKey4::new([0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(format!("{:?}", key), "Key<4>(deadbeef)");
    }

    proptest! {
        #[test]
        fn prop_from_i64_preserves_order(a: i64, b: i64) {
            let ka = GenericKey8::from_i64(a);
            let kb = GenericKey8::from_i64(b);
            prop_assert_eq!(GenericComparator.compare(&ka, &kb), a.cmp(&b));
        }

        #[test]
        fn prop_narrow_and_wide_keys_preserve_order(a: i32, b: i32) {
            let (a, b) = (a as i64, b as i64);
            prop_assert_eq!(
                GenericComparator.compare(&GenericKey4::from_i64(a), &GenericKey4::from_i64(b)),
                a.cmp(&b)
            );
            prop_assert_eq!(
                GenericComparator.compare(&GenericKey16::from_i64(a), &GenericKey16::from_i64(b)),
                a.cmp(&b)
            );
        }
    }
}
