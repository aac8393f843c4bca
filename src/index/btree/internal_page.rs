//! B+Tree internal (non-leaf) node.
//!
//! An internal node maps separator keys to child page ids. It is a typed
//! view over the bytes of one [`Page`]; nothing is cached outside the page,
//! so every mutation is immediately visible to whoever writes the page back.
//!
//! # Layout
//! ```text
//! ┌──────────────────┬───────────────────┬───────────────────┬─────┐
//! │ PageHeader (20B) │ key[0] | child[0] │ key[1] | child[1] │ ... │
//! └──────────────────┴───────────────────┴───────────────────┴─────┘
//! ```
//! Each slot is `K::SIZE` key bytes followed by a 4-byte little-endian
//! [`PageId`]. `key[0]` is a sentinel and never compared. [`lookup`]
//! routes a key to `child[i]` for the first `i >= 1` with
//! `key < key[i]`, and to the last child when there is none; keys below
//! `key[1]` therefore go to `child[1]`, and `child[0]` is reached only
//! through a one-entry node.
//!
//! [`lookup`]: InternalPage::lookup

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use crate::buffer::BufferPoolManager;
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{read_u32, write_u32, Page, PageHeader, PageType};

use super::key::{IndexKey, KeyComparator};

/// Internal node view over a page buffer `T`.
///
/// Read-only operations need `T: Deref<Target = Page>` (`&Page`,
/// [`PageReadGuard`](crate::buffer::PageReadGuard)); structural operations
/// need `DerefMut` (`&mut Page`,
/// [`PageWriteGuard`](crate::buffer::PageWriteGuard)).
///
/// Size bounds and index validity are the caller's responsibility and are
/// checked with assertions.
///
/// Operations that move children re-point each child's parent id through
/// [`BufferPoolManager::try_fetch_page_write`]; they never wait on a page
/// latch. The entries are always moved first. Then every moved child is
/// re-parented, except one whose latch is held by anyone, including the
/// caller. The first such child is reported as `Error::PageBusy` once the
/// rest are done, and the caller sets its parent id through the guard it
/// holds. Any other pool error stops re-parenting and leaves later
/// children pointing at their old parent.
pub struct InternalPage<T, K> {
    page: T,
    _key: PhantomData<K>,
}

impl<T, K: IndexKey> InternalPage<T, K> {
    const PAIR_SIZE: usize = K::SIZE + PageId::SIZE;

    /// Wrap a page buffer. Call [`init`](Self::init) on fresh pages.
    pub fn new(page: T) -> Self {
        Self {
            page,
            _key: PhantomData,
        }
    }

    /// Give back the underlying buffer.
    pub fn into_inner(self) -> T {
        self.page
    }

    /// Number of slots that fit in one page.
    pub fn capacity() -> usize {
        (PAGE_SIZE - PageHeader::SIZE) / Self::PAIR_SIZE
    }

    #[inline]
    fn key_offset(index: usize) -> usize {
        PageHeader::SIZE + index * Self::PAIR_SIZE
    }

    #[inline]
    fn value_offset(index: usize) -> usize {
        Self::key_offset(index) + K::SIZE
    }
}

impl<T: Deref<Target = Page>, K: IndexKey> InternalPage<T, K> {
    #[inline]
    fn data(&self) -> &[u8] {
        self.page.as_slice()
    }

    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data()[PageHeader::OFFSET_PAGE_TYPE])
    }

    /// Number of occupied slots (children).
    pub fn size(&self) -> usize {
        read_u32(self.data(), PageHeader::OFFSET_SIZE) as usize
    }

    pub fn max_size(&self) -> usize {
        read_u32(self.data(), PageHeader::OFFSET_MAX_SIZE) as usize
    }

    /// Fewest children a non-root node may hold.
    pub fn min_size(&self) -> usize {
        self.max_size() / 2
    }

    pub fn page_id(&self) -> PageId {
        PageId::read_from(&self.data()[PageHeader::OFFSET_PAGE_ID..])
    }

    pub fn parent_page_id(&self) -> PageId {
        PageHeader::read_parent_page_id(self.data())
    }

    pub fn is_root(&self) -> bool {
        !self.parent_page_id().is_valid()
    }

    /// Key in slot `index`. Slot 0 holds the sentinel.
    pub fn key_at(&self, index: usize) -> K {
        assert!(index < Self::capacity(), "slot {} out of range", index);
        K::from_bytes(&self.data()[Self::key_offset(index)..])
    }

    /// Child page id in slot `index`.
    pub fn value_at(&self, index: usize) -> PageId {
        assert!(index < Self::capacity(), "slot {} out of range", index);
        PageId::read_from(&self.data()[Self::value_offset(index)..])
    }

    /// Slot holding `value`, if it is one of this node's children.
    pub fn value_index(&self, value: PageId) -> Option<usize> {
        (0..self.size()).find(|&i| self.value_at(i) == value)
    }

    /// Occupied slots in order.
    pub fn items(&self) -> Vec<(K, PageId)> {
        (0..self.size())
            .map(|i| (self.key_at(i), self.value_at(i)))
            .collect()
    }

    /// Child to follow for `key`.
    ///
    /// Returns the child of the first slot `i >= 1` whose key is greater
    /// than `key`, or the last child if there is none. Keys in slots
    /// `1..size` are sorted, so this is a binary search.
    ///
    /// # Panics
    /// Panics if the node is empty.
    pub fn lookup<C: KeyComparator<K>>(&self, key: &K, comparator: &C) -> PageId {
        let size = self.size();
        assert!(size > 0, "lookup on empty internal page {}", self.page_id());

        let (mut lo, mut hi) = (1, size);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if comparator.compare(key, &self.key_at(mid)) == Ordering::Less {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        if lo < size {
            self.value_at(lo)
        } else {
            self.value_at(size - 1)
        }
    }
}

impl<T: DerefMut<Target = Page>, K: IndexKey> InternalPage<T, K> {
    #[inline]
    fn data_mut(&mut self) -> &mut [u8] {
        self.page.as_mut_slice()
    }

    /// Format the page as an empty internal node.
    ///
    /// # Panics
    /// Panics if `max_size` exceeds [`capacity`](Self::capacity).
    pub fn init(&mut self, page_id: PageId, parent_page_id: PageId, max_size: usize) {
        assert!(
            max_size <= Self::capacity(),
            "max_size {} exceeds capacity {}",
            max_size,
            Self::capacity()
        );

        self.page.set_header(&PageHeader::new(
            PageType::BTreeInternal,
            page_id,
            parent_page_id,
            max_size as u32,
        ));
        let sentinel = Self::key_offset(0)..Self::key_offset(1);
        self.data_mut()[sentinel].fill(0);
    }

    fn set_size(&mut self, size: usize) {
        write_u32(self.data_mut(), PageHeader::OFFSET_SIZE, size as u32);
    }

    pub fn set_parent_page_id(&mut self, parent_page_id: PageId) {
        self.page.set_parent_page_id(parent_page_id);
    }

    pub fn set_key_at(&mut self, index: usize, key: &K) {
        assert!(index < Self::capacity(), "slot {} out of range", index);
        key.write_to(&mut self.data_mut()[Self::key_offset(index)..]);
    }

    pub fn set_value_at(&mut self, index: usize, value: PageId) {
        assert!(index < Self::capacity(), "slot {} out of range", index);
        value.write_to(&mut self.data_mut()[Self::value_offset(index)..]);
    }

    fn set_pair(&mut self, index: usize, (key, value): &(K, PageId)) {
        self.set_key_at(index, key);
        self.set_value_at(index, *value);
    }

    /// Move slots `from..size` by one slot to the right.
    fn shift_right(&mut self, from: usize) {
        let size = self.size();
        assert!(size < Self::capacity(), "internal page {} is full", self.page_id());
        let src = Self::key_offset(from)..Self::key_offset(size);
        let dst = Self::key_offset(from + 1);
        self.data_mut().copy_within(src, dst);
    }

    /// Insert `(new_key, new_value)` right after the slot holding
    /// `old_value`. Returns the new size.
    ///
    /// # Panics
    /// Panics if `old_value` is not a child or the page is full.
    pub fn insert_node_after(&mut self, old_value: PageId, new_key: &K, new_value: PageId) -> usize {
        let index = match self.value_index(old_value) {
            Some(index) => index + 1,
            None => panic!("{} is not a child of {}", old_value, self.page_id()),
        };

        self.shift_right(index);
        self.set_pair(index, &(*new_key, new_value));

        let size = self.size() + 1;
        self.set_size(size);
        size
    }

    /// Fill a freshly initialized root after the old root split:
    /// `[(_, old_value), (new_key, new_value)]`.
    pub fn populate_new_root(&mut self, old_value: PageId, new_key: &K, new_value: PageId) {
        assert!(Self::capacity() >= 2);
        self.set_value_at(0, old_value);
        self.set_pair(1, &(*new_key, new_value));
        self.set_size(2);
    }

    /// Remove slot `index`, shifting later slots left.
    pub fn remove(&mut self, index: usize) {
        let size = self.size();
        assert!(index < size, "remove slot {} of {}", index, size);

        let src = Self::key_offset(index + 1)..Self::key_offset(size);
        let dst = Self::key_offset(index);
        self.data_mut().copy_within(src, dst);
        self.set_size(size - 1);
    }

    /// Empty a node that has exactly one child and return that child.
    pub fn remove_and_return_only_child(&mut self) -> PageId {
        assert_eq!(self.size(), 1, "node must have exactly one child");
        let child = self.value_at(0);
        self.set_size(0);
        child
    }

    // ========================================================================
    // Re-parenting moves
    // ========================================================================

    /// Point each child's parent id at this node, skipping latched ones.
    fn adopt<I>(&self, children: I, bpm: &BufferPoolManager) -> Result<()>
    where
        I: IntoIterator<Item = PageId>,
    {
        let parent = self.page_id();
        let mut busy = None;

        for child in children {
            match bpm.try_fetch_page_write(child) {
                Ok(mut guard) => guard.set_parent_page_id(parent),
                Err(Error::PageBusy(pid)) => {
                    busy.get_or_insert(pid);
                }
                Err(e) => return Err(e),
            }
        }

        match busy {
            Some(pid) => Err(Error::PageBusy(pid)),
            None => Ok(()),
        }
    }

    /// Append `items` and adopt their children.
    pub fn copy_n_from(&mut self, items: &[(K, PageId)], bpm: &BufferPoolManager) -> Result<()> {
        let size = self.size();
        assert!(
            size + items.len() <= Self::capacity(),
            "{} items do not fit in internal page {}",
            items.len(),
            self.page_id()
        );

        for (i, item) in items.iter().enumerate() {
            self.set_pair(size + i, item);
        }
        self.set_size(size + items.len());

        self.adopt(items.iter().map(|&(_, child)| child), bpm)
    }

    /// Append one entry and adopt its child.
    pub fn copy_last_from(&mut self, item: (K, PageId), bpm: &BufferPoolManager) -> Result<()> {
        let size = self.size();
        assert!(size < Self::capacity(), "internal page {} is full", self.page_id());

        self.set_pair(size, &item);
        self.set_size(size + 1);
        self.adopt([item.1], bpm)
    }

    /// Prepend one entry and adopt its child.
    pub fn copy_first_from(&mut self, item: (K, PageId), bpm: &BufferPoolManager) -> Result<()> {
        self.shift_right(0);
        self.set_pair(0, &item);

        let size = self.size() + 1;
        self.set_size(size);
        self.adopt([item.1], bpm)
    }

    /// Split: move the upper half (slots `size/2..size`) to `recipient`.
    ///
    /// The recipient takes this node's parent. Its slot 0 key is the
    /// separator the caller pushes up.
    pub fn move_half_to<U>(&mut self, recipient: &mut InternalPage<U, K>, bpm: &BufferPoolManager) -> Result<()>
    where
        U: DerefMut<Target = Page>,
    {
        let size = self.size();
        let half = size / 2;
        let moved: Vec<(K, PageId)> = (half..size)
            .map(|i| (self.key_at(i), self.value_at(i)))
            .collect();

        self.set_size(half);
        recipient.set_parent_page_id(self.parent_page_id());
        recipient.copy_n_from(&moved, bpm)
    }

    /// Merge: move every entry to the end of `recipient`, a left sibling.
    ///
    /// `middle_key` is the parent's separator between the two nodes; it
    /// replaces this node's sentinel so it lands between the siblings'
    /// children. The caller then deletes this page.
    pub fn move_all_to<U>(
        &mut self,
        recipient: &mut InternalPage<U, K>,
        middle_key: &K,
        bpm: &BufferPoolManager,
    ) -> Result<()>
    where
        U: DerefMut<Target = Page>,
    {
        self.set_key_at(0, middle_key);
        let moved = self.items();

        self.set_size(0);
        recipient.set_parent_page_id(self.parent_page_id());
        recipient.copy_n_from(&moved, bpm)
    }

    /// Redistribute: move this node's first child to the end of
    /// `recipient`, a left sibling, under `middle_key`.
    ///
    /// Afterwards this node's sentinel holds the new separator.
    pub fn move_first_to_end_of<U>(
        &mut self,
        recipient: &mut InternalPage<U, K>,
        middle_key: &K,
        bpm: &BufferPoolManager,
    ) -> Result<()>
    where
        U: DerefMut<Target = Page>,
    {
        let first = (*middle_key, self.value_at(0));
        self.remove(0);
        recipient.copy_last_from(first, bpm)
    }

    /// Redistribute: move this node's last entry to the front of
    /// `recipient`, a right sibling.
    ///
    /// `middle_key` becomes the key of the recipient's old first child;
    /// the recipient's new sentinel holds the new separator.
    pub fn move_last_to_front_of<U>(
        &mut self,
        recipient: &mut InternalPage<U, K>,
        middle_key: &K,
        bpm: &BufferPoolManager,
    ) -> Result<()>
    where
        U: DerefMut<Target = Page>,
    {
        let size = self.size();
        assert!(size > 0, "internal page {} is empty", self.page_id());
        let last = (self.key_at(size - 1), self.value_at(size - 1));

        self.set_size(size - 1);
        recipient.set_key_at(0, middle_key);
        recipient.copy_first_from(last, bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::btree::key::{GenericComparator, GenericKey8};
    use crate::storage::MemoryDiskManager;
    use proptest::prelude::*;

    type Node<'a> = InternalPage<&'a mut Page, GenericKey8>;

    fn key(v: i64) -> GenericKey8 {
        GenericKey8::from_i64(v)
    }

    fn bpm(pool_size: usize) -> BufferPoolManager {
        BufferPoolManager::new(pool_size, MemoryDiskManager::new())
    }

    /// Allocate `n` leaf-formatted child pages with no parent.
    fn children(bpm: &BufferPoolManager, n: usize) -> Vec<PageId> {
        (0..n)
            .map(|_| {
                let mut guard = bpm.new_page_write().unwrap();
                let pid = guard.page_id();
                guard.set_header(&PageHeader::new(PageType::BTreeLeaf, pid, PageId::INVALID, 8));
                pid
            })
            .collect()
    }

    fn parent_of(bpm: &BufferPoolManager, child: PageId) -> PageId {
        bpm.fetch_page_read(child).unwrap().parent_page_id()
    }

    /// `[(_, c0), (10, c1), (20, c2), ...]`
    fn fill(node: &mut Node<'_>, kids: &[PageId]) {
        node.populate_new_root(kids[0], &key(10), kids[1]);
        for i in 2..kids.len() {
            node.insert_node_after(kids[i - 1], &key(10 * i as i64), kids[i]);
        }
    }

    #[test]
    fn test_init_and_accessors() {
        let mut page = Page::new();
        page.as_mut_slice()[PageHeader::SIZE] = 0xFF;
        let mut node = Node::new(&mut page);
        node.init(PageId::new(5), PageId::INVALID, 16);

        assert_eq!(node.page_type(), PageType::BTreeInternal);
        assert_eq!(node.page_id(), PageId::new(5));
        assert_eq!(node.size(), 0);
        assert_eq!(node.max_size(), 16);
        assert_eq!(node.min_size(), 8);
        assert!(node.is_root());
        assert_eq!(node.key_at(0), GenericKey8::default());

        node.set_parent_page_id(PageId::new(1));
        assert!(!node.is_root());
    }

    #[test]
    fn test_capacity() {
        assert_eq!(InternalPage::<&Page, GenericKey8>::capacity(), (4096 - 20) / 12);
        assert_eq!(
            InternalPage::<&Page, crate::index::btree::GenericKey64>::capacity(),
            (4096 - 20) / 68
        );
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn test_init_rejects_oversized_max() {
        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(1), PageId::INVALID, Node::capacity() + 1);
    }

    #[test]
    fn test_insert_node_after() {
        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(1), PageId::INVALID, 8);
        node.set_value_at(0, PageId::new(100));
        node.set_size(1);

        assert_eq!(node.insert_node_after(PageId::new(100), &key(30), PageId::new(103)), 2);
        assert_eq!(node.insert_node_after(PageId::new(100), &key(10), PageId::new(101)), 3);
        assert_eq!(node.insert_node_after(PageId::new(101), &key(20), PageId::new(102)), 4);

        let values: Vec<u32> = node.items().iter().map(|(_, v)| v.0).collect();
        assert_eq!(values, vec![100, 101, 102, 103]);
        assert_eq!(node.key_at(2), key(20));
        assert_eq!(node.value_index(PageId::new(103)), Some(3));
        assert_eq!(node.value_index(PageId::new(7)), None);
    }

    #[test]
    #[should_panic(expected = "is not a child of")]
    fn test_insert_after_missing_child() {
        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(1), PageId::INVALID, 8);
        node.insert_node_after(PageId::new(9), &key(1), PageId::new(10));
    }

    #[test]
    fn test_populate_new_root() {
        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(9), PageId::INVALID, 8);
        node.populate_new_root(PageId::new(3), &key(42), PageId::new(4));

        assert_eq!(node.size(), 2);
        assert_eq!(node.value_at(0), PageId::new(3));
        assert_eq!(node.items()[1], (key(42), PageId::new(4)));
    }

    #[test]
    fn test_lookup() {
        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(1), PageId::INVALID, 8);
        let kids: Vec<PageId> = (100..104).map(PageId::new).collect();
        fill(&mut node, &kids);

        // separators [_, 10, 20, 30]
        assert_eq!(node.lookup(&key(5), &GenericComparator), kids[1]);
        assert_eq!(node.lookup(&key(10), &GenericComparator), kids[2]);
        assert_eq!(node.lookup(&key(25), &GenericComparator), kids[3]);
        assert_eq!(node.lookup(&key(30), &GenericComparator), kids[3]);
        assert_eq!(node.lookup(&key(99), &GenericComparator), kids[3]);
    }

    #[test]
    fn test_remove_and_only_child() {
        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(1), PageId::INVALID, 8);
        let kids: Vec<PageId> = (100..103).map(PageId::new).collect();
        fill(&mut node, &kids);

        node.remove(1);
        assert_eq!(node.items(), vec![(GenericKey8::default(), kids[0]), (key(20), kids[2])]);

        node.remove(1);
        assert_eq!(node.remove_and_return_only_child(), kids[0]);
        assert_eq!(node.size(), 0);
    }

    #[test]
    fn test_move_half_to_reparents() {
        let bpm = bpm(16);
        let kids = children(&bpm, 5);

        let mut left_page = Page::new();
        let mut right_page = Page::new();
        let mut left = Node::new(&mut left_page);
        let mut right = Node::new(&mut right_page);
        left.init(PageId::new(50), PageId::new(60), 8);
        right.init(PageId::new(51), PageId::INVALID, 8);
        fill(&mut left, &kids);

        left.move_half_to(&mut right, &bpm).unwrap();

        assert_eq!(left.size(), 2);
        assert_eq!(right.size(), 3);
        assert_eq!(right.parent_page_id(), PageId::new(60));
        assert_eq!(right.items()[0], (key(20), kids[2]));
        assert_eq!(right.value_at(2), kids[4]);
        for &kid in &kids[2..] {
            assert_eq!(parent_of(&bpm, kid), PageId::new(51));
            assert_eq!(bpm.is_dirty(kid), Some(true));
        }
        assert_eq!(parent_of(&bpm, kids[0]), PageId::INVALID);
        assert_eq!(bpm.get_pin_count(kids[2]), Some(0));
    }

    #[test]
    fn test_move_all_to() {
        let bpm = bpm(16);
        let kids = children(&bpm, 5);

        let mut left_page = Page::new();
        let mut right_page = Page::new();
        let mut left = Node::new(&mut left_page);
        let mut right = Node::new(&mut right_page);
        left.init(PageId::new(50), PageId::new(60), 8);
        right.init(PageId::new(51), PageId::new(60), 8);
        left.copy_n_from(&[(key(0), kids[0]), (key(10), kids[1])], &bpm).unwrap();
        right.copy_n_from(&[(key(0), kids[2]), (key(30), kids[3]), (key(40), kids[4])], &bpm).unwrap();

        right.move_all_to(&mut left, &key(25), &bpm).unwrap();

        assert_eq!(right.size(), 0);
        let values: Vec<PageId> = left.items().iter().map(|&(_, v)| v).collect();
        assert_eq!(values, kids);
        assert_eq!(left.key_at(2), key(25));
        for &kid in &kids {
            assert_eq!(parent_of(&bpm, kid), PageId::new(50));
        }
    }

    #[test]
    fn test_move_first_to_end_of() {
        let bpm = bpm(16);
        let kids = children(&bpm, 4);

        let mut left_page = Page::new();
        let mut right_page = Page::new();
        let mut left = Node::new(&mut left_page);
        let mut right = Node::new(&mut right_page);
        left.init(PageId::new(50), PageId::new(60), 8);
        right.init(PageId::new(51), PageId::new(60), 8);
        left.copy_n_from(&[(key(0), kids[0])], &bpm).unwrap();
        right.copy_n_from(&[(key(0), kids[1]), (key(30), kids[2]), (key(40), kids[3])], &bpm).unwrap();

        right.move_first_to_end_of(&mut left, &key(20), &bpm).unwrap();

        assert_eq!(left.items()[1], (key(20), kids[1]));
        assert_eq!(right.size(), 2);
        assert_eq!(right.key_at(0), key(30));
        assert_eq!(right.value_at(0), kids[2]);
        assert_eq!(parent_of(&bpm, kids[1]), PageId::new(50));
    }

    #[test]
    fn test_move_last_to_front_of() {
        let bpm = bpm(16);
        let kids = children(&bpm, 4);

        let mut left_page = Page::new();
        let mut right_page = Page::new();
        let mut left = Node::new(&mut left_page);
        let mut right = Node::new(&mut right_page);
        left.init(PageId::new(50), PageId::new(60), 8);
        right.init(PageId::new(51), PageId::new(60), 8);
        left.copy_n_from(&[(key(0), kids[0]), (key(10), kids[1]), (key(15), kids[2])], &bpm).unwrap();
        right.copy_n_from(&[(key(0), kids[3])], &bpm).unwrap();

        left.move_last_to_front_of(&mut right, &key(20), &bpm).unwrap();

        assert_eq!(left.size(), 2);
        assert_eq!(right.items(), vec![(key(15), kids[2]), (key(20), kids[3])]);
        assert_eq!(parent_of(&bpm, kids[2]), PageId::new(51));
    }

    #[test]
    fn test_copy_first_then_remove_round_trip() {
        let bpm = bpm(8);
        let kids = children(&bpm, 4);

        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(50), PageId::INVALID, 8);
        node.copy_n_from(&[(key(0), kids[0]), (key(10), kids[1]), (key(20), kids[2])], &bpm).unwrap();
        let before = node.items();

        node.copy_first_from((key(-5), kids[3]), &bpm).unwrap();
        assert_eq!(node.size(), 4);
        assert_eq!(node.value_at(0), kids[3]);

        node.remove(0);
        assert_eq!(node.items(), before);
    }

    #[test]
    fn test_reparent_propagates_pool_errors() {
        let bpm = bpm(1);
        let kids = children(&bpm, 1);
        let _pinned = bpm.new_page_write().unwrap();

        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(50), PageId::INVALID, 8);

        let err = node.copy_last_from((key(0), kids[0]), &bpm).unwrap_err();
        assert!(matches!(err, crate::Error::NoFreeFrames));
    }

    #[test]
    fn test_copy_last_from_child_latched_by_caller() {
        let bpm = bpm(4);
        let mut held = bpm.new_page_write().unwrap();
        let child = held.page_id();

        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(50), PageId::INVALID, 8);

        let err = node.copy_last_from((key(0), child), &bpm).unwrap_err();
        assert!(matches!(err, crate::Error::PageBusy(pid) if pid == child));
        assert_eq!(node.items(), vec![(key(0), child)]);
        assert_eq!(bpm.get_pin_count(child), Some(1));

        held.set_parent_page_id(node.page_id());
        drop(held);
        assert_eq!(bpm.fetch_page_read(child).unwrap().parent_page_id(), PageId::new(50));
    }

    #[test]
    fn test_copy_n_from_adopts_every_unlatched_child() {
        let bpm = bpm(8);
        let kids = children(&bpm, 3);
        let held = bpm.fetch_page_read(kids[1]).unwrap();

        let mut page = Page::new();
        let mut node = Node::new(&mut page);
        node.init(PageId::new(50), PageId::INVALID, 8);

        let items = [(key(0), kids[0]), (key(10), kids[1]), (key(20), kids[2])];
        let err = node.copy_n_from(&items, &bpm).unwrap_err();
        assert!(matches!(err, crate::Error::PageBusy(pid) if pid == kids[1]));
        assert_eq!(node.size(), 3);

        assert_eq!(held.parent_page_id(), PageId::INVALID);
        drop(held);
        for &kid in &[kids[0], kids[2]] {
            assert_eq!(bpm.fetch_page_read(kid).unwrap().parent_page_id(), PageId::new(50));
        }
    }

    #[test]
    fn test_view_over_guard() {
        let bpm = bpm(4);
        let pid = {
            let guard = bpm.new_page_write().unwrap();
            let pid = guard.page_id();
            let mut node = InternalPage::<_, GenericKey8>::new(guard);
            node.init(pid, PageId::INVALID, 4);
            node.populate_new_root(PageId::new(7), &key(1), PageId::new(8));
            pid
        };

        let node = InternalPage::<_, GenericKey8>::new(bpm.fetch_page_read(pid).unwrap());
        assert_eq!(node.size(), 2);
        assert_eq!(node.lookup(&key(0), &GenericComparator), PageId::new(8));
    }

    proptest! {
        /// Binary search agrees with a linear scan over the separators.
        #[test]
        fn prop_lookup_matches_scan(
            seps in proptest::collection::btree_set(-1000i64..1000, 1..50),
            target in -1100i64..1100,
        ) {
            let seps: Vec<i64> = seps.into_iter().collect();
            let mut page = Page::new();
            let mut node = Node::new(&mut page);
            node.init(PageId::new(1), PageId::INVALID, 64);
            node.set_value_at(0, PageId::new(0));
            node.set_size(1);
            for (i, &s) in seps.iter().enumerate() {
                node.insert_node_after(PageId::new(i as u32), &key(s), PageId::new(i as u32 + 1));
            }

            let size = node.size();
            let expected = (1..size)
                .find(|&i| key(target) < node.key_at(i))
                .map(|i| node.value_at(i))
                .unwrap_or_else(|| node.value_at(size - 1));

            prop_assert_eq!(node.lookup(&key(target), &GenericComparator), expected);
        }
    }
}
