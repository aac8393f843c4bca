//! B+Tree node formats.
//!
//! - [`InternalPage`] - internal node view and its split / merge /
//!   redistribute primitives
//! - [`IndexKey`], [`GenericKey`] - fixed-width keys stored in nodes
//! - [`KeyComparator`], [`GenericComparator`] - key ordering
//!
//! The tree driver (descent, leaf pages, latch crabbing) sits on top of
//! these and is not part of this crate.

mod internal_page;
mod key;

pub use internal_page::InternalPage;
pub use key::{
    GenericComparator, GenericKey, GenericKey16, GenericKey32, GenericKey4, GenericKey64, GenericKey8,
    IndexKey, KeyComparator,
};
