//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`PageHeader`] - Header shared by every B+Tree page
//! - [`PageType`] - Discriminator for B+Tree page kinds

#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use page::Page;
pub use page_header::{PageHeader, PageType};
pub(crate) use page_header::{read_u32, write_u32};
