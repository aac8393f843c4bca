//! Eviction policy (replacer).
//!
//! - [`FifoReplacer`] - FIFO over the order frames became unpinned

mod fifo;

pub use fifo::FifoReplacer;
