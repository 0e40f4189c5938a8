//! High-performance container types
//!
//! This module provides optimized container types that prioritize
//! performance while maintaining Rust's safety guarantees.
//!
//! - **`BlockVec<T>`** - append-optimized vector of doubling blocks that
//!   never moves existing elements
//! - **`IndexedHeap<T>`** - binary min-heap over a pluggable backing store
//!   with a position-changed hook for external index tracking
//! - **`TopK<T>`** - bounded selector keeping the K largest items of a
//!   stream

mod block_vec;
mod indexed_heap;

pub use block_vec::{BlockVec, BlockVecIter};
pub use indexed_heap::{HeapStore, IndexedHeap, TopK};
