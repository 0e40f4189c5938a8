//! # Densekit: Compact In-Memory Containers
//!
//! This crate bundles four independent, single-threaded data structures that
//! share a focus on dense, cache-friendly layouts and stable indices:
//!
//! - **`BitVector`**: packed bit array with word-at-a-time forward/backward
//!   scanning and raw multi-bit field reads and writes
//! - **`BlockVec<T>`**: append-optimized vector of doubling blocks that
//!   never reallocates or moves existing elements
//! - **`IndexedHeap<T>`** / **`TopK<T>`**: binary min-heap over a pluggable
//!   backing store, reporting every element move to a position hook; plus a
//!   bounded largest-K selector
//! - **`HybridMultiMap<K, V, E>`**: dense multimap with a pluggable key
//!   extractor that upgrades itself from a linear-scan list to a 16-bit
//!   chained hash table as it grows, with stable slot indices, O(1)
//!   swap-removal, and hideable entries
//!
//! ## Quick Start
//!
//! ```rust
//! use densekit::{BitVector, BlockVec, HybridMultiMap, IndexedHeap, TopK};
//!
//! // bit scanning
//! let mut bv = BitVector::with_size(128, false);
//! bv.set(64, true)?;
//! assert_eq!(bv.scan_forward(true, 0, 128), Some(64));
//!
//! // growth without moving elements
//! let mut vec = BlockVec::new();
//! vec.push(42);
//!
//! // priority queue
//! let mut heap = IndexedHeap::new();
//! heap.extend_with([3, 1, 2], true);
//! assert_eq!(heap.pop(), Some(1));
//!
//! // largest-K selection
//! let mut top = TopK::new(2);
//! for x in [5, 9, 1, 7] {
//!     top.add(x);
//! }
//! assert_eq!(top.into_sorted_vec(), vec![7, 9]);
//!
//! // key-to-values lookup with stable slot indices
//! let mut map = HybridMultiMap::new(|v: &(u32, &str)| v.0);
//! let slot = map.insert((7, "seven"))?;
//! assert_eq!(map.find_first(&7), Some(slot));
//! # Ok::<(), densekit::DensekitError>(())
//! ```
//!
//! All containers are single-threaded and non-reentrant; callers sharing
//! one across threads must synchronize externally.

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod containers;
pub mod error;
pub mod hash_map;
pub mod succinct;

// Re-export core types
pub use containers::{BlockVec, BlockVecIter, HeapStore, IndexedHeap, TopK};
pub use error::{DensekitError, Result};
pub use hash_map::{ChainOrder, HybridConfig, HybridMultiMap, KeyIter, MultiMapIter};
pub use succinct::BitVector;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library (currently only emits a log line)
pub fn init() {
    log::debug!("Initializing densekit v{}", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_functionality() {
        init();
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_version_info() {
        // version should be semver format like "0.2.0"
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2);
    }

    #[test]
    fn test_re_exports() {
        let _bv = BitVector::new();
        let _vec = BlockVec::<i32>::new();
        let _heap = IndexedHeap::<i32>::new();
        let _top = TopK::<i32>::new(3);
        let _map = HybridMultiMap::new(|v: &(u32, u32)| v.0);

        let _err = DensekitError::invalid_state("test");
        assert!(std::any::type_name::<Result<()>>().contains("DensekitError"));
    }

    #[test]
    fn test_multiple_init_calls() {
        init();
        init();
        init();
    }
}
