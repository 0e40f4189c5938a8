//! Associative containers
//!
//! - `HybridMultiMap`: dense key-to-values lookup that starts as a
//!   linear-scan list and upgrades to a chained hash table as it grows

mod hybrid_multimap;

pub use hybrid_multimap::{ChainOrder, HybridConfig, HybridMultiMap, KeyIter, LIST_MAX, MAX_SLOTS};

// Export the iterator type with a module-qualified name to avoid conflicts
pub use hybrid_multimap::Iter as MultiMapIter;
