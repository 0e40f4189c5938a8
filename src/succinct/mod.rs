//! Succinct data structures
//!
//! Space-efficient bit storage with word-at-a-time scanning, rank counting,
//! and raw multi-bit field access.

pub mod bit_vector;

pub use bit_vector::{popcount64, read_bits, write_bits, BitVector};
