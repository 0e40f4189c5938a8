//! Error handling for the densekit library
//!
//! All containers in this crate report contract violations through a single
//! error enum. These structures are pure in-memory data structures, so every
//! failure is a usage error surfaced synchronously at the offending call.

use thiserror::Error;

/// Main error type for the densekit library
#[derive(Error, Debug)]
pub enum DensekitError {
    /// Index out of bounds access
    #[error("Out of bounds: index {index}, size {size}")]
    OutOfBounds {
        /// The invalid index
        index: usize,
        /// The valid size/length
        size: usize,
    },

    /// Operation applied to a slot in the wrong state (e.g. unhiding a
    /// slot that is not hidden)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state mismatch
        message: String,
    },

    /// Insertion of a key that already exists in a unique-keys map
    ///
    /// Kept distinct from the generic precondition errors so callers can
    /// catch and ignore it specifically.
    #[error("Duplicate key: {message}")]
    DuplicateKey {
        /// Description of the colliding insertion
        message: String,
    },

    /// A structure reached its hard slot limit
    #[error("Capacity exceeded: structure limit is {limit} slots")]
    CapacityExceeded {
        /// The structural limit that was hit
        limit: usize,
    },

    /// Configuration or parameter errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// Feature not supported or not implemented
    #[error("Not supported: {feature}")]
    NotSupported {
        /// Description of the unsupported feature
        feature: String,
    },
}

impl DensekitError {
    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, size: usize) -> Self {
        Self::OutOfBounds { index, size }
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key<S: Into<String>>(message: S) -> Self {
        Self::DuplicateKey {
            message: message.into(),
        }
    }

    /// Create a capacity exceeded error
    pub fn capacity_exceeded(limit: usize) -> Self {
        Self::CapacityExceeded { limit }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not supported error
    pub fn not_supported<S: Into<String>>(feature: S) -> Self {
        Self::NotSupported {
            feature: feature.into(),
        }
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "bounds",
            Self::InvalidState { .. } => "state",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::CapacityExceeded { .. } => "capacity",
            Self::Configuration { .. } => "config",
            Self::NotSupported { .. } => "unsupported",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DensekitError>;

/// Assert that an index is within bounds
#[inline]
pub fn check_bounds(index: usize, size: usize) -> Result<()> {
    if index >= size {
        Err(DensekitError::out_of_bounds(index, size))
    } else {
        Ok(())
    }
}

/// Assert that a range is within bounds
#[inline]
pub fn check_range(start: usize, end: usize, size: usize) -> Result<()> {
    if start > end {
        return Err(DensekitError::invalid_state(format!(
            "Invalid range: start {} > end {}",
            start, end
        )));
    }
    if end > size {
        return Err(DensekitError::out_of_bounds(end, size));
    }
    Ok(())
}
