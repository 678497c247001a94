//! Rate transform error types.

/// Errors raised while rescaling a chart.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Rate is not a finite positive number other than 1.
    #[error("Invalid rate {0}: must be positive, finite and not 1")]
    InvalidRate(f64),

    /// A hit object of a kind the transform does not know how to rescale.
    #[error("Unsupported hit object #{index} (type bits {type_bits}) at {time}ms")]
    UnsupportedHitObject {
        index: usize,
        type_bits: u32,
        time: i32,
    },
}

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;
