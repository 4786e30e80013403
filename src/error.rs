use thiserror::Error;

/// Error types for the gcs2d library.
///
/// Constraint evaluation itself is deliberately infallible: degenerate
/// geometry produces non-finite residuals that the solver driver detects and
/// rejects. Errors only arise at the boundary where handles, constraint sets
/// and assembled arrays have to agree on dimensions.
#[derive(Error, Debug)]
pub enum GcsError {
    /// A handle does not refer to a parameter of the pool it was used with.
    #[error("Invalid parameter handle: index {index} out of {len}")]
    InvalidHandle { index: usize, len: usize },

    /// Error indicating a mismatch in assembled array dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for invalid input data at the assembly boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error for cases that don't fit the other categories.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for gcs2d operations.
pub type Result<T> = std::result::Result<T, GcsError>;

/// Extensions for converting from other error types.
impl From<String> for GcsError {
    fn from(s: String) -> Self {
        GcsError::Other(s)
    }
}

impl From<&str> for GcsError {
    fn from(s: &str) -> Self {
        GcsError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GcsError::InvalidHandle { index: 7, len: 4 };
        assert!(format!("{}", err).contains("index 7 out of 4"));

        let err = GcsError::DimensionMismatch("expected 3 rows, got 2".to_string());
        assert!(format!("{}", err).contains("expected 3 rows, got 2"));
    }

    #[test]
    fn test_error_conversion() {
        let str_err: GcsError = "test error".into();
        match str_err {
            GcsError::Other(s) => assert_eq!(s, "test error"),
            _ => panic!("Expected Other variant"),
        }
    }
}
