use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type.
///
/// Empty-history undo is deliberately not represented here: it is a no-op,
/// not a failure (see `History::undo`).
#[derive(Error, Debug)]
pub enum PaintError {
    /// A parameter change was rejected; the previous value is kept.
    #[error("invalid {name}: {value} (expected {expected})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    /// Export was requested in a format other than PNG or JPEG.
    #[error("unsupported export format `{0}` (expected png or jpeg)")]
    UnsupportedFormat(String),

    /// An export write failed. The canvas itself is never affected.
    #[error("I/O error writing {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A brush image could not be read or decoded.
    #[error("failed to load brush image {}: {}", .path.display(), .message)]
    Decode { path: PathBuf, message: String },
}

impl PaintError {
    /// Shorthand for the common out-of-range rejection.
    pub(crate) fn bad_param(
        name: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        PaintError::InvalidParameter {
            name,
            value: value.to_string(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, PaintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_names_the_offender() {
        let err = PaintError::bad_param("size", 0, "1..=100");
        assert_eq!(err.to_string(), "invalid size: 0 (expected 1..=100)");
    }

    #[test]
    fn unsupported_format_mentions_the_format() {
        let err = PaintError::UnsupportedFormat("webp".into());
        assert!(err.to_string().contains("webp"));
    }
}
