//! Error types for the display_calib library

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for display_calib operations
pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Error taxonomy for calibration operations.
///
/// Only malformed input and external-service failures are errors. Solver
/// convergence problems are reported as [`crate::WarningKind`] values on a
/// [`crate::Solved`] result instead.
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// Tone-curve samples do not have the (signal, luminance) shape
    #[error("Invalid input shape: sample {index} has {found} components, expected {expected}")]
    InvalidInputShape {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// Measured and target color sets disagree in length or width
    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// A fixed-shape input (triplet, sample row, primaries table) is malformed
    #[error("Invalid shape for {what}: expected {expected}, found {found}")]
    InvalidShape {
        what: String,
        expected: String,
        found: String,
    },

    /// Input value or configuration parameter outside its valid domain
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Persistence service read or write failed
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored session record could not be decoded
    #[error("Failed to decode session record field '{field}': {message}")]
    RecordDecode { field: String, message: String },

    /// The numerical optimizer could not be set up or aborted
    #[error("Optimizer error: {message}")]
    Optimizer { message: String },

    /// Calibration pattern could not be located in the image
    #[error("Calibration pattern not found in {}", path.display())]
    PatternNotFound { path: PathBuf },

    /// Calibration image does not exist or cannot be read
    #[error("Calibration image not found: {}", path.display())]
    ImageNotFound { path: PathBuf },

    /// Lens calibration failed for another reason
    #[error("Lens calibration failed: {message}")]
    LensCalibration { message: String },

    /// Configuration could not be loaded, saved or validated
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CalibrationError {
    /// Create a persistence error with context
    pub fn persistence<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    pub(crate) fn invalid_shape(
        what: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidShape {
            what: what.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Check if this error comes from an external collaborator.
    ///
    /// A calibration run treats these as reportable but not fatal: the
    /// locally computed artifacts stay available to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalibrationError::Persistence { .. }
                | CalibrationError::RecordDecode { .. }
                | CalibrationError::PatternNotFound { .. }
                | CalibrationError::ImageNotFound { .. }
                | CalibrationError::LensCalibration { .. }
                | CalibrationError::Io(_)
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            CalibrationError::InvalidInputShape { .. }
            | CalibrationError::ShapeMismatch { .. }
            | CalibrationError::InvalidShape { .. } => {
                "Measurement data has an unexpected layout. Please check the instrument export."
                    .to_string()
            }
            CalibrationError::PatternNotFound { .. } => {
                "Could not find the checkerboard in the image. Please retake the photo with the full pattern visible.".to_string()
            }
            CalibrationError::ImageNotFound { path } => {
                format!("Calibration image '{}' could not be opened.", path.display())
            }
            CalibrationError::Persistence { .. } => {
                "Calibration results could not be saved. They are still available locally."
                    .to_string()
            }
            _ => "Calibration failed. Please check the measurement data and try again.".to_string(),
        }
    }
}
