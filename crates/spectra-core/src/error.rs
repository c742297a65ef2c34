use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectraError {
    #[error("Cannot access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} has an unsupported extension; accepted extensions are {accepted}", path.display())]
    UnsupportedExtension { path: PathBuf, accepted: String },

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Invalid data file {}: {reason}", path.display())]
    InvalidDataFile { path: PathBuf, reason: String },

    #[error("Invalid image dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Wavelength has {wavelength} samples but flux has {flux}")]
    LengthMismatch { flux: usize, wavelength: usize },

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Upper limit is not set")]
    UpperLimitUnset,

    #[error("Lower limit is not set")]
    LowerLimitUnset,

    #[error(
        "Lower limit is higher than or equal to the upper limit (lower limit: {lower}, upper limit: {upper})"
    )]
    InvertedBand { lower: f64, upper: f64 },

    #[error("Row band [{lower}, {upper}) selects no rows of an image with {rows} rows")]
    BandOutsideImage { lower: i64, upper: i64, rows: usize },

    #[error("Too few calibration points: found {found}, need at least {required}")]
    TooFewCalibrationPoints { found: usize, required: usize },

    #[error("Calibration points do not constrain a degree-{degree} polynomial")]
    DegenerateCalibration { degree: usize },

    #[error("Cannot {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: String,
    },
}

/// Coarse classification of [`SpectraError`], used by the interactive
/// session to title its messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    File,
    Validation,
    Extraction,
    Calibration,
    State,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format => write!(f, "Format error"),
            Self::File => write!(f, "File error"),
            Self::Validation => write!(f, "Validation error"),
            Self::Extraction => write!(f, "Extraction error"),
            Self::Calibration => write!(f, "Calibration error"),
            Self::State => write!(f, "Session error"),
        }
    }
}

impl SpectraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::File { .. } | Self::Io(_) => ErrorKind::File,
            Self::UnsupportedExtension { .. }
            | Self::InvalidFits(_)
            | Self::InvalidDataFile { .. }
            | Self::InvalidDimensions { .. }
            | Self::LengthMismatch { .. } => ErrorKind::Format,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UpperLimitUnset
            | Self::LowerLimitUnset
            | Self::InvertedBand { .. }
            | Self::BandOutsideImage { .. } => ErrorKind::Extraction,
            Self::TooFewCalibrationPoints { .. } | Self::DegenerateCalibration { .. } => {
                ErrorKind::Calibration
            }
            Self::InvalidState { .. } => ErrorKind::State,
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpectraError>;
