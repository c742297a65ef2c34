use serde::{Deserialize, Serialize};

use crate::consts::{
    DATA_EXTENSION, DEFAULT_EXTRACTION_SUFFIX, DEFAULT_MIN_CALIBRATION_POINTS,
    DEFAULT_POINTS_SUFFIX, POLYNOMIAL_DEGREE,
};
use crate::error::{Result, SpectraError};

/// Session settings, loadable from TOML. Missing sections take defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub peaks: PeakConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        self.calibration.validate()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Replaces the image extension in the extracted spectrum's name.
    pub suffix: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_EXTRACTION_SUFFIX.to_string(),
        }
    }
}

impl ExtractionConfig {
    fn validate(&self) -> Result<()> {
        require_data_suffix("extraction suffix", &self.suffix)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Snap marked calibration points onto the nearest local flux maximum.
    pub snap_to_local_maximum: bool,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            snap_to_local_maximum: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Minimum number of points before a wavelength solution is fitted.
    pub min_points: usize,
    /// Replaces the extraction suffix in the default points file name.
    pub points_suffix: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_CALIBRATION_POINTS,
            points_suffix: DEFAULT_POINTS_SUFFIX.to_string(),
        }
    }
}

impl CalibrationConfig {
    fn validate(&self) -> Result<()> {
        if self.min_points <= POLYNOMIAL_DEGREE {
            return Err(SpectraError::validation(
                "minimum calibration points",
                format!(
                    "{} must exceed the polynomial degree {POLYNOMIAL_DEGREE}",
                    self.min_points
                ),
            ));
        }
        require_data_suffix("points suffix", &self.points_suffix)
    }
}

fn require_data_suffix(field: &'static str, suffix: &str) -> Result<()> {
    if suffix.ends_with(&format!(".{DATA_EXTENSION}")) {
        Ok(())
    } else {
        Err(SpectraError::validation(
            field,
            format!("'{suffix}' must end with .{DATA_EXTENSION}"),
        ))
    }
}
