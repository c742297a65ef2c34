pub mod rotate;

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::info;

use crate::consts::IMAGE_EXTENSIONS;
use crate::error::{Result, SpectraError};
use crate::io::fits::{read_fits, FitsHeader};
use crate::io::image_extension;

use self::rotate::{is_identity_rotation, rotate_array};

/// Accepted on-disk image formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Fit,
    Fits,
    FitsGz,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match image_extension(path) {
            Some("fit") => Ok(Self::Fit),
            Some("fits") => Ok(Self::Fits),
            Some("fits.gz") => Ok(Self::FitsGz),
            _ => Err(SpectraError::UnsupportedExtension {
                path: path.to_path_buf(),
                accepted: IMAGE_EXTENSIONS
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Fits => "fits",
            Self::FitsGz => "fits.gz",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

/// A 2-D image with non-destructive rotation.
///
/// `pixels` is always `original_pixels` rotated by the cumulative angle;
/// rotations never compound interpolation error.
#[derive(Clone, Debug)]
pub struct Image {
    path: PathBuf,
    format: ImageFormat,
    original: Array2<f64>,
    pixels: Array2<f64>,
    rotation_degrees: f64,
    metadata: FitsHeader,
}

impl Image {
    /// Open a FITS image. The extension is checked before the file is touched.
    pub fn open(path: &Path) -> Result<Self> {
        let format = ImageFormat::from_path(path)?;
        let fits = read_fits(path)?;
        info!(
            path = %path.display(),
            rows = fits.data.nrows(),
            cols = fits.data.ncols(),
            "Image loaded"
        );
        Self::build(path.to_path_buf(), format, fits.data, fits.header)
    }

    /// Wrap an in-memory pixel grid. `path` names the image and must carry an
    /// accepted image extension.
    pub fn from_pixels(path: impl Into<PathBuf>, pixels: Array2<f64>) -> Result<Self> {
        let path = path.into();
        let format = ImageFormat::from_path(&path)?;
        Self::build(path, format, pixels, FitsHeader::new())
    }

    fn build(
        path: PathBuf,
        format: ImageFormat,
        pixels: Array2<f64>,
        metadata: FitsHeader,
    ) -> Result<Self> {
        let (rows, cols) = pixels.dim();
        if rows == 0 || cols == 0 {
            return Err(SpectraError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            path,
            format,
            original: pixels.clone(),
            pixels,
            rotation_degrees: 0.0,
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source_format(&self) -> ImageFormat {
        self.format
    }

    pub fn pixels(&self) -> &Array2<f64> {
        &self.pixels
    }

    pub fn original_pixels(&self) -> &Array2<f64> {
        &self.original
    }

    pub fn rows(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn cols(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn cumulative_rotation_degrees(&self) -> f64 {
        self.rotation_degrees
    }

    pub fn metadata(&self) -> &FitsHeader {
        &self.metadata
    }

    /// Rotate by `angle_degrees` on top of earlier rotations.
    ///
    /// The new grid is computed from the original pixels by the total angle.
    /// A total of a whole number of turns restores an exact copy of the
    /// original. A rotation note is appended to the metadata.
    pub fn rotate(&mut self, angle_degrees: f64) -> Result<()> {
        if !angle_degrees.is_finite() {
            return Err(SpectraError::validation(
                "angle",
                format!("{angle_degrees} is not a finite number of degrees"),
            ));
        }

        let total = self.rotation_degrees + angle_degrees;
        if !total.is_finite() {
            return Err(SpectraError::validation(
                "angle",
                format!(
                    "total rotation {} + {angle_degrees} degrees is out of range",
                    self.rotation_degrees
                ),
            ));
        }
        let pixels = if is_identity_rotation(total) {
            self.original.clone()
        } else {
            rotate_array(&self.original, total)
        };

        self.pixels = pixels;
        self.rotation_degrees = total;
        self.metadata.push_history(format!(
            "Rotated by {angle_degrees} deg (total rotation {total} deg)"
        ));
        info!(angle = angle_degrees, total, "Image rotated");
        Ok(())
    }

    /// Rotate by an angle typed by the user.
    ///
    /// Returns the parsed angle. Non-numeric input is a validation error and
    /// leaves the image untouched.
    pub fn rotate_input(&mut self, input: &str) -> Result<f64> {
        let angle = parse_angle(input)?;
        self.rotate(angle)?;
        Ok(angle)
    }
}

pub fn parse_angle(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| {
            SpectraError::validation(
                "angle",
                format!("'{trimmed}' is not a number of degrees"),
            )
        })
}
