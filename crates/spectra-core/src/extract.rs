use std::fmt;

use ndarray::{s, Array1, Array2, Axis};
use tracing::info;

use crate::consts::DEFAULT_EXTRACTION_SUFFIX;
use crate::error::{Result, SpectraError};
use crate::image::Image;
use crate::io::replace_suffix;
use crate::spectrum::Spectrum;

/// Which edge of the row band a selection gesture sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandEdge {
    Lower,
    Upper,
}

impl fmt::Display for BandEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lower => write!(f, "lower"),
            Self::Upper => write!(f, "upper"),
        }
    }
}

/// Half-open row band `[lower, upper)` as selected by the user. Either edge
/// may still be unset; positions may be fractional (truncated on use).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RowBand {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl RowBand {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn set(&mut self, edge: BandEdge, row: f64) {
        match edge {
            BandEdge::Lower => self.lower = Some(row),
            BandEdge::Upper => self.upper = Some(row),
        }
    }

    /// Validate the band against an image with `rows` rows and return the
    /// integer row range to average.
    ///
    /// Checks run in a fixed order: upper set, lower set, `lower < upper`.
    /// The band is then clipped to the image like an array slice; a band
    /// with no rows left after clipping is rejected.
    pub fn resolve(&self, rows: usize) -> Result<(usize, usize)> {
        let upper = self.upper.ok_or(SpectraError::UpperLimitUnset)?;
        let lower = self.lower.ok_or(SpectraError::LowerLimitUnset)?;
        if lower.is_nan() || upper.is_nan() || lower >= upper {
            return Err(SpectraError::InvertedBand { lower, upper });
        }

        let lower_row = lower.trunc() as i64;
        let upper_row = upper.trunc() as i64;
        let start = lower_row.clamp(0, rows as i64);
        let end = upper_row.clamp(0, rows as i64);
        if start >= end {
            return Err(SpectraError::BandOutsideImage {
                lower: lower_row,
                upper: upper_row,
                rows,
            });
        }
        Ok((start as usize, end as usize))
    }
}

impl fmt::Display for RowBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "unset".to_string(), |v| v.to_string());
        write!(f, "[{}, {})", show(self.lower), show(self.upper))
    }
}

/// Extract a spectrum named after the image with the default suffix.
pub fn extract(image: &Image, band: RowBand) -> Result<Spectrum> {
    extract_named(image, band, DEFAULT_EXTRACTION_SUFFIX)
}

/// Average the band's rows into one flux value per column. The spectrum is
/// named after the image with its extension replaced by `suffix`.
pub fn extract_named(image: &Image, band: RowBand, suffix: &str) -> Result<Spectrum> {
    let (start, end) = band.resolve(image.rows())?;
    let flux = mean_rows(image.pixels(), start, end).ok_or(SpectraError::BandOutsideImage {
        lower: start as i64,
        upper: end as i64,
        rows: image.rows(),
    })?;

    let name = replace_suffix(image.path(), image.source_format().extension(), suffix);
    info!(
        image = %image.path().display(),
        start,
        end,
        columns = flux.len(),
        "Spectrum extracted"
    );
    Ok(Spectrum::new(name, flux))
}

/// Column means over rows `start..end`. `None` for an empty range.
pub fn mean_rows(pixels: &Array2<f64>, start: usize, end: usize) -> Option<Array1<f64>> {
    if start >= end || end > pixels.nrows() {
        return None;
    }
    pixels.slice(s![start..end, ..]).mean_axis(Axis(0))
}
