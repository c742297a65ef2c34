use crate::calibration::points::CalibrationPoints;
use crate::error::{Result, SpectraError};

/// One row of the review list.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewEntry {
    pub pixel: usize,
    pub wavelength: f64,
    /// Tombstone: the entry is kept (and can be restored) but is excluded
    /// from [`PointReview::finalize`].
    pub deleted: bool,
}

/// Editable snapshot of a [`CalibrationPoints`] set.
///
/// Entries are sorted by pixel when the review starts and never move or
/// renumber afterwards, so list positions stay valid for the whole pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PointReview {
    entries: Vec<ReviewEntry>,
}

impl PointReview {
    pub fn new(points: &CalibrationPoints) -> Self {
        let entries = points
            .iter()
            .map(|(pixel, wavelength)| ReviewEntry {
                pixel,
                wavelength,
                deleted: false,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ReviewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries not marked deleted.
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.deleted).count()
    }

    pub fn delete(&mut self, index: usize) -> Result<&ReviewEntry> {
        self.entry_mut(index)?.deleted = true;
        Ok(&self.entries[index])
    }

    /// Clear the tombstone. Fails if another live entry has taken the pixel
    /// position in the meantime.
    pub fn restore(&mut self, index: usize) -> Result<&ReviewEntry> {
        let pixel = self.entry_mut(index)?.pixel;
        self.ensure_pixel_free(pixel, index)?;
        self.entries[index].deleted = false;
        Ok(&self.entries[index])
    }

    /// Edit the entry at `index`. `None` or blank input leaves a field
    /// unchanged. Nothing is modified unless every provided field parses.
    pub fn modify(
        &mut self,
        index: usize,
        pixel: Option<&str>,
        wavelength: Option<&str>,
    ) -> Result<&ReviewEntry> {
        let current = self.entry_mut(index)?.clone();

        let new_pixel = match non_blank(pixel) {
            Some(text) => parse_pixel(text)?,
            None => current.pixel,
        };
        let new_wavelength = match non_blank(wavelength) {
            Some(text) => parse_wavelength(text)?,
            None => current.wavelength,
        };
        if !current.deleted && new_pixel != current.pixel {
            self.ensure_pixel_free(new_pixel, index)?;
        }

        let entry = &mut self.entries[index];
        entry.pixel = new_pixel;
        entry.wavelength = new_wavelength;
        Ok(&self.entries[index])
    }

    /// The live (non-deleted) entries as a point set. The review list itself
    /// is left as is.
    pub fn finalize(&self) -> CalibrationPoints {
        self.entries
            .iter()
            .filter(|e| !e.deleted)
            .map(|e| (e.pixel, e.wavelength))
            .collect()
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut ReviewEntry> {
        let len = self.entries.len();
        self.entries.get_mut(index).ok_or_else(|| {
            SpectraError::validation(
                "index",
                format!("no calibration point at position {index} (list has {len})"),
            )
        })
    }

    fn ensure_pixel_free(&self, pixel: usize, index: usize) -> Result<()> {
        let taken = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, e)| i != index && !e.deleted && e.pixel == pixel);
        if taken {
            Err(SpectraError::validation(
                "pixel position",
                format!("pixel {pixel} already has a calibration point"),
            ))
        } else {
            Ok(())
        }
    }
}

fn non_blank(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a typed pixel position.
pub fn parse_pixel(input: &str) -> Result<usize> {
    let trimmed = input.trim();
    trimmed.parse::<usize>().map_err(|_| {
        SpectraError::validation(
            "pixel position",
            format!("'{trimmed}' is not a non-negative integer"),
        )
    })
}

/// Parse a typed wavelength in Angstroms.
pub fn parse_wavelength(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite())
        .ok_or_else(|| {
            SpectraError::validation("wavelength", format!("'{trimmed}' is not a number"))
        })
}
