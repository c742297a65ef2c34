use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::consts::POINTS_HEADER;
use crate::error::{Result, SpectraError};
use crate::io::require_data_extension;
use crate::io::text::{read_table, write_table};

/// Legacy header written by the console version of the tool.
const LEGACY_POINTS_COLUMNS: [&str; 2] = ["x", "wavelength(Angs)"];

/// Working set of calibration points, keyed by pixel position.
///
/// Adding a point at an existing position replaces its wavelength.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationPoints {
    points: BTreeMap<usize, f64>,
}

impl CalibrationPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the point at `pixel`. Returns the replaced wavelength.
    pub fn add(&mut self, pixel: usize, wavelength: f64) -> Option<f64> {
        self.points.insert(pixel, wavelength)
    }

    pub fn remove(&mut self, pixel: usize) -> Option<f64> {
        self.points.remove(&pixel)
    }

    /// Replace the whole set.
    pub fn replace(&mut self, other: CalibrationPoints) {
        self.points = other.points;
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn get(&self, pixel: usize) -> Option<f64> {
        self.points.get(&pixel).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in ascending pixel order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.points.iter().map(|(&pixel, &wavelength)| (pixel, wavelength))
    }

    pub fn as_map(&self) -> &BTreeMap<usize, f64> {
        &self.points
    }

    /// Write the points as `# x wave` rows. Requires a `.dat` path.
    pub fn save(&self, path: &Path) -> Result<()> {
        require_data_extension(path)?;
        write_table(
            path,
            POINTS_HEADER,
            self.iter().map(|(pixel, wavelength)| format!("{pixel} {wavelength}")),
        )?;
        info!(path = %path.display(), count = self.len(), "Calibration points saved");
        Ok(())
    }

    /// Read a points file. Pixel positions may be written as integral floats
    /// (`10.0`); fractional or negative positions are rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let table = read_table(path)?;
        let invalid = |reason: String| SpectraError::InvalidDataFile {
            path: path.to_path_buf(),
            reason,
        };

        let points_header: Vec<&str> = POINTS_HEADER
            .trim_start_matches('#')
            .split_whitespace()
            .collect();
        if !table.has_columns(&points_header) && !table.has_columns(&LEGACY_POINTS_COLUMNS) {
            return Err(invalid(format!(
                "unrecognized columns '{}', expected '{}'",
                table.columns.join(" "),
                points_header.join(" ")
            )));
        }

        let mut points = Self::new();
        for row in &table.rows {
            let (x, wavelength) = (row[0], row[1]);
            if !x.is_finite() || x < 0.0 || x.fract() != 0.0 {
                return Err(invalid(format!(
                    "pixel position {x} is not a non-negative integer"
                )));
            }
            points.add(x as usize, wavelength);
        }
        info!(path = %path.display(), count = points.len(), "Calibration points loaded");
        Ok(points)
    }
}

impl FromIterator<(usize, f64)> for CalibrationPoints {
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<usize, f64>> for CalibrationPoints {
    fn from(points: BTreeMap<usize, f64>) -> Self {
        Self { points }
    }
}
