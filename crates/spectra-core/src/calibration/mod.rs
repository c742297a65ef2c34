pub mod fit;
pub mod points;
pub mod review;

use std::path::{Path, PathBuf};

use crate::consts::DATA_EXTENSION;
use crate::io::replace_suffix;

pub use fit::Calibration;
pub use points::CalibrationPoints;
pub use review::{PointReview, ReviewEntry};

/// Default calibration points file next to a spectrum: the spectrum's
/// extraction suffix (or bare `.dat`) replaced by `points_suffix`.
pub fn default_points_path(
    spectrum_name: &Path,
    extraction_suffix: &str,
    points_suffix: &str,
) -> PathBuf {
    let name = spectrum_name.to_string_lossy();
    match name.strip_suffix(extraction_suffix) {
        Some(stem) => PathBuf::from(format!("{stem}{points_suffix}")),
        None => replace_suffix(spectrum_name, DATA_EXTENSION, points_suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_path() {
        let path = default_points_path(
            Path::new("night1/m42_extracted.dat"),
            "_extracted.dat",
            "_wave_solution_peaks.dat",
        );
        assert_eq!(path, PathBuf::from("night1/m42_wave_solution_peaks.dat"));

        let path = default_points_path(Path::new("m42.dat"), "_extracted.dat", "_peaks.dat");
        assert_eq!(path, PathBuf::from("m42_peaks.dat"));
    }
}
