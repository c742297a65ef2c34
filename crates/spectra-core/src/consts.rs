/// Image file extensions accepted on load, without the leading dot.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["fit", "fits", "fits.gz"];

/// The single extension accepted for spectrum and calibration point files.
pub const DATA_EXTENSION: &str = "dat";

/// Suffix that replaces the image extension when naming an extracted spectrum.
pub const DEFAULT_EXTRACTION_SUFFIX: &str = "_extracted.dat";

/// Suffix that replaces the extraction suffix when naming a calibration points file.
pub const DEFAULT_POINTS_SUFFIX: &str = "_wave_solution_peaks.dat";

/// Degree of the wavelength solution polynomial.
pub const POLYNOMIAL_DEGREE: usize = 3;

/// Default minimum number of calibration points required to fit.
pub const DEFAULT_MIN_CALIBRATION_POINTS: usize = 5;

/// Minimum pixel count (rows*cols) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// FITS logical record size in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Pivot magnitude below which the normal equations are treated as singular.
pub const SINGULAR_PIVOT_EPSILON: f64 = 1e-12;

/// Header line written to spectrum files without a wavelength solution.
pub const FLUX_HEADER: &str = "# flux";

/// Header line written to calibrated spectrum files.
pub const WAVELENGTH_FLUX_HEADER: &str = "# wavelength[Angstroms] flux";

/// Header line written to calibration point files.
pub const POINTS_HEADER: &str = "# x wave";
