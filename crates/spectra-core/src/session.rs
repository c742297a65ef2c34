use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::calibration::review::parse_wavelength;
use crate::calibration::{default_points_path, Calibration, CalibrationPoints, PointReview};
use crate::config::SessionConfig;
use crate::error::{Result, SpectraError};
use crate::extract::{extract_named, BandEdge, RowBand};
use crate::image::Image;
use crate::io::FileKind;
use crate::spectrum::Spectrum;

/// Where the session is in the image → spectrum → calibrated workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    ImageLoaded,
    Extracted,
    Calibrated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::ImageLoaded => write!(f, "image loaded"),
            Self::Extracted => write!(f, "extracted"),
            Self::Calibrated => write!(f, "calibrated"),
        }
    }
}

/// What the next pointer gesture on the display surface means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    AwaitingBandSelection(BandEdge),
    AwaitingCalibrationPoint,
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingBandSelection(edge) => write!(f, "setting {edge} limit"),
            Self::AwaitingCalibrationPoint => write!(f, "marking calibration points"),
        }
    }
}

struct ImageWork {
    image: Image,
    band: RowBand,
}

struct SpectrumWork {
    spectrum: Spectrum,
    points: CalibrationPoints,
    review: Option<PointReview>,
    calibration: Option<Calibration>,
}

impl SpectrumWork {
    fn new(spectrum: Spectrum) -> Self {
        Self {
            spectrum,
            points: CalibrationPoints::new(),
            review: None,
            calibration: None,
        }
    }

    fn ensure_no_review(&self, operation: &'static str) -> Result<()> {
        if self.review.is_some() {
            Err(SpectraError::InvalidState {
                operation,
                reason: "commit or cancel the open point review first".into(),
            })
        } else {
            Ok(())
        }
    }
}

enum Workspace {
    Empty,
    Image(ImageWork),
    Spectrum(SpectrumWork),
}

impl Workspace {
    fn image_mut(&mut self) -> Option<&mut ImageWork> {
        match self {
            Self::Image(work) => Some(work),
            _ => None,
        }
    }

    fn spectrum_mut(&mut self) -> Option<&mut SpectrumWork> {
        match self {
            Self::Spectrum(work) => Some(work),
            _ => None,
        }
    }
}

/// One interactive measurement session.
///
/// Every operation either completes or returns an error with the session
/// left exactly as it was. Successful operations return a short status line
/// for the display surface.
pub struct Session {
    config: SessionConfig,
    workspace: Workspace,
    mode: InteractionMode,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            config: SessionConfig::default(),
            workspace: Workspace::Empty,
            mode: InteractionMode::Idle,
        }
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match &self.workspace {
            Workspace::Empty => SessionState::Empty,
            Workspace::Image(_) => SessionState::ImageLoaded,
            Workspace::Spectrum(work) if work.spectrum.is_calibrated() => {
                SessionState::Calibrated
            }
            Workspace::Spectrum(_) => SessionState::Extracted,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn image(&self) -> Option<&Image> {
        match &self.workspace {
            Workspace::Image(work) => Some(&work.image),
            _ => None,
        }
    }

    pub fn band(&self) -> Option<RowBand> {
        match &self.workspace {
            Workspace::Image(work) => Some(work.band),
            _ => None,
        }
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum_work().map(|w| &w.spectrum)
    }

    pub fn points(&self) -> Option<&CalibrationPoints> {
        self.spectrum_work().map(|w| &w.points)
    }

    pub fn review(&self) -> Option<&PointReview> {
        self.spectrum_work().and_then(|w| w.review.as_ref())
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.spectrum_work().and_then(|w| w.calibration.as_ref())
    }

    fn spectrum_work(&self) -> Option<&SpectrumWork> {
        match &self.workspace {
            Workspace::Spectrum(work) => Some(work),
            _ => None,
        }
    }

    fn require_image(&mut self, operation: &'static str) -> Result<&mut ImageWork> {
        let state = self.state();
        self.workspace
            .image_mut()
            .ok_or_else(|| unavailable(operation, state, "a loaded image"))
    }

    fn require_spectrum(&mut self, operation: &'static str) -> Result<&mut SpectrumWork> {
        let state = self.state();
        self.workspace
            .spectrum_mut()
            .ok_or_else(|| unavailable(operation, state, "a spectrum"))
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Open an image or a spectrum, chosen by file extension.
    pub fn open(&mut self, path: &Path) -> Result<String> {
        match FileKind::from_path(path)? {
            FileKind::Image => self.load_image(path),
            FileKind::Spectrum => self.load_spectrum(path),
        }
    }

    pub fn load_image(&mut self, path: &Path) -> Result<String> {
        let image = Image::open(path)?;
        Ok(self.set_image(image))
    }

    /// Replace whatever the session holds with `image`.
    pub fn set_image(&mut self, image: Image) -> String {
        let status = format!(
            "Loaded image {} ({}x{})",
            image.path().display(),
            image.rows(),
            image.cols()
        );
        self.workspace = Workspace::Image(ImageWork {
            image,
            band: RowBand::default(),
        });
        self.mode = InteractionMode::Idle;
        status
    }

    pub fn load_spectrum(&mut self, path: &Path) -> Result<String> {
        let spectrum = Spectrum::load(path)?;
        Ok(self.set_spectrum(spectrum))
    }

    /// Replace whatever the session holds with `spectrum`. Calibration
    /// points and any fitted solution start empty.
    pub fn set_spectrum(&mut self, spectrum: Spectrum) -> String {
        let status = format!(
            "Loaded spectrum {} ({} samples, {})",
            spectrum.name().display(),
            spectrum.len(),
            if spectrum.is_calibrated() {
                "calibrated"
            } else {
                "uncalibrated"
            }
        );
        self.workspace = Workspace::Spectrum(SpectrumWork::new(spectrum));
        self.mode = InteractionMode::Idle;
        status
    }

    // ------------------------------------------------------------------
    // Image stage
    // ------------------------------------------------------------------

    /// Rotate the image by a typed angle in degrees.
    pub fn rotate_input(&mut self, input: &str) -> Result<String> {
        let work = self.require_image("rotate the image")?;
        let angle = work.image.rotate_input(input)?;
        Ok(format!(
            "Rotated image by {angle} deg (total {} deg)",
            work.image.cumulative_rotation_degrees()
        ))
    }

    /// Route the next row selections to `edge`.
    pub fn begin_band_selection(&mut self, edge: BandEdge) -> Result<String> {
        self.require_image("select the extraction band")?;
        self.mode = InteractionMode::AwaitingBandSelection(edge);
        Ok(format!("Setting {edge} limit"))
    }

    /// A row picked on the image while a band edge is being set.
    pub fn select_row(&mut self, row: f64) -> Result<String> {
        let InteractionMode::AwaitingBandSelection(edge) = self.mode else {
            return Err(SpectraError::InvalidState {
                operation: "select a row",
                reason: "no band limit is being set".into(),
            });
        };
        let row = finite("row", row)?;
        let work = self.require_image("select a row")?;
        work.band.set(edge, row);
        debug!(%edge, row, "Band limit selected");
        Ok(format!("{} limit set to row {row}", capitalize(&edge.to_string())))
    }

    /// Set both band edges at once.
    pub fn select_band(&mut self, lower: f64, upper: f64) -> Result<String> {
        let lower = finite("lower limit", lower)?;
        let upper = finite("upper limit", upper)?;
        let work = self.require_image("select the extraction band")?;
        work.band = RowBand::new(lower, upper);
        Ok(format!("Extraction band set to {}", work.band))
    }

    /// Leave any selection or marking mode.
    pub fn end_interaction(&mut self) {
        self.mode = InteractionMode::Idle;
    }

    /// Extract the selected band into a new spectrum. On success the image is
    /// released and the session moves to the extracted state.
    pub fn extract(&mut self) -> Result<String> {
        let suffix = self.config.extraction.suffix.clone();
        let work = self.require_image("extract a spectrum")?;
        let spectrum = extract_named(&work.image, work.band, &suffix)?;
        let status = format!(
            "Extracted {} ({} samples) from rows {}",
            spectrum.name().display(),
            spectrum.len(),
            work.band
        );
        self.workspace = Workspace::Spectrum(SpectrumWork::new(spectrum));
        self.mode = InteractionMode::Idle;
        Ok(status)
    }

    // ------------------------------------------------------------------
    // Calibration points
    // ------------------------------------------------------------------

    pub fn begin_marking(&mut self) -> Result<String> {
        let work = self.require_spectrum("mark calibration points")?;
        work.ensure_no_review("mark calibration points")?;
        self.mode = InteractionMode::AwaitingCalibrationPoint;
        Ok("Marking calibration points".into())
    }

    /// Mark a calibration point at a picked pixel with a typed wavelength.
    ///
    /// The pixel is rounded and clamped to the spectrum, then snapped onto
    /// the nearest local maximum when the configuration asks for it. A point
    /// already at the resulting pixel is overwritten.
    pub fn mark_point(&mut self, pixel: f64, wavelength_input: &str) -> Result<String> {
        if self.mode != InteractionMode::AwaitingCalibrationPoint {
            return Err(SpectraError::InvalidState {
                operation: "mark a calibration point",
                reason: "calibration point marking is not active".into(),
            });
        }
        let snap = self.config.peaks.snap_to_local_maximum;
        let pixel = finite("pixel position", pixel)?;
        let wavelength = parse_wavelength(wavelength_input)?;

        let work = self.require_spectrum("mark a calibration point")?;
        work.ensure_no_review("mark a calibration point")?;
        if work.spectrum.is_empty() {
            return Err(SpectraError::validation(
                "pixel position",
                "the spectrum has no samples",
            ));
        }

        let clicked = (pixel.round().max(0.0) as usize).min(work.spectrum.len() - 1);
        let index = if snap {
            work.spectrum.find_local_maximum(clicked)
        } else {
            clicked
        };
        let flux = work.spectrum.flux_at(index).unwrap_or(f64::NAN);
        let replaced = work.points.add(index, wavelength);
        info!(pixel = index, wavelength, "Calibration point marked");

        let mut status = format!("Pixel {index} (flux {flux}) -> {wavelength} Angstroms");
        if index != clicked {
            status.push_str(&format!(", snapped from pixel {clicked}"));
        }
        if let Some(old) = replaced {
            status.push_str(&format!(", replacing {old}"));
        }
        Ok(status)
    }

    pub fn unmark(&mut self, pixel: usize) -> Result<String> {
        let work = self.require_spectrum("remove a calibration point")?;
        work.ensure_no_review("remove a calibration point")?;
        match work.points.remove(pixel) {
            Some(wavelength) => Ok(format!(
                "Removed calibration point {pixel} -> {wavelength} Angstroms"
            )),
            None => Err(SpectraError::validation(
                "pixel position",
                format!("no calibration point at pixel {pixel}"),
            )),
        }
    }

    /// Replace the working point set with the contents of a points file.
    pub fn load_points(&mut self, path: &Path) -> Result<String> {
        let work = self.require_spectrum("load calibration points")?;
        work.ensure_no_review("load calibration points")?;
        let points = CalibrationPoints::load(path)?;
        let count = points.len();
        work.points.replace(points);
        Ok(format!(
            "Loaded {count} calibration points from {}",
            path.display()
        ))
    }

    /// Save the working point set. Without a path, saves next to the
    /// spectrum.
    pub fn save_points(&mut self, path: Option<&Path>) -> Result<String> {
        let path = self.target_points_path(path, "save calibration points")?;
        let work = self.require_spectrum("save calibration points")?;
        work.points.save(&path)?;
        Ok(format!(
            "Saved {} calibration points to {}",
            work.points.len(),
            path.display()
        ))
    }

    // ------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------

    /// Open an editable, tombstoning view of the working points.
    pub fn begin_review(&mut self) -> Result<String> {
        let work = self.require_spectrum("review calibration points")?;
        work.ensure_no_review("review calibration points")?;
        let review = PointReview::new(&work.points);
        let status = if review.is_empty() {
            "No calibration points to review".to_string()
        } else {
            format!("Reviewing {} calibration points", review.len())
        };
        work.review = Some(review);
        self.mode = InteractionMode::Idle;
        Ok(status)
    }

    pub fn review_mut(&mut self) -> Result<&mut PointReview> {
        self.workspace
            .spectrum_mut()
            .and_then(|w| w.review.as_mut())
            .ok_or_else(|| SpectraError::InvalidState {
                operation: "edit calibration points",
                reason: "no point review is open".into(),
            })
    }

    /// Keep the live entries of the review as the new working set.
    pub fn commit_review(&mut self) -> Result<String> {
        let work = self.require_spectrum("commit the point review")?;
        let review = work.review.take().ok_or_else(|| SpectraError::InvalidState {
            operation: "commit the point review",
            reason: "no point review is open".into(),
        })?;
        let kept = review.finalize();
        let status = format!(
            "Kept {} of {} calibration points",
            kept.len(),
            review.len()
        );
        work.points.replace(kept);
        Ok(status)
    }

    /// Drop the review; the working set is unchanged.
    pub fn cancel_review(&mut self) -> Result<String> {
        let work = self.require_spectrum("cancel the point review")?;
        match work.review.take() {
            Some(_) => Ok("Point review discarded".into()),
            None => Err(SpectraError::InvalidState {
                operation: "cancel the point review",
                reason: "no point review is open".into(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Wavelength solution
    // ------------------------------------------------------------------

    /// Fit a wavelength solution to the working points.
    pub fn compute_calibration(&mut self) -> Result<String> {
        let min_points = self.config.calibration.min_points;
        let work = self.require_spectrum("compute the wavelength solution")?;
        work.ensure_no_review("compute the wavelength solution")?;
        let calibration = Calibration::fit(&work.points, min_points)?;
        let status = format!(
            "Wavelength solution computed from {} points (rms residual {:.4} Angstroms)",
            calibration.points().len(),
            calibration.rms_residual()
        );
        work.calibration = Some(calibration);
        self.mode = InteractionMode::Idle;
        Ok(status)
    }

    /// Load a points file and fit it. The loaded points become the working
    /// set.
    pub fn load_calibration(&mut self, path: &Path) -> Result<String> {
        let min_points = self.config.calibration.min_points;
        let work = self.require_spectrum("load a wavelength solution")?;
        work.ensure_no_review("load a wavelength solution")?;
        let calibration = Calibration::from_file(path, min_points)?;
        let status = format!(
            "Wavelength solution loaded from {} ({} points)",
            path.display(),
            calibration.points().len()
        );
        work.points = calibration.points().clone();
        work.calibration = Some(calibration);
        Ok(status)
    }

    /// Save the points behind the current wavelength solution.
    pub fn save_calibration(&mut self, path: Option<&Path>) -> Result<String> {
        let path = self.target_points_path(path, "save the wavelength solution")?;
        let work = self.require_spectrum("save the wavelength solution")?;
        let calibration = work
            .calibration
            .as_ref()
            .ok_or_else(|| SpectraError::InvalidState {
                operation: "save the wavelength solution",
                reason: "set the calibration before saving it".into(),
            })?;
        calibration.save(&path)?;
        Ok(format!("Wavelength solution saved to {}", path.display()))
    }

    /// Apply the current wavelength solution, replacing the spectrum with a
    /// calibrated one.
    pub fn calibrate(&mut self) -> Result<String> {
        let work = self.require_spectrum("calibrate the spectrum")?;
        let calibration = work
            .calibration
            .as_ref()
            .ok_or_else(|| SpectraError::InvalidState {
                operation: "calibrate the spectrum",
                reason: "no wavelength solution has been computed or loaded".into(),
            })?;
        let calibrated = work.spectrum.calibrated(calibration);
        let status = match calibrated.wavelength() {
            Some(w) if !w.is_empty() => format!(
                "Spectrum calibrated: {:.2} to {:.2} Angstroms",
                w[0],
                w[w.len() - 1]
            ),
            _ => "Spectrum calibrated".to_string(),
        };
        work.spectrum = calibrated;
        self.mode = InteractionMode::Idle;
        Ok(status)
    }

    /// Save the spectrum, to `path` when given (the spectrum is then renamed
    /// to it) or to its own name.
    pub fn save_spectrum(&mut self, path: Option<&Path>) -> Result<String> {
        let work = self.require_spectrum("save the spectrum")?;
        match path {
            Some(path) => {
                work.spectrum.save_as(path)?;
                work.spectrum.set_name(path);
            }
            None => work.spectrum.save()?,
        }
        Ok(format!("Saved spectrum to {}", work.spectrum.name().display()))
    }

    /// Default calibration points file for the current spectrum.
    pub fn default_points_path(&self) -> Option<PathBuf> {
        let spectrum = self.spectrum()?;
        Some(default_points_path(
            spectrum.name(),
            &self.config.extraction.suffix,
            &self.config.calibration.points_suffix,
        ))
    }

    fn target_points_path(
        &self,
        path: Option<&Path>,
        operation: &'static str,
    ) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => self
                .default_points_path()
                .ok_or_else(|| unavailable(operation, self.state(), "a spectrum")),
        }
    }

    /// One-line summary of the session.
    pub fn status(&self) -> String {
        let mut parts = vec![format!("state: {}", self.state()), format!("mode: {}", self.mode)];
        match &self.workspace {
            Workspace::Empty => {}
            Workspace::Image(work) => {
                parts.push(format!(
                    "image: {} ({}x{}, rotated {} deg)",
                    work.image.path().display(),
                    work.image.rows(),
                    work.image.cols(),
                    work.image.cumulative_rotation_degrees()
                ));
                parts.push(format!("band: {}", work.band));
            }
            Workspace::Spectrum(work) => {
                parts.push(format!(
                    "spectrum: {} ({} samples)",
                    work.spectrum.name().display(),
                    work.spectrum.len()
                ));
                parts.push(format!("{} calibration points", work.points.len()));
                parts.push(match work.calibration {
                    Some(_) => "wavelength solution ready".to_string(),
                    None => "no wavelength solution".to_string(),
                });
                if work.review.is_some() {
                    parts.push("review open".to_string());
                }
            }
        }
        parts.join(" | ")
    }
}

fn unavailable(operation: &'static str, state: SessionState, needed: &str) -> SpectraError {
    SpectraError::InvalidState {
        operation,
        reason: format!("requires {needed}, session is {state}"),
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SpectraError::validation(
            field,
            format!("{value} is not a finite number"),
        ))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
