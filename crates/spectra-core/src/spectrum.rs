use std::path::{Path, PathBuf};

use ndarray::Array1;
use tracing::info;

use crate::calibration::Calibration;
use crate::consts::{FLUX_HEADER, WAVELENGTH_FLUX_HEADER};
use crate::error::{Result, SpectraError};
use crate::io::require_data_extension;
use crate::io::text::{read_table, write_table};

/// Column layouts accepted on load. The `spectrum` names are an older
/// layout that is still read but never written.
const FLUX_COLUMNS: [&[&str]; 2] = [&["flux"], &["spectrum"]];
const WAVELENGTH_FLUX_COLUMNS: [&[&str]; 2] = [
    &["wavelength[Angstroms]", "flux"],
    &["wavelength(Angs)", "spectrum"],
];

/// A 1-D spectrum: flux per pixel column, optionally with a wavelength axis.
///
/// Values are never changed in place; calibration returns a new spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    name: PathBuf,
    flux: Array1<f64>,
    wavelength: Option<Array1<f64>>,
}

impl Spectrum {
    /// An uncalibrated spectrum.
    pub fn new(name: impl Into<PathBuf>, flux: Array1<f64>) -> Self {
        Self {
            name: name.into(),
            flux,
            wavelength: None,
        }
    }

    pub fn from_parts(
        name: impl Into<PathBuf>,
        flux: Array1<f64>,
        wavelength: Option<Array1<f64>>,
    ) -> Result<Self> {
        if let Some(ref wavelength) = wavelength {
            if wavelength.len() != flux.len() {
                return Err(SpectraError::LengthMismatch {
                    flux: flux.len(),
                    wavelength: wavelength.len(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            flux,
            wavelength,
        })
    }

    /// Identity of the spectrum, also its default save path.
    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn flux(&self) -> &Array1<f64> {
        &self.flux
    }

    pub fn wavelength(&self) -> Option<&Array1<f64>> {
        self.wavelength.as_ref()
    }

    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    pub fn is_calibrated(&self) -> bool {
        self.wavelength.is_some()
    }

    pub fn flux_at(&self, index: usize) -> Option<f64> {
        self.flux.get(index).copied()
    }

    /// Rename, e.g. after saving under a new path. Flux and wavelength are
    /// untouched.
    pub fn set_name(&mut self, name: impl Into<PathBuf>) {
        self.name = name.into();
    }

    /// Same flux with a complete wavelength axis attached.
    pub fn with_wavelength(&self, wavelength: Array1<f64>) -> Result<Self> {
        Self::from_parts(self.name.clone(), self.flux.clone(), Some(wavelength))
    }

    /// Same flux with the wavelength axis evaluated from `calibration`.
    pub fn calibrated(&self, calibration: &Calibration) -> Self {
        Self {
            name: self.name.clone(),
            flux: self.flux.clone(),
            wavelength: Some(calibration.apply(self.flux.len())),
        }
    }

    /// Walk uphill from `start` to the nearest local peak.
    ///
    /// Steps left while the left neighbour is higher, otherwise right while
    /// the right neighbour is higher. A rough click near a line therefore
    /// snaps onto that line rather than onto the global maximum. `start`
    /// past the end is clamped to the last sample; an empty spectrum
    /// returns 0.
    pub fn find_local_maximum(&self, start: usize) -> usize {
        let n = self.flux.len();
        if n == 0 {
            return 0;
        }
        let flux = &self.flux;
        let mut index = start.min(n - 1);

        if index > 0 && flux[index - 1] > flux[index] {
            while index > 0 && flux[index - 1] > flux[index] {
                index -= 1;
            }
        } else {
            while index + 1 < n && flux[index + 1] > flux[index] {
                index += 1;
            }
        }
        index
    }

    /// Save to the spectrum's own name.
    pub fn save(&self) -> Result<()> {
        self.save_as(&self.name)
    }

    /// Write `# flux` rows, or `# wavelength[Angstroms] flux` rows when
    /// calibrated. The path must end in `.dat`; this is checked before any
    /// file is created.
    pub fn save_as(&self, path: &Path) -> Result<()> {
        require_data_extension(path)?;

        match self.wavelength {
            Some(ref wavelength) => write_table(
                path,
                WAVELENGTH_FLUX_HEADER,
                wavelength
                    .iter()
                    .zip(self.flux.iter())
                    .map(|(w, f)| format!("{w} {f}")),
            )?,
            None => write_table(path, FLUX_HEADER, self.flux.iter().map(|f| f.to_string()))?,
        }

        info!(
            path = %path.display(),
            samples = self.flux.len(),
            calibrated = self.is_calibrated(),
            "Spectrum saved"
        );
        Ok(())
    }

    /// Load a saved spectrum. Calibration state follows the header columns.
    pub fn load(path: &Path) -> Result<Self> {
        let table = read_table(path)?;
        let invalid = |reason: String| SpectraError::InvalidDataFile {
            path: path.to_path_buf(),
            reason,
        };

        if table.rows.is_empty() {
            return Err(invalid("no data rows".into()));
        }

        let spectrum = if FLUX_COLUMNS.iter().any(|cols| table.has_columns(cols)) {
            Self::new(path, Array1::from(table.column(0)))
        } else if WAVELENGTH_FLUX_COLUMNS
            .iter()
            .any(|cols| table.has_columns(cols))
        {
            Self::from_parts(
                path,
                Array1::from(table.column(1)),
                Some(Array1::from(table.column(0))),
            )?
        } else {
            return Err(invalid(format!(
                "unrecognized columns '{}'",
                table.columns.join(" ")
            )));
        };

        info!(
            path = %path.display(),
            samples = spectrum.len(),
            calibrated = spectrum.is_calibrated(),
            "Spectrum loaded"
        );
        Ok(spectrum)
    }
}
