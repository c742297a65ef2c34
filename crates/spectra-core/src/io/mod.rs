pub mod fits;
pub mod text;

use std::path::{Path, PathBuf};

use crate::consts::{DATA_EXTENSION, IMAGE_EXTENSIONS};
use crate::error::{Result, SpectraError};

/// What a file holds, decided from its name alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Spectrum,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        if image_extension(path).is_some() {
            Ok(Self::Image)
        } else if has_data_extension(path) {
            Ok(Self::Spectrum)
        } else {
            let mut accepted: Vec<String> =
                IMAGE_EXTENSIONS.iter().map(|ext| format!(".{ext}")).collect();
            accepted.push(format!(".{DATA_EXTENSION}"));
            Err(SpectraError::UnsupportedExtension {
                path: path.to_path_buf(),
                accepted: accepted.join(", "),
            })
        }
    }
}

/// The accepted image extension `path` ends with, if any.
///
/// Matched on the whole file name so that double extensions like
/// `.fits.gz` are recognized.
pub fn image_extension(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_string_lossy();
    IMAGE_EXTENSIONS
        .iter()
        .copied()
        .filter(|ext| name.len() > ext.len() + 1 && name.ends_with(&format!(".{ext}")))
        .max_by_key(|ext| ext.len())
}

pub fn has_data_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(DATA_EXTENSION)
}

/// Reject `path` unless it carries the data extension. Runs before any I/O.
pub fn require_data_extension(path: &Path) -> Result<()> {
    if has_data_extension(path) {
        Ok(())
    } else {
        Err(SpectraError::UnsupportedExtension {
            path: path.to_path_buf(),
            accepted: format!(".{DATA_EXTENSION}"),
        })
    }
}

/// Replace the trailing `.{extension}` of `path` with `suffix`.
///
/// When `path` does not end with the extension the suffix is appended.
pub fn replace_suffix(path: &Path, extension: &str, suffix: &str) -> PathBuf {
    let full = path.to_string_lossy();
    let ending = format!(".{extension}");
    let stem = full.strip_suffix(ending.as_str()).unwrap_or(&full);
    PathBuf::from(format!("{stem}{suffix}"))
}
