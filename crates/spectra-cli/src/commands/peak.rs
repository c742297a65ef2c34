use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use spectra_core::spectrum::Spectrum;

#[derive(Args)]
pub struct PeakArgs {
    /// Input spectrum (.dat)
    pub file: PathBuf,

    /// Starting pixel
    pub pixel: usize,
}

pub fn run(args: &PeakArgs) -> Result<()> {
    let spectrum = Spectrum::load(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let peak = spectrum.find_local_maximum(args.pixel);
    let flux = spectrum.flux_at(peak).unwrap_or(f64::NAN);

    match spectrum.wavelength().and_then(|w| w.get(peak)) {
        Some(wavelength) => println!("{peak}\t{flux}\t{wavelength}"),
        None => println!("{peak}\t{flux}"),
    }

    Ok(())
}
