use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use spectra_core::config::SessionConfig;
use spectra_core::extract::{extract_named, RowBand};
use spectra_core::image::Image;

#[derive(Args)]
pub struct ExtractArgs {
    /// Input FITS image
    pub file: PathBuf,

    /// Lower row of the extraction band
    #[arg(long)]
    pub lower: f64,

    /// Upper row of the extraction band (exclusive)
    #[arg(long)]
    pub upper: f64,

    /// Rotate the image by this many degrees before extracting
    #[arg(long, allow_hyphen_values = true)]
    pub rotate: Option<f64>,

    /// Output file path (defaults to the image name with the extraction suffix)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &ExtractArgs, config: &SessionConfig) -> Result<()> {
    let mut image = Image::open(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    println!("Loaded {}x{} image", image.rows(), image.cols());

    if let Some(angle) = args.rotate {
        image.rotate(angle).context("Rotation failed")?;
        println!("Rotated by {angle} deg");
    }

    let band = RowBand::new(args.lower, args.upper);
    let spectrum = extract_named(&image, band, &config.extraction.suffix)
        .context("Extraction failed")?;

    match &args.output {
        Some(path) => spectrum.save_as(path)?,
        None => spectrum.save()?,
    }
    let saved = args.output.as_deref().unwrap_or(spectrum.name());
    println!(
        "Extracted {} samples from rows {band}, saved to {}",
        spectrum.len(),
        saved.display()
    );

    Ok(())
}
