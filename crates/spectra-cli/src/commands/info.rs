use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ndarray::Array1;
use spectra_core::image::Image;
use spectra_core::io::FileKind;
use spectra_core::spectrum::Spectrum;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS image (.fit, .fits, .fits.gz) or spectrum (.dat)
    pub file: PathBuf,
}

const SHOWN_KEYWORDS: [&str; 6] = [
    "OBJECT", "DATE-OBS", "EXPTIME", "TELESCOP", "INSTRUME", "OBSERVER",
];

pub fn run(args: &InfoArgs) -> Result<()> {
    match FileKind::from_path(&args.file)? {
        FileKind::Image => image_info(args),
        FileKind::Spectrum => spectrum_info(args),
    }
}

fn image_info(args: &InfoArgs) -> Result<()> {
    let image = Image::open(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    println!("File:        {}", image.path().display());
    println!("Format:      {}", image.source_format());
    println!("Dimensions:  {} rows x {} cols", image.rows(), image.cols());
    for keyword in SHOWN_KEYWORDS {
        if let Some(value) = image.metadata().get(keyword) {
            println!("{:<13}{}", format!("{keyword}:"), value);
        }
    }
    let (min, max) = range(image.pixels().iter().copied());
    println!("Pixel range: {min} .. {max}");
    println!("Pixel mean:  {:.4}", image.pixels().mean().unwrap_or(f64::NAN));
    println!("Header:      {} cards", image.metadata().len());

    Ok(())
}

fn spectrum_info(args: &InfoArgs) -> Result<()> {
    let spectrum = Spectrum::load(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    println!("File:        {}", spectrum.name().display());
    println!("Samples:     {}", spectrum.len());
    let (min, max) = range(spectrum.flux().iter().copied());
    println!("Flux range:  {min} .. {max}");
    match spectrum.wavelength() {
        Some(wavelength) => {
            let (first, last) = ends(wavelength);
            println!("Wavelength:  {first:.2} .. {last:.2} Angstroms");
        }
        None => println!("Wavelength:  uncalibrated"),
    }

    Ok(())
}

fn range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn ends(values: &Array1<f64>) -> (f64, f64) {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => (f64::NAN, f64::NAN),
    }
}
