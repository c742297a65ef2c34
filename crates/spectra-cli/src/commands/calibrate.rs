use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use spectra_core::calibration::Calibration;
use spectra_core::config::SessionConfig;
use spectra_core::consts::POLYNOMIAL_DEGREE;
use spectra_core::spectrum::Spectrum;

const MIN_TERMS: usize = POLYNOMIAL_DEGREE + 1;

#[derive(Args)]
pub struct CalibrateArgs {
    /// Input spectrum (.dat)
    pub file: PathBuf,

    /// Calibration points file (x wave)
    #[arg(long)]
    pub points: PathBuf,

    /// Minimum number of calibration points (overrides the config)
    #[arg(long)]
    pub min_points: Option<usize>,

    /// Output file path (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &CalibrateArgs, config: &SessionConfig) -> Result<()> {
    let spectrum = Spectrum::load(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let min_points = args.min_points.unwrap_or(config.calibration.min_points);
    if min_points < MIN_TERMS {
        bail!(
            "--min-points must be at least {} for a degree-{POLYNOMIAL_DEGREE} solution",
            MIN_TERMS
        );
    }
    let calibration = Calibration::from_file(&args.points, min_points)
        .with_context(|| format!("Failed to fit {}", args.points.display()))?;

    println!(
        "Fitted degree-{} solution to {} points",
        calibration.degree(),
        calibration.points().len()
    );
    for (power, c) in calibration.power_coefficients().iter().enumerate() {
        println!("  c{power} = {c:.6e}");
    }
    for (pixel, residual) in calibration.residuals() {
        println!("  pixel {pixel:>6}  residual {residual:+.4}");
    }
    println!("RMS residual: {:.4} Angstroms", calibration.rms_residual());

    let calibrated = spectrum.calibrated(&calibration);
    let output = args.output.as_ref().unwrap_or(&args.file);
    calibrated.save_as(output)?;
    println!("Calibrated spectrum saved to {}", output.display());

    Ok(())
}
