use std::path::Path;

use ndarray::Array1;
use tracing::{debug, info};

use crate::calibration::points::CalibrationPoints;
use crate::consts::{POLYNOMIAL_DEGREE, SINGULAR_PIVOT_EPSILON};
use crate::error::{Result, SpectraError};

const TERMS: usize = POLYNOMIAL_DEGREE + 1;

/// Fitted wavelength solution: a degree-3 polynomial in pixel position.
///
/// The fit is done in a scaled variable `t in [-1, 1]` spanning the fitted
/// pixel range, so the normal equations stay well conditioned for pixel
/// positions in the thousands.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    /// Ascending coefficients in the scaled variable.
    coefficients: [f64; TERMS],
    /// Pixel range mapped onto [-1, 1].
    domain: (f64, f64),
    points: CalibrationPoints,
}

impl Calibration {
    /// Least-squares fit over every point, equally weighted.
    ///
    /// Requires at least `min_points` points, and never fewer than
    /// degree + 1 whatever `min_points` says.
    pub fn fit(points: &CalibrationPoints, min_points: usize) -> Result<Self> {
        let required = min_points.max(TERMS);
        if points.len() < required {
            return Err(SpectraError::TooFewCalibrationPoints {
                found: points.len(),
                required,
            });
        }

        let (lo, hi) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (pixel, _)| {
                (lo.min(pixel as f64), hi.max(pixel as f64))
            });
        let domain = (lo, hi);

        let mut ata = [[0.0f64; TERMS]; TERMS];
        let mut atb = [0.0f64; TERMS];
        for (pixel, wavelength) in points.iter() {
            let row = powers(scale(pixel as f64, domain));
            for j in 0..TERMS {
                for k in 0..TERMS {
                    ata[j][k] += row[j] * row[k];
                }
                atb[j] += row[j] * wavelength;
            }
        }

        let coefficients = solve_linear_system(ata, atb).ok_or(
            SpectraError::DegenerateCalibration {
                degree: POLYNOMIAL_DEGREE,
            },
        )?;

        let calibration = Self {
            coefficients,
            domain,
            points: points.clone(),
        };
        debug!(
            rms = calibration.rms_residual(),
            coefficients = ?calibration.power_coefficients(),
            "Wavelength solution residuals"
        );
        info!(points = points.len(), "Wavelength solution fitted");
        Ok(calibration)
    }

    /// Load a points file and fit it.
    pub fn from_file(path: &Path, min_points: usize) -> Result<Self> {
        let points = CalibrationPoints::load(path)?;
        Self::fit(&points, min_points)
    }

    /// Save the fitted point set. The solution is refit on load.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.points.save(path)
    }

    pub fn degree(&self) -> usize {
        POLYNOMIAL_DEGREE
    }

    pub fn points(&self) -> &CalibrationPoints {
        &self.points
    }

    /// Pixel range the polynomial was fitted over.
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Wavelength at a (possibly fractional) pixel position.
    pub fn evaluate(&self, pixel: f64) -> f64 {
        let t = scale(pixel, self.domain);
        self.coefficients.iter().rev().fold(0.0, |acc, &c| acc * t + c)
    }

    /// Wavelengths for pixels `0 .. size`. Positions outside the fitted
    /// domain are extrapolated.
    pub fn apply(&self, size: usize) -> Array1<f64> {
        Array1::from_iter((0..size).map(|pixel| self.evaluate(pixel as f64)))
    }

    /// Ascending coefficients in raw pixel units:
    /// `wavelength = c0 + c1*x + c2*x^2 + c3*x^3`.
    pub fn power_coefficients(&self) -> [f64; TERMS] {
        // t = offset + slope * x
        let (lo, hi) = self.domain;
        let slope = 2.0 / (hi - lo);
        let offset = -(lo + hi) / (hi - lo);

        let mut result = [0.0; TERMS];
        // (offset + slope*x)^k, expanded with running binomial products.
        let mut term = [0.0; TERMS];
        term[0] = 1.0;
        for (k, &c) in self.coefficients.iter().enumerate() {
            if k > 0 {
                let mut next = [0.0; TERMS];
                for i in 0..k {
                    next[i] += term[i] * offset;
                    next[i + 1] += term[i] * slope;
                }
                term = next;
            }
            for i in 0..=k {
                result[i] += c * term[i];
            }
        }
        result
    }

    /// Fitted minus asserted wavelength at every point, in pixel order.
    pub fn residuals(&self) -> Vec<(usize, f64)> {
        self.points
            .iter()
            .map(|(pixel, wavelength)| (pixel, self.evaluate(pixel as f64) - wavelength))
            .collect()
    }

    pub fn rms_residual(&self) -> f64 {
        let residuals = self.residuals();
        if residuals.is_empty() {
            return 0.0;
        }
        let sum: f64 = residuals.iter().map(|(_, r)| r * r).sum();
        (sum / residuals.len() as f64).sqrt()
    }
}

fn scale(x: f64, (lo, hi): (f64, f64)) -> f64 {
    (2.0 * x - (lo + hi)) / (hi - lo)
}

fn powers(t: f64) -> [f64; TERMS] {
    let mut row = [1.0; TERMS];
    for k in 1..TERMS {
        row[k] = row[k - 1] * t;
    }
    row
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
fn solve_linear_system<const N: usize>(
    mut a: [[f64; N]; N],
    mut b: [f64; N],
) -> Option<[f64; N]> {
    for col in 0..N {
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for row in (col + 1)..N {
            let val = a[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < SINGULAR_PIVOT_EPSILON {
            return None;
        }

        if max_row != col {
            a.swap(col, max_row);
            b.swap(col, max_row);
        }

        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            for j in col..N {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for i in (0..N).rev() {
        x[i] = b[i];
        for j in (i + 1)..N {
            x[i] -= a[i][j] * x[j];
        }
        x[i] /= a[i][i];
    }

    Some(x)
}
