use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Source coordinates closer than this to an integer are snapped onto it, so
/// quarter turns of square images land exactly on pixel centers.
const GRID_SNAP: f64 = 1e-9;

/// Rotate `data` about its center by `angle_degrees` using bilinear
/// interpolation. The output keeps the input shape; samples that fall
/// outside the source are 0.
///
/// Positive angles turn the image counter-clockwise in array coordinates
/// (row 0 at the top), which is clockwise when row 0 is drawn at the bottom.
pub fn rotate_array(data: &Array2<f64>, angle_degrees: f64) -> Array2<f64> {
    let (h, w) = data.dim();
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let cy = (h as f64 - 1.0) / 2.0;
    let cx = (w as f64 - 1.0) / 2.0;

    let row_samples = |row: usize| -> Vec<f64> {
        let dy = row as f64 - cy;
        (0..w)
            .map(|col| {
                let dx = col as f64 - cx;
                let src_x = snap(cx + dx * cos - dy * sin);
                let src_y = snap(cy + dx * sin + dy * cos);
                bilinear_sample(data, src_y, src_x)
            })
            .collect()
    };

    let rows: Vec<Vec<f64>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(row_samples).collect()
    } else {
        (0..h).map(row_samples).collect()
    };

    let mut result = Array2::<f64>::zeros((h, w));
    for (row, row_data) in rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }
    result
}

/// True when `angle_degrees` is a whole number of turns (including 0).
pub fn is_identity_rotation(angle_degrees: f64) -> bool {
    angle_degrees.rem_euclid(360.0) == 0.0
}

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < GRID_SNAP {
        r
    } else {
        v
    }
}

pub fn bilinear_sample(data: &Array2<f64>, y: f64, x: f64) -> f64 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let sample = |r: i64, c: i64| -> f64 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    let v00 = sample(y0, x0);
    let v10 = sample(y0, x1);
    let v01 = sample(y1, x0);
    let v11 = sample(y1, x1);

    v00 * (1.0 - fx) * (1.0 - fy) + v10 * fx * (1.0 - fy) + v01 * (1.0 - fx) * fy + v11 * fx * fy
}
