#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;

const BLOCK: usize = 2880;

fn card(text: &str) -> String {
    format!("{text:<80}")
}

fn value_card(keyword: &str, value: &str) -> String {
    card(&format!("{keyword:<8}= {value:>20}"))
}

/// Build a FITS header block for a 2-D image. `extra` cards are inserted
/// before `END` as preformatted text.
pub fn build_fits_header(bitpix: i32, rows: usize, cols: usize, extra: &[String]) -> Vec<u8> {
    let mut text = String::new();
    text.push_str(&value_card("SIMPLE", "T"));
    text.push_str(&value_card("BITPIX", &bitpix.to_string()));
    text.push_str(&value_card("NAXIS", "2"));
    text.push_str(&value_card("NAXIS1", &cols.to_string()));
    text.push_str(&value_card("NAXIS2", &rows.to_string()));
    for extra_card in extra {
        text.push_str(&card(extra_card));
    }
    text.push_str(&card("END"));

    let mut buf = text.into_bytes();
    pad_to_block(&mut buf, b' ');
    buf
}

fn pad_to_block(buf: &mut Vec<u8>, fill: u8) {
    let padded = buf.len().div_ceil(BLOCK) * BLOCK;
    buf.resize(padded, fill);
}

/// Complete BITPIX = -64 FITS file for `data` (row-major, rows = NAXIS2).
pub fn build_fits_f64(data: &Array2<f64>, extra: &[String]) -> Vec<u8> {
    let (rows, cols) = data.dim();
    let mut buf = build_fits_header(-64, rows, cols, extra);
    for value in data.iter() {
        buf.extend_from_slice(&value.to_be_bytes());
    }
    pad_to_block(&mut buf, 0);
    buf
}

/// Complete BITPIX = 16 FITS file with raw integer samples.
pub fn build_fits_i16(rows: usize, cols: usize, raw: &[i16], extra: &[String]) -> Vec<u8> {
    assert_eq!(raw.len(), rows * cols);
    let mut buf = build_fits_header(16, rows, cols, extra);
    for value in raw {
        buf.extend_from_slice(&value.to_be_bytes());
    }
    pad_to_block(&mut buf, 0);
    buf
}

pub fn float_card(keyword: &str, value: f64) -> String {
    format!("{keyword:<8}= {value:>20}")
}

pub fn string_card(keyword: &str, value: &str) -> String {
    format!("{keyword:<8}= '{value}'")
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn write_gz(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    write_file(dir, name, &encoder.finish().unwrap())
}

/// 10 rows x 5 columns: ones in rows 2..=5 except row 3, which is all twos.
/// Everything else is zero.
pub fn band_image() -> Array2<f64> {
    Array2::from_shape_fn((10, 5), |(r, _)| match r {
        3 => 2.0,
        2 | 4 | 5 => 1.0,
        _ => 0.0,
    })
}

/// Smooth ramp with distinct values everywhere, for rotation checks.
pub fn ramp_image(rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f64 * 0.5 + 1.0)
}

/// Gaussian emission lines on a flat continuum.
pub fn line_flux(len: usize, centers: &[f64], sigma: f64) -> ndarray::Array1<f64> {
    ndarray::Array1::from_shape_fn(len, |i| {
        let x = i as f64;
        1.0 + centers
            .iter()
            .map(|c| 100.0 * (-(x - c).powi(2) / (2.0 * sigma * sigma)).exp())
            .sum::<f64>()
    })
}
