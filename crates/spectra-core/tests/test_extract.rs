mod common;

use approx::assert_relative_eq;
use ndarray::{Array2, Axis};
use spectra_core::error::{ErrorKind, SpectraError};
use spectra_core::extract::{extract, extract_named, mean_rows, BandEdge, RowBand};
use spectra_core::image::Image;

use common::band_image;

fn image(pixels: Array2<f64>) -> Image {
    Image::from_pixels("/data/slit.fits", pixels).unwrap()
}

#[test]
fn test_extract_band_average() {
    let spectrum = extract(&image(band_image()), RowBand::new(2.0, 6.0)).unwrap();
    assert_eq!(spectrum.len(), 5);
    for &v in spectrum.flux() {
        assert_relative_eq!(v, 1.25);
    }
    assert!(!spectrum.is_calibrated());
}

#[test]
fn test_extract_names_spectrum_after_image() {
    let spectrum = extract(&image(band_image()), RowBand::new(0.0, 1.0)).unwrap();
    assert_eq!(spectrum.name().to_str(), Some("/data/slit_extracted.dat"));

    let gz = Image::from_pixels("m42.fits.gz", band_image()).unwrap();
    let spectrum = extract_named(&gz, RowBand::new(0.0, 1.0), "_band.dat").unwrap();
    assert_eq!(spectrum.name().to_str(), Some("m42_band.dat"));
}

#[test]
fn test_extract_matches_column_means() {
    let pixels = common::ramp_image(12, 7);
    let img = image(pixels.clone());
    for (lower, upper) in [(0, 1), (0, 12), (3, 9), (11, 12)] {
        let spectrum = extract(&img, RowBand::new(lower as f64, upper as f64)).unwrap();
        assert_eq!(spectrum.len(), pixels.ncols());
        for (c, &v) in spectrum.flux().iter().enumerate() {
            let column = pixels.column(c);
            let expected = column.iter().skip(lower).take(upper - lower).sum::<f64>()
                / (upper - lower) as f64;
            assert_relative_eq!(v, expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_fractional_rows_truncate() {
    let a = extract(&image(band_image()), RowBand::new(2.7, 6.2)).unwrap();
    let b = extract(&image(band_image()), RowBand::new(2.0, 6.0)).unwrap();
    assert_eq!(a.flux(), b.flux());
}

#[test]
fn test_unset_edges_checked_upper_first() {
    let img = image(band_image());
    let err = extract(&img, RowBand::default()).unwrap_err();
    assert!(matches!(err, SpectraError::UpperLimitUnset));
    assert_eq!(err.to_string(), "Upper limit is not set");

    let mut band = RowBand::default();
    band.set(BandEdge::Upper, 4.0);
    let err = extract(&img, band).unwrap_err();
    assert!(matches!(err, SpectraError::LowerLimitUnset));
    assert_eq!(err.kind(), ErrorKind::Extraction);
}

#[test]
fn test_inverted_or_empty_band_rejected() {
    let img = image(band_image());
    for (lower, upper) in [(5.0, 5.0), (6.0, 2.0)] {
        let err = extract(&img, RowBand::new(lower, upper)).unwrap_err();
        assert!(matches!(err, SpectraError::InvertedBand { .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }
    let err = extract(&img, RowBand::new(f64::NAN, 3.0)).unwrap_err();
    assert!(matches!(err, SpectraError::InvertedBand { .. }));
}

#[test]
fn test_band_clipped_to_image() {
    let img = image(band_image());
    let clipped = extract(&img, RowBand::new(-4.0, 30.0)).unwrap();
    let full = band_image().mean_axis(Axis(0)).unwrap();
    assert_eq!(clipped.flux(), &full);

    let err = extract(&img, RowBand::new(10.0, 14.0)).unwrap_err();
    assert!(matches!(err, SpectraError::BandOutsideImage { rows: 10, .. }));
}

#[test]
fn test_band_display() {
    let mut band = RowBand::default();
    assert_eq!(band.to_string(), "[unset, unset)");
    band.set(BandEdge::Lower, 2.5);
    assert_eq!(band.to_string(), "[2.5, unset)");
}

#[test]
fn test_mean_rows_empty_range() {
    let pixels = band_image();
    assert!(mean_rows(&pixels, 3, 3).is_none());
    assert!(mean_rows(&pixels, 0, 11).is_none());
    assert_eq!(mean_rows(&pixels, 3, 4).unwrap().to_vec(), vec![2.0; 5]);
}
