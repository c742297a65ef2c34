mod common;

use approx::assert_relative_eq;
use ndarray::{array, Array1};
use spectra_core::calibration::{Calibration, CalibrationPoints};
use spectra_core::error::{ErrorKind, SpectraError};
use spectra_core::spectrum::Spectrum;
use tempfile::TempDir;

use common::{line_flux, write_file};

#[test]
fn test_save_load_flux_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m42_extracted.dat");
    let spectrum = Spectrum::new(&path, array![1.0, 2.5, 1.0 / 3.0, -0.0, 1e-17]);
    spectrum.save().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("# flux\n"));

    let loaded = Spectrum::load(&path).unwrap();
    assert_eq!(loaded.flux(), spectrum.flux());
    assert!(!loaded.is_calibrated());
    assert_eq!(loaded.name(), path.as_path());
}

#[test]
fn test_save_load_calibrated_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("calibrated.dat");
    let spectrum = Spectrum::from_parts(
        "ignored.dat",
        array![10.0, 20.0, 15.0],
        Some(array![4000.0, 4000.5, 4001.25]),
    )
    .unwrap();
    spectrum.save_as(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("# wavelength[Angstroms] flux\n"));

    let loaded = Spectrum::load(&path).unwrap();
    assert_eq!(loaded.flux(), spectrum.flux());
    assert_eq!(loaded.wavelength(), spectrum.wavelength());
}

#[test]
fn test_load_legacy_headers() {
    let dir = TempDir::new().unwrap();
    let plain = write_file(dir.path(), "a.dat", b"# spectrum\n1.0\n2.0\n");
    assert_eq!(Spectrum::load(&plain).unwrap().flux(), &array![1.0, 2.0]);

    let calibrated = write_file(
        dir.path(),
        "b.dat",
        b"# wavelength(Angs) spectrum\n4000.0 1.0\n4001.0 2.0\n",
    );
    let loaded = Spectrum::load(&calibrated).unwrap();
    assert_eq!(loaded.wavelength(), Some(&array![4000.0, 4001.0]));
}

#[test]
fn test_load_rejects_unknown_columns_and_empty() {
    let dir = TempDir::new().unwrap();
    let unknown = write_file(dir.path(), "c.dat", b"# counts\n1.0\n");
    let err = Spectrum::load(&unknown).unwrap_err();
    assert!(matches!(err, SpectraError::InvalidDataFile { .. }));
    assert_eq!(err.kind(), ErrorKind::Format);

    let empty = write_file(dir.path(), "d.dat", b"# flux\n");
    assert!(Spectrum::load(&empty).is_err());

    let ragged = write_file(dir.path(), "e.dat", b"# flux\n1.0\n2.0 3.0\n");
    let err = Spectrum::load(&ragged).unwrap_err();
    assert!(err.to_string().contains('3'), "{err}");
}

#[test]
fn test_load_missing_file_is_file_error() {
    let dir = TempDir::new().unwrap();
    let err = Spectrum::load(&dir.path().join("none.dat")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::File);
}

#[test]
fn test_save_wrong_extension_before_io() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spectrum.csv");
    let err = Spectrum::new("x.dat", array![1.0]).save_as(&path).unwrap_err();
    assert!(matches!(err, SpectraError::UnsupportedExtension { .. }));
    assert!(!path.exists());
}

#[test]
fn test_length_mismatch() {
    let err = Spectrum::from_parts("x.dat", array![1.0, 2.0], Some(array![1.0])).unwrap_err();
    assert!(matches!(
        err,
        SpectraError::LengthMismatch {
            flux: 2,
            wavelength: 1
        }
    ));
}

#[test]
fn test_find_local_maximum_climbs_to_nearest_peak() {
    let spectrum = Spectrum::new("s.dat", line_flux(200, &[40.0, 120.0], 3.0));
    assert_eq!(spectrum.find_local_maximum(35), 40);
    assert_eq!(spectrum.find_local_maximum(47), 40);
    assert_eq!(spectrum.find_local_maximum(115), 120);
    assert_eq!(
        spectrum.find_local_maximum(500),
        spectrum.find_local_maximum(199)
    );
}

#[test]
fn test_find_local_maximum_idempotent() {
    let spectrum = Spectrum::new(
        "s.dat",
        array![0.0, 3.0, 1.0, 1.0, 5.0, 4.0, 4.0, 9.0, 2.0],
    );
    for start in 0..spectrum.len() {
        let peak = spectrum.find_local_maximum(start);
        assert_eq!(spectrum.find_local_maximum(peak), peak, "start {start}");
    }
    // Plateaus stop the climb.
    assert_eq!(spectrum.find_local_maximum(3), 4);
    assert_eq!(spectrum.find_local_maximum(2), 1);
}

#[test]
fn test_find_local_maximum_empty() {
    let spectrum = Spectrum::new("s.dat", Array1::zeros(0));
    assert_eq!(spectrum.find_local_maximum(7), 0);
}

#[test]
fn test_calibrated_returns_new_spectrum() {
    let points: CalibrationPoints = [(0, 4000.0), (3, 4003.0), (6, 4006.0), (9, 4009.0)]
        .into_iter()
        .collect();
    let calibration = Calibration::fit(&points, 4).unwrap();
    let spectrum = Spectrum::new("s.dat", Array1::ones(10));

    let calibrated = spectrum.calibrated(&calibration);
    assert!(!spectrum.is_calibrated());
    assert!(calibrated.is_calibrated());
    assert_eq!(calibrated.flux(), spectrum.flux());
    let wavelength = calibrated.wavelength().unwrap();
    assert_eq!(wavelength.len(), 10);
    assert_relative_eq!(wavelength[5], 4005.0, epsilon = 1e-9);
}
