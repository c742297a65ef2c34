use spectra_core::calibration::{CalibrationPoints, PointReview};
use spectra_core::error::{ErrorKind, SpectraError};

fn points() -> CalibrationPoints {
    [(300, 5460.7), (100, 4358.3), (200, 5015.7)].into_iter().collect()
}

#[test]
fn test_review_sorted_by_pixel() {
    let review = PointReview::new(&points());
    let pixels: Vec<usize> = review.entries().iter().map(|e| e.pixel).collect();
    assert_eq!(pixels, vec![100, 200, 300]);
    assert!(review.entries().iter().all(|e| !e.deleted));
}

#[test]
fn test_delete_restore_finalize() {
    let mut review = PointReview::new(&points());
    let before = review.entries()[1].clone();

    review.delete(1).unwrap();
    assert_eq!(review.len(), 3);
    assert_eq!(review.live_count(), 2);
    assert_eq!(review.entries()[2].pixel, 300);
    let finalized = review.finalize();
    assert_eq!(finalized.get(200), None);
    assert_eq!(finalized.len(), 2);

    review.restore(1).unwrap();
    let after = &review.entries()[1];
    assert_eq!((after.pixel, after.wavelength), (before.pixel, before.wavelength));
    assert_eq!(review.finalize(), points());
}

#[test]
fn test_finalize_leaves_list_intact() {
    let mut review = PointReview::new(&points());
    review.delete(0).unwrap();
    let _ = review.finalize();
    assert_eq!(review.len(), 3);
    assert!(review.entries()[0].deleted);
}

#[test]
fn test_modify_partial_fields() {
    let mut review = PointReview::new(&points());
    review.modify(0, Some("105"), None).unwrap();
    review.modify(2, Some("  "), Some("5461.0")).unwrap();

    let finalized = review.finalize();
    assert_eq!(finalized.get(105), Some(4358.3));
    assert_eq!(finalized.get(100), None);
    assert_eq!(finalized.get(300), Some(5461.0));
}

#[test]
fn test_modify_parse_failure_leaves_entry() {
    let mut review = PointReview::new(&points());
    let original = review.clone();

    let err = review.modify(1, Some("20x"), Some("5000.0")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(
        err,
        SpectraError::Validation {
            field: "pixel position",
            ..
        }
    ));

    let err = review.modify(1, Some("201"), Some("five")).unwrap_err();
    assert!(matches!(
        err,
        SpectraError::Validation {
            field: "wavelength",
            ..
        }
    ));

    assert_eq!(review, original);
}

#[test]
fn test_modify_onto_live_pixel_rejected() {
    let mut review = PointReview::new(&points());
    assert!(review.modify(0, Some("200"), None).is_err());

    // A deleted entry does not hold its pixel.
    review.delete(1).unwrap();
    review.modify(0, Some("200"), None).unwrap();
    assert!(review.restore(1).is_err());
    assert!(review.entries()[1].deleted);
}

#[test]
fn test_index_out_of_range() {
    let mut review = PointReview::new(&points());
    let err = review.delete(3).unwrap_err();
    assert!(matches!(err, SpectraError::Validation { field: "index", .. }));
    assert!(review.restore(7).is_err());
    assert!(review.modify(9, None, Some("1.0")).is_err());
}
