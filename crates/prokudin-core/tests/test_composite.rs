mod common;

use prokudin_core::color::{composite, composite_partial, grayscale_preview, luminance};
use prokudin_core::error::ProkudinError;

use common::{constant, ramp, rgb_from_gray};

#[test]
fn test_neutral_intensities_copy_planes() {
    let img = ramp(20, 10);
    let out = composite([Some(&img), Some(&img), Some(&img)], [100, 100, 100])
        .unwrap()
        .unwrap();
    assert_eq!(out.dims(), (20, 10));
    for plane in 0..3 {
        assert_eq!(out.plane(plane), img);
    }
}

#[test]
fn test_intensity_scales_each_plane() {
    let c = constant(4, 4, 200);
    let out = composite([Some(&c), Some(&c), Some(&c)], [50, 0, 200])
        .unwrap()
        .unwrap();
    assert_eq!(out.data[[0, 0, 0]], 100);
    assert_eq!(out.data[[0, 0, 1]], 0);
    assert_eq!(out.data[[0, 0, 2]], 255);
}

#[test]
fn test_missing_channel_gives_no_output() {
    let c = constant(4, 4, 1);
    let out = composite([Some(&c), None, Some(&c)], [100; 3]).unwrap();
    assert!(out.is_none());
}

#[test]
fn test_dimension_mismatch_is_an_error() {
    let a = constant(4, 4, 1);
    let b = constant(5, 4, 1);
    let err = composite([Some(&a), Some(&b), Some(&a)], [100; 3]).unwrap_err();
    assert!(matches!(
        err,
        ProkudinError::DimensionMismatch {
            expected_w: 4,
            actual_w: 5,
            ..
        }
    ));
}

#[test]
fn test_partial_composite_fills_black() {
    let g = constant(3, 3, 77);
    let out = composite_partial([None, Some(&g), None], [100; 3])
        .unwrap()
        .unwrap();
    assert_eq!(out.data[[1, 1, 0]], 0);
    assert_eq!(out.data[[1, 1, 1]], 77);
    assert_eq!(out.data[[1, 1, 2]], 0);
    assert!(composite_partial([None, None, None], [100; 3])
        .unwrap()
        .is_none());
}

#[test]
fn test_grayscale_preview_replicates_without_scaling() {
    let img = ramp(9, 9);
    let out = grayscale_preview(&img);
    for plane in 0..3 {
        assert_eq!(out.plane(plane), img);
    }
}

#[test]
fn test_luminance_of_gray_rgb_is_unchanged() {
    let img = ramp(16, 16);
    assert_eq!(luminance(&rgb_from_gray(&img)), img);
}
