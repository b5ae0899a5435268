mod common;

use prokudin_core::error::ProkudinError;
use prokudin_core::io::crop::CropRect;
use prokudin_core::io::image_io::load_channel_image;
use prokudin_core::pipeline::config::{ExportSource, ProjectConfig};
use prokudin_core::session::{DisplayMode, Session};

use common::{constant, gray_channel, textured};

fn blank_session(value: u8) -> Session {
    let mut session = Session::new(ProjectConfig::default());
    for i in 0..3 {
        session.load_channel(i, gray_channel(constant(60, 40, value))).unwrap();
    }
    session
}

// ---------------------------------------------------------------------------
// Loading and alignment
// ---------------------------------------------------------------------------

#[test]
fn test_alignment_runs_only_when_all_three_are_loaded() {
    let img = textured(100, 100, 4, 5);
    let mut session = Session::new(ProjectConfig::default());

    assert!(session.set_original(0, gray_channel(img.clone())).unwrap().is_none());
    assert!(session.set_original(2, gray_channel(img.clone())).unwrap().is_none());
    assert!(!session.is_complete());
    // Partial sets fall back to their originals.
    assert_eq!(session.slot(2).unwrap().aligned().unwrap().gray, img);

    let request = session
        .set_original(1, gray_channel(img.clone()))
        .unwrap()
        .unwrap();
    assert!(session.is_complete());
    assert!(session.is_alignment_pending());
    assert_eq!(request.generation, session.generation());
}

#[test]
fn test_synchronous_load_aligns_and_reports() {
    let img = textured(100, 100, 4, 6);
    let mut session = Session::new(ProjectConfig::default());
    for i in 0..3 {
        session.load_channel(i, gray_channel(img.clone())).unwrap();
    }
    assert!(!session.is_alignment_pending());
    assert!(session.alignment_error().is_none());
    assert_eq!(session.alignment_reports().len(), 2);
    assert_eq!(session.slot(0).unwrap().aligned().unwrap().gray, img);
}

#[test]
fn test_failed_alignment_keeps_originals_and_records_error() {
    let session = blank_session(100);
    assert!(matches!(
        session.alignment_error(),
        Some(ProkudinError::InsufficientFeatures { channel: 1 })
    ));
    assert!(session.alignment_reports().is_empty());
    for i in 0..3 {
        let slot = session.slot(i).unwrap();
        assert_eq!(slot.aligned(), slot.original());
        assert_eq!(slot.processed(), Some(&slot.original().unwrap().gray));
    }
}

#[test]
fn test_stale_alignment_result_is_ignored() {
    let img = constant(50, 50, 7);
    let mut session = Session::new(ProjectConfig::default());
    for i in 0..2 {
        session.set_original(i, gray_channel(img.clone())).unwrap();
    }
    let request = session.set_original(2, gray_channel(img.clone())).unwrap().unwrap();

    // Replacing a channel invalidates the in-flight request.
    session.set_original(1, gray_channel(constant(50, 50, 9))).unwrap();
    let applied = session.apply_alignment(
        request.generation,
        Err(ProkudinError::InsufficientFeatures { channel: 1 }),
    );
    assert!(!applied);
    assert!(session.alignment_error().is_none());
}

#[test]
fn test_new_load_clears_previous_error() {
    let mut session = blank_session(100);
    assert!(session.alignment_error().is_some());
    session.set_original(0, gray_channel(constant(60, 40, 3))).unwrap();
    assert!(session.alignment_error().is_none());
    assert!(session.is_alignment_pending());
}

#[test]
fn test_cancelled_result_records_nothing() {
    let img = constant(50, 50, 7);
    let mut session = Session::new(ProjectConfig::default());
    let mut request = None;
    for i in 0..3 {
        request = session.set_original(i, gray_channel(img.clone())).unwrap();
    }
    let generation = request.unwrap().generation;
    assert!(session.apply_alignment(generation, Err(ProkudinError::Cancelled)));
    assert!(!session.is_alignment_pending());
    assert!(session.alignment_error().is_none());
}

#[test]
fn test_invalid_channel_index() {
    let mut session = Session::default();
    let err = session.load_channel(3, gray_channel(constant(4, 4, 0))).unwrap_err();
    assert!(matches!(err, ProkudinError::InvalidChannel(3)));
    assert!(session.slot(5).is_err());
    assert!(session.set_brightness(3, 10).is_err());
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[test]
fn test_parameters_are_clamped() {
    let mut session = Session::default();
    session.set_brightness(0, 500).unwrap();
    session.set_contrast(1, -300).unwrap();
    session.set_intensity(2, 999).unwrap();
    session.set_intensity(0, -5).unwrap();

    assert_eq!(session.params(0).unwrap().brightness, 100);
    assert_eq!(session.params(1).unwrap().contrast, -100);
    assert_eq!(session.intensities(), [0, 100, 200]);
}

#[test]
fn test_brightness_reprocesses_only_that_slot() {
    let mut session = blank_session(100);
    session.set_brightness(1, 20).unwrap();
    assert!(session.slot(1).unwrap().processed().unwrap().data.iter().all(|&v| v == 120));
    assert!(session.slot(0).unwrap().processed().unwrap().data.iter().all(|&v| v == 100));
    // Aligned buffers are never touched by adjustments.
    assert!(session.slot(1).unwrap().aligned().unwrap().gray.data.iter().all(|&v| v == 100));
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn test_render_requires_all_channels_in_combined_mode() {
    let mut session = Session::default();
    assert!(session.render().unwrap().is_none());
    session.load_channel(0, gray_channel(constant(60, 40, 50))).unwrap();
    assert!(session.render().unwrap().is_none());

    session.set_display(DisplayMode::Single(0)).unwrap();
    let preview = session.render().unwrap().unwrap();
    assert_eq!(preview.dims(), (60, 40));
    assert_eq!(preview.data[[0, 0, 2]], 50);
}

#[test]
fn test_render_combined_applies_intensity() {
    let mut session = blank_session(100);
    session.set_intensity(2, 50).unwrap();
    let out = session.render().unwrap().unwrap();
    assert_eq!(out.data[[3, 3, 0]], 100);
    assert_eq!(out.data[[3, 3, 2]], 50);
}

#[test]
fn test_display_rejects_bad_channel() {
    let mut session = Session::default();
    assert!(session.set_display(DisplayMode::Single(3)).is_err());
    assert_eq!(session.display(), DisplayMode::Combined);
}

#[test]
fn test_render_uses_saved_crop_only_outside_crop_mode() {
    let mut session = blank_session(100);
    session.set_crop(Some(CropRect::new(10, 5, 30, 20)));
    assert_eq!(session.render().unwrap().unwrap().dims(), (30, 20));

    assert!(session.begin_crop());
    assert_eq!(session.render().unwrap().unwrap().dims(), (60, 40));

    session.cancel_crop();
    assert_eq!(session.render().unwrap().unwrap().dims(), (30, 20));
    session.clear_crop();
    assert_eq!(session.render().unwrap().unwrap().dims(), (60, 40));
}

#[test]
fn test_failed_alignment_with_mismatched_sizes_only_renders_single_channels() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(ProjectConfig::default());
    session.load_channel(0, gray_channel(constant(100, 100, 40))).unwrap();
    session.load_channel(1, gray_channel(constant(80, 60, 40))).unwrap();
    session.load_channel(2, gray_channel(constant(100, 100, 40))).unwrap();
    assert!(session.alignment_error().is_some());

    match session.render() {
        Err(ProkudinError::UnalignedSizes { reason }) => {
            assert_eq!(reason, session.alignment_error().unwrap().to_string());
        }
        other => panic!("unexpected render result: {other:?}"),
    }

    session.set_display(DisplayMode::Single(1)).unwrap();
    assert_eq!(session.render().unwrap().unwrap().dims(), (80, 60));

    let output = dir.path().join("out.png");
    let report = session.export(&output).unwrap();
    assert_eq!(report.summary(), "Saved 3 of 4 images");
    assert_eq!(report.failures().next().unwrap().path, output);
    assert!(dir.path().join("out_g.png").exists());
    assert!(!output.exists());
}

#[test]
fn test_begin_crop_needs_an_image() {
    let mut session = Session::default();
    assert!(!session.begin_crop());
    assert!(!session.set_crop_working(CropRect::new(0, 0, 100, 100)));
}

// ---------------------------------------------------------------------------
// Export and reset
// ---------------------------------------------------------------------------

#[test]
fn test_export_source_selects_buffers() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = blank_session(100);
    session.set_brightness(0, 50).unwrap();
    session.set_intensity(1, 50).unwrap();

    let processed = dir.path().join("processed.png");
    let report = session.export(&processed).unwrap();
    assert!(report.all_succeeded());
    let red = load_channel_image(&dir.path().join("processed_r.png")).unwrap();
    assert_eq!(red.gray.data[[0, 0]], 150);
    let combined = load_channel_image(&processed).unwrap().color.unwrap();
    assert_eq!(combined.data[[0, 0, 1]], 50);

    session.config_mut().export.source = ExportSource::Aligned;
    let aligned = dir.path().join("aligned.png");
    session.export(&aligned).unwrap();
    let red = load_channel_image(&dir.path().join("aligned_r.png")).unwrap();
    assert_eq!(red.gray.data[[0, 0]], 100);
    let combined = load_channel_image(&aligned).unwrap().color.unwrap();
    assert_eq!(combined.data[[0, 0, 1]], 100);
}

#[test]
fn test_export_with_nothing_loaded_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = Session::default().export(&dir.path().join("x.png")).unwrap_err();
    assert!(matches!(err, ProkudinError::NothingToExport));
}

#[test]
fn test_reset_restores_defaults() {
    let mut session = blank_session(100);
    session.set_brightness(0, 10).unwrap();
    session.set_display(DisplayMode::Single(1)).unwrap();
    session.set_crop(Some(CropRect::new(0, 0, 10, 10)));
    let before = session.generation();

    session.reset();

    assert!(session.generation() > before);
    assert!(!session.is_complete());
    assert!(session.alignment_error().is_none());
    assert_eq!(session.display(), DisplayMode::Combined);
    assert!(session.crop().effective().is_none());
    assert_eq!(session.params(0).unwrap().brightness, 0);
    assert!(session.render().unwrap().is_none());
}
