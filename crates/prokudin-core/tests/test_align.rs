mod common;

use ndarray::s;

use prokudin_core::align::features::detect_and_describe;
use prokudin_core::align::matcher::match_cross_checked;
use prokudin_core::align::{
    align, align_channels, warp_gray, AlignmentOutcome, SimilarityTransform,
};
use prokudin_core::error::ProkudinError;
use prokudin_core::frame::{ChannelImage, GrayRaster};
use prokudin_core::pipeline::config::AlignmentConfig;
use prokudin_core::pipeline::{CancelToken, NoOpReporter, PipelineStage, ProgressReporter};

use common::{constant, gray_channel, mean_abs_diff, rgb_from_gray, shifted, textured};

use std::sync::Mutex;

/// Scale and rotation about the raster center, mapping channel pixels onto
/// reference pixels.
fn about_center(scale: f64, degrees: f64, size: usize) -> SimilarityTransform {
    let c = (size - 1) as f64 / 2.0;
    let angle = degrees.to_radians();
    let (px, py) = SimilarityTransform::from_params(scale, angle, 0.0, 0.0).apply(c, c);
    SimilarityTransform::from_params(scale, angle, c - px, c - py)
}

/// Align `reference` against two warped copies of itself.
fn align_warped(
    reference: &GrayRaster,
    truths: [&SimilarityTransform; 2],
) -> AlignmentOutcome {
    let (w, h) = reference.dims();
    let channels = [
        gray_channel(reference.clone()),
        gray_channel(warp_gray(reference, truths[0], w, h)),
        gray_channel(warp_gray(reference, truths[1], w, h)),
    ];
    align_channels(
        &channels,
        &AlignmentConfig::default(),
        &NoOpReporter,
        &CancelToken::new(),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Features and matching
// ---------------------------------------------------------------------------

#[test]
fn test_blank_image_has_no_features() {
    let features = detect_and_describe(&constant(100, 100, 128), &AlignmentConfig::default());
    assert!(features.is_empty());
}

#[test]
fn test_textured_image_has_features_within_cap() {
    let config = AlignmentConfig {
        max_features: 40,
        ..Default::default()
    };
    let features = detect_and_describe(&textured(100, 100, 4, 1), &config);
    assert_eq!(features.len(), 40);
    assert_eq!(features.descriptors.len(), 40);
    // Strongest first.
    for pair in features.keypoints.windows(2) {
        assert!(pair[0].response >= pair[1].response);
    }
}

#[test]
fn test_detection_is_deterministic() {
    let img = textured(100, 100, 4, 2);
    let config = AlignmentConfig::default();
    let a = detect_and_describe(&img, &config);
    let b = detect_and_describe(&img, &config);
    assert_eq!(a.keypoints, b.keypoints);
    assert_eq!(a.descriptors, b.descriptors);
}

#[test]
fn test_self_matching_pairs_each_keypoint_with_itself() {
    let img = textured(100, 100, 4, 3);
    let features = detect_and_describe(&img, &AlignmentConfig::default());
    let matches = match_cross_checked(&features.descriptors, &features.descriptors);
    assert!(matches.len() >= 50, "only {} matches", matches.len());
    let exact = matches.iter().filter(|m| m.query == m.train).count();
    assert!(exact * 10 >= matches.len() * 9);
}

// ---------------------------------------------------------------------------
// align
// ---------------------------------------------------------------------------

#[test]
fn test_align_identical_channels_is_identity() {
    let img = textured(100, 100, 4, 10);
    let channels = [
        gray_channel(img.clone()),
        gray_channel(img.clone()),
        gray_channel(img.clone()),
    ];
    let aligned = align(&channels).unwrap();

    assert_eq!(aligned[0].gray, img);
    for channel in &aligned[1..] {
        assert_eq!(channel.gray.dims(), img.dims());
        let diff = mean_abs_diff(&channel.gray, &img, 0..100, 0..100);
        assert!(diff < 2.0, "mean abs diff {diff}");
    }
}

#[test]
fn test_align_recovers_horizontal_shift() {
    let reference = textured(100, 100, 4, 20);
    let moved = shifted(&reference, 5, 0);
    let channels = [
        gray_channel(reference.clone()),
        gray_channel(moved),
        gray_channel(reference.clone()),
    ];

    let outcome = align_channels(
        &channels,
        &AlignmentConfig::default(),
        &NoOpReporter,
        &CancelToken::new(),
    )
    .unwrap();

    let report = &outcome.reports[0];
    assert_eq!(report.channel, 1);
    assert!(report.matches >= 50);
    assert!((report.transform.tx + 5.0).abs() < 0.5, "{}", report.transform);
    assert!(report.transform.ty.abs() < 0.5, "{}", report.transform);
    assert!((report.transform.scale() - 1.0).abs() < 0.01);

    // Overlap: aligned columns 0..95 come from inside the shifted image.
    let aligned = &outcome.channels[1].gray;
    let diff = mean_abs_diff(aligned, &reference, 10..90, 10..85);
    assert!(diff < 8.0, "mean abs diff {diff}");
}

#[test]
fn test_align_warps_color_raster_with_gray() {
    let reference = textured(100, 100, 4, 30);
    let moved = shifted(&reference, 0, 4);
    let channels = [
        gray_channel(reference.clone()),
        ChannelImage::with_color(moved.clone(), rgb_from_gray(&moved)),
        gray_channel(reference.clone()),
    ];

    let aligned = align(&channels).unwrap();
    let color = aligned[1].color.as_ref().unwrap();
    assert_eq!(color.dims(), (100, 100));
    assert_eq!(color.plane(0), aligned[1].gray);
    assert!(aligned[2].color.is_none());
}

#[test]
fn test_output_takes_reference_dimensions() {
    let larger = textured(120, 110, 4, 40);
    let reference = GrayRaster::new(larger.data.slice(s![..90, ..100]).to_owned());
    let channels = [
        gray_channel(reference.clone()),
        gray_channel(larger.clone()),
        gray_channel(larger),
    ];
    let aligned = align(&channels).unwrap();
    for channel in &aligned {
        assert_eq!(channel.gray.dims(), (100, 90));
    }
}

#[test]
fn test_blank_channels_fail_with_insufficient_features() {
    let blank = gray_channel(constant(100, 100, 0));
    let err = align(&[blank.clone(), blank.clone(), blank]).unwrap_err();
    assert!(matches!(err, ProkudinError::InsufficientFeatures { channel: 1 }));
    assert!(err.is_alignment_failure());
    assert_eq!(err.channel(), Some(1));
}

#[test]
fn test_blank_third_channel_reports_channel_two() {
    let img = textured(100, 100, 4, 50);
    let channels = [
        gray_channel(img.clone()),
        gray_channel(img),
        gray_channel(constant(100, 100, 90)),
    ];
    let err = align(&channels).unwrap_err();
    assert!(matches!(err, ProkudinError::InsufficientFeatures { channel: 2 }));
}

#[test]
fn test_match_threshold_is_enforced() {
    let img = textured(100, 100, 4, 60);
    let channels = [
        gray_channel(img.clone()),
        gray_channel(img.clone()),
        gray_channel(img),
    ];
    let config = AlignmentConfig {
        min_matches: 100_000,
        ..Default::default()
    };
    let err =
        align_channels(&channels, &config, &NoOpReporter, &CancelToken::new()).unwrap_err();
    match err {
        ProkudinError::InsufficientMatches {
            channel,
            got,
            required,
        } => {
            assert_eq!(channel, 1);
            assert_eq!(required, 100_000);
            assert!(got > 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let img = gray_channel(textured(64, 64, 4, 70));
    let config = AlignmentConfig {
        pyramid_scale: 1.0,
        ..Default::default()
    };
    let err = align_channels(
        &[img.clone(), img.clone(), img],
        &config,
        &NoOpReporter,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, ProkudinError::InvalidConfig(_)));
}

#[test]
fn test_cancelled_token_stops_alignment() {
    let img = gray_channel(textured(100, 100, 4, 80));
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = align_channels(
        &[img.clone(), img.clone(), img],
        &AlignmentConfig::default(),
        &NoOpReporter,
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, ProkudinError::Cancelled));
}

struct StageRecorder(Mutex<Vec<PipelineStage>>);

impl ProgressReporter for StageRecorder {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.0.lock().unwrap().push(stage);
    }
}

#[test]
fn test_progress_reports_every_stage_in_order() {
    let img = gray_channel(textured(100, 100, 4, 90));
    let recorder = StageRecorder(Mutex::new(Vec::new()));
    align_channels(
        &[img.clone(), img.clone(), img],
        &AlignmentConfig::default(),
        &recorder,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(
        *recorder.0.lock().unwrap(),
        vec![
            PipelineStage::DetectingFeatures,
            PipelineStage::Matching,
            PipelineStage::EstimatingTransform,
            PipelineStage::Warping,
        ]
    );
}

// ---------------------------------------------------------------------------
// Rotation and scale
// ---------------------------------------------------------------------------

#[test]
fn test_align_recovers_rotation() {
    let reference = textured(200, 200, 4, 30);
    let truths = [about_center(1.0, 10.0, 200), about_center(1.0, 30.0, 200)];
    let outcome = align_warped(&reference, [&truths[0], &truths[1]]);

    for (k, degrees) in [10.0, 30.0].into_iter().enumerate() {
        let t = &outcome.reports[k].transform;
        assert!((t.rotation_degrees() - degrees).abs() < 0.25, "{t}");
        assert!((t.scale() - 1.0).abs() < 0.005, "{t}");
        // The rotation center stays put.
        let (cx, cy) = t.apply(99.5, 99.5);
        assert!((cx - 99.5).abs() < 0.5 && (cy - 99.5).abs() < 0.5, "{t}");

        let moved = warp_gray(&reference, &truths[k], 200, 200);
        let unaligned = mean_abs_diff(&moved, &reference, 50..150, 50..150);
        let diff = mean_abs_diff(&outcome.channels[k + 1].gray, &reference, 50..150, 50..150);
        assert!(diff < 25.0, "mean abs diff {diff}");
        assert!(diff < unaligned / 2.0, "{diff} vs unaligned {unaligned}");
    }
}

#[test]
fn test_align_recovers_scale() {
    let reference = textured(200, 200, 4, 31);
    let truths = [about_center(1.05, 3.0, 200), about_center(0.97, 0.0, 200)];
    let outcome = align_warped(&reference, [&truths[0], &truths[1]]);

    let grown = &outcome.reports[0].transform;
    assert!((grown.scale() - 1.05).abs() < 0.005, "{grown}");
    assert!((grown.rotation_degrees() - 3.0).abs() < 0.25, "{grown}");

    let shrunk = &outcome.reports[1].transform;
    assert!((shrunk.scale() - 0.97).abs() < 0.005, "{shrunk}");
    assert!(shrunk.rotation_degrees().abs() < 0.25, "{shrunk}");

    for channel in 1..3 {
        let diff = mean_abs_diff(&outcome.channels[channel].gray, &reference, 50..150, 50..150);
        assert!(diff < 25.0, "channel {channel}: mean abs diff {diff}");
    }
}
