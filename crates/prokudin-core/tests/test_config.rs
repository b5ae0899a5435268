use prokudin_core::pipeline::config::{
    AlignmentConfig, ChannelNaming, ExportConfig, ExportSource, ProjectConfig, RansacConfig,
};
use prokudin_core::pipeline::PipelineStage;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_alignment_defaults() {
    let config = AlignmentConfig::default();
    assert_eq!(config.max_features, 1000);
    assert_eq!(config.min_matches, 50);
    assert_eq!(config.pyramid_levels, 4);
    assert_eq!(config.ransac.seed, 42);
    assert!(config.validate().is_ok());
}

#[test]
fn test_export_defaults() {
    let export = ExportConfig::default();
    assert_eq!(export.source, ExportSource::Processed);
    assert_eq!(export.naming, ChannelNaming::Rgb);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_validate_rejects_min_matches_below_two() {
    let config = AlignmentConfig {
        min_matches: 1,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_features_and_levels() {
    let no_features = AlignmentConfig {
        max_features: 0,
        ..Default::default()
    };
    assert!(no_features.validate().is_err());

    let no_levels = AlignmentConfig {
        pyramid_levels: 0,
        ..Default::default()
    };
    assert!(no_levels.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_ransac_settings() {
    let bad_confidence = AlignmentConfig {
        ransac: RansacConfig {
            confidence: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(bad_confidence.validate().is_err());

    let bad_threshold = RansacConfig {
        inlier_threshold: 0.0,
        ..Default::default()
    };
    assert!(bad_threshold.validate().is_err());
}

#[test]
fn test_builtin_and_distinct_custom_naming_validate() {
    assert!(ChannelNaming::Rgb.validate().is_ok());
    assert!(ChannelNaming::Spectral.validate().is_ok());
    let custom = ChannelNaming::Custom(["red".into(), "green".into(), "blue".into()]);
    assert!(custom.validate().is_ok());
}

#[test]
fn test_naming_rejects_empty_separator_and_duplicate_suffixes() {
    let custom = |a: &str, b: &str, c: &str| ChannelNaming::Custom([a.into(), b.into(), c.into()]);
    assert!(custom("r", "", "b").validate().is_err());
    assert!(custom("r", " ", "b").validate().is_err());
    assert!(custom("r", "g/x", "b").validate().is_err());
    assert!(custom("r", "g", "..\\b").validate().is_err());
    assert!(custom("ir", "vis", "ir").validate().is_err());

    let export = ExportConfig {
        naming: custom("a", "a", "b"),
        ..Default::default()
    };
    assert!(export.validate().is_err());
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

#[test]
fn test_project_config_json_round_trip() {
    let config = ProjectConfig {
        alignment: AlignmentConfig {
            max_features: 500,
            min_matches: 10,
            ..Default::default()
        },
        export: ExportConfig {
            source: ExportSource::Aligned,
            naming: ChannelNaming::Custom(["red".into(), "green".into(), "blue".into()]),
        },
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: ProjectConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_partial_json_fills_defaults() {
    let config: ProjectConfig =
        serde_json::from_str(r#"{"alignment": {"min_matches": 12}}"#).unwrap();
    assert_eq!(config.alignment.min_matches, 12);
    assert_eq!(config.alignment.max_features, 1000);
    assert_eq!(config.export, ExportConfig::default());
}

#[test]
fn test_export_source_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&ExportSource::Aligned).unwrap(),
        "\"aligned\""
    );
    let naming: ChannelNaming = serde_json::from_str("\"spectral\"").unwrap();
    assert_eq!(naming, ChannelNaming::Spectral);
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_naming_suffixes_and_display() {
    assert_eq!(ChannelNaming::Rgb.suffixes(), ["r", "g", "b"]);
    assert_eq!(ChannelNaming::Spectral.to_string(), "ir/vis/uv");
    let custom = ChannelNaming::Custom(["a".into(), "b".into(), "c".into()]);
    assert_eq!(custom.suffixes(), ["a", "b", "c"]);
}

#[test]
fn test_export_source_display() {
    assert_eq!(format!("{}", ExportSource::Processed), "Processed");
    assert_eq!(format!("{}", ExportSource::Aligned), "Aligned");
}

#[test]
fn test_pipeline_stage_display() {
    assert_eq!(
        format!("{}", PipelineStage::DetectingFeatures),
        "Detecting features"
    );
    assert_eq!(format!("{}", PipelineStage::Warping), "Warping channels");
}
