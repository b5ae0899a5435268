use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use prokudin_core::consts::CHANNEL_COUNT;
use prokudin_core::io::crop::{CropAspect, CropRect};
use prokudin_core::io::image_io::{ImageFileDecoder, RasterDecoder};
use prokudin_core::pipeline::config::ProjectConfig;
use prokudin_core::pipeline::{PipelineStage, ProgressReporter};
use prokudin_core::session::Session;
use tracing::{info, warn};

/// The three channel exposures plus alignment settings.
#[derive(Args)]
pub struct InputArgs {
    /// Reference channel (red / IR)
    pub reference: PathBuf,

    /// Second channel (green / visible), aligned to the reference
    pub second: PathBuf,

    /// Third channel (blue / UV), aligned to the reference
    pub third: PathBuf,

    /// Project config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Minimum cross-checked matches per channel pair
    #[arg(long)]
    pub min_matches: Option<usize>,

    /// Maximum keypoints per channel
    #[arg(long)]
    pub max_features: Option<usize>,
}

impl InputArgs {
    pub fn paths(&self) -> [&PathBuf; CHANNEL_COUNT] {
        [&self.reference, &self.second, &self.third]
    }
}

/// Per-channel adjustments and crop.
#[derive(Args)]
pub struct AdjustArgs {
    /// Brightness per channel, comma-separated (-100..100)
    #[arg(long, default_value = "0,0,0")]
    pub brightness: String,

    /// Contrast per channel, comma-separated (-100..100)
    #[arg(long, default_value = "0,0,0")]
    pub contrast: String,

    /// Intensity per channel in percent, comma-separated (0..200)
    #[arg(long, default_value = "100,100,100")]
    pub intensity: String,

    /// Crop rectangle in reference pixels: x,y,width,height
    #[arg(long)]
    pub crop: Option<CropRect>,

    /// Aspect ratio enforced on the crop: free, 1:1, 3:2, 16:9, ...
    #[arg(long, default_value = "free")]
    pub aspect: CropAspect,
}

pub fn load_config(args: &InputArgs) -> Result<ProjectConfig> {
    let mut config: ProjectConfig = if let Some(ref path) = args.config {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid project config")?
    } else {
        ProjectConfig::default()
    };

    if let Some(n) = args.min_matches {
        config.alignment.min_matches = n;
    }
    if let Some(n) = args.max_features {
        config.alignment.max_features = n;
    }
    config.alignment.validate()?;
    config.export.validate()?;
    Ok(config)
}

/// Decode every input into a session, aligning once the third one lands.
///
/// A channel that fails to decode is reported and left empty; the others
/// still load.
pub fn load_session(args: &InputArgs, config: ProjectConfig) -> Result<Session> {
    let mut session = Session::new(config);
    let decoder = ImageFileDecoder;
    let reporter = SpinnerReporter::new()?;

    let mut loaded = 0;
    for (index, path) in args.paths().into_iter().enumerate() {
        reporter.pb.set_message(format!("Loading {}", path.display()));
        match decoder.decode(path) {
            Ok(image) => {
                info!(channel = index, path = %path.display(), "Loaded channel");
                session.load_channel_with_progress(index, image, &reporter)?;
                loaded += 1;
            }
            Err(e) => {
                reporter
                    .pb
                    .suspend(|| warn!(channel = index, error = %e, "Skipping undecodable input"));
            }
        }
    }
    reporter.pb.finish_and_clear();

    if loaded == 0 {
        bail!("None of the input images could be decoded");
    }
    if let Some(err) = session.alignment_error() {
        warn!(error = %err, "Alignment failed; using unaligned channels");
    }
    Ok(session)
}

/// Apply brightness, contrast, intensity and crop arguments to a session.
pub fn apply_adjustments(session: &mut Session, args: &AdjustArgs) -> Result<()> {
    let brightness = parse_triplet(&args.brightness, "brightness")?;
    let contrast = parse_triplet(&args.contrast, "contrast")?;
    let intensity = parse_triplet(&args.intensity, "intensity")?;

    for i in 0..CHANNEL_COUNT {
        session.set_brightness(i, brightness[i])?;
        session.set_contrast(i, contrast[i])?;
        session.set_intensity(i, intensity[i])?;
    }

    if let Some(rect) = args.crop {
        session.set_crop_aspect(args.aspect);
        if !session.begin_crop() {
            bail!("Cannot crop: no channel loaded");
        }
        if !session.set_crop_working(rect) {
            bail!("Crop {rect} is outside the image or smaller than the minimum size");
        }
        session.confirm_crop();
    }
    Ok(())
}

/// Parse `a,b,c` into three integers.
pub fn parse_triplet(s: &str, what: &str) -> Result<[i32; CHANNEL_COUNT]> {
    let values: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid {what} '{s}'"))?;
    match values[..] {
        [a, b, c] => Ok([a, b, c]),
        _ => bail!("Expected three comma-separated {what} values, got '{s}'"),
    }
}

/// Spinner that follows the aligner's stages.
pub struct SpinnerReporter {
    pb: ProgressBar,
}

impl SpinnerReporter {
    pub fn new() -> Result<Self> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner().template("{spinner} {msg} {pos}/{len}")?,
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Ok(Self { pb })
    }
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.pb.set_message(stage.to_string());
        self.pb.set_position(0);
        self.pb.set_length(total_items.unwrap_or(0) as u64);
    }

    fn advance(&self, items_done: usize) {
        self.pb.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.pb.tick();
    }
}
