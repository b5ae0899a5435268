use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use prokudin_core::io::image_io::{save_rgb, OutputFormat};
use prokudin_core::session::DisplayMode;

use super::inputs::{apply_adjustments, load_config, load_session, AdjustArgs, InputArgs};

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub adjust: AdjustArgs,

    /// Show only this channel (0, 1 or 2) instead of the combined image
    #[arg(long)]
    pub channel: Option<usize>,

    /// Output file path
    #[arg(short, long, default_value = "preview.png")]
    pub output: PathBuf,
}

pub fn run(args: &PreviewArgs) -> Result<()> {
    let format = OutputFormat::from_path(&args.output)?;
    let config = load_config(&args.inputs)?;
    let mut session = load_session(&args.inputs, config)?;
    apply_adjustments(&mut session, &args.adjust)?;

    if let Some(channel) = args.channel {
        session.set_display(DisplayMode::Single(channel))?;
    }

    let Some(image) = session.render()? else {
        bail!("Nothing to preview: the selected channels are not all loaded");
    };
    save_rgb(&image, &args.output, format)
        .with_context(|| format!("Failed to write preview {}", args.output.display()))?;

    println!(
        "Preview ({}x{}) saved to {}",
        image.width(),
        image.height(),
        args.output.display()
    );
    Ok(())
}
