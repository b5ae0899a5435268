use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use prokudin_core::pipeline::config::{ChannelNaming, ExportSource};

use super::inputs::{apply_adjustments, load_config, load_session, AdjustArgs, InputArgs};
use crate::summary::{print_alignment_summary, print_export_report, print_run_summary};

#[derive(Clone, ValueEnum)]
pub enum NamingArg {
    /// _r, _g, _b
    Rgb,
    /// _ir, _vis, _uv
    Spectral,
}

#[derive(Clone, ValueEnum)]
pub enum SourceArg {
    /// Aligned channels, before brightness/contrast/intensity
    Aligned,
    /// Adjusted channels, as previewed
    Processed,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub adjust: AdjustArgs,

    /// Combined output path; per-channel files get a suffix before the extension
    #[arg(short, long, default_value = "result.png")]
    pub output: PathBuf,

    /// Channel filename suffixes
    #[arg(long, value_enum)]
    pub naming: Option<NamingArg>,

    /// Three custom suffixes, comma-separated (overrides --naming)
    #[arg(long)]
    pub suffixes: Option<String>,

    /// Which channel buffers to export
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = load_config(&args.inputs)?;

    if let Some(ref suffixes) = args.suffixes {
        let parts: Vec<&str> = suffixes.split(',').map(str::trim).collect();
        let [a, b, c] = parts[..] else {
            bail!("Expected three comma-separated suffixes, got '{suffixes}'");
        };
        config.export.naming = ChannelNaming::Custom([a.into(), b.into(), c.into()]);
    } else if let Some(ref naming) = args.naming {
        config.export.naming = match naming {
            NamingArg::Rgb => ChannelNaming::Rgb,
            NamingArg::Spectral => ChannelNaming::Spectral,
        };
    }
    if let Some(ref source) = args.source {
        config.export.source = match source {
            SourceArg::Aligned => ExportSource::Aligned,
            SourceArg::Processed => ExportSource::Processed,
        };
    }
    config.export.validate()?;

    print_run_summary(&args.inputs.paths(), &args.output, &config);

    let mut session = load_session(&args.inputs, config)?;
    print_alignment_summary(&session);
    apply_adjustments(&mut session, &args.adjust)?;

    let report = session.export(&args.output)?;
    print_export_report(&report);

    if report.succeeded() == 0 {
        bail!("{}", report.summary());
    }
    Ok(())
}
