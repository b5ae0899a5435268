use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::color::composite_partial;
use crate::error::{ProkudinError, Result};
use crate::frame::GrayRaster;
use crate::pipeline::config::ChannelNaming;

use super::crop::{crop_if_set, CropRect};
use super::image_io::{save_gray, save_rgb, OutputFormat};

/// Result of writing one export file.
#[derive(Debug)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub error: Option<ProkudinError>,
}

impl ExportOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-file results of one export run.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub outcomes: Vec<ExportOutcome>,
}

impl ExportReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.total()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExportOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn summary(&self) -> String {
        let (ok, total) = (self.succeeded(), self.total());
        if ok == 0 {
            "Failed to save any images".to_string()
        } else if ok < total {
            format!("Saved {ok} of {total} images")
        } else {
            format!("Saved all {total} images")
        }
    }
}

/// What to write and where.
#[derive(Clone, Debug)]
pub struct ExportRequest<'a> {
    /// User-chosen output path; its stem and extension name every file.
    pub output: &'a Path,
    pub naming: &'a ChannelNaming,
    /// Intensities applied to the combined image (100 = unchanged).
    pub intensities: [i32; 3],
}

/// `{base}_{suffix}.{ext}` next to `output`.
pub fn channel_path(output: &Path, suffix: &str) -> Result<PathBuf> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ProkudinError::MissingExtension(output.to_path_buf()))?;
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ProkudinError::MissingExtension(output.to_path_buf()))?;
    Ok(output.with_file_name(format!("{stem}_{suffix}.{ext}")))
}

/// Write each present channel and the combined RGB image, all cropped alike.
///
/// Fails up front (writing nothing) when the output format cannot be
/// determined, the suffixes are unusable, or no channel is present. Once
/// writing starts every file is attempted independently; individual failures
/// are recorded in the report.
pub fn export_channels(
    channels: [Option<&GrayRaster>; 3],
    crop: Option<&CropRect>,
    request: &ExportRequest<'_>,
) -> Result<ExportReport> {
    let format = OutputFormat::from_path(request.output)?;
    request.naming.validate()?;
    if channels.iter().all(Option::is_none) {
        return Err(ProkudinError::NothingToExport);
    }

    let cropped: Vec<Option<GrayRaster>> = channels
        .iter()
        .map(|c| c.map(|raster| crop_if_set(raster, crop)))
        .collect();

    let mut report = ExportReport::default();
    let suffixes = request.naming.suffixes();

    for (raster, suffix) in cropped.iter().zip(suffixes) {
        let Some(raster) = raster else {
            continue;
        };
        let path = channel_path(request.output, suffix)?;
        let result = save_gray(raster, &path, format);
        report.outcomes.push(outcome(path, result));
    }

    let combined_path = request.output.to_path_buf();
    let combined = composite_partial(
        [cropped[0].as_ref(), cropped[1].as_ref(), cropped[2].as_ref()],
        request.intensities,
    );
    let result = match combined {
        Ok(Some(rgb)) => save_rgb(&rgb, &combined_path, format),
        Ok(None) => Err(ProkudinError::NothingToExport),
        Err(e) => Err(e),
    };
    report.outcomes.push(outcome(combined_path, result));

    info!(
        succeeded = report.succeeded(),
        total = report.total(),
        format = %format,
        "Export finished"
    );
    Ok(report)
}

fn outcome(path: PathBuf, result: Result<()>) -> ExportOutcome {
    let error = result.err().map(|e| match e {
        ProkudinError::Save { .. } => e,
        other => ProkudinError::Save {
            path: path.clone(),
            reason: other.to_string(),
        },
    });
    if let Some(ref e) = error {
        warn!(path = %path.display(), error = %e, "Failed to write export file");
    }
    ExportOutcome { path, error }
}
