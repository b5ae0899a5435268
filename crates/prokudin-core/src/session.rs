use std::path::Path;

use tracing::{debug, info, warn};

use crate::align::{align_channels, AlignmentOutcome, ChannelReport};
use crate::color::{composite, grayscale_preview};
use crate::consts::{
    BRIGHTNESS_RANGE, CHANNEL_COUNT, CONTRAST_RANGE, DEFAULT_INTENSITY, INTENSITY_RANGE,
    REFERENCE_CHANNEL,
};
use crate::error::{ProkudinError, Result};
use crate::filters::adjust_channel;
use crate::frame::{ChannelImage, GrayRaster, RgbRaster};
use crate::io::crop::{crop_if_set, CropAspect, CropRect, CropState};
use crate::io::export::{export_channels, ExportReport, ExportRequest};
use crate::pipeline::config::{ExportSource, ProjectConfig};
use crate::pipeline::{CancelToken, NoOpReporter, ProgressReporter};

/// Per-channel adjustment parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelParams {
    pub brightness: i32,
    pub contrast: i32,
    /// Percentage applied at composite time only.
    pub intensity: i32,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            brightness: 0,
            contrast: 0,
            intensity: DEFAULT_INTENSITY,
        }
    }
}

impl ChannelParams {
    pub fn set_brightness(&mut self, value: i32) {
        self.brightness = value.clamp(BRIGHTNESS_RANGE.0, BRIGHTNESS_RANGE.1);
    }

    pub fn set_contrast(&mut self, value: i32) {
        self.contrast = value.clamp(CONTRAST_RANGE.0, CONTRAST_RANGE.1);
    }

    pub fn set_intensity(&mut self, value: i32) {
        self.intensity = value.clamp(INTENSITY_RANGE.0, INTENSITY_RANGE.1);
    }
}

/// One of the three channel slots.
#[derive(Clone, Debug, Default)]
pub struct ChannelSlot {
    original: Option<ChannelImage>,
    aligned: Option<ChannelImage>,
    processed: Option<GrayRaster>,
    params: ChannelParams,
}

impl ChannelSlot {
    pub fn original(&self) -> Option<&ChannelImage> {
        self.original.as_ref()
    }

    pub fn aligned(&self) -> Option<&ChannelImage> {
        self.aligned.as_ref()
    }

    pub fn processed(&self) -> Option<&GrayRaster> {
        self.processed.as_ref()
    }

    pub fn params(&self) -> ChannelParams {
        self.params
    }

    fn reprocess(&mut self) {
        self.processed = adjust_channel(
            self.aligned.as_ref().map(|a| &a.gray),
            self.params.brightness,
            self.params.contrast,
        );
    }

    fn unalign(&mut self) {
        self.aligned = self.original.clone();
        self.reprocess();
    }
}

/// What `render` produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Combined,
    Single(usize),
}

/// Snapshot of the three originals handed to an alignment run.
#[derive(Clone, Debug)]
pub struct AlignRequest {
    /// Session generation at the time of the request; results from older
    /// generations are discarded.
    pub generation: u64,
    pub channels: [ChannelImage; CHANNEL_COUNT],
}

/// Owner of the three channel slots, the crop state and the display mode.
#[derive(Debug, Default)]
pub struct Session {
    slots: [ChannelSlot; CHANNEL_COUNT],
    crop: CropState,
    display: DisplayMode,
    generation: u64,
    pending: Option<u64>,
    alignment_error: Option<ProkudinError>,
    reports: Vec<ChannelReport>,
    config: ProjectConfig,
}

impl Session {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    pub fn slot(&self, index: usize) -> Result<&ChannelSlot> {
        self.slots.get(index).ok_or(ProkudinError::InvalidChannel(index))
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut ChannelSlot> {
        self.slots
            .get_mut(index)
            .ok_or(ProkudinError::InvalidChannel(index))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once all three originals are loaded.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| s.original.is_some())
    }

    /// True while an alignment request has been issued but no result applied.
    pub fn is_alignment_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Error from the last alignment run, if it failed.
    pub fn alignment_error(&self) -> Option<&ProkudinError> {
        self.alignment_error.as_ref()
    }

    /// Reports from the last successful alignment.
    pub fn alignment_reports(&self) -> &[ChannelReport] {
        &self.reports
    }

    /// Store a decoded original for one slot.
    ///
    /// Every slot falls back to its own original until a new alignment result
    /// is applied. Returns an alignment request once all three originals are
    /// present.
    pub fn set_original(
        &mut self,
        index: usize,
        image: ChannelImage,
    ) -> Result<Option<AlignRequest>> {
        let slot = self.slot_mut(index)?;
        debug!(
            channel = index,
            width = image.width(),
            height = image.height(),
            color = image.color.is_some(),
            "Channel loaded"
        );
        slot.original = Some(image);

        self.generation += 1;
        self.pending = None;
        self.alignment_error = None;
        self.reports.clear();
        for slot in &mut self.slots {
            slot.unalign();
        }

        Ok(self.alignment_request())
    }

    /// Request for the current originals, or `None` while a slot is empty.
    pub fn alignment_request(&mut self) -> Option<AlignRequest> {
        let originals = self.slots.each_ref().map(|s| s.original.clone());
        let [Some(a), Some(b), Some(c)] = originals else {
            return None;
        };
        self.pending = Some(self.generation);
        Some(AlignRequest {
            generation: self.generation,
            channels: [a, b, c],
        })
    }

    /// Load a channel and, when it completes the set, align synchronously.
    ///
    /// Alignment failures do not fail the load; they are kept on the session
    /// (see [`Session::alignment_error`]).
    pub fn load_channel(&mut self, index: usize, image: ChannelImage) -> Result<()> {
        self.load_channel_with_progress(index, image, &NoOpReporter)
    }

    pub fn load_channel_with_progress(
        &mut self,
        index: usize,
        image: ChannelImage,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        if let Some(request) = self.set_original(index, image)? {
            let result = align_channels(
                &request.channels,
                &self.config.alignment,
                reporter,
                &CancelToken::new(),
            );
            self.apply_alignment(request.generation, result);
        }
        Ok(())
    }

    /// Commit an alignment result.
    ///
    /// Results for an older generation are ignored (returns `false`). A
    /// failed alignment leaves every slot on its unaligned original and
    /// records the error; a cancelled one records nothing. Originals of
    /// different sizes cannot be combined after a failure, so combined
    /// rendering then reports [`ProkudinError::UnalignedSizes`] and the
    /// combined export file fails while the per-channel files still save.
    pub fn apply_alignment(&mut self, generation: u64, result: Result<AlignmentOutcome>) -> bool {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "Discarding stale alignment result"
            );
            return false;
        }
        self.pending = None;

        match result {
            Ok(outcome) => {
                for (slot, aligned) in self.slots.iter_mut().zip(outcome.channels) {
                    slot.aligned = Some(aligned);
                    slot.reprocess();
                }
                self.reports = outcome.reports;
                self.alignment_error = None;
                info!(generation, "Alignment applied");
            }
            Err(ProkudinError::Cancelled) => {
                debug!(generation, "Alignment cancelled");
            }
            Err(e) => {
                warn!(generation, error = %e, "Alignment failed, keeping unaligned channels");
                for slot in &mut self.slots {
                    slot.unalign();
                }
                self.reports.clear();
                self.alignment_error = Some(e);
            }
        }
        true
    }

    pub fn params(&self, index: usize) -> Result<ChannelParams> {
        Ok(self.slot(index)?.params)
    }

    pub fn set_brightness(&mut self, index: usize, value: i32) -> Result<()> {
        let slot = self.slot_mut(index)?;
        slot.params.set_brightness(value);
        slot.reprocess();
        Ok(())
    }

    pub fn set_contrast(&mut self, index: usize, value: i32) -> Result<()> {
        let slot = self.slot_mut(index)?;
        slot.params.set_contrast(value);
        slot.reprocess();
        Ok(())
    }

    pub fn set_intensity(&mut self, index: usize, value: i32) -> Result<()> {
        self.slot_mut(index)?.params.set_intensity(value);
        Ok(())
    }

    pub fn intensities(&self) -> [i32; CHANNEL_COUNT] {
        self.slots.each_ref().map(|s| s.params.intensity)
    }

    pub fn display(&self) -> DisplayMode {
        self.display
    }

    pub fn set_display(&mut self, mode: DisplayMode) -> Result<()> {
        if let DisplayMode::Single(index) = mode {
            self.slot(index)?;
        }
        self.display = mode;
        Ok(())
    }

    /// Dimensions crop rectangles refer to: the reference channel, or the
    /// first loaded channel before the reference arrives.
    pub fn reference_dims(&self) -> Option<(usize, usize)> {
        std::iter::once(&self.slots[REFERENCE_CHANNEL])
            .chain(self.slots.iter())
            .find_map(|s| s.aligned.as_ref())
            .map(|a| (a.width(), a.height()))
    }

    pub fn crop(&self) -> &CropState {
        &self.crop
    }

    /// Enter crop mode. Returns `false` when nothing is loaded.
    pub fn begin_crop(&mut self) -> bool {
        let Some((w, h)) = self.reference_dims() else {
            return false;
        };
        self.crop.begin(w, h);
        true
    }

    pub fn set_crop_working(&mut self, rect: CropRect) -> bool {
        let Some((w, h)) = self.reference_dims() else {
            return false;
        };
        self.crop.set_working(rect, w, h)
    }

    pub fn set_crop_aspect(&mut self, aspect: CropAspect) {
        let (w, h) = self.reference_dims().unwrap_or((0, 0));
        self.crop.set_aspect(aspect, w, h);
    }

    pub fn confirm_crop(&mut self) -> Option<CropRect> {
        self.crop.confirm()
    }

    pub fn cancel_crop(&mut self) {
        self.crop.cancel();
    }

    pub fn clear_crop(&mut self) {
        self.crop.clear();
    }

    /// Commit a rectangle without going through crop mode.
    pub fn set_crop(&mut self, rect: Option<CropRect>) {
        self.crop.set_saved(rect);
    }

    /// Preview of the current state under the display mode and saved crop.
    ///
    /// `Ok(None)` while the selected channel (or, in combined mode, any
    /// channel) is absent. Combined mode fails with
    /// [`ProkudinError::UnalignedSizes`] when alignment failed and the
    /// unaligned channels differ in size; single-channel modes still render.
    pub fn render(&self) -> Result<Option<RgbRaster>> {
        let crop = self.crop.effective();
        match self.display {
            DisplayMode::Combined => {
                if let Some(err) = self.unaligned_size_error() {
                    return Err(err);
                }
                let cropped = self
                    .slots
                    .each_ref()
                    .map(|s| s.processed.as_ref().map(|p| crop_if_set(p, crop)));
                composite(
                    [cropped[0].as_ref(), cropped[1].as_ref(), cropped[2].as_ref()],
                    self.intensities(),
                )
            }
            DisplayMode::Single(index) => Ok(self
                .slot(index)?
                .processed
                .as_ref()
                .map(|p| grayscale_preview(&crop_if_set(p, crop)))),
        }
    }

    /// Size conflict left behind by a failed alignment, if any.
    fn unaligned_size_error(&self) -> Option<ProkudinError> {
        let failure = self.alignment_error.as_ref()?;
        let mut dims = self
            .slots
            .iter()
            .filter_map(|s| s.processed.as_ref().map(GrayRaster::dims));
        let first = dims.next()?;
        dims.any(|d| d != first).then(|| ProkudinError::UnalignedSizes {
            reason: failure.to_string(),
        })
    }

    /// Write the channels and the combined image next to `output`.
    pub fn export(&self, output: &Path) -> Result<ExportReport> {
        let export = &self.config.export;
        let (channels, intensities) = match export.source {
            ExportSource::Processed => (
                self.slots.each_ref().map(|s| s.processed.as_ref()),
                self.intensities(),
            ),
            ExportSource::Aligned => (
                self.slots
                    .each_ref()
                    .map(|s| s.aligned.as_ref().map(|a| &a.gray)),
                [DEFAULT_INTENSITY; CHANNEL_COUNT],
            ),
        };
        let request = ExportRequest {
            output,
            naming: &export.naming,
            intensities,
        };
        export_channels(channels, self.crop.effective(), &request)
    }

    /// Discard every raster and restore defaults. In-flight alignment results
    /// become stale.
    pub fn reset(&mut self) {
        self.slots = Default::default();
        self.crop = CropState::default();
        self.display = DisplayMode::default();
        self.pending = None;
        self.alignment_error = None;
        self.reports.clear();
        self.generation += 1;
        info!("Session reset");
    }
}
