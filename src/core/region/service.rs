use crate::core::devices::service::DeviceCatalog;
use crate::core::settings::service::SettingsStore;
use crate::domain::models::{
    AppError, Display, FrameSize, Offset, Point, RecordingSettings, SettingsPatch, Size,
    VideoDevice,
};
use crate::infra::window::{nearest_display, DisplaySource, WindowHandle, WindowName, WindowRegistry};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionUpdate {
    pub crop: FrameSize,
    pub offset: Offset,
    pub video: Option<VideoDevice>,
}

/// Capture rectangle for an overlay at `position`/`size`.
///
/// The overlay draws a `border` wide frame around the captured area. The
/// display is resolved from the capture origin; when it differs from the
/// current video device the device is looked up by display label among
/// `candidates`, keeping `current` when nothing matches.
pub fn compute_region(
    position: Point,
    size: Size,
    border: u32,
    displays: &[Display],
    current: Option<&VideoDevice>,
    candidates: &[VideoDevice],
) -> RegionUpdate {
    let inset = border as i32;
    let origin = Point::new(position.x.saturating_add(inset), position.y.saturating_add(inset));
    let mut crop = FrameSize::new(
        size.width.saturating_sub(border * 2),
        size.height.saturating_sub(border * 2),
    );

    let resolved = nearest_display(displays, origin);
    let video = match resolved {
        Some(found) if current.and_then(VideoDevice::label) != Some(found.label.as_str()) => {
            let label = found.label.as_str();
            let matched = candidates
                .iter()
                .find(|candidate| candidate.label() == Some(label));
            if matched.is_none() {
                tracing::warn!("no video device for display {label:?}, keeping previous selection");
            }
            matched.or(current).cloned()
        }
        _ => current.cloned(),
    };

    let display_origin = resolved.map(|found| found.bounds.origin()).unwrap_or_default();
    let offset = Offset::new(
        (origin.x as i64 - display_origin.x as i64).max(0) as u32,
        (origin.y as i64 - display_origin.y as i64).max(0) as u32,
    );

    if let Some(geometry) = video.as_ref().and_then(|video| video.geometry.as_ref()) {
        crop.w = crop.w.min(geometry.scale_max.width);
        crop.h = crop.h.min(geometry.scale_max.height);
    }

    RegionUpdate {
        crop,
        offset,
        video,
    }
}

/// Where the companion control sits: right-aligned under the overlay.
pub fn anchor_companion(
    overlay_position: Point,
    overlay_size: Size,
    companion_size: Size,
    border: u32,
) -> Point {
    let x = overlay_position.x as i64 + overlay_size.width as i64 - companion_size.width as i64;
    let y = overlay_position.y as i64 + overlay_size.height as i64 + border as i64;
    Point::new(clamp_coordinate(x), clamp_coordinate(y))
}

fn clamp_coordinate(value: i64) -> i32 {
    value.clamp(0, i32::MAX as i64) as i32
}

/// Keeps capture settings in step with the region-selection overlay.
pub struct RegionBridge {
    settings: Arc<SettingsStore>,
    catalog: Arc<DeviceCatalog>,
    displays: Arc<dyn DisplaySource>,
    windows: Arc<WindowRegistry>,
    border: u32,
}

impl RegionBridge {
    pub fn new(
        settings: Arc<SettingsStore>,
        catalog: Arc<DeviceCatalog>,
        displays: Arc<dyn DisplaySource>,
        windows: Arc<WindowRegistry>,
        border: u32,
    ) -> Self {
        Self {
            settings,
            catalog,
            displays,
            windows,
            border,
        }
    }

    /// Intermediate move/resize frames only re-anchor the companion control.
    pub fn on_overlay_moved(&self, overlay: &dyn WindowHandle) -> Result<(), AppError> {
        let Some(timer) = self.windows.get(WindowName::Timer) else {
            return Ok(());
        };
        let anchor = anchor_companion(overlay.position()?, overlay.size()?, timer.size()?, self.border);
        timer.set_position(anchor)?;
        if !timer.is_visible()? {
            timer.show()?;
        }
        Ok(())
    }

    pub fn move_overlay(&self, overlay: &dyn WindowHandle, position: Point) -> Result<(), AppError> {
        overlay.set_position(position)?;
        self.on_overlay_moved(overlay)
    }

    /// Recomputes crop, offset and video device once a drag or resize ends.
    pub fn on_overlay_resize_finished(
        &self,
        overlay: &dyn WindowHandle,
    ) -> Result<RecordingSettings, AppError> {
        let position = overlay.position()?;
        let size = overlay.size()?;
        let current = self.settings.get();
        let candidates = self.catalog.snapshot().video;
        let update = compute_region(
            position,
            size,
            self.border,
            &self.displays.displays(),
            current.video.as_ref(),
            &candidates,
        );
        tracing::info!(
            "region selected: crop={}x{} offset={},{} device={:?}",
            update.crop.w,
            update.crop.h,
            update.offset.x,
            update.offset.y,
            update.video.as_ref().map(|video| video.name.as_str())
        );
        self.settings.patch(SettingsPatch {
            crop: Some(update.crop),
            offset: Some(update.offset),
            video: update.video,
            ..SettingsPatch::default()
        })
    }

    /// Shows the overlay and anchors the companion control to it.
    pub fn show_overlay(&self) -> Result<(), AppError> {
        let overlay = self.windows.require(WindowName::Region)?;
        overlay.show()?;
        self.on_overlay_moved(overlay.as_ref())
    }
}
