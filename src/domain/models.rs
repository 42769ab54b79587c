use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn contains(&self, point: Point) -> bool {
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        (point.x as i64) >= self.x as i64
            && (point.x as i64) < right
            && (point.y as i64) >= self.y as i64
            && (point.y as i64) < bottom
    }

    /// Squared distance from `point` to the closest point of the rectangle; zero inside it.
    pub fn distance_sq(&self, point: Point) -> i64 {
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        let px = point.x as i64;
        let py = point.y as i64;
        let dx = if px < self.x as i64 {
            self.x as i64 - px
        } else if px >= right {
            px - right + 1
        } else {
            0
        };
        let dy = if py < self.y as i64 {
            self.y as i64 - py
        } else if py >= bottom {
            py - bottom + 1
        } else {
            0
        };
        dx * dx + dy * dy
    }
}

/// Capture or output dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameSize {
    pub w: u32,
    pub h: u32,
}

impl FrameSize {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Capture origin relative to the selected display's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

impl Offset {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A physical display as reported by the windowing layer, in logical coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Display {
    pub label: String,
    pub bounds: Rect,
    pub work_area: Rect,
    pub scale_factor: f64,
    pub size: Size,
}

/// One capture input reported by the encoder's device listing.
///
/// Indices are only meaningful for the listing run that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenGeometry {
    pub bounds: Rect,
    pub work_area: Rect,
    pub scale_factor: f64,
    pub size: Size,
    pub label: String,
    /// Physical pixel dimensions, `size * scale_factor`.
    pub scale_max: Size,
}

impl ScreenGeometry {
    pub fn from_display(display: &Display) -> Self {
        let scale_max = Size::new(
            (display.size.width as f64 * display.scale_factor).round() as u32,
            (display.size.height as f64 * display.scale_factor).round() as u32,
        );
        Self {
            bounds: display.bounds,
            work_area: display.work_area,
            scale_factor: display.scale_factor,
            size: display.size,
            label: display.label.clone(),
            scale_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDevice {
    pub index: u32,
    pub name: String,
    pub is_screen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<ScreenGeometry>,
}

impl VideoDevice {
    pub fn label(&self) -> Option<&str> {
        self.geometry.as_ref().map(|geometry| geometry.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceLists {
    pub video: Vec<VideoDevice>,
    pub audio: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSettings {
    pub output_path: PathBuf,
    pub fps: u32,
    pub scale: FrameSize,
    pub crop: FrameSize,
    pub offset: Offset,
    #[serde(default)]
    pub audio: Option<Device>,
    #[serde(default)]
    pub video: Option<VideoDevice>,
}

impl RecordingSettings {
    /// Full-frame settings at `scale` with no device selected.
    pub fn new(output_path: PathBuf, fps: u32, scale: FrameSize) -> Self {
        Self {
            output_path,
            fps,
            scale,
            crop: scale,
            offset: Offset::default(),
            audio: None,
            video: None,
        }
    }

    pub fn is_custom_region(&self) -> bool {
        self.crop != self.scale || self.offset != Offset::default()
    }

    pub fn reset_region(&mut self) {
        self.crop = self.scale;
        self.offset = Offset::default();
    }

    /// Shrinks the crop so it fits a screen of `max` physical pixels.
    pub fn fit_crop_within(&mut self, max: Size) {
        self.crop.w = self.crop.w.min(max.width);
        self.crop.h = self.crop.h.min(max.height);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub output_path: Option<PathBuf>,
    pub fps: Option<u32>,
    pub scale: Option<FrameSize>,
    pub crop: Option<FrameSize>,
    pub offset: Option<Offset>,
    pub audio: Option<Device>,
    pub video: Option<VideoDevice>,
}

impl SettingsPatch {
    pub fn apply_to(self, settings: &mut RecordingSettings) {
        if let Some(output_path) = self.output_path {
            settings.output_path = output_path;
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if let Some(scale) = self.scale {
            settings.scale = scale;
        }
        if let Some(crop) = self.crop {
            settings.crop = crop;
        }
        if let Some(offset) = self.offset {
            settings.offset = offset;
        }
        if let Some(audio) = self.audio {
            settings.audio = Some(audio);
        }
        if let Some(video) = self.video {
            settings.video = Some(video);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub is_recording: bool,
    /// Whole seconds since the encoder confirmed start.
    pub duration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecordingResponse {
    pub output_path: String,
    pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingEventKind {
    Recording,
    Stopping,
    Stopped,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatusEvent {
    pub session_id: String,
    pub status: RecordingEventKind,
    pub is_recording: bool,
    pub duration_ms: u64,
    pub detail: String,
    pub output_path: Option<String>,
    pub error: Option<AppError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRemediation {
    pub settings_url: String,
    pub binary_path: Option<String>,
    pub restart_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<PermissionRemediation>,
}

impl AppError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion,
            remediation: None,
        }
    }

    pub fn with_remediation(mut self, remediation: PermissionRemediation) -> Self {
        self.remediation = Some(remediation);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
