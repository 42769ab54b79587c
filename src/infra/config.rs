use crate::domain::models::{AppError, FrameSize, RecordingSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FFMPEG_PATH_ENV: &str = "REGIONREC_FFMPEG_PATH";
pub const OUTPUT_DIR_ENV: &str = "REGIONREC_OUTPUT_DIR";
pub const OUTPUT_FOLDER_NAME: &str = "RegionRec";

/// Tunable constants for discovery, region tracking and the encoder invocation.
///
/// The border inset and the audio channel filter are empirically tuned and
/// kept here rather than derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
    pub fps: u32,
    pub scale: FrameSize,
    pub input_format: String,
    pub input_options: Vec<String>,
    pub video_section_marker: String,
    pub audio_section_marker: String,
    pub screen_device_prefix: String,
    pub preferred_audio_prefix: String,
    pub preferred_video_prefix: String,
    pub region_border: u32,
    pub audio_filter: String,
    pub output_options: Vec<String>,
    pub start_markers: Vec<String>,
    pub start_timeout_ms: u64,
    pub stop_rung_delay_ms: u64,
    pub output_settle_ms: u64,
    pub status_interval_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            output_dir: default_output_dir(),
            file_prefix: "REC_".to_string(),
            file_extension: "mp4".to_string(),
            fps: 30,
            scale: FrameSize::new(1920, 1080),
            input_format: "avfoundation".to_string(),
            input_options: strings(&["-thread_queue_size", "2048", "-capture_cursor", "1"]),
            video_section_marker: "AVFoundation video devices:".to_string(),
            audio_section_marker: "AVFoundation audio devices:".to_string(),
            screen_device_prefix: "Capture screen".to_string(),
            preferred_audio_prefix: "Recorder-Input".to_string(),
            preferred_video_prefix: "Capture screen 0".to_string(),
            region_border: 4,
            audio_filter: "pan=stereo|c0=2.5*c0|c1=1.0*c2".to_string(),
            output_options: strings(&[
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-crf",
                "23",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
            ]),
            start_markers: strings(&["Press [q] to stop", "Output #0"]),
            start_timeout_ms: 10_000,
            stop_rung_delay_ms: 1_500,
            output_settle_ms: 500,
            status_interval_ms: 1_000,
        }
    }
}

impl RecorderConfig {
    /// Defaults, then the optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|error| {
            AppError::new(
                "CONFIG_READ_FAIL",
                format!("failed to read config {}: {error}", path.display()),
                None,
            )
        })?;
        serde_json::from_str::<Self>(&content).map_err(|error| {
            AppError::new(
                "CONFIG_PARSE_FAIL",
                format!("failed to parse config {}: {error}", path.display()),
                Some("check the JSON syntax and field names".to_string()),
            )
        })
    }

    pub fn apply_env(&mut self) {
        if let Some(path) = non_empty_env(FFMPEG_PATH_ENV) {
            self.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = non_empty_env(OUTPUT_DIR_ENV) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn default_settings(&self) -> RecordingSettings {
        RecordingSettings::new(self.output_dir.clone(), self.fps, self.scale)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_rung_delay(&self) -> Duration {
        Duration::from_millis(self.stop_rung_delay_ms)
    }

    pub fn output_settle(&self) -> Duration {
        Duration::from_millis(self.output_settle_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }
}

fn default_output_dir() -> PathBuf {
    let base = dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(std::env::temp_dir);
    base.join(OUTPUT_FOLDER_NAME)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::RecorderConfig;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recorder.json");
        std::fs::write(&path, r#"{ "regionBorder": 6, "fps": 60 }"#).unwrap();
        let config = RecorderConfig::from_file(&path).unwrap();
        assert_eq!(config.region_border, 6);
        assert_eq!(config.fps, 60);
        assert_eq!(config.file_prefix, "REC_");
        assert_eq!(config.audio_filter, "pan=stereo|c0=2.5*c0|c1=1.0*c2");
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recorder.json");
        std::fs::write(&path, "{ not json").unwrap();
        let error = RecorderConfig::from_file(&path).unwrap_err();
        assert_eq!(error.code, "CONFIG_PARSE_FAIL");
    }

    #[test]
    fn default_output_dir_is_absolute() {
        let config = RecorderConfig::default();
        assert!(config.output_dir.is_absolute());
        assert!(config.output_dir.ends_with("RegionRec"));
        assert_eq!(config.default_settings().crop, config.scale);
    }
}
