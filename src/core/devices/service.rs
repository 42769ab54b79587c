use crate::core::devices::listing::{attach_screen_geometry, parse_device_listing};
use crate::domain::models::{Device, DeviceLists, VideoDevice};
use crate::infra::config::RecorderConfig;
use crate::infra::ffmpeg::command::run_device_listing;
use crate::infra::window::{sorted_left_to_right, DisplaySource};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Device discovery through the encoder's listing mode.
///
/// Overlapping `discover` calls are not coalesced; the last one to finish
/// owns the snapshot.
pub struct DeviceCatalog {
    binary: Option<PathBuf>,
    displays: Arc<dyn DisplaySource>,
    input_format: String,
    video_marker: String,
    audio_marker: String,
    screen_prefix: String,
    snapshot: Mutex<Option<DeviceLists>>,
}

impl DeviceCatalog {
    pub fn new(
        binary: Option<PathBuf>,
        displays: Arc<dyn DisplaySource>,
        config: &RecorderConfig,
    ) -> Self {
        Self {
            binary,
            displays,
            input_format: config.input_format.clone(),
            video_marker: config.video_section_marker.clone(),
            audio_marker: config.audio_section_marker.clone(),
            screen_prefix: config.screen_device_prefix.clone(),
            snapshot: Mutex::new(None),
        }
    }

    /// Rebuilds the catalog from scratch. Degrades to an empty catalog when
    /// the encoder cannot be launched.
    pub async fn discover(&self) -> DeviceLists {
        let Some(binary) = self.binary.as_deref() else {
            tracing::error!("ffmpeg path not available for device discovery");
            return self.store(DeviceLists::default());
        };
        let Some(listing) = run_device_listing(binary, &self.input_format).await else {
            return self.store(DeviceLists::default());
        };

        let raw = parse_device_listing(&listing, &self.video_marker, &self.audio_marker);
        let displays = sorted_left_to_right(self.displays.displays());
        let lists = DeviceLists {
            video: attach_screen_geometry(raw.video, &displays, &self.screen_prefix),
            audio: raw.audio,
        };
        tracing::info!(
            "discovered {} video and {} audio devices",
            lists.video.len(),
            lists.audio.len()
        );
        self.store(lists)
    }

    /// The last discovered catalog, rediscovering when `force` is set or
    /// nothing has been discovered yet.
    pub async fn list(&self, force: bool) -> DeviceLists {
        if !force {
            if let Some(lists) = self.cached() {
                return lists;
            }
        }
        self.discover().await
    }

    pub fn cached(&self) -> Option<DeviceLists> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> DeviceLists {
        self.cached().unwrap_or_default()
    }

    fn store(&self, lists: DeviceLists) -> DeviceLists {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(lists.clone());
        lists
    }
}

/// Default selection: the first device whose name starts with the preferred
/// prefix, else the first device.
pub fn pick_default_devices(
    lists: &DeviceLists,
    audio_prefix: &str,
    video_prefix: &str,
) -> (Option<Device>, Option<VideoDevice>) {
    let audio = lists
        .audio
        .iter()
        .find(|device| device.name.starts_with(audio_prefix))
        .or_else(|| lists.audio.first())
        .cloned();
    let video = lists
        .video
        .iter()
        .find(|device| device.name.starts_with(video_prefix))
        .or_else(|| lists.video.first())
        .cloned();
    (audio, video)
}
