use crate::core::devices::service::{pick_default_devices, DeviceCatalog};
use crate::core::region::service::RegionBridge;
use crate::core::session::service::RecordingSession;
use crate::core::settings::service::SettingsStore;
use crate::domain::models::{AppError, RecordingSettings};
use crate::infra::config::RecorderConfig;
use crate::infra::ffmpeg::command::{candidate_paths, resolve_binary_path, DeploymentMode};
use crate::infra::platform::PlatformGate;
use crate::infra::window::{DisplaySource, WindowRegistry};
use std::path::PathBuf;
use std::sync::Arc;

/// Composition root: owns the one session and everything it collaborates with.
pub struct RuntimeState {
    pub config: RecorderConfig,
    pub platform: Arc<dyn PlatformGate>,
    pub windows: Arc<WindowRegistry>,
    pub settings: Arc<SettingsStore>,
    pub catalog: Arc<DeviceCatalog>,
    pub region: RegionBridge,
    pub session: RecordingSession,
}

impl RuntimeState {
    /// Resolves the encoder binary from the configured override and the
    /// deployment layout.
    pub fn new(
        config: RecorderConfig,
        displays: Arc<dyn DisplaySource>,
        platform: Arc<dyn PlatformGate>,
    ) -> Self {
        let candidates = candidate_paths(DeploymentMode::detect(), config.ffmpeg_path.as_deref());
        let binary = resolve_binary_path(&candidates);
        Self::with_binary(config, binary, displays, platform)
    }

    pub fn with_binary(
        config: RecorderConfig,
        binary: Option<PathBuf>,
        displays: Arc<dyn DisplaySource>,
        platform: Arc<dyn PlatformGate>,
    ) -> Self {
        let windows = Arc::new(WindowRegistry::new());
        let settings = Arc::new(SettingsStore::new(config.default_settings()));
        let catalog = Arc::new(DeviceCatalog::new(binary.clone(), displays.clone(), &config));
        let region = RegionBridge::new(
            settings.clone(),
            catalog.clone(),
            displays,
            windows.clone(),
            config.region_border,
        );
        let session = RecordingSession::new(
            config.clone(),
            binary,
            platform.clone(),
            settings.clone(),
            windows.clone(),
        );
        Self {
            config,
            platform,
            windows,
            settings,
            catalog,
            region,
            session,
        }
    }

    /// Runs discovery once and selects the preferred default devices.
    pub async fn initialize(&self) -> Result<RecordingSettings, AppError> {
        let lists = self.catalog.discover().await;
        let (audio, video) = pick_default_devices(
            &lists,
            &self.config.preferred_audio_prefix,
            &self.config.preferred_video_prefix,
        );
        if audio.is_none() || video.is_none() {
            tracing::warn!(
                "default devices incomplete: audio={:?} video={:?}",
                audio.as_ref().map(|device| device.name.as_str()),
                video.as_ref().map(|device| device.name.as_str())
            );
        }
        // written unvalidated; the crop only has to shrink to fit the chosen screen
        Ok(self.settings.update(|settings| {
            if let Some(geometry) = video.as_ref().and_then(|video| video.geometry.as_ref()) {
                settings.fit_crop_within(geometry.scale_max);
            }
            if audio.is_some() {
                settings.audio = audio;
            }
            if video.is_some() {
                settings.video = video;
            }
        }))
    }

    /// The configured output folder, created if missing.
    pub async fn recordings_dir(&self) -> Result<PathBuf, AppError> {
        let dir = self.settings.get().output_path;
        tokio::fs::create_dir_all(&dir).await.map_err(|error| {
            AppError::new(
                "IO_ERROR",
                format!("failed to create recordings dir {}: {error}", dir.display()),
                None,
            )
        })?;
        Ok(dir)
    }
}
