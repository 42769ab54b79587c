use crate::domain::models::{AppError, DeviceLists, RecordingSettings, SettingsPatch};
use crate::infra::platform::{platform_capability, PlatformCapability};
use crate::state::RuntimeState;

pub async fn get_settings(state: &RuntimeState) -> RecordingSettings {
    state.settings.get()
}

/// Replaces the whole snapshot; an empty request is ignored.
pub async fn save_settings(state: &RuntimeState, settings: Option<RecordingSettings>) -> bool {
    state.settings.set(settings)
}

pub async fn patch_settings(
    state: &RuntimeState,
    patch: SettingsPatch,
) -> Result<RecordingSettings, AppError> {
    state.settings.patch(patch)
}

pub async fn list_devices(state: &RuntimeState, force: bool) -> DeviceLists {
    state.catalog.list(force).await
}

pub async fn get_platform_capability(state: &RuntimeState) -> PlatformCapability {
    platform_capability(state.platform.as_ref(), state.session.binary().is_some())
}

pub async fn recordings_dir(state: &RuntimeState) -> Result<String, AppError> {
    state
        .recordings_dir()
        .await
        .map(|dir| dir.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::{get_platform_capability, get_settings, list_devices, patch_settings, save_settings};
    use crate::domain::models::{FrameSize, SettingsPatch};
    use crate::infra::config::RecorderConfig;
    use crate::infra::platform::CaptureAccess;
    use crate::infra::window::FixedDisplays;
    use crate::state::RuntimeState;
    use crate::testing::FakePlatform;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn state(binary: Option<PathBuf>) -> RuntimeState {
        let config = RecorderConfig {
            output_dir: PathBuf::from("/tmp/RegionRec"),
            ..RecorderConfig::default()
        };
        RuntimeState::with_binary(
            config,
            binary,
            Arc::new(FixedDisplays(Vec::new())),
            Arc::new(FakePlatform::granted()),
        )
    }

    #[tokio::test]
    async fn save_ignores_empty_request() {
        let state = state(None);
        let before = get_settings(&state).await;
        assert!(!save_settings(&state, None).await);
        assert_eq!(get_settings(&state).await, before);

        let mut next = before.clone();
        next.fps = 60;
        assert!(save_settings(&state, Some(next)).await);
        assert_eq!(get_settings(&state).await.fps, 60);
    }

    #[tokio::test]
    async fn patch_validates_before_writing() {
        let state = state(None);
        let error = patch_settings(
            &state,
            SettingsPatch {
                scale: Some(FrameSize::new(0, 1080)),
                ..SettingsPatch::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.code, "INVALID_CONFIGURATION");
        assert_eq!(get_settings(&state).await.scale, FrameSize::new(1920, 1080));
    }

    #[tokio::test]
    async fn capability_reflects_encoder_and_gate() {
        let capability = get_platform_capability(&state(None)).await;
        assert!(!capability.encoder_available);
        assert!(capability.supports_screen_capture);
        assert_eq!(capability.screen_capture_access, CaptureAccess::Granted);

        let capability =
            get_platform_capability(&state(Some(PathBuf::from("/opt/bin/ffmpeg")))).await;
        assert!(capability.encoder_available);
    }

    #[tokio::test]
    async fn listing_without_encoder_is_empty_and_cached() {
        let state = state(None);
        let lists = list_devices(&state, false).await;
        assert!(lists.video.is_empty() && lists.audio.is_empty());
        assert_eq!(state.catalog.cached(), Some(lists));
    }
}
