use crate::domain::models::{AppError, Point, RecordingSettings};
use crate::infra::window::WindowName;
use crate::state::RuntimeState;

pub async fn move_window(
    state: &RuntimeState,
    name: WindowName,
    position: Point,
) -> Result<(), AppError> {
    if name == WindowName::Region {
        return move_region(state, position).await;
    }
    state.windows.require(name)?.set_position(position)
}

/// Hiding the timer is the "close" gesture: it stops an active recording,
/// otherwise it drops the pending region selection.
pub async fn hide_window(state: &RuntimeState, name: WindowName) -> Result<(), AppError> {
    state.windows.require(name)?.hide()?;
    if name != WindowName::Timer {
        return Ok(());
    }
    if state.session.status().is_recording {
        tracing::info!("timer closed while recording, stopping");
        state.session.stop().await?;
    } else {
        state.session.release_region();
    }
    Ok(())
}

pub async fn show_region(state: &RuntimeState) -> Result<(), AppError> {
    state.region.show_overlay()
}

pub async fn move_region(state: &RuntimeState, position: Point) -> Result<(), AppError> {
    let overlay = state.windows.require(WindowName::Region)?;
    state.region.move_overlay(overlay.as_ref(), position)
}

pub async fn region_resize_finished(state: &RuntimeState) -> Result<RecordingSettings, AppError> {
    let overlay = state.windows.require(WindowName::Region)?;
    state.region.on_overlay_resize_finished(overlay.as_ref())
}

#[cfg(test)]
mod tests {
    use super::{hide_window, move_window, region_resize_finished, show_region};
    use crate::domain::models::{FrameSize, Offset, Point};
    use crate::infra::config::RecorderConfig;
    use crate::infra::window::{FixedDisplays, WindowHandle, WindowName};
    use crate::state::RuntimeState;
    use crate::testing::{display, FakePlatform, FakeWindow};
    use std::path::PathBuf;
    use std::sync::Arc;

    struct Windows {
        timer: Arc<FakeWindow>,
        region: Arc<FakeWindow>,
    }

    fn state() -> (RuntimeState, Windows) {
        let config = RecorderConfig {
            output_dir: PathBuf::from("/tmp/RegionRec"),
            ..RecorderConfig::default()
        };
        let displays = Arc::new(FixedDisplays(vec![
            display("Built-in Retina Display", 0, 0, 1512, 982, 2.0),
            display("DELL U2720Q", 1512, 0, 2560, 1440, 1.0),
        ]));
        let state =
            RuntimeState::with_binary(config, None, displays, Arc::new(FakePlatform::granted()));
        let windows = Windows {
            timer: Arc::new(FakeWindow::new(Point::new(0, 0), 500, 54)),
            region: Arc::new(FakeWindow::new(Point::new(200, 100), 669, 508)),
        };
        state.windows.register(WindowName::Timer, windows.timer.clone());
        state.windows.register(WindowName::Region, windows.region.clone());
        (state, windows)
    }

    #[tokio::test]
    async fn show_region_anchors_timer() {
        let (state, windows) = state();
        show_region(&state).await.unwrap();
        assert!(windows.region.is_visible().unwrap());
        assert!(windows.timer.is_visible().unwrap());
        assert_eq!(windows.timer.position().unwrap(), Point::new(369, 612));
    }

    #[tokio::test]
    async fn moving_region_by_name_drags_timer_along() {
        let (state, windows) = state();
        move_window(&state, WindowName::Region, Point::new(600, 300))
            .await
            .unwrap();
        assert_eq!(windows.region.position().unwrap(), Point::new(600, 300));
        assert_eq!(windows.timer.position().unwrap(), Point::new(769, 812));
    }

    #[tokio::test]
    async fn resize_finished_on_second_display_is_relative_to_it() {
        let (state, windows) = state();
        windows.region.set_position(Point::new(1600, 100)).unwrap();
        let settings = region_resize_finished(&state).await.unwrap();
        assert_eq!(settings.crop, FrameSize::new(661, 500));
        assert_eq!(settings.offset, Offset::new(92, 104));
    }

    #[tokio::test]
    async fn closing_timer_while_idle_releases_region() {
        let (state, windows) = state();
        windows.region.set_visible(true);
        state.settings.update(|settings| {
            settings.crop = FrameSize::new(661, 500);
            settings.offset = Offset::new(92, 104);
        });
        hide_window(&state, WindowName::Timer).await.unwrap();
        assert!(!windows.timer.is_visible().unwrap());
        assert!(!windows.region.is_visible().unwrap());
        let settings = state.settings.get();
        assert_eq!(settings.crop, settings.scale);
        assert_eq!(settings.offset, Offset::new(0, 0));
    }

    #[tokio::test]
    async fn unknown_window_is_reported() {
        let (state, _windows) = state();
        state.windows.unregister(WindowName::Main);
        let error = hide_window(&state, WindowName::Main).await.unwrap_err();
        assert_eq!(error.code, "WINDOW_NOT_FOUND");
    }
}
