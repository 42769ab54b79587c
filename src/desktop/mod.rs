mod handlers;
mod window;

use crate::commands::{RECORDING_STATUS_CHANNEL, SETTINGS_UPDATED_CHANNEL};
use crate::infra::config::RecorderConfig;
use crate::infra::logging::init_tracing;
use crate::infra::platform::SystemPlatform;
use crate::infra::window::WindowName;
use crate::state::RuntimeState;
use handlers::{
    get_platform_capability, get_recording_status, get_settings, hide_window, list_devices,
    move_window, patch_settings, recordings_dir, region_resize_finished, reveal_output,
    save_settings, show_region, start_recording, stop_recording,
};
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager, WindowEvent};
use window::{TauriDisplays, TauriWindow};

const CONFIG_FILE_NAME: &str = "recorder.json";

fn forward_events(app: &AppHandle, state: &RuntimeState) {
    let emitter = app.clone();
    state.session.subscribe(move |event| {
        if let Err(error) = emitter.emit(RECORDING_STATUS_CHANNEL, event) {
            tracing::warn!("failed to emit recording status: {error}");
        }
    });
    let emitter = app.clone();
    state.settings.subscribe(move |settings| {
        if let Err(error) = emitter.emit(SETTINGS_UPDATED_CHANNEL, settings) {
            tracing::warn!("failed to emit settings: {error}");
        }
    });
}

fn track_region_overlay(app: &AppHandle) {
    let Some(overlay) = app.get_webview_window(WindowName::Region.label()) else {
        return;
    };
    let handle = app.clone();
    overlay.on_window_event(move |event| {
        if !matches!(event, WindowEvent::Moved(_) | WindowEvent::Resized(_)) {
            return;
        }
        let state = handle.state::<RuntimeState>();
        let Some(overlay) = state.windows.get(WindowName::Region) else {
            return;
        };
        if let Err(error) = state.region.on_overlay_moved(overlay.as_ref()) {
            tracing::warn!("failed to anchor timer: {error}");
        }
    });
}

fn close_timer_as_hide(app: &AppHandle) {
    let Some(timer) = app.get_webview_window(WindowName::Timer.label()) else {
        return;
    };
    let handle = app.clone();
    timer.on_window_event(move |event| {
        if let WindowEvent::CloseRequested { api, .. } = event {
            api.prevent_close();
            let handle = handle.clone();
            tauri::async_runtime::spawn(async move {
                let state = handle.state::<RuntimeState>();
                if let Err(error) =
                    crate::commands::windows::hide_window(state.inner(), WindowName::Timer).await
                {
                    tracing::error!("closing timer failed: {error}");
                }
            });
        }
    });
}

pub fn run() {
    init_tracing();

    tauri::Builder::default()
        .setup(|app| {
            let config_path = app
                .path()
                .app_config_dir()
                .map(|dir| dir.join(CONFIG_FILE_NAME))
                .ok();
            let config = RecorderConfig::load(config_path.as_deref()).map_err(|error| error.to_string())?;
            let handle = app.handle().clone();
            let state = RuntimeState::new(
                config,
                Arc::new(TauriDisplays::new(handle.clone())),
                Arc::new(SystemPlatform),
            );
            for name in [WindowName::Main, WindowName::Timer, WindowName::Region] {
                if let Some(window) = app.get_webview_window(name.label()) {
                    state.windows.register(name, Arc::new(TauriWindow::new(window)));
                }
            }
            forward_events(&handle, &state);
            app.manage(state);
            track_region_overlay(&handle);
            close_timer_as_hide(&handle);

            tauri::async_runtime::spawn(async move {
                let state = handle.state::<RuntimeState>();
                match state.initialize().await {
                    Ok(settings) => tracing::info!(
                        "initial devices: video={:?} audio={:?}",
                        settings.video.map(|device| device.name),
                        settings.audio.map(|device| device.name)
                    ),
                    Err(error) => tracing::error!("initial device selection failed: {error}"),
                }
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_settings,
            save_settings,
            patch_settings,
            list_devices,
            get_platform_capability,
            recordings_dir,
            start_recording,
            stop_recording,
            get_recording_status,
            reveal_output,
            move_window,
            hide_window,
            show_region,
            region_resize_finished
        ])
        .run(tauri::generate_context!())
        .expect("failed to run RegionRec");
}
