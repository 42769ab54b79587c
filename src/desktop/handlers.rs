use crate::commands::{recording, settings, windows};
use crate::domain::models::{
    AppError, DeviceLists, Point, RecordingSettings, RecordingStatus, SettingsPatch,
    StartRecordingResponse, StopRecordingResponse,
};
use crate::infra::platform::PlatformCapability;
use crate::infra::window::WindowName;
use crate::state::RuntimeState;
use tauri::State;

#[tauri::command]
pub async fn get_settings(state: State<'_, RuntimeState>) -> Result<RecordingSettings, AppError> {
    Ok(settings::get_settings(state.inner()).await)
}

#[tauri::command]
pub async fn save_settings(
    state: State<'_, RuntimeState>,
    settings: Option<RecordingSettings>,
) -> Result<bool, AppError> {
    Ok(settings::save_settings(state.inner(), settings).await)
}

#[tauri::command]
pub async fn patch_settings(
    state: State<'_, RuntimeState>,
    patch: SettingsPatch,
) -> Result<RecordingSettings, AppError> {
    settings::patch_settings(state.inner(), patch).await
}

#[tauri::command]
pub async fn list_devices(
    state: State<'_, RuntimeState>,
    force: Option<bool>,
) -> Result<DeviceLists, AppError> {
    Ok(settings::list_devices(state.inner(), force.unwrap_or(false)).await)
}

#[tauri::command]
pub async fn get_platform_capability(
    state: State<'_, RuntimeState>,
) -> Result<PlatformCapability, AppError> {
    Ok(settings::get_platform_capability(state.inner()).await)
}

#[tauri::command]
pub async fn recordings_dir(state: State<'_, RuntimeState>) -> Result<String, AppError> {
    settings::recordings_dir(state.inner()).await
}

#[tauri::command]
pub async fn start_recording(
    state: State<'_, RuntimeState>,
) -> Result<StartRecordingResponse, AppError> {
    recording::start_recording(state.inner()).await
}

#[tauri::command]
pub async fn stop_recording(
    state: State<'_, RuntimeState>,
) -> Result<StopRecordingResponse, AppError> {
    recording::stop_recording(state.inner()).await
}

#[tauri::command]
pub async fn get_recording_status(
    state: State<'_, RuntimeState>,
) -> Result<RecordingStatus, AppError> {
    Ok(recording::get_recording_status(state.inner()).await)
}

#[tauri::command]
pub async fn reveal_output(state: State<'_, RuntimeState>, path: String) -> Result<(), AppError> {
    recording::reveal_output(state.inner(), path).await
}

#[tauri::command]
pub async fn move_window(
    state: State<'_, RuntimeState>,
    name: WindowName,
    position: Point,
) -> Result<(), AppError> {
    windows::move_window(state.inner(), name, position).await
}

#[tauri::command]
pub async fn hide_window(state: State<'_, RuntimeState>, name: WindowName) -> Result<(), AppError> {
    windows::hide_window(state.inner(), name).await
}

#[tauri::command]
pub async fn show_region(state: State<'_, RuntimeState>) -> Result<(), AppError> {
    windows::show_region(state.inner()).await
}

#[tauri::command]
pub async fn region_resize_finished(
    state: State<'_, RuntimeState>,
) -> Result<RecordingSettings, AppError> {
    windows::region_resize_finished(state.inner()).await
}
