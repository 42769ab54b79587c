use crate::domain::models::{
    AppError, RecordingStatus, StartRecordingResponse, StopRecordingResponse,
};
use crate::state::RuntimeState;
use std::path::PathBuf;

pub async fn start_recording(state: &RuntimeState) -> Result<StartRecordingResponse, AppError> {
    state.session.start().await.inspect_err(|error| {
        tracing::warn!("start_recording rejected: {error}");
    })
}

pub async fn stop_recording(state: &RuntimeState) -> Result<StopRecordingResponse, AppError> {
    state.session.stop().await.inspect_err(|error| {
        tracing::warn!("stop_recording failed: {error}");
    })
}

pub async fn get_recording_status(state: &RuntimeState) -> RecordingStatus {
    state.session.status()
}

/// Shows a finished recording in the file manager. Only files inside the
/// recordings folder are revealed.
pub async fn reveal_output(state: &RuntimeState, path: String) -> Result<(), AppError> {
    let missing = |detail: String| {
        AppError::new(
            "RECORDING_OUTPUT_MISSING",
            format!("Recording not found: {detail}"),
            None,
        )
    };
    let file = tokio::fs::canonicalize(PathBuf::from(&path))
        .await
        .map_err(|error| missing(format!("{path}: {error}")))?;
    let folder = state.settings.get().output_path;
    let folder = tokio::fs::canonicalize(&folder)
        .await
        .map_err(|error| missing(format!("{}: {error}", folder.display())))?;
    let is_file = tokio::fs::metadata(&file)
        .await
        .is_ok_and(|metadata| metadata.is_file());
    if !is_file || !file.starts_with(&folder) {
        return Err(AppError::new(
            "INVALID_PATH",
            format!("{path} is not a recording in {}", folder.display()),
            None,
        ));
    }
    state.platform.reveal_in_file_manager(&file)
}
