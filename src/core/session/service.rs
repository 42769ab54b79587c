use crate::core::settings::service::{validate_settings, SettingsStore};
use crate::domain::models::{
    AppError, RecordingEventKind, RecordingStatus, RecordingStatusEvent, StartRecordingResponse,
    StopRecordingResponse,
};
use crate::domain::state_machine::{SessionMachine, SessionPhase};
use crate::infra::config::RecorderConfig;
use crate::infra::events::{ObserverId, ObserverList};
use crate::infra::ffmpeg::recording::{
    build_recording_command, request_quit, send_signal, spawn_encoder, EncoderExit, EncoderSignal,
};
use crate::infra::ffmpeg::termination::{
    describe_exit, is_expected_termination, looks_like_permission_error,
};
use crate::infra::platform::{permission_denied_error, CaptureAccess, PlatformGate};
use crate::infra::window::{WindowName, WindowRegistry};
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::process::ChildStdin;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopRung {
    Interrupt,
    Terminate,
    Kill,
    ForceResolve,
}

const LADDER_AFTER_QUIT: &[StopRung] = &[
    StopRung::Interrupt,
    StopRung::Terminate,
    StopRung::Kill,
    StopRung::ForceResolve,
];
const LADDER_AFTER_INTERRUPT: &[StopRung] =
    &[StopRung::Terminate, StopRung::Kill, StopRung::ForceResolve];

#[derive(Debug, PartialEq)]
enum ExitOutcome {
    Clean,
    /// Ended by a termination signal; treated as a normal stop.
    ExpectedTermination,
    Failed(String),
}

fn classify_exit(exit: &EncoderExit) -> ExitOutcome {
    if exit.success() {
        return ExitOutcome::Clean;
    }
    let summary = failure_summary(exit);
    if exit.forced {
        return ExitOutcome::Failed(summary);
    }
    let text = format!(
        "{}\n{}",
        describe_exit(exit.status.as_ref()),
        exit.diagnostics.join("\n")
    );
    if is_expected_termination(&text) {
        ExitOutcome::ExpectedTermination
    } else {
        ExitOutcome::Failed(summary)
    }
}

fn failure_summary(exit: &EncoderExit) -> String {
    let last_line = exit
        .diagnostics
        .iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| !line.is_empty());
    if exit.forced {
        return last_line.unwrap_or("encoder was abandoned").to_string();
    }
    let description = describe_exit(exit.status.as_ref());
    match last_line {
        Some(line) => format!("{description}: {line}"),
        None => description,
    }
}

pub fn output_file_name(prefix: &str, extension: &str, now: DateTime<Local>) -> String {
    format!("{prefix}{}.{extension}", now.format("%d-%m-%Y_%H_%M_%S"))
}

async fn verify_output(path: &Path) -> Result<(), AppError> {
    let usable = tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.len() > 0)
        .unwrap_or(false);
    if usable {
        return Ok(());
    }
    Err(AppError::new(
        "RECORDING_OUTPUT_MISSING",
        format!("Output file is missing or empty: {}", path.display()),
        Some("check free disk space and the output folder permissions".to_string()),
    ))
}

fn elapsed_ms(started_at: Option<DateTime<Utc>>) -> u64 {
    started_at
        .map(|started_at| (Utc::now() - started_at).num_milliseconds().max(0) as u64)
        .unwrap_or(0)
}

#[derive(Default)]
struct SessionInner {
    machine: SessionMachine,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    output_path: Option<PathBuf>,
    pid: Option<u32>,
    stdin: Option<ChildStdin>,
    kill: Option<oneshot::Sender<()>>,
    ticker: Option<JoinHandle<()>>,
    ladder: Option<JoinHandle<()>>,
    region_locked: bool,
    exit_waiters: Vec<oneshot::Sender<EncoderExit>>,
}

struct ResetEffects {
    ticker: Option<JoinHandle<()>>,
    ladder: Option<JoinHandle<()>>,
    region_locked: bool,
}

impl SessionInner {
    fn is_current(&self, session_id: &str) -> bool {
        self.session_id.as_deref() == Some(session_id)
    }

    fn status(&self) -> RecordingStatus {
        let is_recording = self.machine.phase().is_recording();
        RecordingStatus {
            is_recording,
            duration: if is_recording {
                elapsed_ms(self.started_at) / 1000
            } else {
                0
            },
        }
    }

    fn reset(&mut self) -> ResetEffects {
        self.machine.reset();
        self.session_id = None;
        self.started_at = None;
        self.output_path = None;
        self.pid = None;
        self.stdin = None;
        self.kill = None;
        ResetEffects {
            ticker: self.ticker.take(),
            ladder: self.ladder.take(),
            region_locked: std::mem::take(&mut self.region_locked),
        }
    }
}

struct Shared {
    config: RecorderConfig,
    binary: Option<PathBuf>,
    platform: Arc<dyn PlatformGate>,
    settings: Arc<SettingsStore>,
    windows: Arc<WindowRegistry>,
    events: ObserverList<RecordingStatusEvent>,
    inner: Mutex<SessionInner>,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, SessionInner>, AppError> {
        self.inner.lock().map_err(|_| {
            AppError::new(
                "STATE_LOCK_ERROR",
                "failed to lock recording session",
                None,
            )
        })
    }

    /// Exit paths must always be able to reset, even after a panic elsewhere.
    fn lock_recover(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn event(
        &self,
        session_id: &str,
        status: RecordingEventKind,
        duration_ms: u64,
        detail: impl Into<String>,
    ) -> RecordingStatusEvent {
        RecordingStatusEvent {
            session_id: session_id.to_string(),
            status,
            is_recording: matches!(
                status,
                RecordingEventKind::Recording | RecordingEventKind::Stopping
            ),
            duration_ms,
            detail: detail.into(),
            output_path: None,
            error: None,
        }
    }

    fn start_error(&self, message: &str) -> AppError {
        if looks_like_permission_error(message) {
            return permission_denied_error(self.binary.as_deref(), Some(message));
        }
        AppError::new(
            "RECORDING_START_FAIL",
            message.to_string(),
            Some("check the selected capture devices and try again".to_string()),
        )
    }

    fn process_error(&self, message: &str) -> AppError {
        if looks_like_permission_error(message) {
            return permission_denied_error(self.binary.as_deref(), Some(message));
        }
        AppError::new(
            "RECORDING_PROCESS_ERROR",
            message.to_string(),
            Some("the recording may be incomplete; check the output folder".to_string()),
        )
    }

    /// Makes a visible region overlay click-through and fixed while recording.
    fn lock_overlay(&self) -> bool {
        let Some(overlay) = self.windows.visible(WindowName::Region) else {
            return false;
        };
        if let Err(error) = overlay.set_ignore_mouse_events(true) {
            tracing::warn!("failed to make region overlay click-through: {error}");
        }
        if let Err(error) = overlay.set_movable(false) {
            tracing::warn!("failed to pin region overlay: {error}");
        }
        true
    }

    /// Unlocks and hides the overlay, and puts the capture back to full frame.
    fn release_overlay(&self) {
        if let Some(overlay) = self.windows.get(WindowName::Region) {
            let results = [
                overlay.set_ignore_mouse_events(false),
                overlay.set_movable(true),
                overlay.hide(),
            ];
            for error in results.into_iter().filter_map(Result::err) {
                tracing::warn!("failed to release region overlay: {error}");
            }
        }
        if self.settings.get().is_custom_region() {
            self.settings.update(|settings| settings.reset_region());
        }
    }

    fn apply_reset(&self, effects: ResetEffects) {
        if let Some(ticker) = effects.ticker {
            ticker.abort();
        }
        if let Some(ladder) = effects.ladder {
            ladder.abort();
        }
        if effects.region_locked {
            self.release_overlay();
        }
    }

    /// Single exit point for a session: resets state and reports the outcome.
    /// Exits from sessions that were already reset are ignored.
    fn handle_exit(&self, session_id: &str, exit: EncoderExit) {
        let (phase, started_at, output_path, waiters, effects) = {
            let mut inner = self.lock_recover();
            if !inner.is_current(session_id) {
                tracing::debug!("ignoring exit of stale session {session_id}");
                return;
            }
            let phase = inner.machine.phase();
            let started_at = inner.started_at;
            let output_path = inner.output_path.clone();
            let waiters = std::mem::take(&mut inner.exit_waiters);
            (phase, started_at, output_path, waiters, inner.reset())
        };
        self.apply_reset(effects);
        for waiter in waiters {
            let _ = waiter.send(exit.clone());
        }
        if phase == SessionPhase::Starting {
            // start() reports its own failure
            return;
        }

        let duration_ms = elapsed_ms(started_at);
        let mut event = match classify_exit(&exit) {
            ExitOutcome::Clean | ExitOutcome::ExpectedTermination => {
                tracing::info!("recording finished: {session_id}");
                self.event(session_id, RecordingEventKind::Stopped, duration_ms, "recording stopped")
            }
            ExitOutcome::Failed(message) => {
                tracing::error!("encoder failed ({phase:?}): {message}");
                let mut event =
                    self.event(session_id, RecordingEventKind::Error, duration_ms, message.clone());
                event.error = Some(self.process_error(&message));
                event
            }
        };
        event.output_path = output_path.map(|path| path.to_string_lossy().to_string());
        self.events.notify(&event);
    }

    fn tick_event(&self, session_id: &str) -> Option<RecordingStatusEvent> {
        let inner = self.lock_recover();
        if !inner.is_current(session_id) || !inner.machine.phase().is_recording() {
            return None;
        }
        let status = match inner.machine.phase() {
            SessionPhase::Stopping => RecordingEventKind::Stopping,
            _ => RecordingEventKind::Recording,
        };
        Some(self.event(session_id, status, elapsed_ms(inner.started_at), "status tick"))
    }

    fn is_stopping(&self, session_id: &str) -> bool {
        let inner = self.lock_recover();
        inner.is_current(session_id) && inner.machine.phase() == SessionPhase::Stopping
    }

    fn request_kill(&self, session_id: &str) {
        let kill = {
            let mut inner = self.lock_recover();
            if !inner.is_current(session_id) {
                return;
            }
            inner.kill.take()
        };
        if let Some(kill) = kill {
            let _ = kill.send(());
        }
    }

    fn escalate(&self, session_id: &str, rung: StopRung) {
        let pid = self.lock_recover().pid;
        match rung {
            StopRung::Interrupt => {
                tracing::warn!("encoder still running after quit, sending interrupt");
                if let Err(error) = send_signal(pid, EncoderSignal::Interrupt) {
                    tracing::warn!("{error}");
                }
            }
            StopRung::Terminate => {
                tracing::warn!("encoder still running, sending terminate");
                if let Err(error) = send_signal(pid, EncoderSignal::Terminate) {
                    tracing::warn!("{error}");
                }
            }
            StopRung::Kill => {
                tracing::warn!("encoder ignored termination, killing it");
                self.request_kill(session_id);
            }
            StopRung::ForceResolve => {
                tracing::error!("encoder did not exit after kill; resolving stop without it");
                self.handle_exit(
                    session_id,
                    EncoderExit::forced("encoder did not exit after being killed"),
                );
            }
        }
    }
}

fn spawn_ticker(shared: Arc<Shared>, session_id: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = shared.config.status_interval();
        loop {
            tokio::time::sleep(interval).await;
            let Some(event) = shared.tick_event(&session_id) else {
                break;
            };
            shared.events.notify(&event);
        }
    })
}

/// One timeout per rung; each rung re-checks that the session is still
/// stopping before it acts.
fn spawn_stop_ladder(shared: Arc<Shared>, session_id: String, rungs: &'static [StopRung]) -> JoinHandle<()> {
    tokio::spawn(async move {
        let delay = shared.config.stop_rung_delay();
        for rung in rungs {
            tokio::time::sleep(delay).await;
            if !shared.is_stopping(&session_id) {
                return;
            }
            shared.escalate(&session_id, *rung);
        }
    })
}

/// Owns the single encoder process and its lifecycle:
/// `Idle -> Starting -> Running -> Stopping -> Idle`.
pub struct RecordingSession {
    shared: Arc<Shared>,
}

impl RecordingSession {
    pub fn new(
        config: RecorderConfig,
        binary: Option<PathBuf>,
        platform: Arc<dyn PlatformGate>,
        settings: Arc<SettingsStore>,
        windows: Arc<WindowRegistry>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                binary,
                platform,
                settings,
                windows,
                events: ObserverList::new(),
                inner: Mutex::new(SessionInner::default()),
            }),
        }
    }

    pub fn binary(&self) -> Option<&Path> {
        self.shared.binary.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared.lock_recover().machine.phase()
    }

    pub fn status(&self) -> RecordingStatus {
        self.shared.lock_recover().status()
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&RecordingStatusEvent) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    fn preflight(&self) -> Result<PathBuf, AppError> {
        let shared = &self.shared;
        if shared.lock()?.machine.phase() != SessionPhase::Idle {
            return Err(AppError::new(
                "RECORDING_ALREADY_ACTIVE",
                "Recording is already in progress",
                Some("stop the current recording first".to_string()),
            ));
        }
        let binary = shared.binary.clone().ok_or_else(|| {
            AppError::new(
                "FFMPEG_NOT_AVAILABLE",
                "FFmpeg is not available.",
                Some(format!(
                    "install ffmpeg or set {}",
                    crate::infra::config::FFMPEG_PATH_ENV
                )),
            )
        })?;
        if !shared.platform.supports_screen_capture() {
            return Err(AppError::new(
                "PLATFORM_NOT_SUPPORTED",
                format!(
                    "This recorder is currently configured for macOS only (running on {}).",
                    shared.platform.platform()
                ),
                None,
            ));
        }
        if shared.platform.screen_capture_access() != CaptureAccess::Granted {
            return Err(permission_denied_error(Some(&binary), None));
        }
        Ok(binary)
    }

    /// Launches the encoder and resolves once it reports that capture began.
    pub async fn start(&self) -> Result<StartRecordingResponse, AppError> {
        let binary = self.preflight()?;
        let shared = &self.shared;
        let settings = shared.settings.get();
        let (Some(video), Some(audio)) = (settings.video.clone(), settings.audio.clone()) else {
            return Err(AppError::new(
                "INVALID_CONFIGURATION",
                "Capture devices are not selected.",
                Some("refresh the device list and pick a screen and an audio input".to_string()),
            ));
        };
        validate_settings(&settings)?;

        tokio::fs::create_dir_all(&settings.output_path).await.map_err(|error| {
            AppError::new(
                "IO_ERROR",
                format!("failed to create output dir: {error}"),
                Some("check the output folder permissions".to_string()),
            )
        })?;
        let output_path = settings.output_path.join(output_file_name(
            &shared.config.file_prefix,
            &shared.config.file_extension,
            Local::now(),
        ));
        let command = build_recording_command(
            &binary,
            &settings,
            &video,
            &audio,
            &output_path,
            &shared.config,
        );

        let session_id = Uuid::new_v4().to_string();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (started_rx, exited_rx) = {
            let mut inner = shared.lock()?;
            inner.machine.begin_start()?;
            let handle = match spawn_encoder(command, shared.config.start_markers.clone()) {
                Ok(handle) => handle,
                Err(error) => {
                    inner.machine.reset();
                    tracing::error!("{error}");
                    return Err(error.into());
                }
            };
            inner.session_id = Some(session_id.clone());
            inner.output_path = Some(output_path.clone());
            inner.pid = handle.pid;
            inner.stdin = handle.stdin;
            inner.kill = Some(handle.kill);
            inner.exit_waiters.push(exit_tx);
            (handle.started, handle.exited)
        };
        tracing::info!("encoder launched for {}", output_path.display());

        let watcher = shared.clone();
        let watched_id = session_id.clone();
        tokio::spawn(async move {
            let exit = exited_rx
                .await
                .unwrap_or_else(|_| EncoderExit::forced("encoder supervisor stopped"));
            watcher.handle_exit(&watched_id, exit);
        });

        match tokio::time::timeout(shared.config.start_timeout(), started_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                let exit = exit_rx
                    .await
                    .unwrap_or_else(|_| EncoderExit::forced("encoder exited before starting"));
                let message = failure_summary(&exit);
                tracing::error!("encoder failed to start: {message}");
                return Err(shared.start_error(&message));
            }
            Err(_) => {
                tracing::error!(
                    "encoder did not report start within {:?}",
                    shared.config.start_timeout()
                );
                shared.request_kill(&session_id);
                if tokio::time::timeout(shared.config.stop_rung_delay(), exit_rx)
                    .await
                    .is_err()
                {
                    shared.handle_exit(
                        &session_id,
                        EncoderExit::forced("encoder did not start in time"),
                    );
                }
                return Err(AppError::new(
                    "RECORDING_START_TIMEOUT",
                    "Encoder did not report that recording started.",
                    Some("check the capture devices and try again".to_string()),
                ));
            }
        }

        let confirmed = {
            let mut inner = shared.lock()?;
            if inner.is_current(&session_id) && inner.machine.confirm_started().is_ok() {
                inner.started_at = Some(Utc::now());
                inner.region_locked = shared.lock_overlay();
                inner.ticker = Some(spawn_ticker(shared.clone(), session_id.clone()));
                true
            } else {
                false
            }
        };
        if !confirmed {
            let exit = exit_rx
                .await
                .unwrap_or_else(|_| EncoderExit::forced("encoder exited right after starting"));
            return Err(shared.start_error(&failure_summary(&exit)));
        }

        let output = output_path.to_string_lossy().to_string();
        tracing::info!("recording started: {output}");
        let mut event = shared.event(&session_id, RecordingEventKind::Recording, 0, "recording started");
        event.output_path = Some(output.clone());
        shared.events.notify(&event);

        Ok(StartRecordingResponse {
            session_id,
            output_path: output,
        })
    }

    /// Asks the encoder to finish, escalating until it is gone. The session is
    /// idle again whenever this returns, whatever the outcome.
    pub async fn stop(&self) -> Result<StopRecordingResponse, AppError> {
        let shared = &self.shared;
        let (session_id, mut stdin, pid, started_at, output_path, exit_rx) = {
            let mut inner = shared.lock()?;
            inner.machine.begin_stop()?;
            let (exit_tx, exit_rx) = oneshot::channel();
            inner.exit_waiters.push(exit_tx);
            (
                inner.session_id.clone().unwrap_or_default(),
                inner.stdin.take(),
                inner.pid,
                inner.started_at,
                inner.output_path.clone(),
                exit_rx,
            )
        };
        let duration = elapsed_ms(started_at) / 1000;
        shared.events.notify(&shared.event(
            &session_id,
            RecordingEventKind::Stopping,
            elapsed_ms(started_at),
            "stopping recording",
        ));

        let rungs = match request_quit(stdin.as_mut()).await {
            Ok(()) => LADDER_AFTER_QUIT,
            Err(error) => {
                tracing::warn!("graceful stop unavailable ({error}), interrupting encoder");
                if let Err(error) = send_signal(pid, EncoderSignal::Interrupt) {
                    tracing::warn!("{error}");
                }
                LADDER_AFTER_INTERRUPT
            }
        };

        let ladder = spawn_stop_ladder(shared.clone(), session_id.clone(), rungs);
        {
            let mut inner = shared.lock_recover();
            if inner.is_current(&session_id) {
                inner.ladder = Some(ladder);
            } else {
                ladder.abort();
            }
        }

        let exit = exit_rx
            .await
            .unwrap_or_else(|_| EncoderExit::forced("recording session was reset"));
        drop(stdin);

        if let ExitOutcome::Failed(message) = classify_exit(&exit) {
            return Err(shared.process_error(&message));
        }
        let output_path = output_path.ok_or_else(|| {
            AppError::new("RECORDING_OUTPUT_MISSING", "No output file was recorded.", None)
        })?;
        tokio::time::sleep(shared.config.output_settle()).await;
        verify_output(&output_path).await?;

        tracing::info!("recording saved: {}", output_path.display());
        Ok(StopRecordingResponse {
            output_path: output_path.to_string_lossy().to_string(),
            duration,
        })
    }

    /// Drops a leftover region selection while idle: unlocks and hides the
    /// overlay and restores full-frame capture.
    pub fn release_region(&self) {
        if self.status().is_recording {
            return;
        }
        if self.shared.windows.visible(WindowName::Region).is_some() {
            self.shared.release_overlay();
        }
    }
}
