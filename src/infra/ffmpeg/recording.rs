use crate::domain::models::{AppError, Device, RecordingSettings, VideoDevice};
use crate::infra::config::RecorderConfig;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::oneshot;

const DIAGNOSTIC_TAIL_LINES: usize = 20;
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("failed to start encoder process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("encoder process has no diagnostic stream")]
    MissingDiagnostics,
    #[error("encoder control input not available")]
    ControlUnavailable,
    #[error("failed to write to encoder control input: {0}")]
    Control(#[source] std::io::Error),
    #[error("failed to signal encoder process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
    #[error("process signals are not supported on this platform")]
    SignalUnsupported,
}

impl From<EncoderError> for AppError {
    fn from(error: EncoderError) -> Self {
        let code = match error {
            EncoderError::Spawn(_) | EncoderError::MissingDiagnostics => "RECORDING_START_FAIL",
            _ => "RECORDING_PROCESS_IO",
        };
        AppError::new(code, error.to_string(), None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderSignal {
    Interrupt,
    Terminate,
}

/// What the supervisor saw when the encoder went away.
#[derive(Debug, Clone)]
pub struct EncoderExit {
    pub status: Option<ExitStatus>,
    pub diagnostics: Vec<String>,
    /// Set when the session gave up waiting and resolved without a real exit.
    pub forced: bool,
}

impl EncoderExit {
    pub fn forced(reason: impl Into<String>) -> Self {
        Self {
            status: None,
            diagnostics: vec![reason.into()],
            forced: true,
        }
    }

    pub fn success(&self) -> bool {
        !self.forced && self.status.map(|status| status.success()).unwrap_or(false)
    }
}

/// Live encoder process: control input plus lifecycle notifications.
pub struct EncoderHandle {
    pub pid: Option<u32>,
    pub stdin: Option<ChildStdin>,
    /// Resolves once the encoder prints a start marker; dropped if it exits first.
    pub started: oneshot::Receiver<()>,
    pub exited: oneshot::Receiver<EncoderExit>,
    pub kill: oneshot::Sender<()>,
}

pub fn build_recording_command(
    ffmpeg_bin: &Path,
    settings: &RecordingSettings,
    video: &VideoDevice,
    audio: &Device,
    output_path: &Path,
    config: &RecorderConfig,
) -> Command {
    let mut command = Command::new(ffmpeg_bin);
    command.arg("-hide_banner");
    command.arg("-f").arg(&config.input_format);
    command.arg("-framerate").arg(settings.fps.to_string());
    command.args(&config.input_options);
    // one combined selector keeps picture and sound on a single synchronized input
    command.arg("-i").arg(format!("{}:{}", video.index, audio.index));
    command.arg("-vf").arg(format!(
        "scale={}:{},crop={}:{}:{}:{}",
        settings.scale.w,
        settings.scale.h,
        settings.crop.w,
        settings.crop.h,
        settings.offset.x,
        settings.offset.y
    ));
    command.arg("-af").arg(&config.audio_filter);
    command.args(&config.output_options);
    command.arg("-r").arg(settings.fps.to_string());
    command.arg("-y");
    command.arg(output_path.as_os_str());

    command.stdin(Stdio::piped());
    command.stdout(Stdio::null());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);
    command
}

pub fn build_ffmpeg_recording_debug_command(
    settings: &RecordingSettings,
    video: &VideoDevice,
    audio: &Device,
    output_path: &Path,
    config: &RecorderConfig,
) -> Vec<OsString> {
    let command = build_recording_command(
        Path::new("ffmpeg"),
        settings,
        video,
        audio,
        output_path,
        config,
    );
    command
        .as_std()
        .get_args()
        .map(|arg| arg.to_os_string())
        .collect::<Vec<_>>()
}

fn is_start_marker(line: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| line.contains(marker.as_str()))
}

/// Spawns the encoder and a supervisor task that turns its diagnostic stream
/// and exit into `started` / `exited` notifications.
pub fn spawn_encoder(
    mut command: Command,
    start_markers: Vec<String>,
) -> Result<EncoderHandle, EncoderError> {
    let mut child = command.spawn().map_err(EncoderError::Spawn)?;
    let pid = child.id();
    let stdin = child.stdin.take();
    let stderr = child.stderr.take().ok_or(EncoderError::MissingDiagnostics)?;

    let (started_tx, started_rx) = oneshot::channel();
    let (exited_tx, exited_rx) = oneshot::channel();
    let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut started_tx = Some(started_tx);
        let mut tail = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
        let mut reading = true;
        let mut kill_armed = true;

        let mut record = |line: String, tail: &mut VecDeque<String>| {
            if started_tx.is_some() && is_start_marker(&line, &start_markers) {
                if let Some(sender) = started_tx.take() {
                    let _ = sender.send(());
                }
            }
            if !line.trim_start().starts_with("frame=") {
                tracing::debug!(target: "regionrec::ffmpeg", "{line}");
            }
            if tail.len() == DIAGNOSTIC_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        };

        let status = loop {
            tokio::select! {
                line = lines.next_line(), if reading => match line {
                    Ok(Some(line)) => record(line, &mut tail),
                    Ok(None) => reading = false,
                    Err(error) => {
                        tracing::warn!("failed to read encoder diagnostics: {error}");
                        reading = false;
                    }
                },
                status = child.wait() => break status.ok(),
                request = &mut kill_rx, if kill_armed => {
                    kill_armed = false;
                    if request.is_ok() {
                        tracing::warn!("force killing encoder process {pid:?}");
                        if let Err(error) = child.start_kill() {
                            tracing::error!("failed to kill encoder process: {error}");
                        }
                    }
                }
            }
        };

        // the last lines before exit usually explain it
        while reading {
            match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, lines.next_line()).await {
                Ok(Ok(Some(line))) => record(line, &mut tail),
                _ => reading = false,
            }
        }
        drop(record);

        let _ = exited_tx.send(EncoderExit {
            status,
            diagnostics: tail.into_iter().collect(),
            forced: false,
        });
    });

    Ok(EncoderHandle {
        pid,
        stdin,
        started: started_rx,
        exited: exited_rx,
        kill: kill_tx,
    })
}

pub async fn send_ffmpeg_stdin(stdin: &mut ChildStdin, payload: &[u8]) -> Result<(), EncoderError> {
    stdin.write_all(payload).await.map_err(EncoderError::Control)?;
    stdin.flush().await.map_err(EncoderError::Control)
}

/// Asks the encoder to finish the file and exit.
pub async fn request_quit(stdin: Option<&mut ChildStdin>) -> Result<(), EncoderError> {
    let stdin = stdin.ok_or(EncoderError::ControlUnavailable)?;
    send_ffmpeg_stdin(stdin, b"q\n").await
}

#[cfg(unix)]
pub fn send_signal(pid: Option<u32>, signal: EncoderSignal) -> Result<(), EncoderError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let pid = pid.ok_or(EncoderError::ControlUnavailable)?;
    let signal_kind = match signal {
        EncoderSignal::Interrupt => Signal::SIGINT,
        EncoderSignal::Terminate => Signal::SIGTERM,
    };
    signal::kill(Pid::from_raw(pid as i32), signal_kind).map_err(|error| EncoderError::Signal {
        pid,
        reason: error.to_string(),
    })
}

#[cfg(not(unix))]
pub fn send_signal(_pid: Option<u32>, _signal: EncoderSignal) -> Result<(), EncoderError> {
    Err(EncoderError::SignalUnsupported)
}
