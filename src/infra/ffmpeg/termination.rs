use std::process::ExitStatus;

/// Phrases the encoder (or its exit description) uses when it stopped because
/// it was asked to.
const EXPECTED_TERMINATION_PATTERNS: &[&str] = &[
    "exiting normally, received signal",
    "received signal 2",
    "received signal 15",
    "killed with signal sigint",
    "killed with signal sigterm",
    "exited with code 255",
];

const PERMISSION_PATTERNS: &[&str] = &[
    "permission",
    "denied",
    "not authorized",
    "operation not permitted",
    "screen record",
    "screenrecord",
    "cannot capture",
    "ktccaccessdenied",
    "screencapture",
    "scstream",
];

pub fn is_expected_termination(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EXPECTED_TERMINATION_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

pub fn looks_like_permission_error(text: &str) -> bool {
    let lowered = text.to_lowercase();
    PERMISSION_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map(|signal| signal.as_str().to_string())
        .unwrap_or_else(|_| format!("signal {signal}"))
}

pub fn describe_exit(status: Option<&ExitStatus>) -> String {
    let Some(status) = status else {
        return "ffmpeg exit status unknown".to_string();
    };
    if let Some(code) = status.code() {
        return format!("ffmpeg exited with code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("ffmpeg was killed with signal {}", signal_name(signal));
        }
    }
    "ffmpeg exited abnormally".to_string()
}
