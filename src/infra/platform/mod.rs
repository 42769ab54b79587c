use crate::domain::models::{AppError, PermissionRemediation};
use serde::Serialize;
use std::path::Path;

pub const SCREEN_CAPTURE_SETTINGS_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_ScreenCapture";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureAccess {
    Granted,
    Denied,
}

/// OS-level gate consulted before an encoder is launched.
pub trait PlatformGate: Send + Sync {
    fn platform(&self) -> &'static str;
    fn supports_screen_capture(&self) -> bool;
    fn screen_capture_access(&self) -> CaptureAccess;
    /// Shows `path` selected in the system file manager.
    fn reveal_in_file_manager(&self, path: &Path) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCapability {
    pub platform: String,
    pub supports_screen_capture: bool,
    pub screen_capture_access: CaptureAccess,
    pub encoder_available: bool,
}

pub fn platform_capability(gate: &dyn PlatformGate, encoder_available: bool) -> PlatformCapability {
    let supports_screen_capture = gate.supports_screen_capture();
    PlatformCapability {
        platform: gate.platform().to_string(),
        supports_screen_capture,
        screen_capture_access: if supports_screen_capture {
            gate.screen_capture_access()
        } else {
            CaptureAccess::Denied
        },
        encoder_available,
    }
}

pub struct SystemPlatform;

impl PlatformGate for SystemPlatform {
    fn platform(&self) -> &'static str {
        std::env::consts::OS
    }

    fn supports_screen_capture(&self) -> bool {
        cfg!(target_os = "macos")
    }

    #[cfg(target_os = "macos")]
    fn screen_capture_access(&self) -> CaptureAccess {
        // preflight only reads the TCC state; it never prompts
        if core_graphics::access::ScreenCaptureAccess.preflight() {
            CaptureAccess::Granted
        } else {
            CaptureAccess::Denied
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn screen_capture_access(&self) -> CaptureAccess {
        CaptureAccess::Denied
    }

    fn reveal_in_file_manager(&self, path: &Path) -> Result<(), AppError> {
        let mut command = reveal_command(path);
        command.spawn().map_err(|error| {
            AppError::new(
                "REVEAL_FAIL",
                format!("failed to open the file manager: {error}"),
                None,
            )
        })?;
        tracing::info!("revealed {}", path.display());
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn reveal_command(path: &Path) -> std::process::Command {
    let mut command = std::process::Command::new("open");
    command.arg("-R").arg(path);
    command
}

#[cfg(target_os = "windows")]
fn reveal_command(path: &Path) -> std::process::Command {
    let mut command = std::process::Command::new("explorer");
    command.arg(format!("/select,{}", path.display()));
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn reveal_command(path: &Path) -> std::process::Command {
    let mut command = std::process::Command::new("xdg-open");
    command.arg(path.parent().unwrap_or(path));
    command
}

pub fn permission_remediation(binary: Option<&Path>) -> PermissionRemediation {
    PermissionRemediation {
        settings_url: SCREEN_CAPTURE_SETTINGS_URL.to_string(),
        binary_path: binary.map(|path| path.to_string_lossy().to_string()),
        restart_required: true,
    }
}

pub fn permission_denied_error(binary: Option<&Path>, detail: Option<&str>) -> AppError {
    let message = match detail {
        Some(detail) => format!("Screen Recording permission required: {detail}"),
        None => "Screen Recording permission required.".to_string(),
    };
    AppError::new(
        "SCREEN_CAPTURE_PERMISSION_DENIED",
        message,
        Some(
            "Open Privacy & Security > Screen Recording, allow this app (and ffmpeg if listed), then restart the app"
                .to_string(),
        ),
    )
    .with_remediation(permission_remediation(binary))
}

#[cfg(test)]
mod tests {
    use super::{
        permission_denied_error, platform_capability, reveal_command, CaptureAccess, PlatformGate,
        SystemPlatform,
    };
    use crate::testing::FakePlatform;
    use std::path::Path;

    #[test]
    fn permission_error_carries_remediation() {
        let error = permission_denied_error(Some(Path::new("/opt/bin/ffmpeg")), None);
        assert_eq!(error.code, "SCREEN_CAPTURE_PERMISSION_DENIED");
        let remediation = error.remediation.unwrap();
        assert!(remediation.settings_url.contains("Privacy_ScreenCapture"));
        assert_eq!(remediation.binary_path.as_deref(), Some("/opt/bin/ffmpeg"));
        assert!(remediation.restart_required);
    }

    #[test]
    fn system_gate_matches_build_target() {
        let gate = SystemPlatform;
        assert_eq!(gate.platform(), std::env::consts::OS);
        assert_eq!(gate.supports_screen_capture(), cfg!(target_os = "macos"));
        if !gate.supports_screen_capture() {
            assert_eq!(gate.screen_capture_access(), CaptureAccess::Denied);
        }
    }

    #[test]
    fn reveal_command_targets_the_recording() {
        let path = Path::new("/Users/me/Desktop/RegionRec/REC_01-01-2026_10_00_00.mp4");
        let command = reveal_command(path);
        let args = command
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect::<Vec<_>>();
        if cfg!(target_os = "macos") {
            assert_eq!(command.get_program(), "open");
            assert_eq!(args, vec!["-R".to_string(), path.display().to_string()]);
        } else if cfg!(not(target_os = "windows")) {
            assert_eq!(command.get_program(), "xdg-open");
            assert_eq!(args, vec!["/Users/me/Desktop/RegionRec".to_string()]);
        }
    }

    #[test]
    fn unsupported_platform_reports_denied_access() {
        let gate = FakePlatform {
            supported: false,
            access: CaptureAccess::Granted,
            ..FakePlatform::granted()
        };
        let capability = platform_capability(&gate, true);
        assert!(!capability.supports_screen_capture);
        assert_eq!(capability.screen_capture_access, CaptureAccess::Denied);
    }
}
