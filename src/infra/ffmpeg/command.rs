use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Running out of a cargo build tree.
    Source,
    /// Running from an installed application bundle.
    Packaged,
}

impl DeploymentMode {
    pub fn detect() -> Self {
        if cfg!(debug_assertions) {
            DeploymentMode::Source
        } else {
            DeploymentMode::Packaged
        }
    }
}

pub fn ffmpeg_file_name() -> &'static str {
    if cfg!(windows) {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

/// Ordered locations to search for the encoder binary. An explicit override
/// always comes first.
pub fn candidate_paths(mode: DeploymentMode, override_path: Option<&Path>) -> Vec<PathBuf> {
    let name = ffmpeg_file_name();
    let mut candidates = Vec::new();
    if let Some(path) = override_path {
        candidates.push(path.to_path_buf());
    }

    match mode {
        DeploymentMode::Source => {
            candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("bin").join(name));
            if let Some(paths) = env::var_os("PATH") {
                candidates.extend(env::split_paths(&paths).map(|dir| dir.join(name)));
            }
        }
        DeploymentMode::Packaged => {
            if let Some(exe_dir) = env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
            {
                candidates.push(exe_dir.join(name));
                candidates.push(exe_dir.join("bin").join(name));
                // macOS bundle: Contents/MacOS/<exe> -> Contents/Resources/bin
                candidates.push(exe_dir.join("../Resources/bin").join(name));
                candidates.push(exe_dir.join("resources").join("bin").join(name));
            }
        }
    }
    candidates
}

/// First candidate that exists and is executable, or `None` when recording is
/// unavailable. Never fails.
pub fn resolve_binary_path(candidates: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        let exists = candidate.is_file();
        tracing::debug!("checking ffmpeg candidate {} exists={exists}", candidate.display());
        if exists && ensure_executable(candidate) {
            tracing::info!("ffmpeg resolved: {}", candidate.display());
            return Some(candidate.clone());
        }
    }
    tracing::error!("ffmpeg binary not found; recording is unavailable");
    None
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let mode = metadata.permissions().mode();
    if mode & 0o111 != 0 {
        return true;
    }
    tracing::warn!("ffmpeg at {} is not executable, fixing permissions", path.display());
    let mut permissions = metadata.permissions();
    permissions.set_mode(mode | 0o755);
    match std::fs::set_permissions(path, permissions) {
        Ok(()) => true,
        Err(error) => {
            tracing::error!("failed to make {} executable: {error}", path.display());
            false
        }
    }
}

#[cfg(not(unix))]
fn ensure_executable(path: &Path) -> bool {
    path.is_file()
}

/// Runs the device-listing mode and returns its diagnostic stream.
///
/// The listing command exits non-zero by convention; only a failure to launch
/// the binary at all yields `None`.
pub async fn run_device_listing(binary: &Path, input_format: &str) -> Option<String> {
    let output = Command::new(binary)
        .arg("-hide_banner")
        .arg("-f")
        .arg(input_format)
        .arg("-list_devices")
        .arg("true")
        .arg("-i")
        .arg("")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;
    match output {
        Ok(output) => Some(String::from_utf8_lossy(&output.stderr).to_string()),
        Err(error) => {
            tracing::error!("failed to run device listing: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{candidate_paths, resolve_binary_path, run_device_listing, DeploymentMode};
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[test]
    fn empty_candidate_list_resolves_to_none() {
        assert!(resolve_binary_path(&[]).is_none());
    }

    #[test]
    fn missing_candidates_resolve_to_none() {
        let dir = tempdir().unwrap();
        let candidates = vec![dir.path().join("ffmpeg"), PathBuf::from("/nonexistent/ffmpeg")];
        assert!(resolve_binary_path(&candidates).is_none());
    }

    #[test]
    fn override_is_searched_first() {
        let candidates = candidate_paths(DeploymentMode::Source, Some(Path::new("/custom/ffmpeg")));
        assert_eq!(candidates[0], PathBuf::from("/custom/ffmpeg"));
        assert!(candidates.len() > 1);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_candidate_gets_fixed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let binary = dir.path().join("ffmpeg");
        std::fs::write(&binary, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();
        let resolved = resolve_binary_path(&[dir.path().join("missing"), binary.clone()]);
        assert_eq!(resolved, Some(binary.clone()));
        let mode = std::fs::metadata(&binary).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[tokio::test]
    async fn unlaunchable_binary_yields_no_listing() {
        let listing = run_device_listing(Path::new("/nonexistent/ffmpeg"), "avfoundation").await;
        assert!(listing.is_none());
    }
}
