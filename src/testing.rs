//! Fakes shared by the unit tests.

use crate::domain::models::{AppError, Display, Point, Rect, ScreenGeometry, Size, VideoDevice};
use crate::infra::platform::{CaptureAccess, PlatformGate};
use crate::infra::window::WindowHandle;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SAMPLE_LISTING: &str = "\
[AVFoundation indev @ 0x7f9c8e004a80] AVFoundation video devices:
[AVFoundation indev @ 0x7f9c8e004a80] [0] FaceTime HD Camera
[AVFoundation indev @ 0x7f9c8e004a80] [1] Capture screen 0
[AVFoundation indev @ 0x7f9c8e004a80] [2] Capture screen 1
[AVFoundation indev @ 0x7f9c8e004a80] AVFoundation audio devices:
[AVFoundation indev @ 0x7f9c8e004a80] [0] Recorder-Input
[AVFoundation indev @ 0x7f9c8e004a80] [1] MacBook Pro Microphone
: Input/output error
";

pub fn display(label: &str, x: i32, y: i32, width: u32, height: u32, scale: f64) -> Display {
    Display {
        label: label.to_string(),
        bounds: Rect::new(x, y, width, height),
        work_area: Rect::new(x, y, width, height),
        scale_factor: scale,
        size: Size::new(width, height),
    }
}

pub fn screen_device(
    index: u32,
    label: &str,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    scale: f64,
) -> VideoDevice {
    VideoDevice {
        index,
        name: format!("Capture screen {}", index.saturating_sub(1)),
        is_screen: true,
        geometry: Some(ScreenGeometry::from_display(&display(
            label, x, y, width, height, scale,
        ))),
    }
}

#[derive(Debug)]
struct FakeWindowState {
    position: Point,
    size: Size,
    visible: bool,
    ignore_mouse: bool,
    movable: bool,
}

pub struct FakeWindow {
    state: Mutex<FakeWindowState>,
}

impl FakeWindow {
    pub fn new(position: Point, width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(FakeWindowState {
                position,
                size: Size::new(width, height),
                visible: false,
                ignore_mouse: false,
                movable: true,
            }),
        }
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.lock().unwrap().visible = visible;
    }

    pub fn ignores_mouse(&self) -> bool {
        self.state.lock().unwrap().ignore_mouse
    }

    pub fn is_movable(&self) -> bool {
        self.state.lock().unwrap().movable
    }
}

impl WindowHandle for FakeWindow {
    fn position(&self) -> Result<Point, AppError> {
        Ok(self.state.lock().unwrap().position)
    }

    fn size(&self) -> Result<Size, AppError> {
        Ok(self.state.lock().unwrap().size)
    }

    fn set_position(&self, position: Point) -> Result<(), AppError> {
        self.state.lock().unwrap().position = position;
        Ok(())
    }

    fn is_visible(&self) -> Result<bool, AppError> {
        Ok(self.state.lock().unwrap().visible)
    }

    fn show(&self) -> Result<(), AppError> {
        self.set_visible(true);
        Ok(())
    }

    fn hide(&self) -> Result<(), AppError> {
        self.set_visible(false);
        Ok(())
    }

    fn set_ignore_mouse_events(&self, ignore: bool) -> Result<(), AppError> {
        self.state.lock().unwrap().ignore_mouse = ignore;
        Ok(())
    }

    fn set_movable(&self, movable: bool) -> Result<(), AppError> {
        self.state.lock().unwrap().movable = movable;
        Ok(())
    }
}

pub struct FakePlatform {
    pub supported: bool,
    pub access: CaptureAccess,
    pub revealed: Mutex<Vec<PathBuf>>,
}

impl FakePlatform {
    pub fn granted() -> Self {
        Self {
            supported: true,
            access: CaptureAccess::Granted,
            revealed: Mutex::new(Vec::new()),
        }
    }
}

impl PlatformGate for FakePlatform {
    fn platform(&self) -> &'static str {
        "macos"
    }

    fn supports_screen_capture(&self) -> bool {
        self.supported
    }

    fn screen_capture_access(&self) -> CaptureAccess {
        self.access
    }

    fn reveal_in_file_manager(&self, path: &Path) -> Result<(), AppError> {
        self.revealed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Shell stand-ins for the encoder. Each one treats its last argument as the
/// output file.
#[derive(Debug, Clone, Copy)]
pub enum FakeEncoder {
    QuitCleanly,
    QuitWithSignalMessage,
    FailOnQuit,
    EmptyOutput,
    /// Ignores `q` and SIGINT; only SIGTERM or a kill ends it.
    IgnoreQuit,
    CrashAfterStart,
    ExitBeforeStart(&'static str),
    /// Closes its control input before starting; finishes the file on SIGINT.
    ClosedControlInput,
    /// Ignores quit, SIGINT and SIGTERM, and leaves a child holding its
    /// diagnostic stream open, so even a kill never ends the stream.
    Unkillable,
}

const STARTED: &str = r#"for last; do :; done
echo "Input #0, avfoundation, from '1:0':" >&2
echo "Output #0, mp4, to '$last':" >&2
echo "Press [q] to stop, [?] for help" >&2
"#;

fn on_quit(action: &str) -> String {
    format!(
        r#"{STARTED}while read -r line; do
  if [ "$line" = "q" ]; then
{action}
  fi
done
exit 0
"#
    )
}

#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Prints the sample listing on stderr and exits 1, like the real listing mode.
#[cfg(unix)]
pub fn listing_script(dir: &Path) -> PathBuf {
    let body = format!("cat >&2 <<'EOF'\n{SAMPLE_LISTING}EOF\nexit 1\n");
    write_script(dir, "ffmpeg-list", &body)
}

#[cfg(unix)]
pub fn encoder_script(dir: &Path, behaviour: FakeEncoder) -> PathBuf {
    let body = match behaviour {
        FakeEncoder::QuitCleanly => on_quit("    printf 'recorded' > \"$last\"\n    exit 0"),
        FakeEncoder::QuitWithSignalMessage => on_quit(
            "    printf 'recorded' > \"$last\"\n    echo \"Exiting normally, received signal 2.\" >&2\n    exit 255",
        ),
        FakeEncoder::FailOnQuit => on_quit("    echo \"Conversion failed!\" >&2\n    exit 1"),
        FakeEncoder::EmptyOutput => on_quit("    : > \"$last\"\n    exit 0"),
        FakeEncoder::IgnoreQuit => format!(
            "trap '' INT\n{STARTED}printf 'recorded' > \"$last\"\nwhile true; do sleep 1; done\n"
        ),
        FakeEncoder::CrashAfterStart => format!(
            "{STARTED}printf 'partial' > \"$last\"\nsleep 0.3\necho \"Error writing trailer: Input/output error\" >&2\nexit 1\n"
        ),
        FakeEncoder::ExitBeforeStart(message) => format!("echo \"{message}\" >&2\nexit 1\n"),
        FakeEncoder::ClosedControlInput => format!(
            "trap 'printf interrupted > \"$last\"; echo \"Exiting normally, received signal 2.\" >&2; exit 255' INT\nexec 0<&-\n{STARTED}while true; do sleep 0.05; done\n"
        ),
        FakeEncoder::Unkillable => format!(
            "trap '' INT TERM\n{STARTED}printf 'recorded' > \"$last\"\n(i=0; while [ $i -lt 100 ]; do echo \"frame=$i fps=30\" >&2; sleep 0.05; i=$((i+1)); done) &\nwhile true; do sleep 1; done\n"
        ),
    };
    write_script(dir, "ffmpeg", &body)
}
