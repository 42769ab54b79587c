use crate::domain::models::{AppError, Display, Point, Rect, Size};
use crate::infra::window::{DisplaySource, WindowHandle};
use tauri::{AppHandle, Emitter, LogicalPosition, Position, WebviewWindow};

/// Tells the overlay page whether its drag region is active.
pub const WINDOW_MOVABLE_EVENT: &str = "window/movable";

fn window_error(action: &str, error: tauri::Error) -> AppError {
    AppError::new(
        "WINDOW_OPERATION_FAILED",
        format!("failed to {action}: {error}"),
        None,
    )
}

pub struct TauriWindow {
    window: WebviewWindow,
}

impl TauriWindow {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }

    fn scale_factor(&self) -> Result<f64, AppError> {
        self.window
            .scale_factor()
            .map_err(|error| window_error("read scale factor", error))
    }
}

impl WindowHandle for TauriWindow {
    fn position(&self) -> Result<Point, AppError> {
        let scale = self.scale_factor()?;
        let position = self
            .window
            .outer_position()
            .map_err(|error| window_error("read window position", error))?
            .to_logical::<i32>(scale);
        Ok(Point::new(position.x, position.y))
    }

    fn size(&self) -> Result<Size, AppError> {
        let scale = self.scale_factor()?;
        let size = self
            .window
            .outer_size()
            .map_err(|error| window_error("read window size", error))?
            .to_logical::<u32>(scale);
        Ok(Size::new(size.width, size.height))
    }

    fn set_position(&self, position: Point) -> Result<(), AppError> {
        self.window
            .set_position(Position::Logical(LogicalPosition::new(
                position.x as f64,
                position.y as f64,
            )))
            .map_err(|error| window_error("move window", error))
    }

    fn is_visible(&self) -> Result<bool, AppError> {
        self.window
            .is_visible()
            .map_err(|error| window_error("read window visibility", error))
    }

    fn show(&self) -> Result<(), AppError> {
        self.window
            .show()
            .map_err(|error| window_error("show window", error))
    }

    fn hide(&self) -> Result<(), AppError> {
        self.window
            .hide()
            .map_err(|error| window_error("hide window", error))
    }

    fn set_ignore_mouse_events(&self, ignore: bool) -> Result<(), AppError> {
        self.window
            .set_ignore_cursor_events(ignore)
            .map_err(|error| window_error("toggle click-through", error))
    }

    fn set_movable(&self, movable: bool) -> Result<(), AppError> {
        self.window
            .emit_to(self.window.label(), WINDOW_MOVABLE_EVENT, movable)
            .map_err(|error| window_error("toggle window dragging", error))
    }
}

pub struct TauriDisplays {
    app: AppHandle,
}

impl TauriDisplays {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl DisplaySource for TauriDisplays {
    fn displays(&self) -> Vec<Display> {
        let monitors = match self.app.available_monitors() {
            Ok(monitors) => monitors,
            Err(error) => {
                tracing::warn!("failed to enumerate displays: {error}");
                return Vec::new();
            }
        };
        monitors
            .iter()
            .enumerate()
            .map(|(index, monitor)| {
                let scale = monitor.scale_factor();
                let position = monitor.position().to_logical::<i32>(scale);
                let size = monitor.size().to_logical::<u32>(scale);
                let bounds = Rect::new(position.x, position.y, size.width, size.height);
                Display {
                    label: monitor
                        .name()
                        .cloned()
                        .unwrap_or_else(|| format!("Display {}", index + 1)),
                    bounds,
                    work_area: bounds,
                    scale_factor: scale,
                    size: Size::new(size.width, size.height),
                }
            })
            .collect()
    }
}
