use crate::domain::models::{AppError, Display, Point, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowName {
    Main,
    Timer,
    Region,
}

impl WindowName {
    pub fn label(self) -> &'static str {
        match self {
            WindowName::Main => "main",
            WindowName::Timer => "timer",
            WindowName::Region => "region",
        }
    }
}

/// Opaque handle to a UI window owned by the desktop layer.
///
/// Coordinates are logical (scale-independent) screen units.
pub trait WindowHandle: Send + Sync {
    fn position(&self) -> Result<Point, AppError>;
    fn size(&self) -> Result<Size, AppError>;
    fn set_position(&self, position: Point) -> Result<(), AppError>;
    fn is_visible(&self) -> Result<bool, AppError>;
    fn show(&self) -> Result<(), AppError>;
    fn hide(&self) -> Result<(), AppError>;
    /// Lets pointer events pass through to whatever is underneath.
    fn set_ignore_mouse_events(&self, ignore: bool) -> Result<(), AppError>;
    fn set_movable(&self, movable: bool) -> Result<(), AppError>;
}

pub trait DisplaySource: Send + Sync {
    fn displays(&self) -> Vec<Display>;
}

/// A display list fixed at construction; used when no windowing layer is attached.
pub struct FixedDisplays(pub Vec<Display>);

impl DisplaySource for FixedDisplays {
    fn displays(&self) -> Vec<Display> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct WindowRegistry {
    windows: RwLock<HashMap<WindowName, Arc<dyn WindowHandle>>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: WindowName, window: Arc<dyn WindowHandle>) {
        tracing::debug!("window registered: {}", name.label());
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, window);
    }

    pub fn unregister(&self, name: WindowName) -> Option<Arc<dyn WindowHandle>> {
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name)
    }

    pub fn get(&self, name: WindowName) -> Option<Arc<dyn WindowHandle>> {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .cloned()
    }

    pub fn require(&self, name: WindowName) -> Result<Arc<dyn WindowHandle>, AppError> {
        self.get(name).ok_or_else(|| {
            AppError::new(
                "WINDOW_NOT_FOUND",
                format!("window not registered: {}", name.label()),
                None,
            )
        })
    }

    /// The window only if it is registered and currently shown.
    pub fn visible(&self, name: WindowName) -> Option<Arc<dyn WindowHandle>> {
        let window = self.get(name)?;
        match window.is_visible() {
            Ok(true) => Some(window),
            Ok(false) => None,
            Err(error) => {
                tracing::warn!("failed to query visibility of {}: {error}", name.label());
                None
            }
        }
    }
}

/// Displays ordered left to right by horizontal origin; screen-capture device
/// numbering follows this order.
pub fn sorted_left_to_right(mut displays: Vec<Display>) -> Vec<Display> {
    displays.sort_by_key(|display| display.bounds.x);
    displays
}

/// The display containing `point`, or the closest one when the point is off-screen.
pub fn nearest_display(displays: &[Display], point: Point) -> Option<&Display> {
    displays
        .iter()
        .find(|display| display.bounds.contains(point))
        .or_else(|| {
            displays
                .iter()
                .min_by_key(|display| display.bounds.distance_sq(point))
        })
}

#[cfg(test)]
mod tests {
    use super::{nearest_display, sorted_left_to_right, WindowName, WindowRegistry};
    use crate::domain::models::Point;
    use crate::testing::{display, FakeWindow};
    use std::sync::Arc;

    #[test]
    fn nearest_display_prefers_containing_display() {
        let displays = vec![
            display("Left", -1920, 0, 1920, 1080, 1.0),
            display("Main", 0, 0, 1512, 982, 2.0),
        ];
        let found = nearest_display(&displays, Point::new(-10, 500)).unwrap();
        assert_eq!(found.label, "Left");
        let found = nearest_display(&displays, Point::new(1600, 100)).unwrap();
        assert_eq!(found.label, "Main");
        assert!(nearest_display(&[], Point::new(0, 0)).is_none());
    }

    #[test]
    fn displays_sort_by_horizontal_origin() {
        let sorted = sorted_left_to_right(vec![
            display("Main", 0, 0, 1512, 982, 2.0),
            display("Right", 1512, 0, 2560, 1440, 1.0),
            display("Left", -1920, 0, 1920, 1080, 1.0),
        ]);
        let labels = sorted.iter().map(|d| d.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["Left", "Main", "Right"]);
    }

    #[test]
    fn registry_reports_only_visible_windows() {
        let registry = WindowRegistry::new();
        let region = Arc::new(FakeWindow::new(Point::new(0, 0), 400, 300));
        registry.register(WindowName::Region, region.clone());
        assert!(registry.visible(WindowName::Region).is_none());
        region.set_visible(true);
        assert!(registry.visible(WindowName::Region).is_some());
        assert_eq!(
            registry.require(WindowName::Timer).err().unwrap().code,
            "WINDOW_NOT_FOUND"
        );
    }
}
