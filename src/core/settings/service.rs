use crate::domain::models::{AppError, RecordingSettings, SettingsPatch};
use crate::infra::events::{ObserverId, ObserverList};
use std::sync::{Mutex, PoisonError};

/// The single mutable recording configuration, broadcast on every write.
pub struct SettingsStore {
    current: Mutex<RecordingSettings>,
    observers: ObserverList<RecordingSettings>,
}

impl SettingsStore {
    pub fn new(initial: RecordingSettings) -> Self {
        Self {
            current: Mutex::new(initial),
            observers: ObserverList::new(),
        }
    }

    pub fn get(&self) -> RecordingSettings {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the snapshot as-is. `None` is ignored and not broadcast.
    pub fn set(&self, next: Option<RecordingSettings>) -> bool {
        let Some(next) = next else {
            return false;
        };
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = next.clone();
        self.observers.notify(&next);
        true
    }

    /// Merges `patch` into the current snapshot and writes it only if the
    /// merged result is valid.
    pub fn patch(&self, patch: SettingsPatch) -> Result<RecordingSettings, AppError> {
        let merged = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            let mut merged = current.clone();
            patch.apply_to(&mut merged);
            validate_settings(&merged)?;
            *current = merged.clone();
            merged
        };
        self.observers.notify(&merged);
        Ok(merged)
    }

    /// Applies `change` atomically and broadcasts the result.
    pub fn update<F>(&self, change: F) -> RecordingSettings
    where
        F: FnOnce(&mut RecordingSettings),
    {
        let updated = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            change(&mut current);
            current.clone()
        };
        self.observers.notify(&updated);
        updated
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&RecordingSettings) + Send + Sync + 'static,
    {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }
}

pub fn validate_settings(settings: &RecordingSettings) -> Result<(), AppError> {
    let invalid = |message: String| {
        Err(AppError::new(
            "INVALID_CONFIGURATION",
            message,
            Some("adjust the recording settings and try again".to_string()),
        ))
    };
    if !settings.output_path.is_absolute() {
        return invalid(format!(
            "output path must be absolute: {}",
            settings.output_path.display()
        ));
    }
    if settings.fps == 0 {
        return invalid("fps must be greater than zero".to_string());
    }
    if settings.scale.w == 0 || settings.scale.h == 0 {
        return invalid("output scale must be non-zero".to_string());
    }
    if settings.crop.w == 0 || settings.crop.h == 0 {
        return invalid("capture region must be non-zero".to_string());
    }
    if let Some(geometry) = settings.video.as_ref().and_then(|video| video.geometry.as_ref()) {
        if settings.crop.w > geometry.scale_max.width || settings.crop.h > geometry.scale_max.height {
            return invalid(format!(
                "capture region {}x{} exceeds display {}x{}",
                settings.crop.w,
                settings.crop.h,
                geometry.scale_max.width,
                geometry.scale_max.height
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SettingsStore;
    use crate::domain::models::{FrameSize, RecordingSettings, SettingsPatch};
    use crate::testing::screen_device;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn store() -> SettingsStore {
        SettingsStore::new(RecordingSettings::new(
            PathBuf::from("/tmp/RegionRec"),
            30,
            FrameSize::new(1920, 1080),
        ))
    }

    fn counting(store: &SettingsStore) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hits
    }

    #[test]
    fn set_none_is_a_silent_no_op() {
        let store = store();
        let hits = counting(&store);
        let before = store.get();
        assert!(!store.set(None));
        assert_eq!(store.get(), before);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn set_broadcasts_without_validation() {
        let store = store();
        let hits = counting(&store);
        let mut next = store.get();
        next.fps = 0;
        assert!(store.set(Some(next)));
        assert_eq!(store.get().fps, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn patch_rejects_crop_beyond_display() {
        let store = store();
        let hits = counting(&store);
        store
            .patch(SettingsPatch {
                video: Some(screen_device(1, "Main", 0, 0, 1512, 982, 2.0)),
                ..SettingsPatch::default()
            })
            .unwrap();
        let error = store
            .patch(SettingsPatch {
                crop: Some(FrameSize::new(4000, 1000)),
                ..SettingsPatch::default()
            })
            .unwrap_err();
        assert_eq!(error.code, "INVALID_CONFIGURATION");
        assert_eq!(store.get().crop, FrameSize::new(1920, 1080));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn patch_rejects_zero_fps() {
        let store = store();
        let error = store
            .patch(SettingsPatch {
                fps: Some(0),
                ..SettingsPatch::default()
            })
            .unwrap_err();
        assert_eq!(error.code, "INVALID_CONFIGURATION");
        assert_eq!(store.get().fps, 30);
    }

    #[test]
    fn unsubscribed_observer_is_not_notified() {
        let store = store();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        store.update(|settings| settings.fps = 60);
        assert!(store.unsubscribe(id));
        store.update(|settings| settings.fps = 24);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.get().fps, 24);
    }
}
