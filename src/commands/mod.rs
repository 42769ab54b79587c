pub mod recording;
pub mod settings;
pub mod windows;

/// Event channel for session start, stop, failure and status ticks.
pub const RECORDING_STATUS_CHANNEL: &str = "recording/status";
/// Event channel carrying the full settings snapshot after every write.
pub const SETTINGS_UPDATED_CHANNEL: &str = "settings/updated";
