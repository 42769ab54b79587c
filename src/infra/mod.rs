pub mod config;
pub mod events;
pub mod ffmpeg;
pub mod logging;
pub mod platform;
pub mod window;
