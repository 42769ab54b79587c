pub mod devices;
pub mod region;
pub mod session;
pub mod settings;
