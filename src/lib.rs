pub mod commands;
pub mod core;
pub mod domain;
pub mod infra;
pub mod state;

#[cfg(feature = "desktop")]
mod desktop;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(test)]
pub(crate) mod testing;
