pub mod listing;
pub mod service;
