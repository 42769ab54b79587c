pub mod command;
pub mod recording;
pub mod termination;
