pub mod acquire;
pub mod config;
pub mod error;
pub mod flatten;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod snapshot;
