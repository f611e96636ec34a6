//! Process wiring: logging setup and the long-running jobs.
pub mod jobs;
pub mod logging;
