//! Periodic background jobs that run independently of message traffic.

mod history_upload;
mod model_update;
mod runner;

pub use history_upload::HistoryUploadJob;
pub use model_update::{ModelUpdateJob, model_update_announcement};
pub use runner::{PeriodicJobOutcome, ScheduledJob, run_periodic_job};
