use thiserror::Error;

use crate::client::LayoutError;

/// Admission-level failures surfaced synchronously to the caller.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not enough bots available (requested: {requested}, available: {available})")]
    InsufficientBots { requested: usize, available: usize },

    #[error("match {0} already exists")]
    DuplicateMatch(i64),

    #[error("start time must be at least {min_lead_secs}s in the future")]
    InvalidStartTime { min_lead_secs: u64 },

    #[error("failed to load hall layout")]
    LayoutLoad(#[source] LayoutError),

    #[error("server is shutting down; not accepting new matches")]
    ShuttingDown,
}
