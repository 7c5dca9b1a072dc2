use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule canceled before start")]
    Canceled,
}

/// Suspends until `start_time`, then runs `task` to completion and returns
/// its output. A start instant in the past runs the task immediately.
///
/// Cancellation only wins the race while waiting: once the instant is
/// reached the task future is not raced against the token (the task observes
/// cancellation itself at its own suspension points).
pub async fn schedule_at<F, Fut, T>(
    cancel: &CancellationToken,
    start_time: DateTime<Utc>,
    task: F,
) -> Result<T, ScheduleError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let delay = (start_time - Utc::now()).to_std().unwrap_or(Duration::ZERO);

    if !delay.is_zero() {
        info!(
            start_time = %start_time,
            delay_ms = delay.as_millis() as u64,
            "waiting for start instant"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                info!("schedule canceled before start");
                return Err(ScheduleError::Canceled);
            }
        }
    }

    Ok(task().await)
}
