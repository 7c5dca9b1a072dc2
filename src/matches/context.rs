use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::hall::HallLayout;
use crate::level::{Difficulty, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Canceled,
    Failed,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Running => "running",
            MatchStatus::Completed => "completed",
            MatchStatus::Canceled => "canceled",
            MatchStatus::Failed => "failed",
        }
    }

    fn rank(self) -> u8 {
        match self {
            MatchStatus::Pending => 0,
            MatchStatus::Scheduled => 1,
            MatchStatus::Running => 2,
            MatchStatus::Completed | MatchStatus::Canceled | MatchStatus::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 3
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-match execution context. Created at admission, dropped after cleanup;
/// outlives every bot of the match.
pub struct MatchContext {
    pub match_id: i64,
    pub bot_count: usize,
    pub start_time: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub hall_layout: Arc<HallLayout>,
    /// One level per bot, `bot_levels[i]` belongs to `user_id = -(i + 1)`.
    pub bot_levels: Vec<Level>,

    status: Mutex<MatchStatus>,
    cancel: CancellationToken,
    outstanding: AtomicUsize,
}

impl MatchContext {
    pub fn new(
        match_id: i64,
        bot_count: usize,
        start_time: DateTime<Utc>,
        difficulty: Difficulty,
        hall_layout: Arc<HallLayout>,
        bot_levels: Vec<Level>,
    ) -> Self {
        debug_assert_eq!(bot_levels.len(), bot_count);

        Self {
            match_id,
            bot_count,
            start_time,
            difficulty,
            hall_layout,
            bot_levels,
            status: Mutex::new(MatchStatus::Pending),
            cancel: CancellationToken::new(),
            outstanding: AtomicUsize::new(0),
        }
    }

    pub fn status(&self) -> MatchStatus {
        *self.status.lock()
    }

    /// Advances the status. Transitions only move forward; a stale or
    /// backwards write is dropped.
    pub fn set_status(&self, next: MatchStatus) {
        let mut status = self.status.lock();
        if status.is_terminal() || next.rank() < status.rank() {
            warn!(
                match_id = self.match_id,
                current = %status,
                requested = %next,
                "ignoring non-forward status transition"
            );
            return;
        }
        *status = next;
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the match: the scheduler wait and every bot observe this at
    /// their next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn bots_launched(&self, count: usize) {
        self.outstanding.store(count, Ordering::SeqCst);
    }

    pub(crate) fn bot_done(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of launched bots that have not yet terminated.
    pub fn outstanding_bots(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}
