//! Per-bot purchase state machine.
//!
//! Each bot walks the four-phase protocol in strict order:
//!
//! 1. day select: linger on the date screen, then join the queue
//! 2. await release: block on the one-shot gate fired by the event stream
//! 3. captcha: linger, then validate
//! 4. seat select + confirm: walk the planned target list until a hold
//!    sticks, then finalize
//!
//! Cancellation is observed at every sleep and before every outbound call.
//! A canceled or failed bot is an outcome, not a controller error: the
//! controller logs it and only counts completions.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{
    CaptchaRequest, DaySelectRequest, SeatConfirmRequest, SeatHoldRequest, SeatInfo, TicketingApi,
    TicketingError,
};
use crate::hall::{self, Grade};
use crate::level::{DelayConfig, Level};

/// Terminal outcome of a bot that did not confirm seats.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("day select failed: {0}")]
    DaySelect(#[source] TicketingError),

    #[error("captcha validation failed: {0}")]
    Captcha(#[source] TicketingError),

    #[error("no target seats assigned")]
    NoTargetSeats,

    #[error("all {attempts} target seats failed")]
    AllSeatsFailed { attempts: usize },

    #[error("seat confirm failed: {0}")]
    Confirm(#[source] TicketingError),

    #[error("bot canceled")]
    Canceled,
}

/// One entry of a bot's priority-ordered seat plan. `total_cols` is carried
/// from the section so the retry loop never re-reads the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSeat {
    pub section_id: String,
    pub seat_number: u32,
    pub total_cols: u32,
    pub grade: Grade,
}

pub struct Bot {
    /// Negative by convention (`-(index + 1)`) so the ticketing API can tell
    /// bots from real users.
    pub user_id: i64,
    pub match_id: i64,
    pub level: Level,
    pub delay: DelayConfig,
    pub target_seats: Vec<TargetSeat>,
    client: Arc<dyn TicketingApi>,
    release: oneshot::Receiver<()>,
    cancel: CancellationToken,
}

impl Bot {
    pub fn new(
        user_id: i64,
        match_id: i64,
        level: Level,
        client: Arc<dyn TicketingApi>,
        release: oneshot::Receiver<()>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            user_id,
            match_id,
            level,
            delay: level.delay_config(),
            target_seats: Vec::new(),
            client,
            release,
            cancel,
        }
    }

    pub async fn run(mut self) -> Result<(), BotError> {
        let started = std::time::Instant::now();
        debug!(
            user_id = self.user_id,
            match_id = self.match_id,
            level = self.level.as_str(),
            "bot started"
        );

        self.select_day().await?;
        self.await_release().await?;
        self.solve_captcha().await?;
        self.select_seat().await?;
        self.confirm_seats().await?;

        info!(
            user_id = self.user_id,
            match_id = self.match_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bot finished"
        );
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), BotError> {
        if self.cancel.is_cancelled() {
            return Err(BotError::Canceled);
        }
        Ok(())
    }

    async fn sleep_checked(&self, duration: Duration) -> Result<(), BotError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(BotError::Canceled),
        }
    }

    /// Phase 1: linger on the date screen, then join the waiting queue.
    async fn select_day(&self) -> Result<(), BotError> {
        let delay = self.delay.day_delay();
        self.sleep_checked(delay).await?;
        self.ensure_live()?;

        let req = DaySelectRequest {
            click_miss: 0,
            duration: delay.as_millis() as u64,
        };
        self.client
            .join_queue(self.match_id, &req, self.user_id)
            .await
            .map_err(BotError::DaySelect)?;

        debug!(
            user_id = self.user_id,
            duration_ms = req.duration,
            "day selected; queued"
        );
        Ok(())
    }

    /// Phase 2: block until the event stream releases this user from the
    /// upstream queue.
    async fn await_release(&mut self) -> Result<(), BotError> {
        debug!(user_id = self.user_id, "waiting for queue release");

        tokio::select! {
            received = &mut self.release => match received {
                Ok(()) => {
                    debug!(user_id = self.user_id, "release signal received");
                    Ok(())
                }
                // Sender dropped: the registry entry was torn down under us.
                Err(_) => Err(BotError::Canceled),
            },
            _ = self.cancel.cancelled() => Err(BotError::Canceled),
        }
    }

    /// Phase 3: linger over the captcha, then validate.
    async fn solve_captcha(&self) -> Result<(), BotError> {
        self.sleep_checked(self.delay.captcha_delay()).await?;
        self.ensure_live()?;

        let req = CaptchaRequest {
            user_id: self.user_id,
        };
        self.client
            .validate_captcha(self.match_id, &req)
            .await
            .map_err(BotError::Captcha)?;

        debug!(user_id = self.user_id, "captcha passed");
        Ok(())
    }

    /// Phase 4: walk the target list in priority order until a hold sticks.
    async fn select_seat(&self) -> Result<(), BotError> {
        if self.target_seats.is_empty() {
            return Err(BotError::NoTargetSeats);
        }

        let total = self.target_seats.len();
        for (attempt, seat) in self.target_seats.iter().enumerate() {
            self.ensure_live()?;
            self.sleep_checked(self.delay.seat_delay()).await?;

            let (row, col) = hall::to_row_col(seat.seat_number, seat.total_cols);

            let section_id: i64 = match seat.section_id.parse() {
                Ok(n) => n,
                Err(err) => {
                    warn!(
                        user_id = self.user_id,
                        section = %seat.section_id,
                        %err,
                        "section id is not numeric; skipping candidate"
                    );
                    self.retry_pause(attempt, total).await?;
                    continue;
                }
            };

            let req = SeatHoldRequest {
                user_id: self.user_id,
                seats: vec![SeatInfo {
                    section_id,
                    row,
                    col,
                    grade: seat.grade,
                }],
                total_seats: 0,
            };

            match self.client.hold_seats(self.match_id, &req).await {
                Ok(resp) if resp.success && !resp.held_seats.is_empty() => {
                    info!(
                        user_id = self.user_id,
                        attempt = attempt + 1,
                        section = %seat.section_id,
                        seat_number = seat.seat_number,
                        row,
                        col,
                        held = resp.held_seats.len(),
                        "seat held"
                    );
                    return Ok(());
                }
                Ok(resp) => {
                    debug!(
                        user_id = self.user_id,
                        attempt = attempt + 1,
                        section = %seat.section_id,
                        seat_number = seat.seat_number,
                        failed = resp.failed_seats.len(),
                        "seat hold rejected; trying next candidate"
                    );
                }
                Err(err) => {
                    warn!(
                        user_id = self.user_id,
                        attempt = attempt + 1,
                        section = %seat.section_id,
                        seat_number = seat.seat_number,
                        %err,
                        "seat hold call failed; trying next candidate"
                    );
                }
            }

            self.retry_pause(attempt, total).await?;
        }

        Err(BotError::AllSeatsFailed { attempts: total })
    }

    /// Level-specific pause before the next candidate; skipped after the
    /// last one.
    async fn retry_pause(&self, attempt: usize, total: usize) -> Result<(), BotError> {
        if attempt + 1 < total {
            self.sleep_checked(self.level.retry_delay()).await?;
        }
        Ok(())
    }

    /// Phase 5: finalize. The response's own success flag is logged, not
    /// gated on; the upstream is authoritative about what was confirmed.
    async fn confirm_seats(&self) -> Result<(), BotError> {
        self.ensure_live()?;

        let req = SeatConfirmRequest {
            user_id: self.user_id,
            ..Default::default()
        };
        let resp = self
            .client
            .confirm_seats(self.match_id, &req)
            .await
            .map_err(BotError::Confirm)?;

        info!(
            user_id = self.user_id,
            success = resp.success,
            message = %resp.message,
            user_rank = resp.user_rank,
            confirmed = resp.confirmed_seats.len(),
            "seats confirmed"
        );
        Ok(())
    }
}
