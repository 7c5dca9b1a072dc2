//! Match lifecycle controller.
//!
//! Responsibilities:
//! - Admission: validate the request, acquire pool capacity, fetch the hall
//!   layout, compose the level cohort and register the match.
//! - Scheduling: one detached task per match suspends until the start
//!   instant, then fans the cohort out.
//! - Run: create bots, register every release gate and assign every seat
//!   plan before any bot launches, then await all of them.
//! - Cleanup: deregister and release pool capacity on every termination
//!   path, idempotently.
//!
//! Non-responsibilities:
//! - HTTP binding (the embedding server calls into this type).
//! - Driving the purchase protocol (each bot owns its own state machine).
//!
//! The match map lock is never held across I/O; the layout fetch happens
//! between the duplicate pre-check and the install re-check.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::bot::Bot;
use crate::client::{HallLayoutStore, TicketingApi};
use crate::error::AppError;
use crate::level::generate_levels;
use crate::logger::warn_if_slow;
use crate::matches::context::{MatchContext, MatchStatus};
use crate::matches::types::MatchSettingRequest;
use crate::planner;
use crate::pool::BotPool;
use crate::scheduler::{self, ScheduleError};
use crate::signal::ReleaseRegistry;

pub struct MatchService {
    matches: Mutex<HashMap<i64, Arc<MatchContext>>>,
    pool: Arc<BotPool>,
    registry: Arc<ReleaseRegistry>,
    ticketing: Arc<dyn TicketingApi>,
    layouts: Arc<HallLayoutStore>,

    /// Minimum admission-to-start gap; guarantees planning finishes before
    /// the scheduled instant.
    admission_grace: Duration,

    /// Base for the per-match cohort and planner seeds.
    base_seed: u64,

    accepting: AtomicBool,
}

impl MatchService {
    pub fn new(
        pool: Arc<BotPool>,
        registry: Arc<ReleaseRegistry>,
        ticketing: Arc<dyn TicketingApi>,
        layouts: Arc<HallLayoutStore>,
        admission_grace: Duration,
        base_seed: u64,
    ) -> Self {
        Self {
            matches: Mutex::new(HashMap::new()),
            pool,
            registry,
            ticketing,
            layouts,
            admission_grace,
            base_seed,
            accepting: AtomicBool::new(true),
        }
    }

    /// `(total, available)` slots of the bot pool.
    pub fn bot_count(&self) -> (usize, usize) {
        self.pool.get()
    }

    pub fn get_match(&self, match_id: i64) -> Option<Arc<MatchContext>> {
        self.matches.lock().get(&match_id).cloned()
    }

    pub fn active_matches(&self) -> usize {
        self.matches.lock().len()
    }

    fn seed_for(&self, match_id: i64) -> u64 {
        self.base_seed ^ match_id as u64
    }

    /// Admits a match: on success the caller gets an immediate answer and a
    /// detached task owns the rest of the lifecycle.
    #[instrument(skip(self, req), fields(bot_count = req.bot_count))]
    pub async fn set_bots_for_match(
        self: &Arc<Self>,
        match_id: i64,
        req: MatchSettingRequest,
    ) -> Result<(), AppError> {
        if req.bot_count == 0 {
            info!("zero bots requested; nothing to schedule");
            return Ok(());
        }

        if !self.accepting.load(Ordering::Acquire) {
            return Err(AppError::ShuttingDown);
        }

        let start_time = req.start_time.0;
        let earliest = Utc::now()
            + chrono::Duration::from_std(self.admission_grace)
                .unwrap_or_else(|_| chrono::Duration::zero());
        if start_time < earliest {
            return Err(AppError::InvalidStartTime {
                min_lead_secs: self.admission_grace.as_secs(),
            });
        }

        self.pool.acquire(req.bot_count)?;

        // Cheap duplicate pre-check so a duplicate never pays a layout fetch.
        if self.matches.lock().contains_key(&match_id) {
            self.pool.release(req.bot_count);
            return Err(AppError::DuplicateMatch(match_id));
        }

        let layout = match warn_if_slow("hall_layout_fetch", Duration::from_secs(2), async {
            self.layouts.get_hall_layout(req.hall_id.as_str()).await
        })
        .await
        {
            Ok(layout) => Arc::new(layout),
            Err(err) => {
                self.pool.release(req.bot_count);
                return Err(AppError::LayoutLoad(err));
            }
        };

        let levels = generate_levels(req.difficulty, req.bot_count, self.seed_for(match_id));
        let ctx = Arc::new(MatchContext::new(
            match_id,
            req.bot_count,
            start_time,
            req.difficulty,
            layout,
            levels,
        ));

        {
            let mut matches = self.matches.lock();
            // Re-check: another admission of the same id may have won the
            // race while the layout was loading.
            if matches.contains_key(&match_id) {
                drop(matches);
                self.pool.release(req.bot_count);
                return Err(AppError::DuplicateMatch(match_id));
            }
            matches.insert(match_id, ctx.clone());
        }

        ctx.set_status(MatchStatus::Scheduled);
        info!(
            start_time = %start_time,
            difficulty = ?req.difficulty,
            hall_id = %req.hall_id,
            "match registered"
        );

        let service = Arc::clone(self);
        tokio::spawn(async move {
            let token = ctx.cancel_token();
            let outcome =
                scheduler::schedule_at(&token, ctx.start_time, || service.run_match(&ctx)).await;

            match outcome {
                Ok(()) => {
                    ctx.set_status(MatchStatus::Completed);
                    info!(match_id = ctx.match_id, "match completed");
                }
                Err(ScheduleError::Canceled) => {
                    ctx.set_status(MatchStatus::Failed);
                    warn!(match_id = ctx.match_id, "match canceled before start");
                }
            }

            service.cleanup(ctx.match_id);
        });

        Ok(())
    }

    /// Runs one match to completion: full wiring first, then fan-out, then
    /// wait for every bot to terminate.
    #[instrument(skip(self, ctx), fields(match_id = ctx.match_id, bot_count = ctx.bot_count))]
    async fn run_match(&self, ctx: &Arc<MatchContext>) {
        ctx.set_status(MatchStatus::Running);
        info!("starting bots");

        let token = ctx.cancel_token();

        // Every bot exists, has its release gate registered and its seat
        // plan assigned before any of them launches, so no bot can ever
        // observe its own gate missing.
        let mut bots: Vec<Bot> = (0..ctx.bot_count)
            .map(|i| {
                let user_id = -((i as i64) + 1);
                let release = self.registry.register(ctx.match_id, user_id);
                Bot::new(
                    user_id,
                    ctx.match_id,
                    ctx.bot_levels[i],
                    Arc::clone(&self.ticketing),
                    release,
                    token.child_token(),
                )
            })
            .collect();

        planner::assign_target_seats(
            &mut bots,
            &ctx.hall_layout,
            self.seed_for(ctx.match_id).wrapping_add(1),
        );

        ctx.bots_launched(ctx.bot_count);

        let mut tasks = JoinSet::new();
        for bot in bots {
            let registry = Arc::clone(&self.registry);
            let ctx = Arc::clone(ctx);
            tasks.spawn(async move {
                let match_id = bot.match_id;
                let user_id = bot.user_id;

                let outcome = bot.run().await;

                // Single removal site for the release gate.
                registry.remove(match_id, user_id);
                ctx.bot_done();

                if let Err(err) = outcome {
                    warn!(match_id, user_id, %err, "bot failed");
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(%err, "bot task aborted");
            }
        }

        info!("all bots finished");
    }

    /// Deregisters the match and returns its slots to the pool. Safe to call
    /// more than once; only the call that removes the entry releases.
    fn cleanup(&self, match_id: i64) {
        let removed = self.matches.lock().remove(&match_id);

        if let Some(ctx) = removed {
            self.pool.release(ctx.bot_count);
            debug!(match_id, "match cleaned up");
        }
    }

    /// Stops admissions and cancels every registered match. In-flight bots
    /// observe the cancellation at their next suspension point; cleanup runs
    /// through the normal lifecycle path.
    pub fn begin_shutdown(&self) {
        self.accepting.store(false, Ordering::Release);

        let contexts: Vec<_> = self.matches.lock().values().cloned().collect();
        info!(matches = contexts.len(), "shutdown initiated; canceling matches");
        for ctx in contexts {
            ctx.cancel();
        }
    }
}
