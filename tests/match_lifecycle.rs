//! End-to-end lifecycle scenarios: admission through fan-out to cleanup,
//! against a scripted ticketing API and an in-memory layout bucket. All
//! timing runs on tokio's paused clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use stampede::client::{
    CaptchaRequest, DaySelectRequest, DaySelectResponse, HallLayoutStore, HeldSeat, ObjectStore,
    SeatConfirmRequest, SeatConfirmResponse, SeatHoldRequest, SeatHoldResponse, TicketingApi,
    TicketingError,
};
use stampede::error::AppError;
use stampede::level::Difficulty;
use stampede::matches::{HallId, LocalDateTime, MatchService, MatchSettingRequest, MatchStatus};
use stampede::pool::BotPool;
use stampede::signal::ReleaseRegistry;

// -----------------------
// Test collaborators
// -----------------------

#[derive(Default)]
struct MockTicketing {
    joins: AtomicUsize,
    captchas: AtomicUsize,
    holds: AtomicUsize,
    confirms: AtomicUsize,
}

#[async_trait]
impl TicketingApi for MockTicketing {
    async fn join_queue(
        &self,
        _match_id: i64,
        _req: &DaySelectRequest,
        _user_id: i64,
    ) -> Result<DaySelectResponse, TicketingError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        Ok(DaySelectResponse::default())
    }

    async fn validate_captcha(
        &self,
        _match_id: i64,
        _req: &CaptchaRequest,
    ) -> Result<(), TicketingError> {
        self.captchas.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn hold_seats(
        &self,
        _match_id: i64,
        _req: &SeatHoldRequest,
    ) -> Result<SeatHoldResponse, TicketingError> {
        self.holds.fetch_add(1, Ordering::SeqCst);
        Ok(SeatHoldResponse {
            success: true,
            held_seats: vec![HeldSeat::default()],
            failed_seats: vec![],
        })
    }

    async fn confirm_seats(
        &self,
        _match_id: i64,
        _req: &SeatConfirmRequest,
    ) -> Result<SeatConfirmResponse, TicketingError> {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        Ok(SeatConfirmResponse {
            success: true,
            ..Default::default()
        })
    }
}

struct MemObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemObjectStore {
    fn with_hall(hall_id: &str, rows: u32, cols: u32) -> Self {
        let layout = serde_json::json!({
            "hallId": hall_id,
            "sections": [
                {"sectionId": "1", "totalRows": rows, "totalCols": cols, "grade": "R", "unavailable": []},
            ],
        });
        let objects = HashMap::from([(
            format!("halls/{hall_id}/layout.json"),
            serde_json::to_vec(&layout).unwrap(),
        )]);
        Self {
            objects: Mutex::new(objects),
        }
    }
}

#[async_trait]
impl ObjectStore for MemObjectStore {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.objects
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such object: {key}"))
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

struct Harness {
    service: Arc<MatchService>,
    registry: Arc<ReleaseRegistry>,
    ticketing: Arc<MockTicketing>,
}

fn harness(pool_size: usize, rows: u32, cols: u32) -> Harness {
    let pool = Arc::new(BotPool::new(pool_size));
    let registry = Arc::new(ReleaseRegistry::new());
    let ticketing = Arc::new(MockTicketing::default());
    let layouts = Arc::new(HallLayoutStore::new(Arc::new(MemObjectStore::with_hall(
        "H1", rows, cols,
    ))));

    let service = Arc::new(MatchService::new(
        pool,
        Arc::clone(&registry),
        ticketing.clone(),
        layouts,
        Duration::from_secs(10),
        12345,
    ));

    Harness {
        service,
        registry,
        ticketing,
    }
}

fn request(bot_count: usize, start_in_secs: i64) -> MatchSettingRequest {
    MatchSettingRequest {
        bot_count,
        start_time: LocalDateTime(Utc::now() + chrono::Duration::seconds(start_in_secs)),
        difficulty: Difficulty::Easy,
        hall_id: HallId("H1".into()),
    }
}

/// Spins (on the paused clock) until `cond` holds.
async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..200_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for: {what}");
}

// -----------------------
// Scenarios
// -----------------------

#[tokio::test(start_paused = true)]
async fn small_happy_path_runs_to_completion_and_releases_the_pool() {
    let h = harness(10, 5, 5);

    h.service
        .set_bots_for_match(1, request(3, 11))
        .await
        .unwrap();

    assert_eq!(h.service.bot_count(), (10, 7));
    let ctx = h.service.get_match(1).expect("match must be registered");
    assert_eq!(ctx.status(), MatchStatus::Scheduled);

    // All three bots join the queue, then get released upstream.
    wait_until("all bots queued", || {
        h.ticketing.joins.load(Ordering::SeqCst) == 3
    })
    .await;
    assert_eq!(h.registry.len(), 3);

    for user_id in [-1, -2, -3] {
        h.registry.signal(1, user_id);
    }

    wait_until("match cleaned up", || h.service.active_matches() == 0).await;

    assert_eq!(ctx.status(), MatchStatus::Completed);
    assert_eq!(ctx.outstanding_bots(), 0);
    assert_eq!(h.service.bot_count(), (10, 10));
    assert!(h.service.get_match(1).is_none());
    assert!(h.registry.is_empty());

    assert_eq!(h.ticketing.captchas.load(Ordering::SeqCst), 3);
    assert_eq!(h.ticketing.holds.load(Ordering::SeqCst), 3);
    assert_eq!(h.ticketing.confirms.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn admission_fails_when_the_pool_runs_dry() {
    let h = harness(5, 5, 5);

    h.service
        .set_bots_for_match(1, request(3, 60))
        .await
        .unwrap();

    let err = h
        .service
        .set_bots_for_match(2, request(3, 60))
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientBots {
            requested,
            available,
        } => {
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    // The failed admission must not leak capacity.
    assert_eq!(h.service.bot_count(), (5, 2));
    assert!(h.service.get_match(2).is_none());
}

#[tokio::test(start_paused = true)]
async fn duplicate_match_is_rejected_without_leaking_capacity() {
    let h = harness(10, 5, 5);

    h.service
        .set_bots_for_match(42, request(3, 60))
        .await
        .unwrap();
    let before = h.service.bot_count();

    let err = h
        .service
        .set_bots_for_match(42, request(4, 60))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateMatch(42)));

    assert_eq!(h.service.bot_count(), before);
    assert_eq!(h.service.active_matches(), 1);
}

#[tokio::test(start_paused = true)]
async fn start_time_inside_the_grace_window_is_rejected() {
    let h = harness(10, 5, 5);

    for start_in in [-5, 0, 9] {
        let err = h
            .service
            .set_bots_for_match(1, request(3, start_in))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStartTime { .. }));
    }

    assert_eq!(h.service.bot_count(), (10, 10));
    assert!(h.service.get_match(1).is_none());
}

#[tokio::test(start_paused = true)]
async fn zero_bots_is_a_successful_noop() {
    let h = harness(10, 5, 5);

    h.service
        .set_bots_for_match(1, request(0, 60))
        .await
        .unwrap();

    assert_eq!(h.service.bot_count(), (10, 10));
    assert!(h.service.get_match(1).is_none());
}

#[tokio::test(start_paused = true)]
async fn unknown_hall_fails_admission_and_releases_capacity() {
    let h = harness(10, 5, 5);

    let mut req = request(3, 60);
    req.hall_id = HallId("missing".into());

    let err = h.service.set_bots_for_match(1, req).await.unwrap_err();
    assert!(matches!(err, AppError::LayoutLoad(_)));
    assert_eq!(h.service.bot_count(), (10, 10));
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_flight_stops_bots_before_seat_holds() {
    let h = harness(10, 5, 5);

    h.service
        .set_bots_for_match(1, request(10, 15))
        .await
        .unwrap();
    let ctx = h.service.get_match(1).unwrap();

    // Let the match start and every bot park on its release gate.
    wait_until("all bots queued", || {
        h.ticketing.joins.load(Ordering::SeqCst) == 10
    })
    .await;

    ctx.cancel();

    wait_until("match cleaned up", || h.service.active_matches() == 0).await;

    // No bot got past its gate, so no seat was ever touched.
    assert_eq!(h.ticketing.holds.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.outstanding_bots(), 0);
    assert_eq!(h.service.bot_count(), (10, 10));
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_start_launches_no_bots() {
    let h = harness(10, 5, 5);

    h.service
        .set_bots_for_match(1, request(5, 3600))
        .await
        .unwrap();
    let ctx = h.service.get_match(1).unwrap();

    ctx.cancel();
    wait_until("match cleaned up", || h.service.active_matches() == 0).await;

    assert_eq!(h.ticketing.joins.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.status(), MatchStatus::Failed);
    assert_eq!(h.service.bot_count(), (10, 10));
}

#[tokio::test(start_paused = true)]
async fn shutdown_rejects_new_admissions_and_drains_matches() {
    let h = harness(10, 5, 5);

    h.service
        .set_bots_for_match(1, request(4, 3600))
        .await
        .unwrap();

    h.service.begin_shutdown();

    let err = h
        .service
        .set_bots_for_match(2, request(1, 3600))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ShuttingDown));

    wait_until("matches drained", || h.service.active_matches() == 0).await;
    assert_eq!(h.service.bot_count(), (10, 10));
}

#[tokio::test(start_paused = true)]
async fn pool_balance_tracks_registered_matches_across_many_admissions() {
    let h = harness(100, 10, 10);

    let mut registered = 0;
    for (id, count) in [(1i64, 30usize), (2, 30), (3, 30), (4, 30)] {
        match h.service.set_bots_for_match(id, request(count, 3600)).await {
            Ok(()) => registered += count,
            Err(AppError::InsufficientBots { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }

        let (total, available) = h.service.bot_count();
        assert_eq!(available, total - registered);
    }

    // 3 x 30 fit into 100; the fourth is refused.
    assert_eq!(registered, 90);
    assert_eq!(h.service.active_matches(), 3);
}
