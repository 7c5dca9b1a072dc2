//! Per-bot release gates.
//!
//! Each bot of a running match waits on a one-shot signal keyed by
//! `"{match_id}:{user_id}"`. The controller registers every signal before
//! launching any bot; the event consumer fires them as the upstream queue
//! releases users; the controller removes each entry when its bot exits.
//! Removal has exactly one site so fire/remove can never race.

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::warn;

enum SignalSlot {
    Armed(oneshot::Sender<()>),
    Fired,
}

/// Concurrent registry of release gates, sized for the process-wide bot cap.
#[derive(Default)]
pub struct ReleaseRegistry {
    slots: DashMap<String, SignalSlot>,
}

impl ReleaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(match_id: i64, user_id: i64) -> String {
        format!("{match_id}:{user_id}")
    }

    /// Creates a fresh unfired signal and returns its receive side. An
    /// existing entry under the same key is replaced.
    pub fn register(&self, match_id: i64, user_id: i64) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.slots
            .insert(Self::key(match_id, user_id), SignalSlot::Armed(tx));
        rx
    }

    /// Fires the signal for `(match_id, user_id)`. Late or duplicate signals
    /// are dropped with a warning; the entry itself stays until the owning
    /// bot exits.
    pub fn signal(&self, match_id: i64, user_id: i64) {
        let key = Self::key(match_id, user_id);
        let Some(mut entry) = self.slots.get_mut(&key) else {
            warn!(match_id, user_id, "release signal for unknown bot; dropping");
            return;
        };

        match std::mem::replace(entry.value_mut(), SignalSlot::Fired) {
            SignalSlot::Armed(tx) => {
                // The receiver may already be gone if the bot failed early.
                let _ = tx.send(());
            }
            SignalSlot::Fired => {
                warn!(match_id, user_id, "duplicate release signal; ignoring");
            }
        }
    }

    /// Removes the entry regardless of fired/unfired state.
    pub fn remove(&self, match_id: i64, user_id: i64) {
        self.slots.remove(&Self::key(match_id, user_id));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
