use parking_lot::Mutex;

use crate::error::AppError;

/// Process-wide bot-slot accountant.
///
/// Admission acquires slots before a match is registered and cleanup releases
/// them; the acquire decision and the decrement are atomic under one mutex so
/// concurrent admissions can never oversubscribe the pool.
pub struct BotPool {
    total: usize,
    available: Mutex<usize>,
}

impl BotPool {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            available: Mutex::new(total),
        }
    }

    /// Consistent `(total, available)` snapshot.
    pub fn get(&self) -> (usize, usize) {
        (self.total, *self.available.lock())
    }

    pub fn acquire(&self, count: usize) -> Result<(), AppError> {
        let mut available = self.available.lock();
        if *available < count {
            return Err(AppError::InsufficientBots {
                requested: count,
                available: *available,
            });
        }
        *available -= count;
        Ok(())
    }

    /// Releases `count` slots. Paired with an earlier `acquire`; no upper
    /// bound is enforced.
    pub fn release(&self, count: usize) {
        *self.available.lock() += count;
    }
}
