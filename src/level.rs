//! Skill-level model.
//!
//! A level fixes the timing personality of a bot: how long it lingers on
//! each protocol phase, how quickly it retries a lost seat, how noisy its
//! seat preferences are, and how many target candidates it plans. All
//! mappings are pure functions of the level.

use std::time::Duration;

use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Beginner,
    Expert,
    Pro,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Expert => "expert",
            Level::Pro => "pro",
        }
    }

    pub fn delay_config(self) -> DelayConfig {
        match self {
            Level::Beginner => DelayConfig {
                select_day_base: 2000,
                select_day_variance: 400,
                captcha_base: 15000,
                captcha_variance: 3000,
                select_seat_base: 5000,
                select_seat_variance: 3000,
            },
            Level::Expert => DelayConfig {
                select_day_base: 1300,
                select_day_variance: 300,
                captcha_base: 10000,
                captcha_variance: 2000,
                select_seat_base: 4000,
                select_seat_variance: 1000,
            },
            Level::Pro => DelayConfig {
                select_day_base: 800,
                select_day_variance: 100,
                captcha_base: 6500,
                captcha_variance: 1500,
                select_seat_base: 2500,
                select_seat_variance: 500,
            },
        }
    }

    /// Pause between seat-hold attempts.
    pub fn retry_delay(self) -> Duration {
        match self {
            Level::Beginner => Duration::from_millis(300),
            Level::Expert => Duration::from_millis(100),
            Level::Pro => Duration::from_millis(50),
        }
    }

    /// Upper bound of the random score jitter the planner adds per seat.
    /// Beginners are close to random; pros pick consistently.
    pub fn jitter_range(self) -> f64 {
        match self {
            Level::Beginner => 50.0,
            Level::Expert => 15.0,
            Level::Pro => 5.0,
        }
    }

    /// How many target seats the planner lines up.
    pub fn candidate_count(self) -> usize {
        match self {
            Level::Beginner => 4,
            Level::Expert => 3,
            Level::Pro => 3,
        }
    }
}

/// Per-phase delay parameters, all in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct DelayConfig {
    pub select_day_base: u64,
    pub select_day_variance: u64,
    pub captcha_base: u64,
    pub captcha_variance: u64,
    pub select_seat_base: u64,
    pub select_seat_variance: u64,
}

impl DelayConfig {
    /// Uniform draw from `[base - variance, base + variance]` milliseconds.
    pub fn random_delay(base: u64, variance: u64) -> Duration {
        let lo = base.saturating_sub(variance);
        let hi = base + variance;
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    pub fn day_delay(&self) -> Duration {
        Self::random_delay(self.select_day_base, self.select_day_variance)
    }

    pub fn captcha_delay(&self) -> Duration {
        Self::random_delay(self.captcha_base, self.captcha_variance)
    }

    pub fn seat_delay(&self) -> Duration {
        Self::random_delay(self.select_seat_base, self.select_seat_variance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Level mix of a cohort, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    pub beginner: u32,
    pub expert: u32,
    pub pro: u32,
}

impl Difficulty {
    pub fn distribution(self) -> Distribution {
        match self {
            Difficulty::Easy => Distribution {
                beginner: 70,
                expert: 20,
                pro: 10,
            },
            Difficulty::Medium => Distribution {
                beginner: 30,
                expert: 50,
                pro: 20,
            },
            Difficulty::Hard => Distribution {
                beginner: 10,
                expert: 30,
                pro: 60,
            },
        }
    }
}

/// Builds the level cohort for one match: floored percentage counts for
/// beginner and expert, the remainder goes to pro, then a seeded uniform
/// shuffle so positions are mixed but reproducible.
pub fn generate_levels(difficulty: Difficulty, count: usize, seed: u64) -> Vec<Level> {
    let dist = difficulty.distribution();

    let beginner_count = count * dist.beginner as usize / 100;
    let expert_count = count * dist.expert as usize / 100;
    let pro_count = count - beginner_count - expert_count;

    let mut levels = Vec::with_capacity(count);
    levels.extend(std::iter::repeat_n(Level::Beginner, beginner_count));
    levels.extend(std::iter::repeat_n(Level::Expert, expert_count));
    levels.extend(std::iter::repeat_n(Level::Pro, pro_count));

    let mut rng = SmallRng::seed_from_u64(seed);
    levels.shuffle(&mut rng);
    levels
}
