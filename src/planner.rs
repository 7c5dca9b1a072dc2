//! Seat planner.
//!
//! Before a match starts, every bot gets a priority-ordered list of target
//! seats derived from the venue layout and its skill level:
//!
//! - sections are ranked by their parsed decimal id (1000-point component,
//!   weighted by level), rows front-to-back (100 points), columns by
//!   distance from centre (50 points)
//! - a per-seat random jitter scaled by the level blurs the ranking, so
//!   beginners scatter while pros converge on the best block
//! - bots are served in descending level order and first choices are unique
//!   across the match; lower-ranked candidates may overlap
//!
//! The RNG is seeded per match so a given `(layout, cohort)` always plans
//! identically.

use std::collections::{HashMap, HashSet};

use rand::prelude::*;
use rand::rngs::SmallRng;

use crate::bot::{Bot, TargetSeat};
use crate::hall::{self, HallLayout, ReachableSeat};
use crate::level::Level;

/// Section id that failed to parse as a decimal numeral; ranks below every
/// real section.
const UNPARSED_SECTION_RANK: u32 = 999;

struct SectionMeta {
    rank: u32,
    total_rows: u32,
    total_cols: u32,
}

pub struct SeatPlanner<'a> {
    layout: &'a HallLayout,
    sections: HashMap<String, SectionMeta>,
    rng: SmallRng,
}

impl<'a> SeatPlanner<'a> {
    pub fn new(layout: &'a HallLayout, seed: u64) -> Self {
        let sections = layout
            .sections
            .iter()
            .map(|s| {
                (
                    s.section_id.clone(),
                    SectionMeta {
                        rank: s.section_id.parse().unwrap_or(UNPARSED_SECTION_RANK),
                        total_rows: s.total_rows,
                        total_cols: s.total_cols,
                    },
                )
            })
            .collect();

        Self {
            layout,
            sections,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Base preference score of one seat for one level, before jitter.
    pub fn score_seat(&self, seat: &ReachableSeat, level: Level) -> f64 {
        let Some(meta) = self.sections.get(&seat.section_id) else {
            return 0.0;
        };

        let (row, col) = hall::to_row_col(seat.seat_number, meta.total_cols);

        // Section component, 1000 points: rank 1 scores full marks, the last
        // section zero.
        let total_sections = self.layout.sections.len();
        let section_score = if total_sections > 1 {
            1000.0 * (1.0 - (meta.rank as f64 - 1.0) / (total_sections as f64 - 1.0))
        } else {
            1000.0
        };
        let section_weight = match level {
            Level::Pro => 1.5,
            Level::Expert => 1.0,
            Level::Beginner => 0.5,
        };

        // Row component, 100 points, front rows first.
        let mut row_score = 100.0 * (1.0 - (row as f64 - 1.0) / meta.total_rows as f64);
        if level == Level::Pro {
            row_score *= 1.2;
        }

        // Column component, 50 points, centre seats first.
        let middle = meta.total_cols as f64 / 2.0;
        let col_score = 50.0 * (1.0 - (col as f64 - middle).abs() / middle);

        section_score * section_weight + row_score + col_score
    }

    fn plan_for(
        &mut self,
        level: Level,
        reachable: &[ReachableSeat],
        first_choices: &mut HashSet<(String, u32)>,
    ) -> Vec<TargetSeat> {
        let mut scored: Vec<(f64, &ReachableSeat)> = reachable
            .iter()
            .map(|seat| {
                let jitter = self.rng.random::<f64>() * level.jitter_range();
                (self.score_seat(seat, level) + jitter, seat)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut targets = Vec::with_capacity(level.candidate_count());
        for (_, seat) in scored {
            if targets.len() == level.candidate_count() {
                break;
            }

            // Only the first choice is deduplicated across bots; lower
            // candidates may collide and sort themselves out at hold time.
            if targets.is_empty() {
                let key = (seat.section_id.clone(), seat.seat_number);
                if first_choices.contains(&key) {
                    continue;
                }
                first_choices.insert(key);
            }

            let total_cols = self
                .sections
                .get(&seat.section_id)
                .map(|m| m.total_cols)
                .unwrap_or(1);

            targets.push(TargetSeat {
                section_id: seat.section_id.clone(),
                seat_number: seat.seat_number,
                total_cols,
                grade: seat.grade,
            });
        }

        targets
    }
}

/// Assigns every bot its target-seat list, pros first so they claim the best
/// first choices.
pub fn assign_target_seats(bots: &mut [Bot], layout: &HallLayout, seed: u64) {
    let mut planner = SeatPlanner::new(layout, seed);
    let reachable = layout.reachable_seats();

    let mut order: Vec<usize> = (0..bots.len()).collect();
    order.sort_by(|&a, &b| bots[b].level.cmp(&bots[a].level));

    let mut first_choices = HashSet::new();
    for idx in order {
        bots[idx].target_seats =
            planner.plan_for(bots[idx].level, &reachable, &mut first_choices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::oneshot;
    use tokio_util::sync::CancellationToken;

    use crate::client::{
        CaptchaRequest, DaySelectRequest, DaySelectResponse, SeatConfirmRequest,
        SeatConfirmResponse, SeatHoldRequest, SeatHoldResponse, TicketingApi, TicketingError,
    };
    use crate::hall::{Grade, Section};

    struct NullTicketing;

    #[async_trait]
    impl TicketingApi for NullTicketing {
        async fn join_queue(
            &self,
            _: i64,
            _: &DaySelectRequest,
            _: i64,
        ) -> Result<DaySelectResponse, TicketingError> {
            Ok(DaySelectResponse::default())
        }
        async fn validate_captcha(&self, _: i64, _: &CaptchaRequest) -> Result<(), TicketingError> {
            Ok(())
        }
        async fn hold_seats(
            &self,
            _: i64,
            _: &SeatHoldRequest,
        ) -> Result<SeatHoldResponse, TicketingError> {
            Ok(SeatHoldResponse::default())
        }
        async fn confirm_seats(
            &self,
            _: i64,
            _: &SeatConfirmRequest,
        ) -> Result<SeatConfirmResponse, TicketingError> {
            Ok(SeatConfirmResponse::default())
        }
    }

    fn mk_bots(levels: &[Level]) -> Vec<Bot> {
        let client = Arc::new(NullTicketing);
        levels
            .iter()
            .enumerate()
            .map(|(i, level)| {
                let (_tx, rx) = oneshot::channel();
                Bot::new(
                    -((i as i64) + 1),
                    1,
                    *level,
                    client.clone(),
                    rx,
                    CancellationToken::new(),
                )
            })
            .collect()
    }

    fn section(id: &str, rows: u32, cols: u32, unavailable: Vec<u32>) -> Section {
        Section {
            section_id: id.into(),
            total_rows: rows,
            total_cols: cols,
            grade: Grade::R,
            unavailable,
        }
    }

    fn layout(sections: Vec<Section>) -> HallLayout {
        HallLayout {
            hall_id: "H1".into(),
            sections,
        }
    }

    #[test]
    fn plan_length_is_candidate_count_when_seats_abound() {
        let layout = layout(vec![section("1", 10, 10, vec![])]);
        let mut bots = mk_bots(&[Level::Pro, Level::Expert, Level::Beginner]);

        assign_target_seats(&mut bots, &layout, 12345);

        assert_eq!(bots[0].target_seats.len(), 3);
        assert_eq!(bots[1].target_seats.len(), 3);
        assert_eq!(bots[2].target_seats.len(), 4);
    }

    #[test]
    fn plan_is_capped_by_reachable_seats() {
        // 2x2 grid with one seat blocked: 3 reachable.
        let layout = layout(vec![section("1", 2, 2, vec![4])]);
        let mut bots = mk_bots(&[Level::Beginner]);

        assign_target_seats(&mut bots, &layout, 12345);
        assert_eq!(bots[0].target_seats.len(), 3);
    }

    #[test]
    fn every_target_is_reachable() {
        let layout = layout(vec![
            section("1", 3, 4, vec![1, 2, 3]),
            section("2", 2, 2, vec![]),
        ]);
        let reachable: HashSet<(String, u32)> = layout
            .reachable_seats()
            .into_iter()
            .map(|s| (s.section_id, s.seat_number))
            .collect();

        let mut bots = mk_bots(&[Level::Pro, Level::Pro, Level::Beginner, Level::Expert]);
        assign_target_seats(&mut bots, &layout, 7);

        for bot in &bots {
            for seat in &bot.target_seats {
                assert!(reachable.contains(&(seat.section_id.clone(), seat.seat_number)));
                assert!(seat.total_cols > 0, "total_cols must be carried from the section");
            }
        }
    }

    #[test]
    fn first_choices_are_distinct_across_bots() {
        let layout = layout(vec![section("1", 5, 5, vec![])]);
        let mut bots = mk_bots(&[Level::Pro; 6]);

        assign_target_seats(&mut bots, &layout, 12345);

        let firsts: HashSet<(String, u32)> = bots
            .iter()
            .map(|b| {
                let first = &b.target_seats[0];
                (first.section_id.clone(), first.seat_number)
            })
            .collect();
        assert_eq!(firsts.len(), bots.len());
    }

    #[test]
    fn same_seed_plans_identically() {
        let layout = layout(vec![section("1", 6, 6, vec![8])]);

        let mut a = mk_bots(&[Level::Pro, Level::Expert, Level::Beginner]);
        let mut b = mk_bots(&[Level::Pro, Level::Expert, Level::Beginner]);
        assign_target_seats(&mut a, &layout, 99);
        assign_target_seats(&mut b, &layout, 99);

        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.target_seats, y.target_seats);
        }
    }

    #[test]
    fn numeric_sections_outrank_unparsed_ones() {
        let layout = layout(vec![
            section("A", 3, 3, vec![]),
            section("1", 3, 3, vec![]),
        ]);
        let planner = SeatPlanner::new(&layout, 0);

        let in_named = ReachableSeat {
            section_id: "A".into(),
            seat_number: 2,
            grade: Grade::R,
        };
        let in_numeric = ReachableSeat {
            section_id: "1".into(),
            seat_number: 2,
            grade: Grade::R,
        };

        assert!(
            planner.score_seat(&in_numeric, Level::Expert)
                > planner.score_seat(&in_named, Level::Expert)
        );
    }

    #[test]
    fn pros_weight_sections_harder_than_beginners() {
        let layout = layout(vec![
            section("1", 3, 3, vec![]),
            section("2", 3, 3, vec![]),
        ]);
        let planner = SeatPlanner::new(&layout, 0);

        let best_section_seat = ReachableSeat {
            section_id: "1".into(),
            seat_number: 5,
            grade: Grade::R,
        };

        assert!(
            planner.score_seat(&best_section_seat, Level::Pro)
                > planner.score_seat(&best_section_seat, Level::Beginner)
        );
    }

    #[test]
    fn single_section_scores_full_section_marks() {
        let layout = layout(vec![section("3", 2, 3, vec![])]);
        let planner = SeatPlanner::new(&layout, 0);

        let seat = ReachableSeat {
            section_id: "3".into(),
            seat_number: 2,
            grade: Grade::R,
        };
        // Expert weight is 1.0, so the section component contributes exactly
        // 1000 regardless of the section's own id.
        assert!(planner.score_seat(&seat, Level::Expert) >= 1000.0);
    }
}
