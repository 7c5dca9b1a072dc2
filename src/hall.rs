//! Venue layout model.
//!
//! A hall is an ordered list of sections; each section is a dense
//! `total_rows x total_cols` grid with a set of seat numbers marked
//! unavailable. Seats are numbered `(row - 1) * total_cols + col` with rows
//! and columns 1-indexed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    R,
    S,
    Standing,
    Vip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HallLayout {
    pub hall_id: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Typically a decimal numeral ("1", "2", ...); non-numeric ids are
    /// legal and sort to the lowest planner priority.
    pub section_id: String,
    pub total_rows: u32,
    pub total_cols: u32,
    pub grade: Grade,
    /// Seat numbers that can never be selected (blocked, broken, reserved).
    #[serde(default)]
    pub unavailable: Vec<u32>,
}

/// A selectable seat, tagged with its section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachableSeat {
    pub section_id: String,
    pub seat_number: u32,
    pub grade: Grade,
}

/// `seat_number -> (row, col)`, all 1-indexed.
pub fn to_row_col(seat_number: u32, total_cols: u32) -> (u32, u32) {
    let row = (seat_number - 1) / total_cols + 1;
    let col = (seat_number - 1) % total_cols + 1;
    (row, col)
}

/// `(row, col) -> seat_number`, all 1-indexed.
pub fn from_row_col(row: u32, col: u32, total_cols: u32) -> u32 {
    (row - 1) * total_cols + col
}

impl HallLayout {
    /// Every seat of every section that is not marked unavailable, in
    /// section order.
    pub fn reachable_seats(&self) -> Vec<ReachableSeat> {
        let mut seats = Vec::new();

        for section in &self.sections {
            let unavailable: HashSet<u32> = section.unavailable.iter().copied().collect();
            let total = section.total_rows * section.total_cols;

            for seat_number in 1..=total {
                if !unavailable.contains(&seat_number) {
                    seats.push(ReachableSeat {
                        section_id: section.section_id.clone(),
                        seat_number,
                        grade: section.grade,
                    });
                }
            }
        }

        seats
    }
}
