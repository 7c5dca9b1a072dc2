//! Outbound request bodies for the ticketing API.

use serde::Serialize;

use crate::hall::Grade;

/// Joins the waiting queue for a show date.
#[derive(Debug, Clone, Serialize)]
pub struct DaySelectRequest {
    #[serde(rename = "clickmiss")]
    pub click_miss: u32,
    /// Time the client spent on the date screen, in milliseconds.
    pub duration: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatInfo {
    pub section_id: i64,
    pub row: u32,
    pub col: u32,
    pub grade: Grade,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatHoldRequest {
    pub user_id: i64,
    pub seats: Vec<SeatInfo>,
    /// Bots always send 0: the upstream uses this field to validate human
    /// selections and 0 bypasses that check.
    pub total_seats: u32,
}

/// Finalizes held seats. Every timing/telemetry field is zero for bots; only
/// `user_id` carries information.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatConfirmRequest {
    pub user_id: i64,
    pub date_select_time: f64,
    pub seccode_select_time: f64,
    pub seccode_backspace_count: u32,
    pub seccode_try_count: u32,
    pub seat_select_time: f64,
    pub seat_select_try_count: u32,
    pub seat_select_click_miss_count: u32,
}
