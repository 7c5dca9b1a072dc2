//! Ticketing API response bodies. Every field defaults so that partial
//! payloads from older upstream revisions still decode.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaySelectResponse {
    pub event_id: i64,
    pub match_id: i64,
    pub player_type: String,
    pub status: String,
    pub position_ahead: i64,
    pub position_behind: i64,
    pub total_num: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeldSeat {
    pub section_id: i64,
    pub seat_id: i64,
    pub grade: String,
    pub match_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeatHoldResponse {
    pub success: bool,
    pub held_seats: Vec<HeldSeat>,
    pub failed_seats: Vec<HeldSeat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeatConfirmResponse {
    pub success: bool,
    pub message: String,
    pub user_rank: i64,
    pub confirmed_seats: Vec<serde_json::Value>,
    pub match_id: i64,
    pub user_id: i64,
}
