//! Admission wire shapes.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::AppError;
use crate::level::Difficulty;
use crate::time;

/// A wall-clock instant that arrives without timezone information and is
/// interpreted as Asia/Seoul local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDateTime(pub DateTime<Utc>);

impl<'de> Deserialize<'de> for LocalDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        time::parse_local_datetime(&raw)
            .map(LocalDateTime)
            .map_err(|e| de::Error::custom(format!("invalid datetime {raw:?}: {e}")))
    }
}

impl Serialize for LocalDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let local = self.0.with_timezone(&time::kst());
        serializer.serialize_str(&local.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}

/// Hall identifier; clients send either a string or a bare integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HallId(pub String);

impl HallId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HallId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HallIdVisitor;

        impl Visitor<'_> for HallIdVisitor {
            type Value = HallId;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a string or integer hall id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<HallId, E> {
                Ok(HallId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<HallId, E> {
                Ok(HallId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<HallId, E> {
                Ok(HallId(v.to_string()))
            }
        }

        deserializer.deserialize_any(HallIdVisitor)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSettingRequest {
    /// 1..=50_000 in practice; 0 is accepted and is a no-op.
    pub bot_count: usize,
    pub start_time: LocalDateTime,
    pub difficulty: Difficulty,
    pub hall_id: HallId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSettingResponse {
    pub success: bool,
    pub message: String,
    pub match_id: i64,
}

impl MatchSettingResponse {
    pub fn scheduled(match_id: i64) -> Self {
        Self {
            success: true,
            message: "match scheduled".to_string(),
            match_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotCountResponse {
    pub total_bot_count: usize,
    pub available_bot_count: usize,
}
