pub mod context;
pub mod service;
pub mod types;

pub use context::{MatchContext, MatchStatus};
pub use service::MatchService;
pub use types::{
    BotCountResponse, ErrorResponse, HallId, LocalDateTime, MatchSettingRequest,
    MatchSettingResponse,
};
