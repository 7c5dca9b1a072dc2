pub mod error;
pub mod layout;
pub mod request;
pub mod response;
pub mod ticketing;

pub use error::TicketingError;
pub use layout::{FsObjectStore, HallLayoutStore, LayoutError, ObjectStore};
pub use request::{CaptchaRequest, DaySelectRequest, SeatConfirmRequest, SeatHoldRequest, SeatInfo};
pub use response::{DaySelectResponse, HeldSeat, SeatConfirmResponse, SeatHoldResponse};
pub use ticketing::{HttpTicketingClient, TicketingApi};
