pub mod booking;
pub mod seat;
pub mod show;
pub mod user;

pub use booking::Booking;
pub use seat::{Seat, SeatStatus, SeatTier};
pub use show::{Movie, Show};
pub use user::User;
