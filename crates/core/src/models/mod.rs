//! Data models for Seatplan

mod guest;
mod side;
mod zone;

pub use guest::*;
pub use side::*;
pub use zone::*;
