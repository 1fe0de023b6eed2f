pub mod error;
pub mod index;
pub mod query;
pub mod scroll;
pub mod status;
pub mod time_range;
