pub mod catalog;
pub mod remote;
pub mod scroll;
pub mod status;
