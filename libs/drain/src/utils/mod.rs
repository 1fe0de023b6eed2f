pub mod deserialize;
pub mod futures;
pub mod serialize;
