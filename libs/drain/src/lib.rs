//! Drain the documents of time partitioned Elasticsearch indices.
//!
//! The domain selects the monthly indices of a time range, and scans each one
//! with a server side cursor, page after page, until every match has been
//! handed to the caller. Backends plug in through the secondary ports, the
//! Elasticsearch adapter being the only one for now.
pub mod adapters;
pub mod domain;
pub mod utils;
