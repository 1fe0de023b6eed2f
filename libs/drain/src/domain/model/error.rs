use snafu::Snafu;

use super::index::IndexId;
use super::scroll::MAX_PAGE_SIZE;
use super::time_range::Error as TimeRangeError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid Range: {}", source))]
    InvalidRange { source: TimeRangeError },

    #[snafu(display("Invalid Prefix: index prefix must not be empty"))]
    InvalidPrefix,

    #[snafu(display(
        "Invalid Page Size: {}, expected between 1 and {}",
        page_size,
        MAX_PAGE_SIZE
    ))]
    InvalidPageSize { page_size: u64 },

    #[snafu(display("Catalog Unavailable: {}", source))]
    CatalogUnavailable { source: BoxError },

    #[snafu(display("Query Error on index {}: {}", index, source))]
    Query { index: IndexId, source: BoxError },

    #[snafu(display(
        "Scroll Advance Error on index {} after {} delivered page(s): {}",
        index,
        pages_delivered,
        source
    ))]
    ScrollAdvance {
        index: IndexId,
        pages_delivered: u64,
        source: BoxError,
    },

    #[snafu(display("Status Error: {}", source))]
    Status { source: BoxError },
}
