use async_trait::async_trait;
use serde::de::DeserializeOwned;
use snafu::Snafu;
use std::time::Duration;

use crate::domain::model::{
    index::IndexId,
    query::Query,
    scroll::{Cursor, Page, ScrollStart},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// This port defines the cursor based pagination primitive of a backend.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub index: IndexId,
    pub query: Query,
    pub page_size: u64,
    pub cursor_ttl: Duration,
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Scroll Opening Error: {}", source))]
    OpenScrollError { source: BoxError },

    /// The cursor was opened, but its first page could not be read.
    /// The cursor still has to be released.
    #[snafu(display("Unreadable First Page: {}", source))]
    UnreadableFirstPage { cursor: Cursor, source: BoxError },

    #[snafu(display("Scroll Advance Error: {}", source))]
    AdvanceError { source: BoxError },

    #[snafu(display("Cursor Expired: {}", details))]
    CursorExpired { details: String },

    #[snafu(display("Cursor Not Found: {}", details))]
    CursorNotFound { details: String },

    #[snafu(display("Cursor Release Error: {}", source))]
    ReleaseError { source: BoxError },
}

#[async_trait]
pub trait Scroll {
    /// Run the query and open a cursor living for `cursor_ttl`.
    async fn open_scroll<D>(&self, parameters: Parameters) -> Result<ScrollStart<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static;

    /// Fetch the page following `cursor`, and renew the cursor for `ttl`.
    async fn advance_scroll<D>(&self, cursor: &Cursor, ttl: Duration) -> Result<Page<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static;

    /// Free the server side state of the cursor.
    async fn release_scroll(&self, cursor: Cursor) -> Result<(), Error>;
}

#[async_trait]
impl<T: ?Sized> Scroll for Box<T>
where
    T: Scroll + Send + Sync,
{
    async fn open_scroll<D>(&self, parameters: Parameters) -> Result<ScrollStart<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        (**self).open_scroll(parameters).await
    }

    async fn advance_scroll<D>(&self, cursor: &Cursor, ttl: Duration) -> Result<Page<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        (**self).advance_scroll(cursor, ttl).await
    }

    async fn release_scroll(&self, cursor: Cursor) -> Result<(), Error> {
        (**self).release_scroll(cursor).await
    }
}

// Synchronous twin of `Scroll` over JSON documents, so that tests can set
// expectations on each backend call.
#[cfg(test)]
#[mockall::automock]
pub trait ErasedScroll {
    fn erased_open_scroll(
        &self,
        parameters: Parameters,
    ) -> Result<ScrollStart<serde_json::Value>, Error>;

    fn erased_advance_scroll(
        &self,
        cursor: &str,
        ttl: Duration,
    ) -> Result<Page<serde_json::Value>, Error>;

    fn erased_release_scroll(&self, cursor: &str) -> Result<(), Error>;
}

#[cfg(test)]
fn decode_documents<D: DeserializeOwned>(
    documents: Vec<serde_json::Value>,
) -> Result<Vec<D>, BoxError> {
    let documents = documents
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<D>, _>>()?;
    Ok(documents)
}

#[cfg(test)]
#[async_trait]
impl Scroll for MockErasedScroll {
    async fn open_scroll<D>(&self, parameters: Parameters) -> Result<ScrollStart<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        let ScrollStart { page, total_hits } = self.erased_open_scroll(parameters)?;
        match decode_documents(page.documents) {
            Ok(documents) => Ok(ScrollStart {
                page: Page {
                    documents,
                    cursor: page.cursor,
                },
                total_hits,
            }),
            Err(source) => Err(Error::UnreadableFirstPage {
                cursor: page.cursor,
                source,
            }),
        }
    }

    async fn advance_scroll<D>(&self, cursor: &Cursor, ttl: Duration) -> Result<Page<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        let page = self.erased_advance_scroll(cursor.as_str(), ttl)?;
        let documents =
            decode_documents(page.documents).map_err(|source| Error::AdvanceError { source })?;
        Ok(Page {
            documents,
            cursor: page.cursor,
        })
    }

    async fn release_scroll(&self, cursor: Cursor) -> Result<(), Error> {
        self.erased_release_scroll(cursor.as_str())
    }
}
