use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::internal::Error as InternalError;
use super::ElasticsearchStorage;
use crate::domain::{
    model::scroll::{Cursor, Page, ScrollStart},
    ports::secondary::scroll::{Error as ScrollError, Parameters, Scroll},
};

#[async_trait]
impl Scroll for ElasticsearchStorage {
    async fn open_scroll<D>(&self, parameters: Parameters) -> Result<ScrollStart<D>, ScrollError>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        let Parameters {
            index,
            query,
            page_size,
            cursor_ttl,
        } = parameters;
        self.open_scroll(&index, query, page_size, cursor_ttl)
            .await
            .map_err(|err| match err {
                InternalError::ElasticsearchUnreadableScroll { scroll_id, source } => {
                    ScrollError::UnreadableFirstPage {
                        cursor: Cursor::new(scroll_id),
                        source,
                    }
                }
                err => ScrollError::OpenScrollError {
                    source: Box::new(err),
                },
            })
    }

    async fn advance_scroll<D>(
        &self,
        cursor: &Cursor,
        ttl: Duration,
    ) -> Result<Page<D>, ScrollError>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        self.advance_scroll(cursor, ttl)
            .await
            .map_err(|err| match err {
                InternalError::ElasticsearchSearchContextMissing { details } => {
                    ScrollError::CursorExpired { details }
                }
                InternalError::ElasticsearchInvalidScrollId { details } => {
                    ScrollError::CursorNotFound { details }
                }
                err => ScrollError::AdvanceError {
                    source: Box::new(err),
                },
            })
    }

    async fn release_scroll(&self, cursor: Cursor) -> Result<(), ScrollError> {
        self.clear_scroll(cursor)
            .await
            .map_err(|err| ScrollError::ReleaseError {
                source: Box::new(err),
            })
    }
}
