use async_trait::async_trait;
use chrono::NaiveDateTime;
use snafu::ResultExt;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::domain::model::error::{Error as ModelError, InvalidRangeSnafu};
use crate::domain::model::index::IndexId;
use crate::domain::model::time_range::TimeRange;
use crate::domain::ports::secondary::catalog::Catalog;

#[async_trait]
pub trait SelectIndices {
    /// Names of the indices starting with `prefix` and holding data for one of
    /// the months between `start` and `end`.
    async fn select_indices(
        &self,
        prefix: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<IndexId>, ModelError>;
}

#[async_trait]
impl<T> SelectIndices for T
where
    T: Catalog + Send + Sync,
{
    #[tracing::instrument(skip(self))]
    async fn select_indices(
        &self,
        prefix: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<IndexId>, ModelError> {
        // Validate everything before bothering the backend.
        if prefix.is_empty() {
            return Err(ModelError::InvalidPrefix);
        }
        let range = TimeRange::new(start, end).context(InvalidRangeSnafu)?;

        let catalog = self.list_indices().await?;
        debug!("catalog holds {} indices", catalog.len());

        let indices = select_from_catalog(prefix, &range, &catalog);
        info!(
            "selected {} indices with prefix '{}' between {} and {}",
            indices.len(),
            prefix,
            start,
            end
        );
        Ok(indices)
    }
}

/// Walk the months of `range` and keep, month after month, the catalog
/// entries that start with `prefix` and contain the month token.
///
/// The token may appear anywhere in the name. An index matching several
/// months is only returned for the first one.
pub fn select_from_catalog(prefix: &str, range: &TimeRange, catalog: &[IndexId]) -> Vec<IndexId> {
    let mut seen = HashSet::new();

    range
        .months()
        .flat_map(|month| {
            let token = month.token();
            catalog
                .iter()
                .filter(move |index| {
                    index.as_str().starts_with(prefix) && index.as_str().contains(token.as_str())
                })
                .cloned()
                .collect::<Vec<_>>()
        })
        .filter(|index| seen.insert(index.clone()))
        .collect()
}
