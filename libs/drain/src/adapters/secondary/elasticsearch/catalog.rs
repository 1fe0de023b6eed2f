use async_trait::async_trait;

use super::ElasticsearchStorage;
use crate::domain::{
    model::index::IndexId,
    ports::secondary::catalog::{Catalog, Error as CatalogError},
};

#[async_trait]
impl Catalog for ElasticsearchStorage {
    /// Names of every index in the cluster, as reported by Elasticsearch.
    async fn list_indices(&self) -> Result<Vec<IndexId>, CatalogError> {
        self.list_indices()
            .await
            .map_err(|err| CatalogError::IndexListingError {
                source: Box::new(err),
            })
    }
}
