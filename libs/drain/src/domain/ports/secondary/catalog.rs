use async_trait::async_trait;
use snafu::Snafu;

use crate::domain::model::error::Error as ModelError;
use crate::domain::model::index::IndexId;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Index Listing Error: {}", source))]
    IndexListingError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// This port lists every index known to the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog {
    async fn list_indices(&self) -> Result<Vec<IndexId>, Error>;
}

#[async_trait]
impl<T: ?Sized> Catalog for Box<T>
where
    T: Catalog + Send + Sync,
{
    async fn list_indices(&self) -> Result<Vec<IndexId>, Error> {
        (**self).list_indices().await
    }
}

// Conversion from secondary ports errors
impl From<Error> for ModelError {
    fn from(err: Error) -> ModelError {
        match err {
            Error::IndexListingError { source } => ModelError::CatalogUnavailable { source },
        }
    }
}
