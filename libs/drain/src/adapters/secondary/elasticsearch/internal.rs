use elasticsearch::cluster::ClusterHealthParts;
use elasticsearch::http::response::{Exception, Response};
use elasticsearch::http::StatusCode;
use elasticsearch::indices::IndicesGetAliasParts;
use elasticsearch::{ClearScrollParts, ScrollParts, SearchParts};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use snafu::{ResultExt, Snafu};
use std::time::Duration;
use tracing::{debug, warn};

use super::models::{ElasticsearchClearScrollResponse, ElasticsearchScrollResponse};
use super::ElasticsearchStorage;
use crate::domain::model::{
    index::IndexId,
    query::Query,
    scroll::{Cursor, Page, ScrollStart},
    status::StorageHealth,
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Elasticsearch Error
    #[snafu(display("Elasticsearch Error: {} [{}]", source, details))]
    ElasticsearchClient {
        details: String,
        source: elasticsearch::Error,
    },

    /// Elasticsearch Document Insertion Exception
    #[snafu(display("Elasticsearch Failure without Exception"))]
    ElasticsearchFailureWithoutException,

    /// Elasticsearch Unhandled Exception
    #[snafu(display("Elasticsearch Unhandled Exception: {}", details))]
    ElasticsearchUnhandledException { details: String },

    /// Elasticsearch Unknown Index
    #[snafu(display("Elasticsearch Unknown Index: {}", index))]
    ElasticsearchUnknownIndex { index: String },

    /// Elasticsearch lost the scroll context, usually because its keep alive expired
    #[snafu(display("Elasticsearch Search Context Missing: {}", details))]
    ElasticsearchSearchContextMissing { details: String },

    /// Elasticsearch does not know the scroll id
    #[snafu(display("Elasticsearch Invalid Scroll Id: {}", details))]
    ElasticsearchInvalidScrollId { details: String },

    /// Elasticsearch Deserialization Error
    #[snafu(display("JSON Elasticsearch Deserialization Error: {}", source))]
    ElasticsearchDeserialization { source: elasticsearch::Error },

    /// JSON Deserialization Error
    #[snafu(display("JSON Deserialization Error: {}", source))]
    JsonDeserialization { source: serde_json::Error },

    /// Invalid JSON Value
    #[snafu(display("JSON Deserialization Invalid: {} {:?}", details, json))]
    JsonInvalid { details: String, json: Value },

    /// Elasticsearch Unhandled Status
    #[snafu(display("Elasticsearch Unhandled Status: {}", details))]
    ElasticsearchUnhandledStatus { details: String },

    /// Elasticsearch Response Has No Scroll Id
    #[snafu(display("Elasticsearch Response is Missing a Scroll Id"))]
    ElasticsearchResponseMissingScrollId,

    /// Elasticsearch Response Has No Total Hits
    #[snafu(display("Elasticsearch Response is Missing the Total Hits"))]
    ElasticsearchResponseMissingTotalHits,

    /// Elasticsearch opened a scroll, but its first page could not be read
    #[snafu(display("Elasticsearch Unreadable Scroll {}: {}", scroll_id, source))]
    ElasticsearchUnreadableScroll {
        scroll_id: String,
        source: Box<Error>,
    },

    /// Page size out of the range Elasticsearch accepts
    #[snafu(display("Elasticsearch Invalid Page Size: {}", page_size))]
    ElasticsearchInvalidPageSize { page_size: u64 },

    /// Elasticsearch did not free the scroll context
    #[snafu(display("Elasticsearch Scroll Not Cleared: {}", details))]
    ElasticsearchScrollNotCleared { details: String },
}

impl From<Exception> for Error {
    // This function analyzes the content of an elasticsearch exception,
    // and returns an error, the type of which should mirror the exception's content.
    // There is no clear blueprint for this analysis, it's very much adhoc.
    fn from(exception: Exception) -> Error {
        let root_cause = exception.error().root_cause();
        if root_cause.is_empty() {
            // If there is no root cause, there maybe a reason
            if let Some(reason) = exception.error().reason() {
                Error::ElasticsearchUnhandledException {
                    details: String::from(reason),
                }
            } else {
                Error::ElasticsearchUnhandledException {
                    details: String::from("Unspecified root cause or reason"),
                }
            }
        } else {
            lazy_static! {
                static ref NOT_FOUND: Regex = Regex::new(r"no such index \[([^\]/]+).*\]").unwrap();
            }
            lazy_static! {
                // Example: No search context found for id [2104]
                static ref NO_SEARCH_CONTEXT: Regex =
                    Regex::new(r"No search context found for id \[([^\]]*)\]").unwrap();
            }
            lazy_static! {
                static ref INVALID_SCROLL_ID: Regex =
                    Regex::new(r"(?i)cannot parse scroll id").unwrap();
            }
            match root_cause[0].reason() {
                Some(reason) => {
                    if let Some(caps) = NOT_FOUND.captures(reason) {
                        let index = caps
                            .get(1)
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default();
                        Error::ElasticsearchUnknownIndex { index }
                    } else if NO_SEARCH_CONTEXT.is_match(reason) {
                        Error::ElasticsearchSearchContextMissing {
                            details: String::from(reason),
                        }
                    } else if INVALID_SCROLL_ID.is_match(reason) {
                        Error::ElasticsearchInvalidScrollId {
                            details: String::from(reason),
                        }
                    } else {
                        Error::ElasticsearchUnhandledException {
                            details: format!("Unidentified reason: {}", reason),
                        }
                    }
                }
                None => Error::ElasticsearchUnhandledException {
                    details: String::from("Unspecified reason"),
                },
            }
        }
    }
}

impl From<Option<Exception>> for Error {
    fn from(opt_exc: Option<Exception>) -> Self {
        opt_exc
            .map(Into::into)
            .unwrap_or(Error::ElasticsearchFailureWithoutException)
    }
}

/// Extract the exception of a failed response.
async fn failure(response: Response) -> Error {
    match response.exception().await {
        Ok(exception) => Error::from(exception),
        Err(source) => Error::ElasticsearchDeserialization { source },
    }
}

/// Scroll keep alive, in the format of Elasticsearch time units.
fn keep_alive(ttl: Duration) -> String {
    format!("{}ms", ttl.as_millis())
}

impl ElasticsearchStorage {
    pub(super) async fn list_indices(&self) -> Result<Vec<IndexId>, Error> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::None)
            .request_timeout(self.config.timeout)
            .send()
            .await
            .context(ElasticsearchClientSnafu {
                details: String::from("cannot list indices"),
            })?;

        if response.status_code().is_success() {
            // Response similar to:
            // {
            //   "index1": { "aliases": { "alias1": {} } },
            //   "index2": { "aliases": {} }
            // }
            let json = response
                .json::<Value>()
                .await
                .context(ElasticsearchDeserializationSnafu)?;

            let indices = json
                .as_object()
                .ok_or(Error::JsonInvalid {
                    details: String::from("expected JSON object"),
                    json: json.clone(),
                })?
                .keys()
                .map(|index| IndexId::from(index.as_str()))
                .collect();
            Ok(indices)
        } else {
            Err(failure(response).await)
        }
    }

    pub(super) async fn open_scroll<D>(
        &self,
        index: &IndexId,
        query: Query,
        page_size: u64,
        ttl: Duration,
    ) -> Result<ScrollStart<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        let keep_alive = keep_alive(ttl);
        let indices = [index.as_str()];
        let size = i64::try_from(page_size)
            .map_err(|_| Error::ElasticsearchInvalidPageSize { page_size })?;

        // The total must be exact to know how many pages to expect.
        let (body, query_string) = match query {
            Query::QueryString(q) => (json!({ "track_total_hits": true }), Some(q)),
            Query::QueryDSL(dsl) => (json!({ "query": dsl, "track_total_hits": true }), None),
        };

        let mut search = self
            .client
            .search(SearchParts::Index(&indices))
            .scroll(&keep_alive)
            .size(size)
            .request_timeout(self.config.timeout);

        if let Some(q) = query_string.as_deref() {
            search = search.q(q);
        }

        let response = search
            .body(body)
            .send()
            .await
            .context(ElasticsearchClientSnafu {
                details: format!("could not open scroll on index {}", index),
            })?;

        if !response.status_code().is_success() {
            return Err(failure(response).await);
        }

        // From here on the scroll context exists server side, so a failure to
        // read the page must still hand its id back.
        let json = response
            .json::<Value>()
            .await
            .context(ElasticsearchDeserializationSnafu)?;
        let scroll_id = json
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(String::from);

        read_scroll_start(index, json).map_err(|err| match scroll_id {
            Some(scroll_id) => Error::ElasticsearchUnreadableScroll {
                scroll_id,
                source: Box::new(err),
            },
            None => err,
        })
    }

    pub(super) async fn advance_scroll<D>(
        &self,
        cursor: &Cursor,
        ttl: Duration,
    ) -> Result<Page<D>, Error>
    where
        D: DeserializeOwned + Send + Sync + 'static,
    {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .request_timeout(self.config.timeout)
            .body(json!({
                "scroll": keep_alive(ttl),
                "scroll_id": cursor.as_str(),
            }))
            .send()
            .await
            .context(ElasticsearchClientSnafu {
                details: String::from("could not advance scroll"),
            })?;

        if !response.status_code().is_success() {
            let status = response.status_code();
            let err = failure(response).await;
            // Elasticsearch answers 404 for scroll ids it no longer knows.
            return Err(match err {
                Error::ElasticsearchUnhandledException { details } if status == StatusCode::NOT_FOUND => {
                    Error::ElasticsearchInvalidScrollId { details }
                }
                Error::ElasticsearchFailureWithoutException if status == StatusCode::NOT_FOUND => {
                    Error::ElasticsearchInvalidScrollId {
                        details: String::from("scroll id not found"),
                    }
                }
                err => err,
            });
        }

        let body = response
            .json::<ElasticsearchScrollResponse<D>>()
            .await
            .context(ElasticsearchDeserializationSnafu)?;

        into_page(body)
    }

    pub(super) async fn clear_scroll(&self, cursor: Cursor) -> Result<(), Error> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .request_timeout(self.config.timeout)
            .body(json!({ "scroll_id": [cursor.as_str()] }))
            .send()
            .await
            .context(ElasticsearchClientSnafu {
                details: String::from("could not clear scroll"),
            })?;

        // Elasticsearch answers 404 when nothing could be freed, with the same
        // body as a success.
        let status = response.status_code();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            let body = response
                .json::<ElasticsearchClearScrollResponse>()
                .await
                .context(ElasticsearchDeserializationSnafu)?;
            if body.succeeded && body.num_freed > 0 {
                Ok(())
            } else {
                Err(Error::ElasticsearchScrollNotCleared {
                    details: format!(
                        "succeeded: {}, freed {} search context(s)",
                        body.succeeded, body.num_freed
                    ),
                })
            }
        } else {
            Err(failure(response).await)
        }
    }

    pub(super) async fn cluster_health(&self) -> Result<StorageHealth, Error> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .request_timeout(self.config.timeout)
            .send()
            .await
            .context(ElasticsearchClientSnafu {
                details: String::from("cannot query cluster health"),
            })?;

        if response.status_code().is_success() {
            // Response similar to:
            // Object({"cluster_name": "foo", "status": "yellow", ...})
            let json = response
                .json::<Value>()
                .await
                .context(ElasticsearchDeserializationSnafu)?;

            let health = json
                .as_object()
                .ok_or(Error::JsonInvalid {
                    details: String::from("expected JSON object"),
                    json: json.clone(),
                })?
                .get("status")
                .ok_or_else(|| Error::JsonInvalid {
                    details: String::from("expected 'status'"),
                    json: json.clone(),
                })?
                .as_str()
                .ok_or_else(|| Error::JsonInvalid {
                    details: String::from("expected JSON string"),
                    json: json.clone(),
                })?;

            StorageHealth::try_from(health)
        } else {
            Err(failure(response).await)
        }
    }

    pub(super) async fn cluster_version(&self) -> Result<String, Error> {
        // In the following, we specify the list of columns we're interested in ("v" for version).
        // Refer to https://www.elastic.co/guide/en/elasticsearch/reference/current/cat-nodes.html
        // to explicitely set the list of columns
        let response = self
            .client
            .cat()
            .nodes()
            .request_timeout(self.config.timeout)
            .h(&["v"]) // We only want the version
            .format("json")
            .send()
            .await
            .context(ElasticsearchClientSnafu {
                details: String::from("cannot query cluster version"),
            })?;

        if response.status_code().is_success() {
            let json = response
                .json::<Value>()
                .await
                .context(ElasticsearchDeserializationSnafu)?;

            let version = json
                .as_array()
                .ok_or(Error::JsonInvalid {
                    details: String::from("expected JSON array"),
                    json: json.clone(),
                })?
                .get(0)
                .ok_or(Error::JsonInvalid {
                    details: String::from("empty list of node information"),
                    json: json.clone(),
                })?
                .get("v")
                .ok_or(Error::JsonInvalid {
                    details: String::from("expected 'v' (version)"),
                    json: json.clone(),
                })?
                .as_str()
                .ok_or(Error::JsonInvalid {
                    details: String::from("expected JSON string"),
                    json: json.clone(),
                })?;
            Ok(version.to_string())
        } else {
            Err(failure(response).await)
        }
    }
}

fn read_scroll_start<D>(index: &IndexId, json: Value) -> Result<ScrollStart<D>, Error>
where
    D: DeserializeOwned,
{
    let body: ElasticsearchScrollResponse<D> =
        serde_json::from_value(json).context(JsonDeserializationSnafu)?;

    let total = body
        .hits
        .total
        .as_ref()
        .ok_or(Error::ElasticsearchResponseMissingTotalHits)?;
    if !total.is_exact() {
        warn!(
            "Elasticsearch only reports a lower bound of {} hits on {}",
            total.value(),
            index
        );
    }
    let total_hits = total.value();

    let page = into_page(body)?;
    debug!(
        "opened scroll on {} with {} hits, first page has {} documents",
        index,
        total_hits,
        page.documents.len()
    );

    Ok(ScrollStart { page, total_hits })
}

fn into_page<D>(response: ElasticsearchScrollResponse<D>) -> Result<Page<D>, Error> {
    let cursor = response
        .scroll_id
        .clone()
        .map(Cursor::new)
        .ok_or(Error::ElasticsearchResponseMissingScrollId)?;
    Ok(Page {
        documents: response.into_hits(),
        cursor,
    })
}

impl<'a> TryFrom<&'a str> for StorageHealth {
    type Error = Error;
    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        match value {
            "green" | "yellow" => Ok(StorageHealth::Available),
            "red" => Ok(StorageHealth::Degraded),
            _ => Err(Error::ElasticsearchUnhandledStatus {
                details: value.to_string(),
            }),
        }
    }
}
