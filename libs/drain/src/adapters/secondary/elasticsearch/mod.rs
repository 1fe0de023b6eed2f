use crate::utils::deserialize::deserialize_duration;
use crate::utils::serialize::serialize_duration;
use elasticsearch::Elasticsearch;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub mod catalog;
pub(super) mod internal;
pub mod models;
pub mod remote;
pub mod scroll;
pub mod status;

/// A structure wrapping around the elasticsearch's client.
#[derive(Clone, Debug)]
pub struct ElasticsearchStorage {
    /// Elasticsearch client
    pub(crate) client: Elasticsearch,
    /// Client configuration
    pub config: ElasticsearchStorageConfig,
}

impl ElasticsearchStorage {
    pub fn new(client: Elasticsearch, config: ElasticsearchStorageConfig) -> Self {
        ElasticsearchStorage { client, config }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ElasticsearchStorageConfig {
    pub url: Url,
    /// Timeout of each request, in milliseconds.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub timeout: Duration,
    pub version_req: String,
    /// Default number of documents per scroll page.
    pub scroll_page_size: u64,
    /// Default lifetime of a scroll cursor between two pages, in milliseconds.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub scroll_cursor_ttl: Duration,
}

impl Default for ElasticsearchStorageConfig {
    fn default() -> Self {
        ElasticsearchStorageConfig {
            url: Url::parse("http://localhost:9200").expect("valid default url"),
            timeout: Duration::from_secs(10),
            version_req: String::from(">=7.13.0"),
            scroll_page_size: crate::domain::model::scroll::DEFAULT_PAGE_SIZE,
            scroll_cursor_ttl: crate::domain::model::scroll::DEFAULT_CURSOR_TTL,
        }
    }
}

impl ElasticsearchStorageConfig {
    /// Configuration found in the repository's `config/elasticsearch`, in
    /// 'testing' mode.
    pub fn default_testing() -> Self {
        let config_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config");

        let config = common::config::config_from(
            config_dir.as_path(),
            &["elasticsearch"],
            "testing",
            "ESDRAIN_TEST",
            vec![],
        );

        config
            .unwrap_or_else(|_| {
                panic!(
                    "cannot build the configuration for testing from {}",
                    config_dir.display(),
                )
            })
            .get("elasticsearch")
            .unwrap_or_else(|_| {
                panic!(
                    "expected elasticsearch section in configuration from {}",
                    config_dir.display(),
                )
            })
    }
}
