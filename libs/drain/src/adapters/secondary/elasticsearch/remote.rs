use async_trait::async_trait;
use elasticsearch::http::transport::{
    BuildError as TransportBuilderError, SingleNodeConnectionPool, TransportBuilder,
};
use elasticsearch::Elasticsearch;
use semver::{Version, VersionReq};
use snafu::{ResultExt, Snafu};
use tracing::info;
use url::Url;

use super::{ElasticsearchStorage, ElasticsearchStorageConfig};
use crate::domain::ports::secondary::remote::{Error as RemoteError, Remote};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Elasticsearch Build Error
    #[snafu(display("Elasticsearch Connection Error: {}", source))]
    ElasticsearchConnectionError { source: TransportBuilderError },
}

#[async_trait]
impl Remote for SingleNodeConnectionPool {
    type Conn = ElasticsearchStorage;
    type Config = ElasticsearchStorageConfig;

    /// Use the connection to create a client, and make sure the cluster's
    /// version is one we know how to talk to.
    async fn conn(self, config: Self::Config) -> Result<Self::Conn, RemoteError> {
        let version_req =
            VersionReq::parse(&config.version_req).map_err(|err| RemoteError::InvalidVersion {
                details: format!("invalid version requirement '{}': {}", config.version_req, err),
            })?;

        let transport = TransportBuilder::new(self)
            .disable_proxy()
            .timeout(config.timeout)
            .build()
            .context(ElasticsearchConnectionSnafu)
            .map_err(|err| RemoteError::Connection {
                details: err.to_string(),
            })?;
        let client = Elasticsearch::new(transport);
        let storage = ElasticsearchStorage::new(client, config);

        let cluster_version =
            storage
                .cluster_version()
                .await
                .map_err(|err| RemoteError::Connection {
                    details: format!("could not retrieve the cluster's version: {}", err),
                })?;
        let version =
            Version::parse(&cluster_version).map_err(|err| RemoteError::InvalidVersion {
                details: format!("could not parse version '{}': {}", cluster_version, err),
            })?;

        if !version_req.matches(&version) {
            return Err(RemoteError::InvalidVersion {
                details: format!(
                    "Elasticsearch version {} does not match '{}'",
                    version, version_req
                ),
            });
        }

        info!("connected to Elasticsearch {}", version);
        Ok(storage)
    }
}

/// Open a connection to elasticsearch
pub fn connection_pool_url(url: &Url) -> SingleNodeConnectionPool {
    SingleNodeConnectionPool::new(url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_refuse_invalid_version_requirement() {
        let config = ElasticsearchStorageConfig {
            version_req: String::from("not a requirement"),
            ..ElasticsearchStorageConfig::default()
        };

        let res = connection_pool_url(&config.url).conn(config).await;

        match res {
            Err(RemoteError::InvalidVersion { details }) => {
                assert!(details.contains("not a requirement"))
            }
            Err(err) => panic!("expected an invalid version, got {}", err),
            Ok(_) => panic!("expected an invalid version"),
        }
    }
}
