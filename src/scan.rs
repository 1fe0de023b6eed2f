use futures::stream::{self, StreamExt};
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use std::ops::ControlFlow;
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

use drain::adapters::primary::common::dsl::build_query;
use drain::adapters::secondary::elasticsearch::remote;
use drain::domain::model::error::Error as ModelError;
use drain::domain::model::scroll::{ScanRequest, ScanStatus};
use drain::domain::ports::primary::scroll_documents::ScrollDocuments;
use drain::domain::ports::primary::select_indices::SelectIndices;
use drain::domain::ports::primary::status::Status;
use drain::domain::ports::secondary::remote::{Error as RemoteError, Remote};
use drain::utils::futures::with_backoff;

use crate::settings::Settings;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Elasticsearch Connection Error: {}", source))]
    ElasticsearchConnection { source: RemoteError },

    #[snafu(display("Elasticsearch Status Error: {}", source))]
    Status { source: ModelError },

    #[snafu(display("Elasticsearch is not healthy (version {})", version))]
    Unhealthy { version: String },

    #[snafu(display("Index Selection Error: {}", source))]
    IndexSelection { source: ModelError },

    #[snafu(display("{} out of {} scan(s) failed", failed, total))]
    Scan { failed: usize, total: usize },
}

/// Connect to Elasticsearch, select the indices of the configured time range,
/// and log every document they hold.
///
/// A failing scan does not stop the others, the error is reported once every
/// scan is over.
pub async fn run(settings: Settings) -> Result<(), Error> {
    let Settings {
        retry,
        scan,
        elasticsearch: es_config,
        ..
    } = settings;

    info!("Trying to connect to elasticsearch at {}", &es_config.url);
    let client = with_backoff(
        || remote::connection_pool_url(&es_config.url).conn(es_config.clone()),
        retry.retries,
        retry.wait,
    )
    .await
    .context(ElasticsearchConnectionSnafu)?;

    let status = client.status().await.context(StatusSnafu)?;
    if !status.storage.health.is_available() {
        return Err(Error::Unhealthy {
            version: status.storage.version,
        });
    }
    info!("Connected to elasticsearch, {}", status.storage);

    let indices = client
        .select_indices(&scan.prefix, scan.start, scan.end)
        .await
        .context(IndexSelectionSnafu)?;
    if indices.is_empty() {
        warn!(
            "no index with prefix '{}' between {} and {}",
            scan.prefix, scan.start, scan.end
        );
        return Ok(());
    }

    let query = build_query(&scan.query);
    let page_size = scan.page_size(&es_config);
    let cursor_ttl = scan.cursor_ttl(&es_config);
    let total = indices.len();
    let client = &client;

    let reports: Vec<_> = stream::iter(indices)
        .map(|index| {
            let span = info_span!("Scan index", index = %index);
            let request = ScanRequest::new(index.clone(), query.clone())
                .with_page_size(page_size)
                .with_cursor_ttl(cursor_ttl);
            async move {
                client
                    .scroll_documents(request, move |documents: Vec<Value>| {
                        for document in documents {
                            info!(index = %index, "{}", document);
                        }
                        ControlFlow::Continue(())
                    })
                    .await
            }
            .instrument(span)
        })
        .buffer_unordered(scan.max_concurrent_scans)
        .collect()
        .await;

    let mut failed = 0;
    let mut documents = 0;
    for report in reports {
        match report {
            Ok(report) => {
                documents += report.documents_delivered;
                if report.status == ScanStatus::Cancelled {
                    warn!("scan of {} was cancelled", report.index);
                }
            }
            Err(err) => {
                error!("{}", err);
                failed += 1;
            }
        }
    }
    info!(
        "drained {} document(s) from {} index(es)",
        documents,
        total - failed
    );

    if failed > 0 {
        Err(Error::Scan { failed, total })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Command, Opts};
    use serde_json::json;
    use serial_test::serial;
    use std::path::PathBuf;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn es_response(body: Value) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("x-elastic-product", "Elasticsearch")
            .set_body_json(body)
    }

    fn settings(server: &MockServer) -> Settings {
        let opts = Opts {
            config_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config"),
            run_mode: Some(String::from("testing")),
            settings: vec![format!("elasticsearch.url={}", server.uri())],
            cmd: Command::Run,
        };
        Settings::new(&opts).expect("testing settings")
    }

    async fn mount_cluster(server: &MockServer, health: &str) {
        Mock::given(method("GET"))
            .and(path("/_cat/nodes"))
            .respond_with(es_response(json!([{ "v": "7.17.9" }])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(es_response(json!({ "status": health })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    #[serial]
    async fn should_scan_every_selected_index() {
        let server = MockServer::start().await;
        mount_cluster(&server, "green").await;
        Mock::given(method("GET"))
            .and(path("/_alias"))
            .respond_with(es_response(json!({
                "idx_202001a": { "aliases": {} },
                "idx_202002b": { "aliases": {} },
                "other_202001": { "aliases": {} }
            })))
            .expect(1)
            .mount(&server)
            .await;
        for (index, scroll_id) in [("idx_202001a", "a1"), ("idx_202002b", "b1")] {
            Mock::given(method("POST"))
                .and(path(format!("/{}/_search", index)))
                .respond_with(es_response(json!({
                    "_scroll_id": scroll_id,
                    "hits": {
                        "total": { "value": 1, "relation": "eq" },
                        "hits": [ { "_source": { "index": index } } ]
                    }
                })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("DELETE"))
                .and(path("/_search/scroll"))
                .and(body_json(json!({ "scroll_id": [scroll_id] })))
                .respond_with(es_response(json!({ "succeeded": true, "num_freed": 1 })))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/other_202001/_search"))
            .respond_with(es_response(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let res = run(settings(&server)).await;

        assert!(res.is_ok(), "Expected Ok, Got an Err: {}", res.unwrap_err());
    }

    #[tokio::test]
    #[serial]
    async fn should_refuse_unhealthy_cluster() {
        let server = MockServer::start().await;
        mount_cluster(&server, "red").await;
        Mock::given(method("GET"))
            .and(path("/_alias"))
            .respond_with(es_response(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let res = run(settings(&server)).await;

        assert!(std::matches!(res, Err(Error::Unhealthy { .. })));
    }

    #[tokio::test]
    #[serial]
    async fn should_report_failed_scans() {
        let server = MockServer::start().await;
        mount_cluster(&server, "yellow").await;
        Mock::given(method("GET"))
            .and(path("/_alias"))
            .respond_with(es_response(json!({ "idx_202001": { "aliases": {} } })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/idx_202001/_search"))
            .respond_with(
                ResponseTemplate::new(500)
                    .insert_header("x-elastic-product", "Elasticsearch")
                    .set_body_json(json!({
                        "error": { "root_cause": [], "reason": "boom" },
                        "status": 500
                    })),
            )
            .mount(&server)
            .await;

        let res = run(settings(&server)).await;

        match res {
            Err(Error::Scan { failed, total }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 1);
            }
            other => panic!("expected a scan error, got {:?}", other),
        }
    }
}
