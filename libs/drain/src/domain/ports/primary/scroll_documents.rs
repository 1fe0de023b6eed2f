use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::ops::ControlFlow;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;

use crate::domain::model::error::Error as ModelError;
use crate::domain::model::index::IndexId;
use crate::domain::model::scroll::{
    Cursor, Page, ScanReport, ScanRequest, ScanStatus, ScrollStart, MAX_PAGE_SIZE,
};
use crate::domain::ports::secondary::scroll::{Error as ScrollError, Parameters, Scroll};

#[async_trait]
pub trait ScrollDocuments {
    /// Deliver every document matching the request to `sink`, one page at a
    /// time, in the order of the backend.
    ///
    /// The sink returns `ControlFlow::Break(())` to stop the scan early. Pages
    /// delivered before a failure are not taken back: on error, the sink has
    /// seen a prefix of the result set.
    async fn scroll_documents<D, F>(
        &self,
        request: ScanRequest,
        sink: F,
    ) -> Result<ScanReport, ModelError>
    where
        D: DeserializeOwned + Send + Sync + 'static,
        F: FnMut(Vec<D>) -> ControlFlow<()> + Send;
}

#[async_trait]
impl<T> ScrollDocuments for T
where
    T: Scroll + Send + Sync,
{
    #[tracing::instrument(skip(self, request, sink), fields(index = %request.index))]
    async fn scroll_documents<D, F>(
        &self,
        request: ScanRequest,
        mut sink: F,
    ) -> Result<ScanReport, ModelError>
    where
        D: DeserializeOwned + Send + Sync + 'static,
        F: FnMut(Vec<D>) -> ControlFlow<()> + Send,
    {
        if request.page_size == 0 || request.page_size > MAX_PAGE_SIZE {
            return Err(ModelError::InvalidPageSize {
                page_size: request.page_size,
            });
        }

        let ttl = request.cursor_ttl;
        let parameters = Parameters {
            index: request.index.clone(),
            query: request.query.clone(),
            page_size: request.page_size,
            cursor_ttl: ttl,
        };

        let ScrollStart { page, total_hits } = match self.open_scroll::<D>(parameters).await {
            Ok(start) => start,
            Err(ScrollError::UnreadableFirstPage { cursor, source }) => {
                release(self, cursor, &request.index).await;
                return Err(ModelError::Query {
                    index: request.index,
                    source,
                });
            }
            // Any other failure means no cursor was opened.
            Err(err) => {
                return Err(ModelError::Query {
                    index: request.index,
                    source: err.into(),
                })
            }
        };
        let mut last_response = Instant::now();

        let pages_expected = request.page_count(total_hits);
        info!(
            "scanning {}: {} documents in {} page(s)",
            request.index, total_hits, pages_expected
        );

        let Page {
            mut documents,
            mut cursor,
        } = page;
        let mut pages_delivered = 0u64;
        let mut documents_delivered = 0u64;

        let outcome = loop {
            if pages_delivered >= pages_expected {
                break Ok(ScanStatus::Completed);
            }

            documents_delivered += documents.len() as u64;
            pages_delivered += 1;
            debug!("delivering page {}/{}", pages_delivered, pages_expected);
            let flow = sink(std::mem::take(&mut documents));

            if pages_delivered >= pages_expected {
                break Ok(ScanStatus::Completed);
            }
            if flow.is_break() {
                info!(
                    "scan of {} cancelled after {} page(s)",
                    request.index, pages_delivered
                );
                break Ok(ScanStatus::Cancelled);
            }

            // The backend drops the scroll context once the keep alive is
            // over, so a late advance cannot succeed.
            let idle = last_response.elapsed();
            if idle > ttl {
                break Err(ScrollError::CursorExpired {
                    details: format!(
                        "{:?} elapsed since last page, cursor lifetime is {:?}",
                        idle, ttl
                    ),
                });
            }

            match self.advance_scroll::<D>(&cursor, ttl).await {
                Ok(page) => {
                    last_response = Instant::now();
                    documents = page.documents;
                    cursor = page.cursor;
                }
                Err(err) => break Err(err),
            }
        };

        release(self, cursor, &request.index).await;

        match outcome {
            Ok(status) => Ok(ScanReport {
                index: request.index,
                status,
                total_hits,
                pages_expected,
                pages_delivered,
                documents_delivered,
            }),
            Err(err) => Err(ModelError::ScrollAdvance {
                index: request.index,
                pages_delivered,
                source: err.into(),
            }),
        }
    }
}

/// Release failures are only logged, they never change the outcome of a scan.
async fn release<S>(backend: &S, cursor: Cursor, index: &IndexId)
where
    S: Scroll + Sync,
{
    if let Err(err) = backend
        .release_scroll(cursor)
        .instrument(info_span!("Release cursor"))
        .await
    {
        warn!("could not release cursor on {}: {}", index, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::query::Query;
    use crate::domain::ports::secondary::scroll::MockErasedScroll;
    use mockall::Sequence;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        id: u64,
    }

    fn records(from: u64, to: u64) -> Vec<Value> {
        (from..to).map(|id| json!({ "id": id })).collect()
    }

    fn request(page_size: u64) -> ScanRequest {
        ScanRequest::new(IndexId::from("idx_202001"), Query::default()).with_page_size(page_size)
    }

    /// A backend holding `total` documents, handing out pages of `page_size`
    /// and a new cursor after each call.
    fn paging_backend(total: u64, page_size: u64) -> MockErasedScroll {
        let mut backend = MockErasedScroll::new();
        let served = Arc::new(AtomicU64::new(0));

        let first = served.clone();
        backend
            .expect_erased_open_scroll()
            .times(1)
            .returning(move |parameters| {
                assert_eq!(parameters.page_size, page_size);
                let end = page_size.min(total);
                first.store(end, Ordering::SeqCst);
                Ok(ScrollStart {
                    page: Page {
                        documents: records(0, end),
                        cursor: Cursor::new("cursor-0"),
                    },
                    total_hits: total,
                })
            });

        let next = served;
        backend
            .expect_erased_advance_scroll()
            .returning(move |cursor, _| {
                let start = next.load(Ordering::SeqCst);
                let end = (start + page_size).min(total);
                next.store(end, Ordering::SeqCst);
                assert_eq!(cursor.to_string(), format!("cursor-{}", start / page_size - 1));
                Ok(Page {
                    documents: records(start, end),
                    cursor: Cursor::new(format!("cursor-{}", start / page_size)),
                })
            });

        backend
    }

    #[tokio::test]
    async fn should_deliver_every_page_in_order() {
        let mut backend = paging_backend(1200, 500);
        backend
            .expect_erased_release_scroll()
            .times(1)
            .withf(|cursor| cursor.to_string() == "cursor-2")
            .returning(|_| Ok(()));

        let mut pages: Vec<Vec<Record>> = Vec::new();
        let report = backend
            .scroll_documents(request(500), |page: Vec<Record>| {
                pages.push(page);
                ControlFlow::Continue(())
            })
            .await
            .expect("successful scan");

        assert_eq!(
            pages.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![500, 500, 200]
        );
        let ids = pages
            .into_iter()
            .flatten()
            .map(|record| record.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, (0..1200).collect::<Vec<_>>());
        assert_eq!(report.status, ScanStatus::Completed);
        assert_eq!(report.pages_expected, 3);
        assert_eq!(report.pages_delivered, 3);
        assert_eq!(report.documents_delivered, 1200);
    }

    #[tokio::test]
    async fn should_issue_page_count_minus_one_advances() {
        for (total, page_size) in [(1, 500), (500, 500), (501, 500), (1200, 500), (10, 3)] {
            let mut backend = MockErasedScroll::new();
            let pages = (total + page_size - 1) / page_size;
            backend.expect_erased_open_scroll().times(1).returning(move |_| {
                Ok(ScrollStart {
                    page: Page {
                        documents: records(0, page_size.min(total)),
                        cursor: Cursor::new("c"),
                    },
                    total_hits: total,
                })
            });
            backend
                .expect_erased_advance_scroll()
                .times((pages - 1) as usize)
                .returning(|_, _| {
                    Ok(Page {
                        documents: records(0, 1),
                        cursor: Cursor::new("c"),
                    })
                });
            backend
                .expect_erased_release_scroll()
                .times(1)
                .returning(|_| Ok(()));

            let mut delivered = 0;
            let report = backend
                .scroll_documents(request(page_size), |_: Vec<Record>| {
                    delivered += 1;
                    ControlFlow::Continue(())
                })
                .await
                .expect("successful scan");

            assert_eq!(delivered, pages);
            assert_eq!(report.pages_delivered, pages);
        }
    }

    #[tokio::test]
    async fn should_not_deliver_anything_for_empty_result_but_release() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().times(1).returning(|_| {
            Ok(ScrollStart {
                page: Page {
                    documents: vec![],
                    cursor: Cursor::new("empty"),
                },
                total_hits: 0,
            })
        });
        backend.expect_erased_advance_scroll().never();
        backend
            .expect_erased_release_scroll()
            .times(1)
            .withf(|cursor| cursor.to_string() == "empty")
            .returning(|_| Ok(()));

        let mut calls = 0;
        let report = backend
            .scroll_documents(request(500), |_: Vec<Record>| {
                calls += 1;
                ControlFlow::Continue(())
            })
            .await
            .expect("successful scan");

        assert_eq!(calls, 0);
        assert_eq!(report.pages_expected, 0);
        assert_eq!(report.status, ScanStatus::Completed);
    }

    #[tokio::test]
    async fn should_fail_without_release_when_first_query_fails() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().times(1).returning(|_| {
            Err(ScrollError::OpenScrollError {
                source: "no such index".into(),
            })
        });
        backend.expect_erased_advance_scroll().never();
        backend.expect_erased_release_scroll().never();

        let res = backend
            .scroll_documents(request(500), |_: Vec<Record>| ControlFlow::Continue(()))
            .await;

        assert!(std::matches!(res, Err(ModelError::Query { .. })));
    }

    #[tokio::test]
    async fn should_release_cursor_opened_with_unreadable_first_page() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().times(1).returning(|_| {
            Err(ScrollError::UnreadableFirstPage {
                cursor: Cursor::new("opened"),
                source: "missing total hits".into(),
            })
        });
        backend.expect_erased_advance_scroll().never();
        backend
            .expect_erased_release_scroll()
            .times(1)
            .withf(|cursor| cursor.to_string() == "opened")
            .returning(|_| Ok(()));

        let mut calls = 0;
        let res = backend
            .scroll_documents(request(500), |_: Vec<Record>| {
                calls += 1;
                ControlFlow::Continue(())
            })
            .await;

        assert_eq!(calls, 0);
        match res {
            Err(ModelError::Query { source, .. }) => {
                assert_eq!(source.to_string(), "missing total hits")
            }
            other => panic!("expected a query error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn should_release_cursor_when_first_documents_do_not_decode() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().times(1).returning(|_| {
            Ok(ScrollStart {
                page: Page {
                    documents: vec![json!({ "id": "not-a-number" })],
                    cursor: Cursor::new("cursor-0"),
                },
                total_hits: 3,
            })
        });
        backend.expect_erased_advance_scroll().never();
        backend
            .expect_erased_release_scroll()
            .times(1)
            .withf(|cursor| cursor.to_string() == "cursor-0")
            .returning(|_| {
                Err(ScrollError::ReleaseError {
                    source: "connection reset".into(),
                })
            });

        let res = backend
            .scroll_documents(request(500), |_: Vec<Record>| ControlFlow::Continue(()))
            .await;

        assert!(std::matches!(res, Err(ModelError::Query { .. })));
    }

    #[tokio::test]
    async fn should_release_after_failed_advance_and_report_progress() {
        let mut backend = MockErasedScroll::new();
        let mut seq = Sequence::new();
        backend
            .expect_erased_open_scroll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(ScrollStart {
                    page: Page {
                        documents: records(0, 500),
                        cursor: Cursor::new("cursor-0"),
                    },
                    total_hits: 1200,
                })
            });
        backend
            .expect_erased_advance_scroll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(ScrollError::CursorNotFound {
                    details: String::from("No search context found"),
                })
            });
        backend
            .expect_erased_release_scroll()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|cursor| cursor.to_string() == "cursor-0")
            .returning(|_| Ok(()));

        let mut pages: Vec<Vec<Record>> = Vec::new();
        let res = backend
            .scroll_documents(request(500), |page: Vec<Record>| {
                pages.push(page);
                ControlFlow::Continue(())
            })
            .await;

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 500);
        match res {
            Err(ModelError::ScrollAdvance {
                pages_delivered, ..
            }) => assert_eq!(pages_delivered, 1),
            other => panic!("expected a scroll advance error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn should_swallow_release_failure() {
        let mut backend = paging_backend(700, 500);
        backend.expect_erased_release_scroll().times(1).returning(|_| {
            Err(ScrollError::ReleaseError {
                source: "connection reset".into(),
            })
        });

        let report = backend
            .scroll_documents(request(500), |_: Vec<Record>| ControlFlow::Continue(()))
            .await
            .expect("release failure does not fail the scan");

        assert_eq!(report.status, ScanStatus::Completed);
        assert_eq!(report.documents_delivered, 700);
    }

    #[tokio::test]
    async fn should_stop_and_release_when_sink_cancels() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().times(1).returning(|_| {
            Ok(ScrollStart {
                page: Page {
                    documents: records(0, 10),
                    cursor: Cursor::new("cursor-0"),
                },
                total_hits: 30,
            })
        });
        backend.expect_erased_advance_scroll().never();
        backend
            .expect_erased_release_scroll()
            .times(1)
            .withf(|cursor| cursor.to_string() == "cursor-0")
            .returning(|_| Ok(()));

        let report = backend
            .scroll_documents(request(10), |_: Vec<Record>| ControlFlow::Break(()))
            .await
            .expect("cancelled scan");

        assert_eq!(report.status, ScanStatus::Cancelled);
        assert_eq!(report.pages_delivered, 1);
        assert_eq!(report.pages_expected, 3);
    }

    #[tokio::test]
    async fn should_not_advance_an_expired_cursor() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().times(1).returning(|_| {
            Ok(ScrollStart {
                page: Page {
                    documents: records(0, 2),
                    cursor: Cursor::new("cursor-0"),
                },
                total_hits: 4,
            })
        });
        backend.expect_erased_advance_scroll().never();
        backend
            .expect_erased_release_scroll()
            .times(1)
            .returning(|_| Ok(()));

        let res = backend
            .scroll_documents(
                request(2).with_cursor_ttl(Duration::from_millis(5)),
                |_: Vec<Record>| {
                    std::thread::sleep(Duration::from_millis(30));
                    ControlFlow::Continue(())
                },
            )
            .await;

        match res {
            Err(ModelError::ScrollAdvance {
                pages_delivered,
                source,
                ..
            }) => {
                assert_eq!(pages_delivered, 1);
                assert!(source.to_string().contains("Cursor Expired"));
            }
            other => panic!("expected a scroll advance error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn should_reject_zero_page_size() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().never();

        let res = backend
            .scroll_documents(request(0), |_: Vec<Record>| ControlFlow::Continue(()))
            .await;

        assert!(std::matches!(
            res,
            Err(ModelError::InvalidPageSize { page_size: 0 })
        ));
    }

    #[tokio::test]
    async fn should_reject_page_size_above_result_window() {
        let mut backend = MockErasedScroll::new();
        backend.expect_erased_open_scroll().never();

        for page_size in [MAX_PAGE_SIZE + 1, u64::MAX] {
            let res = backend
                .scroll_documents(request(page_size), |_: Vec<Record>| {
                    ControlFlow::Continue(())
                })
                .await;

            match res {
                Err(ModelError::InvalidPageSize { page_size: rejected }) => {
                    assert_eq!(rejected, page_size)
                }
                other => panic!("expected an invalid page size, got {:?}", other),
            }
        }

        let mut backend = paging_backend(3, MAX_PAGE_SIZE);
        backend
            .expect_erased_release_scroll()
            .times(1)
            .returning(|_| Ok(()));
        let report = backend
            .scroll_documents(request(MAX_PAGE_SIZE), |_: Vec<Record>| {
                ControlFlow::Continue(())
            })
            .await
            .expect("largest page size is accepted");
        assert_eq!(report.documents_delivered, 3);
    }
}
