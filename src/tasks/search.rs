use std::future::Future;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::descriptor::ImageDescriptor;
use crate::events::{Query, SearchCompleted, SearchOutcome, SearchRequest};

/// Search side of the remote service.
pub trait SearchBackend: Clone + Send + Sync + 'static {
    fn search(
        &self,
        expression: &str,
        record: bool,
    ) -> impl Future<Output = crate::error::Result<Vec<ImageDescriptor>>> + Send;

    fn refine_with_tag(
        &self,
        expression: &str,
        tag: &str,
    ) -> impl Future<Output = crate::error::Result<String>> + Send;
}

impl SearchBackend for ApiClient {
    fn search(
        &self,
        expression: &str,
        record: bool,
    ) -> impl Future<Output = crate::error::Result<Vec<ImageDescriptor>>> + Send {
        ApiClient::search(self, expression, record)
    }

    fn refine_with_tag(
        &self,
        expression: &str,
        tag: &str,
    ) -> impl Future<Output = crate::error::Result<String>> + Send {
        ApiClient::refine_with_tag(self, expression, tag)
    }
}

async fn execute<B: SearchBackend>(
    backend: B,
    query: Query,
    record: bool,
) -> Result<SearchOutcome, String> {
    let expression = match query {
        Query::Expression(expression) => expression,
        Query::RefineTag { expression, tag } => backend
            .refine_with_tag(&expression, &tag)
            .await
            .map_err(|err| err.to_string())?,
    };
    let items = backend
        .search(&expression, record)
        .await
        .map_err(|err| err.to_string())?;
    Ok(SearchOutcome { expression, items })
}

/// Run searches concurrently and reply with the generation they were asked
/// under; the manager drops replies for superseded generations. Only the
/// latest request is kept while waiting, older ones are never started.
pub async fn run<B: SearchBackend>(
    mut requests: watch::Receiver<Option<SearchRequest>>,
    to_manager: Sender<SearchCompleted>,
    backend: B,
    cancel: CancellationToken,
) -> Result<()> {
    let mut tasks: JoinSet<SearchCompleted> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => break,

            Ok(()) = requests.changed() => {
                let request = requests.borrow_and_update().clone();
                if let Some(SearchRequest { generation, query, record }) = request {
                    debug!(generation, ?query, record, "search requested");
                    let backend = backend.clone();
                    tasks.spawn(async move {
                        let result = execute(backend, query, record).await;
                        SearchCompleted { generation, result }
                    });
                }
            }

            Some(join_res) = tasks.join_next() => {
                match join_res {
                    Ok(done) => {
                        match &done.result {
                            Ok(outcome) => info!(
                                generation = done.generation,
                                expression = %outcome.expression,
                                count = outcome.items.len(),
                                "search completed"
                            ),
                            Err(err) => {
                                warn!(generation = done.generation, error = %err, "search failed")
                            }
                        }
                        if to_manager.send(done).await.is_err() {
                            warn!("manager channel closed");
                            break;
                        }
                    }
                    Err(err) => warn!("search task panicked: {err}"),
                }
            }

            else => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Clone)]
    struct FakeBackend;

    impl SearchBackend for FakeBackend {
        fn search(
            &self,
            expression: &str,
            _record: bool,
        ) -> impl Future<Output = crate::error::Result<Vec<ImageDescriptor>>> + Send {
            let expression = expression.to_string();
            async move {
                if expression.contains("((") {
                    return Err(Error::Api {
                        code: 400,
                        message: "unbalanced".into(),
                    });
                }
                // slow searches finish after fast ones
                if expression == "slow" {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                Ok(vec![ImageDescriptor::new(format!("/{expression}.jpg"), "jpeg")])
            }
        }

        fn refine_with_tag(
            &self,
            expression: &str,
            tag: &str,
        ) -> impl Future<Output = crate::error::Result<String>> + Send {
            let refined = format!("#{tag} and {expression}");
            async move { Ok(refined) }
        }
    }

    #[tokio::test]
    async fn replies_keep_their_generation() {
        let (req_tx, req_rx) = watch::channel(None);
        let (done_tx, mut done_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(req_rx, done_tx, FakeBackend, cancel.clone()));

        for (generation, query) in [
            (1, Query::Expression("slow".into())),
            (
                2,
                Query::RefineTag {
                    expression: "true".into(),
                    tag: "sea".into(),
                },
            ),
            (3, Query::Expression("((".into())),
        ] {
            req_tx
                .send(Some(SearchRequest {
                    generation,
                    query,
                    record: false,
                }))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }

        let mut replies = Vec::new();
        for _ in 0..3 {
            let done = tokio::time::timeout(Duration::from_secs(2), done_rx.recv())
                .await
                .expect("timeout waiting for search")
                .unwrap();
            replies.push(done);
        }
        replies.sort_by_key(|d| d.generation);

        assert_eq!(replies[0].result.as_ref().unwrap().items[0].path(), "/slow.jpg");
        let refined = replies[1].result.as_ref().unwrap();
        assert_eq!(refined.expression, "#sea and true");
        assert_eq!(refined.items[0].path(), "/#sea and true.jpg");
        assert!(replies[2].result.as_ref().unwrap_err().contains("unbalanced"));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
