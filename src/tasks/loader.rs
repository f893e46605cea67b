use std::future::Future;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::buffered::LoadToken;
use crate::error::Error;
use crate::events::{LoadCompleted, LoadImage, PreparedImage};

/// Where image bytes come from.
pub trait ImageSource: Clone + Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = crate::error::Result<Vec<u8>>> + Send;
}

impl ImageSource for ApiClient {
    fn fetch(&self, url: &str) -> impl Future<Output = crate::error::Result<Vec<u8>>> + Send {
        self.fetch_bytes(url)
    }
}

// Full decode is the off-screen validation: truncated or corrupt data fails
// here instead of on the display.
fn prepare(url: String, bytes: Vec<u8>) -> crate::error::Result<PreparedImage> {
    let decoded = image::load_from_memory(&bytes)?;
    Ok(PreparedImage {
        url,
        width: decoded.width(),
        height: decoded.height(),
        bytes,
    })
}

async fn load<S: ImageSource>(source: S, url: String) -> Result<PreparedImage, String> {
    let bytes = source.fetch(&url).await.map_err(|err| err.to_string())?;
    let decoded = tokio::task::spawn_blocking(move || prepare(url, bytes))
        .await
        .map_err(|err| format!("decode task failed: {err}"))?;
    decoded.map_err(|err: Error| err.to_string())
}

/// Fetch and decode requested images off-screen.
///
/// Requests arrive through a watch channel that only holds the latest one,
/// so requests superseded before a fetch slot frees up are never fetched.
/// Every reply carries the token of its request; deciding whether a reply is
/// still wanted is left to the receiver. There is no network cancellation,
/// superseded fetches that already started simply run to completion.
pub async fn run<S: ImageSource>(
    mut load_rx: watch::Receiver<Option<LoadImage>>,
    to_manager: Sender<LoadCompleted>,
    source: S,
    cancel: CancellationToken,
    max_in_flight: usize,
) -> Result<()> {
    let mut tasks: JoinSet<(LoadToken, Result<PreparedImage, String>)> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => break,

            // Accept the latest load request while under limit
            Ok(()) = load_rx.changed(), if tasks.len() < max_in_flight => {
                let request = load_rx.borrow_and_update().clone();
                if let Some(LoadImage { token, url }) = request {
                    debug!(%token, url = %url, "loading off-screen");
                    let source = source.clone();
                    tasks.spawn(async move { (token, load(source, url).await) });
                }
            }

            // Handle completed loads as they finish
            Some(join_res) = tasks.join_next() => {
                match join_res {
                    Ok((token, result)) => {
                        if let Err(err) = &result {
                            debug!(%token, error = %err, "image load failed");
                        }
                        if to_manager.send(LoadCompleted { token, result }).await.is_err() {
                            warn!("manager channel closed");
                            break;
                        }
                    }
                    Err(err) => warn!("load task panicked: {err}"),
                }
            }

            else => break,
        }
    }
    Ok(())
}
