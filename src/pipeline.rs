use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::events::{Command, LoadCompleted, SearchCompleted, ViewerEvent};
use crate::preferences::Preferences;
use crate::tasks::loader::{self, ImageSource};
use crate::tasks::manager::{self, Links, ManagerOptions};
use crate::tasks::search::{self, SearchBackend};

// Input -> Manager
pub const COMMAND_CAPACITY: usize = 16;
// Search/Loader -> Manager
pub const REPLY_CAPACITY: usize = 4;
// Manager -> Viewer
pub const VIEWER_CAPACITY: usize = 16;

/// Ends of the pipeline left for the caller: navigation goes in, viewer
/// events come out.
pub struct Endpoints {
    pub commands: Sender<Command>,
    pub viewer: Receiver<ViewerEvent>,
}

/// Spawn the manager, search and loader tasks onto `tasks`.
///
/// Manager to worker requests use latest-only watch channels; every other
/// hop is a small bounded queue.
pub fn spawn<B: SearchBackend, S: ImageSource>(
    tasks: &mut JoinSet<Result<()>>,
    prefs: Preferences,
    options: ManagerOptions,
    backend: B,
    source: S,
    max_in_flight: usize,
    cancel: &CancellationToken,
) -> Endpoints {
    let (command_tx, command_rx) = mpsc::channel::<Command>(COMMAND_CAPACITY);
    let (search_tx, search_rx) = watch::channel(None);
    let (searched_tx, searched_rx) = mpsc::channel::<SearchCompleted>(REPLY_CAPACITY);
    let (load_tx, load_rx) = watch::channel(None);
    let (loaded_tx, loaded_rx) = mpsc::channel::<LoadCompleted>(REPLY_CAPACITY);
    let (viewer_tx, viewer_rx) = mpsc::channel::<ViewerEvent>(VIEWER_CAPACITY);

    tasks.spawn({
        let links = Links {
            commands: command_rx,
            searched: searched_rx,
            loaded: loaded_rx,
            to_search: search_tx,
            to_loader: load_tx,
            to_viewer: viewer_tx,
        };
        let cancel = cancel.clone();
        async move {
            manager::run(links, prefs, options, cancel)
                .await
                .context("manager task failed")
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            search::run(search_rx, searched_tx, backend, cancel)
                .await
                .context("search task failed")
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            loader::run(load_rx, loaded_tx, source, cancel, max_in_flight)
                .await
                .context("loader task failed")
        }
    });

    Endpoints {
        commands: command_tx,
        viewer: viewer_rx,
    }
}

/// Wait for every task, cancelling the rest as soon as one finishes.
/// Returns `false` if any task failed or panicked.
pub async fn drain(tasks: &mut JoinSet<Result<()>>, cancel: &CancellationToken) -> bool {
    let mut clean = true;
    while let Some(res) = tasks.join_next().await {
        cancel.cancel();
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                clean = false;
                error!("task error: {e:?}");
            }
            Err(e) => {
                clean = false;
                error!("join error: {e}");
            }
        }
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn until_cancelled(tasks: &mut JoinSet<Result<()>>, cancel: &CancellationToken) {
        let cancel = cancel.clone();
        tasks.spawn(async move {
            cancel.cancelled().await;
            Ok(())
        });
    }

    #[tokio::test]
    async fn orderly_shutdown_is_clean() {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        until_cancelled(&mut tasks, &cancel);
        until_cancelled(&mut tasks, &cancel);
        cancel.cancel();
        assert!(drain(&mut tasks, &cancel).await);
    }

    #[tokio::test]
    async fn one_failed_task_stops_the_rest_and_is_reported() {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        until_cancelled(&mut tasks, &cancel);
        tasks.spawn(async { Err(anyhow::anyhow!("loader task failed")) });
        assert!(!drain(&mut tasks, &cancel).await);
        assert!(cancel.is_cancelled());
    }

    async fn blow_up() -> Result<()> {
        panic!("viewer blew up")
    }

    #[tokio::test]
    async fn panicked_task_is_reported() {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        tasks.spawn(blow_up());
        assert!(!drain(&mut tasks, &cancel).await);
    }
}
