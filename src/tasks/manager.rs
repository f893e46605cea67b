use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auto_advance::AutoAdvance;
use crate::buffered::{BufferedLoader, Completion};
use crate::cursor::Cursor;
use crate::descriptor::{self, ImageDescriptor};
use crate::events::{
    Command, Frame, LoadCompleted, LoadImage, Navigation, PreparedImage, Query, SearchCompleted,
    SearchOutcome, SearchRequest, ViewerEvent,
};
use crate::preferences::{Preferences, Toggle};
use crate::retry::{RetryBudget, RetryDecision};

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Base URL used to build image URLs.
    pub endpoint: String,
    pub max_load_retries: u32,
    /// Deterministic RNG seed for random start/navigation.
    pub seed: Option<u64>,
}

/// Channel ends owned by the manager.
///
/// Requests to the search and loader workers go through latest-only watch
/// channels so the manager never waits on a worker that may itself be
/// waiting to report back.
pub struct Links {
    pub commands: Receiver<Command>,
    pub searched: Receiver<SearchCompleted>,
    pub loaded: Receiver<LoadCompleted>,
    pub to_search: watch::Sender<Option<SearchRequest>>,
    pub to_loader: watch::Sender<Option<LoadImage>>,
    pub to_viewer: Sender<ViewerEvent>,
}

struct Manager {
    prefs: Preferences,
    options: ManagerOptions,
    cursor: Cursor,
    loader: BufferedLoader,
    retry: RetryBudget,
    timer: AutoAdvance,
    rng: StdRng,
    search_generation: u64,
    path_prefix: String,
    pending_image: Option<ImageDescriptor>,
    last_frame: Option<Frame>,
    to_search: watch::Sender<Option<SearchRequest>>,
    to_loader: watch::Sender<Option<LoadImage>>,
    to_viewer: Sender<ViewerEvent>,
}

/// Owns every piece of slideshow state and serializes all mutations.
///
/// Rules:
/// - A search result replaces the cursor wholesale; replies for superseded
///   searches are dropped.
/// - Every change of the current image starts a new buffered load; only the
///   latest load may reach the viewer.
/// - Failed loads retry on a random image until the retry budget runs out.
/// - Manual navigation re-arms the auto-advance timer; nothing navigates
///   while the overlay panel is open.
pub async fn run(
    links: Links,
    prefs: Preferences,
    options: ManagerOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let Links {
        mut commands,
        mut searched,
        mut loaded,
        to_search,
        to_loader,
        to_viewer,
    } = links;

    let rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let timer = AutoAdvance::new(
        prefs.get(Toggle::AutoNext),
        prefs.update_interval(),
        Instant::now(),
    );
    let mut manager = Manager {
        retry: RetryBudget::new(options.max_load_retries),
        prefs,
        options,
        cursor: Cursor::default(),
        loader: BufferedLoader::new(),
        timer,
        rng,
        search_generation: 0,
        path_prefix: String::new(),
        pending_image: None,
        last_frame: None,
        to_search,
        to_loader,
        to_viewer,
    };

    let initial = manager.prefs.search_expression().to_string();
    manager
        .start_search(Query::Expression(initial), false)
        .await?;

    loop {
        let deadline = manager.timer.deadline();
        select! {
            _ = cancel.cancelled() => break,

            Some(command) = commands.recv() => {
                manager.on_command(command).await?;
            }

            Some(done) = searched.recv() => {
                manager.on_search_completed(done).await?;
            }

            Some(done) = loaded.recv() => {
                manager.on_load_completed(done).await?;
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if manager.timer.on_tick(Instant::now()) {
                    debug!("auto-advance");
                    manager.navigate(Navigation::Next, false).await?;
                }
            }

            else => break,
        }
    }

    Ok(())
}

impl Manager {
    async fn start_search(&mut self, query: Query, record: bool) -> Result<()> {
        self.search_generation += 1;
        let label = match &query {
            Query::Expression(expression) => expression.clone(),
            Query::RefineTag { expression, tag } => format!("#{tag} in {expression}"),
        };
        info!(generation = self.search_generation, query = %label, "searching");
        self.emit(ViewerEvent::Searching(label)).await;
        self.to_search
            .send(Some(SearchRequest {
                generation: self.search_generation,
                query,
                record,
            }))
            .map_err(|_| anyhow::anyhow!("search channel closed"))
    }

    async fn on_command(&mut self, command: Command) -> Result<()> {
        let now = Instant::now();
        match command {
            Command::Navigate(nav) => self.navigate(nav, true).await?,
            Command::Search(expression) => {
                self.close_overlay(now);
                if let Err(err) = self.prefs.set_search_expression(&expression) {
                    warn!(error = %err, "failed to persist search expression");
                }
                self.start_search(Query::Expression(expression), true)
                    .await?;
            }
            Command::RefineTag(tag) => {
                self.close_overlay(now);
                let expression = self.prefs.search_expression().to_string();
                self.start_search(Query::RefineTag { expression, tag }, true)
                    .await?;
            }
            Command::TogglePanel => {
                let open = !self.timer.overlay_open();
                self.timer.set_overlay_open(open, now);
                info!(open, "overlay panel");
            }
            Command::SetInterval(secs) => {
                if let Err(err) = self.prefs.set_update_interval(secs) {
                    warn!(error = %err, "failed to persist update interval");
                }
                self.timer.set_interval(self.prefs.update_interval(), now);
                match self.timer.effective_interval() {
                    Some(interval) => info!(
                        interval = %humantime::format_duration(interval),
                        "update interval changed"
                    ),
                    None => info!("update interval unset"),
                }
            }
            Command::Toggle(toggle) => {
                let value = match self.prefs.toggle(toggle) {
                    Ok(value) => value,
                    Err(err) => {
                        warn!(error = %err, %toggle, "failed to persist toggle");
                        self.prefs.get(toggle)
                    }
                };
                info!(%toggle, value, "preference changed");
                match toggle {
                    Toggle::AutoNext => self.timer.set_enabled(value, now),
                    Toggle::Clock | Toggle::Path | Toggle::Tags | Toggle::Position => {
                        self.redraw().await
                    }
                    Toggle::Random | Toggle::Shuffle => {}
                }
            }
            Command::Status => self.log_status(),
        }
        Ok(())
    }

    fn close_overlay(&mut self, now: Instant) {
        if self.timer.overlay_open() {
            self.timer.set_overlay_open(false, now);
        }
    }

    async fn navigate(&mut self, nav: Navigation, manual: bool) -> Result<()> {
        if manual && self.timer.overlay_open() {
            debug!(?nav, "ignoring navigation while the overlay is open");
            return Ok(());
        }
        let before = self.cursor.position();
        self.cursor = self.apply(nav);
        if manual {
            self.timer.on_manual_navigation(Instant::now());
        }
        if self.cursor.position() != before {
            debug!(?nav, position = ?self.cursor.position(), "cursor moved");
            self.show_current().await?;
        }
        Ok(())
    }

    fn apply(&mut self, nav: Navigation) -> Cursor {
        let cursor = &self.cursor;
        match nav {
            Navigation::Forward(n) => cursor.forward(n),
            Navigation::Backward(n) => cursor.backward(n),
            Navigation::First(n) => cursor.first(n),
            Navigation::Last(n) => cursor.last(n),
            Navigation::Random => cursor.random(&mut self.rng),
            Navigation::Hide => cursor.hide(),
            Navigation::Step if cursor.in_the_past() => cursor.forward(1),
            Navigation::Next | Navigation::Step => {
                if self.prefs.get(Toggle::Random) {
                    cursor.random(&mut self.rng)
                } else if cursor.in_the_past() {
                    cursor.forward(1)
                } else {
                    cursor.first(1)
                }
            }
        }
    }

    /// Start a buffered load for the cursor's current image.
    async fn show_current(&mut self) -> Result<()> {
        let Some(image) = self.cursor.current_image().cloned() else {
            self.loader.clear();
            self.pending_image = None;
            self.last_frame = None;
            self.emit(ViewerEvent::NoImage { reason: None }).await;
            return Ok(());
        };
        let url = match descriptor::image_url(&self.options.endpoint, &image) {
            Ok(url) => url.to_string(),
            Err(err) => {
                error!(path = image.path(), error = %err, "cannot build image url");
                self.loader.clear();
                self.pending_image = None;
                self.last_frame = None;
                self.emit(ViewerEvent::NoImage {
                    reason: Some(err.to_string()),
                })
                .await;
                return Ok(());
            }
        };
        let token = self.loader.request(url.clone());
        self.pending_image = Some(image);
        self.to_loader
            .send(Some(LoadImage { token, url }))
            .map_err(|_| anyhow::anyhow!("loader channel closed"))
    }

    async fn on_search_completed(&mut self, done: SearchCompleted) -> Result<()> {
        if done.generation != self.search_generation {
            debug!(
                generation = done.generation,
                latest = self.search_generation,
                "dropping superseded search result"
            );
            return Ok(());
        }
        match done.result {
            Ok(outcome) => self.on_search_result(outcome).await,
            Err(err) => {
                warn!(error = %err, "search failed");
                if self.loader.visible_url().is_some() {
                    self.emit(ViewerEvent::Notice(format!("search failed: {err}")))
                        .await;
                } else {
                    self.emit(ViewerEvent::NoImage { reason: Some(err) }).await;
                }
                Ok(())
            }
        }
    }

    async fn on_search_result(&mut self, outcome: SearchOutcome) -> Result<()> {
        let SearchOutcome {
            expression,
            mut items,
        } = outcome;
        self.prefs.record_expression(&expression);
        if self.prefs.search_expression() != expression {
            if let Err(err) = self.prefs.set_search_expression(&expression) {
                warn!(error = %err, "failed to persist search expression");
            }
        }
        if self.prefs.get(Toggle::Shuffle) {
            items.shuffle(&mut self.rng);
        }
        self.path_prefix = descriptor::common_path_prefix(items.iter().map(ImageDescriptor::path));
        let random_start = self.prefs.get(Toggle::Random);
        self.cursor = self.cursor.set_items(items, random_start, &mut self.rng);
        self.retry.reset();
        info!(
            count = self.cursor.len(),
            position = ?self.cursor.position(),
            prefix = %self.path_prefix,
            "result set replaced"
        );
        self.timer.rearm(Instant::now());
        self.show_current().await
    }

    async fn on_load_completed(&mut self, done: LoadCompleted) -> Result<()> {
        let LoadCompleted { token, result } = done;
        match result {
            Ok(image) => match self.loader.complete(token, true) {
                Completion::Shown(url) => {
                    debug!(%token, url = %url, "image ready");
                    self.retry.reset();
                    self.present(image).await;
                }
                _ => debug!(%token, "dropping superseded load"),
            },
            Err(err) => match self.loader.complete(token, false) {
                Completion::Failed(url) => {
                    warn!(%token, url = %url, error = %err, "image failed to load");
                    return self.on_load_failed(url).await;
                }
                _ => debug!(%token, error = %err, "ignoring failure of superseded load"),
            },
        }
        Ok(())
    }

    async fn on_load_failed(&mut self, url: String) -> Result<()> {
        match self.retry.on_failure() {
            RetryDecision::Retry { attempt } => {
                info!(attempt, url = %url, "retrying with another image");
                self.cursor = self.cursor.random(&mut self.rng);
                self.show_current().await
            }
            RetryDecision::GiveUp { failures } => {
                error!(failures, "giving up loading images");
                self.cursor = self.cursor.hide();
                self.loader.clear();
                self.pending_image = None;
                self.last_frame = None;
                self.emit(ViewerEvent::NoImage {
                    reason: Some(format!(
                        "failed to load images after {failures} attempts"
                    )),
                })
                .await;
                Ok(())
            }
        }
    }

    async fn present(&mut self, image: PreparedImage) {
        let Some(descriptor) = self.pending_image.take() else {
            return;
        };
        let frame = Frame {
            display_path: descriptor::display_path(&descriptor, &self.path_prefix).to_string(),
            descriptor,
            image,
            position: self.cursor.position(),
            len: self.cursor.len(),
            overlays: self.prefs.overlays(),
        };
        self.last_frame = Some(frame.clone());
        self.emit(ViewerEvent::Show(frame)).await;
    }

    async fn redraw(&mut self) {
        let overlays = self.prefs.overlays();
        if let Some(frame) = self.last_frame.as_mut() {
            frame.overlays = overlays;
            let frame = frame.clone();
            self.emit(ViewerEvent::Show(frame)).await;
        }
    }

    fn log_status(&self) {
        info!(
            expression = self.prefs.search_expression(),
            position = ?self.cursor.position().map(|p| p + 1),
            count = self.cursor.len(),
            visible = ?self.loader.visible_url(),
            pending = ?self.loader.pending_url(),
            retries = self.retry.attempts(),
            retries_exhausted = self.retry.is_exhausted(),
            auto_next = self.timer.is_running(),
            overlay = self.timer.overlay_open(),
            history = ?self.prefs.history().items(),
            "status"
        );
    }

    async fn emit(&self, event: ViewerEvent) {
        if self.to_viewer.send(event).await.is_err() {
            warn!("viewer channel closed");
        }
    }
}
