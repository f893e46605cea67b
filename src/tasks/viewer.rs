use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use chrono_tz::Tz;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::events::{Frame, ViewerEvent};

pub const CLOCK_FORMAT: &str = "%Y-%m-%d (%a) %H:%M";
const CLOCK_REFRESH: Duration = Duration::from_secs(60);

/// Where presented images end up.
pub trait Display: Send + 'static {
    fn show(&mut self, frame: &Frame, overlays: &[String]) -> Result<()>;
    fn clear(&mut self, reason: Option<&str>) -> Result<()>;
}

/// Logs what would be on screen.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl Display for LogDisplay {
    fn show(&mut self, frame: &Frame, overlays: &[String]) -> Result<()> {
        info!(
            path = frame.descriptor.path(),
            width = frame.image.width,
            height = frame.image.height,
            overlays = ?overlays,
            "showing image"
        );
        Ok(())
    }

    fn clear(&mut self, reason: Option<&str>) -> Result<()> {
        match reason {
            Some(reason) => warn!(reason, "no image"),
            None => info!("no image"),
        }
        Ok(())
    }
}

/// Keeps the current image at a fixed path; external viewers can watch it.
#[derive(Debug)]
pub struct FileDisplay {
    path: PathBuf,
}

impl FileDisplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Display for FileDisplay {
    fn show(&mut self, frame: &Frame, overlays: &[String]) -> Result<()> {
        // replace atomically so readers never see a half-written image
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &frame.image.bytes)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        LogDisplay.show(frame, overlays)
    }

    fn clear(&mut self, reason: Option<&str>) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to remove {}", self.path.display()));
            }
        }
        LogDisplay.clear(reason)
    }
}

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub clock_timezone: Option<Tz>,
    /// How often a visible clock overlay is redrawn.
    pub clock_refresh: Duration,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            clock_timezone: None,
            clock_refresh: CLOCK_REFRESH,
        }
    }
}

pub fn clock_text(tz: Option<Tz>) -> String {
    match tz {
        Some(tz) => Utc::now().with_timezone(&tz).format(CLOCK_FORMAT).to_string(),
        None => Local::now().format(CLOCK_FORMAT).to_string(),
    }
}

/// Overlay lines for `frame`, in drawing order.
pub fn overlay_lines(frame: &Frame, clock: Option<&str>, tags: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    let overlays = frame.overlays;
    if overlays.clock {
        if let Some(clock) = clock {
            lines.push(clock.to_string());
        }
    }
    if overlays.path {
        lines.push(frame.display_path.clone());
    }
    if overlays.tags && !tags.is_empty() {
        lines.push(tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" "));
    }
    if overlays.position {
        if let Some(position) = frame.position {
            lines.push(format!("{} / {}", position + 1, frame.len));
        }
    }
    lines
}

async fn frame_tags(api: Option<&ApiClient>, frame: &Frame) -> Vec<String> {
    let Some(api) = api.filter(|_| frame.overlays.tags) else {
        return Vec::new();
    };
    match api.file_tags(frame.descriptor.path()).await {
        Ok(tags) => tags,
        Err(err) => {
            debug!(path = frame.descriptor.path(), error = %err, "failed to fetch tags");
            Vec::new()
        }
    }
}

/// Present frames as the manager hands them over.
pub async fn run<D: Display>(
    mut events: Receiver<ViewerEvent>,
    mut display: D,
    options: ViewerOptions,
    api: Option<ApiClient>,
    cancel: CancellationToken,
) -> Result<()> {
    // the frame on screen and its tags, kept for clock redraws
    let mut current: Option<(Frame, Vec<String>)> = None;
    let mut clock = tokio::time::interval(options.clock_refresh.max(Duration::from_millis(1)));
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    clock.tick().await;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ViewerEvent::Show(frame) => {
                        let tags = frame_tags(api.as_ref(), &frame).await;
                        let clock_now = clock_text(options.clock_timezone);
                        let lines = overlay_lines(&frame, Some(&clock_now), &tags);
                        if let Err(err) = display.show(&frame, &lines) {
                            warn!("display failed: {err:#}");
                        }
                        current = Some((frame, tags));
                    }
                    ViewerEvent::Searching(query) => info!(%query, "searching"),
                    ViewerEvent::NoImage { reason } => {
                        current = None;
                        if let Err(err) = display.clear(reason.as_deref()) {
                            warn!("display failed: {err:#}");
                        }
                    }
                    ViewerEvent::Notice(message) => warn!(%message, "notice"),
                }
            }

            _ = clock.tick() => {
                if let Some((frame, tags)) = current.as_ref().filter(|(f, _)| f.overlays.clock) {
                    let clock_now = clock_text(options.clock_timezone);
                    debug!(path = frame.descriptor.path(), clock = %clock_now, "clock redraw");
                    let lines = overlay_lines(frame, Some(&clock_now), tags);
                    if let Err(err) = display.show(frame, &lines) {
                        warn!("display failed: {err:#}");
                    }
                }
            }
        }
    }
    Ok(())
}
