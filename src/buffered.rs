//! Double-buffered image presentation state.
//!
//! Every request is tagged with a monotonically increasing [`LoadToken`].
//! A completion is only allowed to replace the visible image when it carries
//! the token of the most recent request; completions for superseded requests
//! are reported as [`Completion::Stale`] and leave the state untouched.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadToken(u64);

impl LoadToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for LoadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    token: LoadToken,
    url: String,
}

/// Result of feeding a finished off-screen load back into the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The latest request loaded; `url` is now visible.
    Shown(String),
    /// The latest request failed; the visible image is unchanged.
    Failed(String),
    /// A newer request superseded this one.
    Stale,
}

#[derive(Debug, Default)]
pub struct BufferedLoader {
    next_token: u64,
    pending: Option<Pending>,
    visible: Option<String>,
}

impl BufferedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url` as the new target, superseding any in-flight request.
    pub fn request(&mut self, url: impl Into<String>) -> LoadToken {
        self.next_token += 1;
        let token = LoadToken(self.next_token);
        self.pending = Some(Pending {
            token,
            url: url.into(),
        });
        token
    }

    /// Apply the outcome of the off-screen load started for `token`.
    pub fn complete(&mut self, token: LoadToken, loaded: bool) -> Completion {
        match self.pending.take() {
            Some(pending) if pending.token == token => {
                if loaded {
                    self.visible = Some(pending.url.clone());
                    Completion::Shown(pending.url)
                } else {
                    Completion::Failed(pending.url)
                }
            }
            other => {
                self.pending = other;
                Completion::Stale
            }
        }
    }

    /// Drop the pending request without touching the visible image.
    pub fn abandon(&mut self) {
        self.pending = None;
    }

    /// Forget the visible image too (empty or error state).
    pub fn clear(&mut self) {
        self.pending = None;
        self.visible = None;
    }

    pub fn pending_url(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.url.as_str())
    }

    pub fn visible_url(&self) -> Option<&str> {
        self.visible.as_deref()
    }
}
