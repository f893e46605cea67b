use crate::buffered::LoadToken;
use crate::descriptor::ImageDescriptor;
use crate::preferences::{Overlays, Toggle};

/// Cursor movement requested by the user or the auto-advance timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Forward(usize),
    Backward(usize),
    First(usize),
    Last(Option<usize>),
    Random,
    Hide,
    /// Same step the auto-advance timer takes.
    Next,
    /// Forward while there are items ahead, otherwise [`Navigation::Next`].
    Step,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Navigate(Navigation),
    Search(String),
    RefineTag(String),
    TogglePanel,
    SetInterval(i64),
    Toggle(Toggle),
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Expression(String),
    RefineTag { expression: String, tag: String },
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: Query,
    /// Append to server-side history.
    pub record: bool,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Expression actually searched (after tag rewriting).
    pub expression: String,
    pub items: Vec<ImageDescriptor>,
}

#[derive(Debug)]
pub struct SearchCompleted {
    pub generation: u64,
    pub result: Result<SearchOutcome, String>,
}

#[derive(Debug, Clone)]
pub struct LoadImage {
    pub token: LoadToken,
    pub url: String,
}

/// Bytes confirmed to decode as an image.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct LoadCompleted {
    pub token: LoadToken,
    pub result: Result<PreparedImage, String>,
}

/// Everything the viewer needs to present one image.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: PreparedImage,
    pub descriptor: ImageDescriptor,
    pub display_path: String,
    pub position: Option<usize>,
    pub len: usize,
    pub overlays: Overlays,
}

#[derive(Debug, Clone)]
pub enum ViewerEvent {
    Show(Frame),
    Searching(String),
    /// Nothing to show; `reason` is `None` for a plain empty result.
    NoImage { reason: Option<String> },
    /// Message that leaves the current image in place.
    Notice(String),
}
