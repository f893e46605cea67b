pub mod api;
pub mod auto_advance;
pub mod buffered;
pub mod config;
pub mod cursor;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod history;
pub mod input;
pub mod pipeline;
pub mod preferences;
pub mod retry;
pub mod storage;
pub mod suggest;
pub mod tasks {
    pub mod input;
    pub mod loader;
    pub mod manager;
    pub mod search;
    pub mod viewer;
}
