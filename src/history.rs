//! Locally persisted list of issued search expressions, newest first.

use crate::error::Result;
use crate::storage::Storage;

pub const STORAGE_KEY: &str = "expression-history";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionHistory {
    items: Vec<String>,
}

impl ExpressionHistory {
    pub fn load(storage: &Storage) -> Self {
        Self {
            items: storage.get(STORAGE_KEY, Vec::new()),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Move `expression` (trimmed) to the front, dropping older duplicates.
    pub fn push(&mut self, expression: &str) {
        let expression = expression.trim();
        if expression.is_empty() {
            return;
        }
        self.items.retain(|it| it != expression);
        self.items.insert(0, expression.to_string());
    }

    pub fn save(&self, storage: &mut Storage) -> Result<()> {
        storage.set(STORAGE_KEY, &self.items)
    }
}
