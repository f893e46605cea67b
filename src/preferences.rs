//! User preferences persisted through [`Storage`].
//!
//! Every value is read once at startup (falling back to its default) and
//! written back immediately whenever it changes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;
use crate::history::ExpressionHistory;
use crate::storage::Storage;

pub const DEFAULT_EXPRESSION: &str = "path like '%wallpaper%'";
pub const DEFAULT_UPDATE_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    AutoNext,
    Clock,
    Path,
    Tags,
    Position,
    Random,
    Shuffle,
}

impl Toggle {
    pub const ALL: [Self; 7] = [
        Self::AutoNext,
        Self::Clock,
        Self::Path,
        Self::Tags,
        Self::Position,
        Self::Random,
        Self::Shuffle,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::AutoNext => "auto-next",
            Self::Clock => "show-clock",
            Self::Path => "show-path",
            Self::Tags => "show-tags",
            Self::Position => "show-position",
            Self::Random => "random",
            Self::Shuffle => "shuffle",
        }
    }

    pub fn default_value(self) -> bool {
        matches!(self, Self::AutoNext | Self::Clock | Self::Shuffle)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" | "auto-next" | "interval" => Ok(Self::AutoNext),
            "clock" | "show-clock" => Ok(Self::Clock),
            "path" | "show-path" => Ok(Self::Path),
            "tags" | "show-tags" => Ok(Self::Tags),
            "position" | "show-position" => Ok(Self::Position),
            "random" => Ok(Self::Random),
            "shuffle" => Ok(Self::Shuffle),
            other => Err(format!("unknown toggle '{other}'")),
        }
    }
}

/// Which overlays the viewer should draw next to the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overlays {
    pub clock: bool,
    pub path: bool,
    pub tags: bool,
    pub position: bool,
}

#[derive(Debug)]
pub struct Preferences {
    storage: Storage,
    toggles: [bool; 7],
    search_expression: String,
    update_interval: Option<i64>,
    history: ExpressionHistory,
}

impl Preferences {
    pub fn load(storage: Storage) -> Self {
        let mut toggles = [false; 7];
        for toggle in Toggle::ALL {
            toggles[toggle.index()] = storage.get(toggle.key(), toggle.default_value());
        }
        let search_expression = storage.get("search-expression", DEFAULT_EXPRESSION.to_string());
        let update_interval = storage.get("update-interval", Some(DEFAULT_UPDATE_INTERVAL_SECS));
        let history = ExpressionHistory::load(&storage);
        Self {
            storage,
            toggles,
            search_expression,
            update_interval,
            history,
        }
    }

    pub fn get(&self, toggle: Toggle) -> bool {
        self.toggles[toggle.index()]
    }

    pub fn set(&mut self, toggle: Toggle, value: bool) -> Result<()> {
        self.toggles[toggle.index()] = value;
        self.storage.set(toggle.key(), &value)
    }

    /// Flip `toggle` and return its new value.
    pub fn toggle(&mut self, toggle: Toggle) -> Result<bool> {
        let value = !self.get(toggle);
        self.set(toggle, value)?;
        Ok(value)
    }

    pub fn search_expression(&self) -> &str {
        &self.search_expression
    }

    pub fn set_search_expression(&mut self, expression: &str) -> Result<()> {
        self.search_expression = expression.to_string();
        self.storage.set("search-expression", expression)
    }

    /// Auto-advance interval; `None` when unset or not positive.
    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs as u64))
    }

    /// Values `<= 0` unset the interval.
    pub fn set_update_interval(&mut self, secs: i64) -> Result<()> {
        self.update_interval = (secs > 0).then_some(secs);
        self.storage.set("update-interval", &self.update_interval)
    }

    pub fn history(&self) -> &ExpressionHistory {
        &self.history
    }

    pub fn record_expression(&mut self, expression: &str) {
        self.history.push(expression);
        if let Err(err) = self.history.save(&mut self.storage) {
            warn!(error = %err, "failed to persist expression history");
        }
    }

    pub fn overlays(&self) -> Overlays {
        Overlays {
            clock: self.get(Toggle::Clock),
            path: self.get(Toggle::Path),
            tags: self.get(Toggle::Tags),
            position: self.get(Toggle::Position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonFileStore;

    #[test]
    fn defaults_match_first_run() {
        let prefs = Preferences::load(Storage::in_memory());
        assert_eq!(prefs.search_expression(), DEFAULT_EXPRESSION);
        assert!(prefs.get(Toggle::AutoNext));
        assert!(prefs.get(Toggle::Clock));
        assert!(prefs.get(Toggle::Shuffle));
        assert!(!prefs.get(Toggle::Path));
        assert!(!prefs.get(Toggle::Tags));
        assert!(!prefs.get(Toggle::Position));
        assert!(!prefs.get(Toggle::Random));
        assert_eq!(prefs.update_interval(), Some(Duration::from_secs(60)));
        assert!(prefs.history().items().is_empty());
    }

    #[test]
    fn every_change_is_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noir.json");
        {
            let mut prefs = Preferences::load(Storage::new(JsonFileStore::open(&path).unwrap()));
            assert!(prefs.toggle(Toggle::Random).unwrap());
            prefs.set_search_expression("#cat").unwrap();
            prefs.set_update_interval(0).unwrap();
            prefs.record_expression("#cat");
        }
        let prefs = Preferences::load(Storage::new(JsonFileStore::open(&path).unwrap()));
        assert!(prefs.get(Toggle::Random));
        assert_eq!(prefs.search_expression(), "#cat");
        assert_eq!(prefs.update_interval(), None);
        assert_eq!(prefs.history().items(), ["#cat"]);
    }

    #[test]
    fn toggle_names_parse() {
        for toggle in Toggle::ALL {
            assert_eq!(toggle.key().parse::<Toggle>(), Ok(toggle));
        }
        assert_eq!("auto".parse::<Toggle>(), Ok(Toggle::AutoNext));
        assert!("bogus".parse::<Toggle>().is_err());
    }
}
