//! # View Configuration
//!
//! Per-profile defaults read from a TOML file:
//!
//! ```toml
//! [list]
//! debounce_ms = 300
//! page_size = 10
//! search_fields = ["name", "description"]
//! sort_by = "date"
//! sort_order = "descending"
//!
//! [dashboard]
//! debounce_ms = 500
//! page_size = 12
//! auto_refresh = true
//! refresh_interval_secs = 30
//! ```
//!
//! Every key is optional; omitted keys keep the profile's built-in default.

use crate::debounce::{DASHBOARD_QUIET_PERIOD, DEFAULT_QUIET_PERIOD};
use crate::error::ConfigError;
use crate::query::{Query, SortOrder};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Period between automatic reloads when a view turns them on.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    List,
    Dashboard,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "dashboard" => Ok(Self::Dashboard),
            other => Err(format!("unknown profile '{}' (expected list or dashboard)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewProfile {
    pub debounce: Duration,
    pub page_size: usize,
    pub search_fields: Vec<String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
    /// Reload periodically once the view has loaded.
    pub auto_refresh: bool,
    pub refresh_interval: Duration,
}

impl ViewProfile {
    pub fn list() -> Self {
        Self {
            debounce: DEFAULT_QUIET_PERIOD,
            page_size: 10,
            search_fields: vec!["name".into(), "description".into()],
            sort_by: "date".into(),
            sort_order: SortOrder::Descending,
            auto_refresh: false,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn dashboard() -> Self {
        Self {
            debounce: DASHBOARD_QUIET_PERIOD,
            page_size: 12,
            ..Self::list()
        }
    }

    /// Starting query for a view using this profile.
    pub fn base_query(&self) -> Query {
        Query::default()
            .with_search_fields(self.search_fields.iter().cloned())
            .sorted_by(self.sort_by.clone(), self.sort_order)
            .with_page_size(self.page_size)
    }

    fn apply(mut self, overrides: ProfileOverrides) -> Self {
        if let Some(ms) = overrides.debounce_ms {
            self.debounce = Duration::from_millis(ms);
        }
        if let Some(size) = overrides.page_size {
            self.page_size = size;
        }
        if let Some(fields) = overrides.search_fields {
            self.search_fields = fields;
        }
        if let Some(field) = overrides.sort_by {
            self.sort_by = field;
        }
        if let Some(order) = overrides.sort_order {
            self.sort_order = order;
        }
        if let Some(enabled) = overrides.auto_refresh {
            self.auto_refresh = enabled;
        }
        if let Some(secs) = overrides.refresh_interval_secs {
            self.refresh_interval = Duration::from_secs(secs);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub list: ViewProfile,
    pub dashboard: ViewProfile,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            list: ViewProfile::list(),
            dashboard: ViewProfile::dashboard(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    list: ProfileOverrides,
    #[serde(default)]
    dashboard: ProfileOverrides,
}

#[derive(Deserialize, Default)]
struct ProfileOverrides {
    debounce_ms: Option<u64>,
    page_size: Option<usize>,
    search_fields: Option<Vec<String>>,
    sort_by: Option<String>,
    sort_order: Option<SortOrder>,
    auto_refresh: Option<bool>,
    refresh_interval_secs: Option<u64>,
}

impl FromStr for ViewConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let raw: RawConfig = toml::from_str(content)?;
        Ok(Self {
            list: ViewProfile::list().apply(raw.list),
            dashboard: ViewProfile::dashboard().apply(raw.dashboard),
        })
    }
}

impl ViewConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Like [`ViewConfig::load`], but a broken file is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn profile(&self, profile: Profile) -> &ViewProfile {
        match profile {
            Profile::List => &self.list,
            Profile::Dashboard => &self.dashboard,
        }
    }
}
