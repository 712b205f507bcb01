//! Client configuration.

use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Deserializer};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://xandikos:8000";
pub const DEFAULT_CALENDAR_PATH: &str = "/stonewall/calendars/calendar/";
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(5000);

/// `CALDAV_BASE_URL`, `CALDAV_CALENDAR_PATH`, `CALDAV_{LIST,QUERY,SYNC}_TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "CALDAV";
pub const ENV_BASE_URL: &str = "CALDAV_BASE_URL";
pub const ENV_CALENDAR_PATH: &str = "CALDAV_CALENDAR_PATH";
pub const ENV_LIST_TIMEOUT_MS: &str = "CALDAV_LIST_TIMEOUT_MS";
pub const ENV_QUERY_TIMEOUT_MS: &str = "CALDAV_QUERY_TIMEOUT_MS";
pub const ENV_SYNC_TIMEOUT_MS: &str = "CALDAV_SYNC_TIMEOUT_MS";

/// Where the calendar lives and how long the bulk operations may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalDavConfig {
    /// Scheme and authority, without trailing slash.
    pub base_url: String,

    /// Collection path, with leading and trailing slash.
    pub calendar_path: String,

    /// Deadline for `list_events` (PROPFIND plus every GET).
    pub list_timeout: Duration,

    /// Deadline for the `calendar-query` REPORT.
    pub query_timeout: Duration,

    /// Deadline for the `sync-collection` REPORT.
    pub sync_timeout: Duration,
}

impl Default for CalDavConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            calendar_path: DEFAULT_CALENDAR_PATH.to_string(),
            list_timeout: DEFAULT_LIST_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }
}

impl CalDavConfig {
    pub fn new(base_url: impl Into<String>, calendar_path: impl Into<String>) -> Self {
        Self::default()
            .with_base_url(base_url)
            .with_calendar_path(calendar_path)
    }

    /// Defaults overridden by the `CALDAV_*` process environment.
    pub fn from_env() -> Self {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: Environment) -> Self {
        let settings = Config::builder()
            .add_source(environment)
            .build()
            .and_then(|raw| raw.try_deserialize::<EnvSettings>());
        match settings {
            Ok(settings) => settings.apply(Self::default()),
            Err(err) => {
                warn!(error = %err, "ignoring CALDAV_* environment");
                Self::default()
            }
        }
    }

    /// Builder: set the server root. A trailing `/` is dropped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Builder: set the collection path. Leading and trailing `/` are added if missing.
    pub fn with_calendar_path(mut self, calendar_path: impl Into<String>) -> Self {
        let path = calendar_path.into();
        let trimmed = path.trim().trim_matches('/');
        self.calendar_path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        };
        self
    }

    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    /// `{base_url}{calendar_path}`
    pub fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, self.calendar_path)
    }

    /// `{base_url}{calendar_path}{uid}.ics`
    pub fn event_url(&self, uid: &str) -> String {
        format!("{}{}{uid}.ics", self.base_url, self.calendar_path)
    }
}

/// Raw `CALDAV_*` values, keyed by the name after the prefix.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvSettings {
    base_url: Option<String>,
    calendar_path: Option<String>,
    #[serde(deserialize_with = "lenient_millis")]
    list_timeout_ms: Option<u64>,
    #[serde(deserialize_with = "lenient_millis")]
    query_timeout_ms: Option<u64>,
    #[serde(deserialize_with = "lenient_millis")]
    sync_timeout_ms: Option<u64>,
}

impl EnvSettings {
    fn apply(self, mut config: CalDavConfig) -> CalDavConfig {
        if let Some(url) = self.base_url.filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(url);
        }
        if let Some(path) = self.calendar_path.filter(|v| !v.trim().is_empty()) {
            config = config.with_calendar_path(path);
        }
        if let Some(ms) = self.list_timeout_ms {
            config.list_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.query_timeout_ms {
            config.query_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.sync_timeout_ms {
            config.sync_timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// A malformed value leaves the field unset so the default stays.
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) => Ok(Some(ms)),
        Err(_) => {
            warn!(value = %raw, "ignoring malformed timeout");
            Ok(None)
        }
    }
}
