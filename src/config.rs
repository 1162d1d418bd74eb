use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

const DESTROY_DELAY_VAR: &str = "SWEEP_DESTROY_DELAY_MS";
const CONFIRM_DELAY_VAR: &str = "SWEEP_CONFIRM_DELAY_MS";
const PREFIX_VAR: &str = "SWEEP_CATEGORY_PREFIX";
const KEEP_VAR: &str = "SWEEP_KEEP_CATEGORY";
const DESTROY_VAR: &str = "SWEEP_DESTROY_CATEGORY";
const DESTROYED_VAR: &str = "SWEEP_DESTROYED_CATEGORY";

/// Names of the decision categories; each one is also a file name in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categories {
    pub keep: String,
    pub destroy: String,
    pub destroyed: String,
}

impl Categories {
    pub fn with_prefix(prefix: &str) -> Self {
        Categories {
            keep: format!("{prefix}.keep"),
            destroy: format!("{prefix}.destroy"),
            destroyed: format!("{prefix}.destroyed"),
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.keep, &self.destroy, &self.destroyed].map(String::as_str)
    }
}

impl Default for Categories {
    fn default() -> Self {
        Categories::with_prefix("sweep")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Pause between two remote deletions.
    pub destroy_delay: Duration,
    /// Pause after the KEEP / DELETE banners.
    pub confirm_delay: Duration,
    pub categories: Categories,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            destroy_delay: Duration::from_millis(2750),
            confirm_delay: Duration::from_millis(200),
            categories: Categories::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup, falling back to defaults for absent keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let millis = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidNumber { key, value }),
            }
        };

        let name = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut categories = name(PREFIX_VAR)
            .map(|prefix| Categories::with_prefix(&prefix))
            .unwrap_or(defaults.categories);
        // Single names win over the prefix, e.g. `yatat.kill` for an old working directory.
        if let Some(keep) = name(KEEP_VAR) {
            categories.keep = keep;
        }
        if let Some(destroy) = name(DESTROY_VAR) {
            categories.destroy = destroy;
        }
        if let Some(destroyed) = name(DESTROYED_VAR) {
            categories.destroyed = destroyed;
        }

        Ok(Settings {
            destroy_delay: millis(DESTROY_DELAY_VAR, defaults.destroy_delay)?,
            confirm_delay: millis(CONFIRM_DELAY_VAR, defaults.confirm_delay)?,
            categories,
        })
    }
}

/// OAuth 1.0a user-context keys for the remote API.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    /// Reads a dotenv-style file without touching the process environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for item in dotenv::from_path_iter(path)? {
            let (key, value) = item?;
            values.insert(key, value);
        }
        Self::from_map(&values)
    }

    fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| {
            values
                .get(key)
                .filter(|value| !value.trim().is_empty())
                .cloned()
                .ok_or(ConfigError::MissingKey(key))
        };
        Ok(Credentials {
            consumer_key: get("TWITTER_CONSUMER_KEY")?,
            consumer_secret: get("TWITTER_CONSUMER_SECRET")?,
            access_token: get("TWITTER_ACCESS_TOKEN")?,
            access_token_secret: get("TWITTER_ACCESS_TOKEN_SECRET")?,
        })
    }
}
