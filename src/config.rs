use std::fmt;
use std::time::Duration;

use crate::error::FetchError;

pub const CLIENT_ID_VAR: &str = "FORTYTWO_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "FORTYTWO_CLIENT_SECRET";

pub const DEFAULT_API_URL: &str = "https://api.intra.42.fr";
pub const DEFAULT_CAMPUS_ID: u32 = 64;
pub const DEFAULT_CURSUS_ID: u32 = 21;

/// OAuth client credentials registered on the intra.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, FetchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FetchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| FetchError::Configuration(format!("{key} must be set")))
        };

        Ok(Self {
            client_id: read(CLIENT_ID_VAR)?,
            client_secret: read(CLIENT_SECRET_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Query scope for the cursus_users collection.
#[derive(Debug, Clone)]
pub struct RosterQuery {
    pub campus_id: u32,
    pub cursus_id: u32,
    pub level_range: String,
    pub sort: String,
}

impl Default for RosterQuery {
    fn default() -> Self {
        Self {
            campus_id: DEFAULT_CAMPUS_ID,
            cursus_id: DEFAULT_CURSUS_ID,
            level_range: "4,30".to_string(),
            sort: "-level".to_string(),
        }
    }
}

impl RosterQuery {
    pub fn path(&self) -> String {
        format!("/v2/cursus/{}/cursus_users", self.cursus_id)
    }

    pub fn params(&self) -> Vec<(String, String)> {
        vec![
            ("filter[campus_id]".to_string(), self.campus_id.to_string()),
            ("range[level]".to_string(), self.level_range.clone()),
            ("sort".to_string(), self.sort.clone()),
        ]
    }
}

/// Pacing and hardening knobs for the pagination loop.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub page_size: u32,
    pub page_delay: Duration,
    pub default_retry_after: Duration,
    pub max_retry_wait: Duration,
    pub max_rate_limit_retries: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_delay: Duration::from_millis(500),
            default_retry_after: Duration::from_secs(5),
            max_retry_wait: Duration::from_secs(120),
            max_rate_limit_retries: 10,
        }
    }
}

impl FetchOptions {
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.page_size == 0 {
            return Err(FetchError::Configuration(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
