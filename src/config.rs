//! Backend Configuration
//!
//! Connection settings for the hosted data service.

use serde::{Deserialize, Serialize};

use crate::error::{KanbanError, Result};

pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const ACCESS_TOKEN_VAR: &str = "SUPABASE_ACCESS_TOKEN";
pub const TIMEOUT_VAR: &str = "SUPABASE_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public (anon) API key sent with every request
    pub anon_key: String,
    /// Signed-in user's JWT; falls back to the anon key when absent
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            access_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Load from process environment, reading `.env` first if one exists
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(KanbanError::config(format!("failed to read .env: {}", e)));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| KanbanError::config(format!("{} is not set", key)))
        };

        let mut config = Self::new(required(URL_VAR)?, required(ANON_KEY_VAR)?);
        config.access_token = lookup(ACCESS_TOKEN_VAR).filter(|t| !t.trim().is_empty());

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                KanbanError::config(format!("{} must be a whole number of seconds, got '{}'", TIMEOUT_VAR, raw))
            })?;
        }

        Ok(config)
    }

    /// Base URL of the REST interface
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url.trim().trim_end_matches('/'))
    }
}
