//! Configuration read from the environment.

use std::env;
use std::fmt::{self, Debug};
use std::path::PathBuf;

use heso_openrouter_model::{OpenRouterConfig, OpenRouterConfigBuilder};

/// Required, the key sent to the provider.
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";
/// Optional, overrides the provider endpoint.
pub const BASE_URL_VAR: &str = "OPENROUTER_BASE_URL";
/// Optional, overrides the model.
pub const MODEL_VAR: &str = "HESO_MODEL";
/// Optional, the `HTTP-Referer` attribution header.
pub const REFERER_VAR: &str = "HESO_REFERER";
/// Optional, the `X-Title` attribution header.
pub const TITLE_VAR: &str = "HESO_TITLE";
/// Optional, where conversations and settings are stored.
pub const DATA_DIR_VAR: &str = "HESO_DATA_DIR";

/// The error type for loading [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is missing or empty.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// No data directory is configured and the platform has none.
    #[error("cannot determine a data directory, set {DATA_DIR_VAR}")]
    NoDataDir,
}

/// Settings of the terminal client.
#[derive(Clone)]
pub struct AppConfig {
    /// The provider API key.
    pub api_key: String,
    /// Provider endpoint override.
    pub base_url: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// `HTTP-Referer` header value.
    pub referer: Option<String>,
    /// `X-Title` header value.
    pub title: Option<String>,
    /// Directory holding the storage slots.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Reads the configuration from environment variables.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as
    /// unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::Missing(API_KEY_VAR))?;
        let data_dir = match get(DATA_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join("heso"))
                .ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            api_key,
            base_url: get(BASE_URL_VAR),
            model: get(MODEL_VAR),
            referer: get(REFERER_VAR),
            title: get(TITLE_VAR),
            data_dir,
        })
    }

    /// Builds the provider configuration with the given persona.
    pub fn openrouter_config(&self, system_prompt: String) -> OpenRouterConfig {
        let mut builder = OpenRouterConfigBuilder::with_api_key(&self.api_key)
            .with_system_prompt(system_prompt);
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        if let Some(referer) = &self.referer {
            builder = builder.with_referer(referer);
        }
        if let Some(title) = &self.title {
            builder = builder.with_title(title);
        }
        builder.build()
    }
}

impl Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<deducted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("referer", &self.referer)
            .field("title", &self.title)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}
