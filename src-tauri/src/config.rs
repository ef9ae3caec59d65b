//! Startup configuration read from the environment.
//!
//! `run()` loads a `.env` file first (dotenvy), so every value here may
//! also come from there.

use std::fmt;

/// Required: the Gemini API key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
/// Optional: model used for all three calls.
pub const MODEL_VAR: &str = "STREAMER_COMPANION_MODEL";
/// Optional: override for the Generative Language endpoint.
pub const API_BASE_VAR: &str = "STREAMER_COMPANION_API_BASE";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// An API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_present(&self) -> bool {
        !self.0.trim().is_empty()
    }

    pub fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            write!(f, "Credential(<{} chars>)", self.expose().len())
        } else {
            f.write_str("Credential(<empty>)")
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credential: Credential,
    pub model: String,
    pub api_base: String,
}

impl AppConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credential = lookup(API_KEY_VAR)
            .map(Credential::new)
            .filter(Credential::is_present)
            .ok_or(ConfigError::MissingCredential { var: API_KEY_VAR })?;

        let model = non_empty(lookup(MODEL_VAR)).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = non_empty(lookup(API_BASE_VAR))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            credential,
            model,
            api_base,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro da API: A variável de ambiente '{var}' não foi configurada.")]
    MissingCredential { var: &'static str },
}
