use crate::{DEFAULT_BASE_URL, RunkeeperError};
use secrecy::SecretString;

/// Login settings for demo programs and tests.
///
/// The library itself never reads the environment; callers pass credentials
/// to [`ReqwestRunkeeperClient::login`](crate::ReqwestRunkeeperClient::login)
/// directly or build one of these first.
#[derive(Clone, Debug)]
pub struct Config {
    pub email: String,
    pub password: SecretString,
    pub base_url: String,
}

impl Config {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, RunkeeperError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, RunkeeperError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let email = get("RUNKEEPER_EMAIL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RunkeeperError::Config("RUNKEEPER_EMAIL missing".into()))?;
        let password = get("RUNKEEPER_PASSWORD")
            .ok_or_else(|| RunkeeperError::Config("RUNKEEPER_PASSWORD missing".into()))?;
        let base_url = get("RUNKEEPER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Ok(Self {
            email,
            password: SecretString::new(password.into()),
            base_url,
        })
    }
}
