//! Runkeeper web client: form login, monthly activity listings and lazily
//! fetched per-activity statistics.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub mod activity;
pub mod config;
pub mod http_client;
pub mod markup;
pub mod utils;

pub use activity::{Activity, ActivityDetails, ActivityStats};
pub use http_client::ReqwestRunkeeperClient;

/// Default site origin.
pub const DEFAULT_BASE_URL: &str = "https://runkeeper.com";

/// Cookie granted by the site after a successful login.
pub const AUTH_COOKIE: &str = "checker";

#[derive(Debug, Error)]
pub enum RunkeeperError {
    #[error("endpoint connection error: {0}")]
    EndpointConnection(#[from] reqwest::Error),
    #[error("invalid authentication: login was not accepted")]
    InvalidAuthentication,
    #[error("profile not found on home page")]
    ProfileNotFound,
    #[error("no activities found in listing response")]
    NoActivitiesFound,
    #[error("no activity in {month} {year}")]
    NoActivityInMonth { month: String, year: String },
    #[error("invalid activity id: {0}")]
    InvalidActivityId(String),
    #[error("timestamp parse error: {0}")]
    TimestampParse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// One entry of the month listing, as returned by `/activitiesByDateRange`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ActivitySummary {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub distance: Option<String>,
    #[serde(
        rename = "distanceUnits",
        default,
        deserialize_with = "deserialize_opt_string"
    )]
    pub distance_units: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub activity_id: Option<String>,
    #[serde(
        rename = "elapsedTime",
        default,
        deserialize_with = "deserialize_opt_string"
    )]
    pub elapsed_time: Option<String>,
    #[serde(default)]
    pub live: Option<bool>,
    #[serde(rename = "mainText", default, deserialize_with = "deserialize_opt_string")]
    pub caption: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_opt_string")]
    pub activity_type: Option<String>,
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string().into()),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Session-level operations of an authenticated Runkeeper client.
///
/// [`Activity`] methods take an implementor explicitly instead of holding a
/// pointer back to the client that produced them. Callers must pass the same
/// client (or a clone of it) that returned the activity.
#[async_trait]
pub trait RunkeeperClient: Send + Sync {
    /// Site origin the session was established against, without a trailing slash.
    fn site(&self) -> &str;

    /// Profile identifier of the logged-in user, resolved at most once.
    async fn profile_username(&self) -> Result<String, RunkeeperError>;

    /// All activities of `month` (three-letter abbreviation) in `year`
    /// (defaults to the current year).
    async fn get_activities_month(
        &self,
        month: &str,
        year: Option<&str>,
    ) -> Result<Vec<Activity>, RunkeeperError>;

    /// Raw statistics mapping from the point-data endpoint.
    async fn get_activity_details(
        &self,
        activity_id: &str,
    ) -> Result<serde_json::Value, RunkeeperError>;

    /// HTML of the activity's display page.
    async fn get_activity_page(&self, activity_id: &str) -> Result<String, RunkeeperError>;
}
