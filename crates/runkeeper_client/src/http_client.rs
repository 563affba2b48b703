//! HTTP client implementation for the Runkeeper web site.
//!
//! This module provides a reqwest-based implementation of the
//! [`RunkeeperClient`](crate::RunkeeperClient) trait. The site has no public
//! API for this data, so the client logs in through the HTML form and keeps
//! the resulting cookies for every later request.

use crate::config::Config;
use crate::{
    AUTH_COOKIE, Activity, DEFAULT_BASE_URL, RunkeeperClient, RunkeeperError, markup, utils,
};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Authenticated Runkeeper session using reqwest.
///
/// Clones share the cookie jar and the cached profile identifier.
#[derive(Clone, Debug)]
pub struct ReqwestRunkeeperClient {
    base_url: String,
    email: String,
    client: reqwest::Client,
    cookies: Arc<Jar>,
    profile: Arc<OnceCell<String>>,
}

impl ReqwestRunkeeperClient {
    /// Log in and return an authenticated client.
    ///
    /// # Arguments
    /// * `base_url` - Site origin (e.g., "https://runkeeper.com")
    /// * `email` - Account email
    /// * `password` - Account password, only used for the login form
    pub async fn login(
        base_url: &str,
        email: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, RunkeeperError> {
        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .build()?;
        let this = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.into(),
            client,
            cookies,
            profile: Arc::new(OnceCell::new()),
        };
        this.authenticate(&password).await?;
        Ok(this)
    }

    /// Log in against the public site.
    pub async fn connect(
        email: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, RunkeeperError> {
        Self::login(DEFAULT_BASE_URL, email, password).await
    }

    pub async fn from_config(config: &Config) -> Result<Self, RunkeeperError> {
        Self::login(&config.base_url, config.email.clone(), config.password.clone()).await
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Profile identifier if it has already been resolved.
    pub fn cached_profile(&self) -> Option<&str> {
        self.profile.get().map(String::as_str)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submit the login form and check for the session cookie.
    async fn authenticate(&self, password: &SecretString) -> Result<(), RunkeeperError> {
        let url = self.url("/login");
        let mut form = self.get_hidden_elements(&url).await?;
        form.retain(|(name, _)| name != "email" && name != "password");
        form.push(("email".to_string(), self.email.clone()));
        form.push((
            "password".to_string(),
            password.expose_secret().to_string(),
        ));

        let before = self.auth_cookie_value(&url);
        let resp = self.client.post(&url).form(&form).send().await?;
        log_status(&resp);
        let set_by_response = resp
            .cookies()
            .any(|c| c.name() == AUTH_COOKIE && !c.value().is_empty());
        drop(resp);
        // A redirect hop may have set it instead; only a new or changed
        // value counts, never one left over from the login page.
        let after = self.auth_cookie_value(&url);
        let granted = set_by_response || (after.is_some() && after != before);

        if !granted {
            tracing::warn!("runkeeper login rejected: no {AUTH_COOKIE} cookie granted");
            return Err(RunkeeperError::InvalidAuthentication);
        }
        tracing::info!(site = %self.base_url, "logged in to runkeeper");
        Ok(())
    }

    /// Hidden inputs of the login form (CSRF token and similar).
    async fn get_hidden_elements(&self, url: &str) -> Result<Vec<(String, String)>, RunkeeperError> {
        let page = self.execute_text(self.client.get(url)).await?;
        let fields = markup::extract_hidden_fields(&page);
        tracing::debug!(count = fields.len(), "login form hidden fields");
        Ok(fields)
    }

    /// Current non-empty value of the auth cookie in the session jar.
    fn auth_cookie_value(&self, url: &str) -> Option<String> {
        let url = reqwest::Url::parse(url).ok()?;
        let header = self.cookies.cookies(&url)?;
        cookie_value(header.to_str().ok()?, AUTH_COOKIE).map(str::to_string)
    }

    async fn resolve_profile(&self) -> Result<String, RunkeeperError> {
        let home = self.execute_text(self.client.get(self.url("/home"))).await?;
        let profile = markup::extract_profile_id(&home).ok_or(RunkeeperError::ProfileNotFound)?;
        tracing::info!(profile = %profile, "resolved runkeeper profile");
        Ok(profile)
    }

    /// Execute a request and return the body text.
    ///
    /// Unexpected statuses are only logged: the site answers most failures
    /// with ordinary pages, so the caller's parse step decides the error.
    async fn execute_text(&self, request: reqwest::RequestBuilder) -> Result<String, RunkeeperError> {
        let resp = request.send().await?;
        log_status(&resp);
        Ok(resp.text().await?)
    }
}

fn log_status(resp: &reqwest::Response) {
    let status = resp.status();
    if status.is_success() {
        tracing::debug!(url = %resp.url(), %status, "runkeeper response");
    } else {
        tracing::warn!(url = %resp.url(), %status, "unexpected runkeeper status");
    }
}

/// Non-empty value of the cookie called `name` in a `Cookie` header value.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v)
}

/// Pull the entries for one month out of an `/activitiesByDateRange` body.
fn parse_month_listing(body: &str, month: &str, year: &str) -> Result<Vec<Value>, RunkeeperError> {
    let none_in_month = || RunkeeperError::NoActivityInMonth {
        month: month.to_string(),
        year: year.to_string(),
    };

    let mut json: Value =
        serde_json::from_str(body).map_err(|_| RunkeeperError::NoActivitiesFound)?;
    let activities = json
        .get_mut("activities")
        .map(Value::take)
        .unwrap_or(Value::Null);

    match activities {
        Value::Object(mut years) => {
            if years.is_empty() {
                return Err(none_in_month());
            }
            let entries = years
                .remove(year)
                .and_then(|mut months| months.get_mut(month).map(Value::take));
            match entries {
                Some(Value::Array(entries)) if !entries.is_empty() => Ok(entries),
                _ => Err(none_in_month()),
            }
        }
        // `[]` is accepted as an empty map.
        Value::Array(empty) if empty.is_empty() => Err(none_in_month()),
        _ => Err(RunkeeperError::NoActivitiesFound),
    }
}

#[async_trait]
impl RunkeeperClient for ReqwestRunkeeperClient {
    fn site(&self) -> &str {
        &self.base_url
    }

    async fn profile_username(&self) -> Result<String, RunkeeperError> {
        self.profile
            .get_or_try_init(|| self.resolve_profile())
            .await
            .cloned()
    }

    async fn get_activities_month(
        &self,
        month: &str,
        year: Option<&str>,
    ) -> Result<Vec<Activity>, RunkeeperError> {
        let month = utils::normalize_month(month)
            .ok_or_else(|| RunkeeperError::InvalidInput(format!("invalid month: {month:?}")))?;
        let year = utils::resolve_year(year)
            .ok_or_else(|| RunkeeperError::InvalidInput(format!("invalid year: {year:?}")))?;

        let profile = self.profile_username().await?;
        let start_date = utils::listing_start_date(&month, &year);
        let url = self.url("/activitiesByDateRange");
        let qp = [
            ("userName", profile.as_str()),
            ("startDate", start_date.as_str()),
        ];
        let body = self.execute_text(self.client.get(&url).query(&qp)).await?;

        let activities = parse_month_listing(&body, &month, &year)?
            .iter()
            .map(Activity::from_summary)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(%month, %year, count = activities.len(), "fetched runkeeper activities");
        Ok(activities)
    }

    async fn get_activity_details(&self, activity_id: &str) -> Result<Value, RunkeeperError> {
        let url = self.url("/ajax/pointData");
        let body = self
            .execute_text(self.client.get(&url).query(&[("activityId", activity_id)]))
            .await?;
        serde_json::from_str(&body)
            .map_err(|e| RunkeeperError::InvalidActivityId(format!("{activity_id}: {e}")))
    }

    async fn get_activity_page(&self, activity_id: &str) -> Result<String, RunkeeperError> {
        let profile = self.profile_username().await?;
        let url = self.url(&format!("/user/{profile}/activity/{activity_id}"));
        self.execute_text(self.client.get(&url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cookie_header_lookup() {
        assert_eq!(cookie_value("JSESSIONID=abc; checker=1", "checker"), Some("1"));
        assert_eq!(cookie_value("JSESSIONID=abc; checker=", "checker"), None);
        assert_eq!(cookie_value("JSESSIONID=abc; xchecker=1", "checker"), None);
        assert_eq!(cookie_value("", "checker"), None);
    }

    #[test]
    fn month_listing_returns_entries_in_order() {
        let body = json!({"activities": {"2024": {"Jan": [
            {"activity_id": 1}, {"activity_id": 2}
        ]}}})
        .to_string();
        let entries = parse_month_listing(&body, "Jan", "2024").unwrap();
        assert_eq!(entries, vec![json!({"activity_id": 1}), json!({"activity_id": 2})]);
    }

    #[test]
    fn month_listing_invalid_json() {
        let err = parse_month_listing("<html>login</html>", "Jan", "2024").unwrap_err();
        assert!(matches!(err, RunkeeperError::NoActivitiesFound));
    }

    #[test]
    fn month_listing_missing_key() {
        let err = parse_month_listing(r#"{"other": 1}"#, "Jan", "2024").unwrap_err();
        assert!(matches!(err, RunkeeperError::NoActivitiesFound));
    }

    #[test]
    fn month_listing_empty_variants() {
        for body in [
            r#"{"activities": {}}"#,
            r#"{"activities": []}"#,
            r#"{"activities": {"2023": {"Jan": [{"activity_id": 1}]}}}"#,
            r#"{"activities": {"2024": {"Feb": [{"activity_id": 1}]}}}"#,
            r#"{"activities": {"2024": {"Jan": []}}}"#,
        ] {
            let err = parse_month_listing(body, "Jan", "2024").unwrap_err();
            assert!(
                matches!(err, RunkeeperError::NoActivityInMonth { .. }),
                "{body}"
            );
        }
    }
}
