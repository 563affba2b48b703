//! A single workout and its lazily fetched statistics.

use crate::{ActivitySummary, RunkeeperClient, RunkeeperError, markup, utils};
use chrono::NaiveDateTime;
use serde::Deserialize;

/// The four statistics returned together by the point-data endpoint.
///
/// Values are kept exactly as the endpoint sent them (numbers stay numbers,
/// pace stays a `"m:ss"` string).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityStats {
    pub calories: Option<serde_json::Value>,
    pub elevation: Option<serde_json::Value>,
    pub pace: Option<serde_json::Value>,
    pub speed: Option<serde_json::Value>,
}

impl ActivityStats {
    /// Pick the statistics out of a raw point-data mapping. Unknown keys are
    /// ignored; a non-object payload yields no statistics.
    pub fn from_details(details: &serde_json::Value) -> Self {
        let pick = |key: &str| details.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            calories: pick("statsCalories"),
            elevation: pick("statsElevation"),
            pace: pick("statsPace"),
            speed: pick("statsSpeed"),
        }
    }
}

/// Everything one population pass produces.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityDetails {
    pub stats: ActivityStats,
    pub datetime: NaiveDateTime,
}

#[derive(Clone, Debug, Default)]
enum DetailCache {
    #[default]
    Unset,
    Populated(ActivityDetails),
    /// Last population attempt failed. Retried on the next access.
    Failed(String),
}

/// One workout from a month listing.
///
/// Summary fields are available immediately. Statistics and the timestamp are
/// fetched on first access through the client that produced the activity, in
/// a single pass, and cached for the lifetime of the record.
#[derive(Clone, Debug)]
pub struct Activity {
    summary: ActivitySummary,
    cache: DetailCache,
}

impl Activity {
    /// Build from one raw listing entry.
    pub fn from_summary(info: &serde_json::Value) -> Result<Self, RunkeeperError> {
        if !info.is_object() {
            return Err(RunkeeperError::InvalidActivityId(format!(
                "listing entry is not an object: {info}"
            )));
        }
        let summary = ActivitySummary::deserialize(info)
            .map_err(|e| RunkeeperError::InvalidActivityId(e.to_string()))?;
        Ok(Self::new(summary))
    }

    pub fn new(summary: ActivitySummary) -> Self {
        Self {
            summary,
            cache: DetailCache::Unset,
        }
    }

    pub fn summary(&self) -> &ActivitySummary {
        &self.summary
    }

    pub fn activity_id(&self) -> Option<&str> {
        self.summary.activity_id.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.summary.username.as_deref()
    }

    pub fn distance(&self) -> Option<&str> {
        self.summary.distance.as_deref()
    }

    pub fn distance_units(&self) -> Option<&str> {
        self.summary.distance_units.as_deref()
    }

    pub fn elapsed_time(&self) -> Option<&str> {
        self.summary.elapsed_time.as_deref()
    }

    pub fn live(&self) -> Option<bool> {
        self.summary.live
    }

    pub fn caption(&self) -> Option<&str> {
        self.summary.caption.as_deref()
    }

    pub fn activity_type(&self) -> Option<&str> {
        self.summary.activity_type.as_deref()
    }

    pub fn is_populated(&self) -> bool {
        matches!(self.cache, DetailCache::Populated(_))
    }

    /// Reason of the most recent failed population, cleared once one succeeds.
    pub fn last_failure(&self) -> Option<&str> {
        match &self.cache {
            DetailCache::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Raw point-data mapping for `activity_id`.
    pub async fn get_activity_details<C>(
        &self,
        client: &C,
        activity_id: &str,
    ) -> Result<serde_json::Value, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        client.get_activity_details(activity_id).await
    }

    /// Timestamp shown in the subtitle of the activity's page.
    pub async fn get_activity_datetime<C>(
        &self,
        client: &C,
        activity_id: &str,
    ) -> Result<NaiveDateTime, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        let page = client.get_activity_page(activity_id).await?;
        let text = markup::extract_timestamp(&page).ok_or_else(|| {
            RunkeeperError::TimestampParse(format!(
                "activity {activity_id}: subtitle element not found"
            ))
        })?;
        utils::parse_activity_timestamp(&text)
    }

    /// Statistics and timestamp, fetching them on first use.
    pub async fn details<C>(&mut self, client: &C) -> Result<&ActivityDetails, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        if !self.is_populated() {
            match self.populate(client).await {
                Ok(details) => self.cache = DetailCache::Populated(details),
                Err(e) => {
                    tracing::debug!(
                        activity_id = ?self.activity_id(),
                        "activity population failed: {e}"
                    );
                    self.cache = DetailCache::Failed(e.to_string());
                    return Err(e);
                }
            }
        }
        match &self.cache {
            DetailCache::Populated(details) => Ok(details),
            DetailCache::Unset | DetailCache::Failed(_) => Err(RunkeeperError::InvalidActivityId(
                format!("activity {:?} has no cached details", self.activity_id()),
            )),
        }
    }

    pub async fn calories<C>(
        &mut self,
        client: &C,
    ) -> Result<Option<&serde_json::Value>, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        Ok(self.details(client).await?.stats.calories.as_ref())
    }

    pub async fn elevation<C>(
        &mut self,
        client: &C,
    ) -> Result<Option<&serde_json::Value>, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        Ok(self.details(client).await?.stats.elevation.as_ref())
    }

    pub async fn pace<C>(&mut self, client: &C) -> Result<Option<&serde_json::Value>, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        Ok(self.details(client).await?.stats.pace.as_ref())
    }

    pub async fn speed<C>(
        &mut self,
        client: &C,
    ) -> Result<Option<&serde_json::Value>, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        Ok(self.details(client).await?.stats.speed.as_ref())
    }

    pub async fn datetime<C>(&mut self, client: &C) -> Result<NaiveDateTime, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        Ok(self.details(client).await?.datetime)
    }

    async fn populate<C>(&self, client: &C) -> Result<ActivityDetails, RunkeeperError>
    where
        C: RunkeeperClient + ?Sized,
    {
        let activity_id = self.activity_id().ok_or_else(|| {
            RunkeeperError::InvalidActivityId("listing entry has no activity_id".into())
        })?;
        let raw = self.get_activity_details(client, activity_id).await?;
        let datetime = self.get_activity_datetime(client, activity_id).await?;
        let stats = ActivityStats::from_details(&raw);
        if stats == ActivityStats::default() {
            tracing::warn!(
                site = client.site(),
                activity_id,
                "activity details carry no statistics"
            );
        } else {
            tracing::debug!(activity_id, "activity details populated");
        }
        Ok(ActivityDetails { stats, datetime })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves canned responses and counts calls per endpoint.
    struct MockClient {
        details: Mutex<Vec<Result<serde_json::Value, RunkeeperError>>>,
        page: String,
        detail_calls: Mutex<u32>,
        page_calls: Mutex<u32>,
    }

    impl MockClient {
        fn new(details: serde_json::Value) -> Self {
            Self::with_responses(vec![Ok(details)])
        }

        fn with_responses(details: Vec<Result<serde_json::Value, RunkeeperError>>) -> Self {
            Self {
                details: Mutex::new(details),
                page: r#"<div class="micro-text activitySubTitle">Mon Jan 05 14:30:00 UTC 2024 - 3.1 mi</div>"#.into(),
                detail_calls: Mutex::new(0),
                page_calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> (u32, u32) {
            (
                *self.detail_calls.lock().unwrap(),
                *self.page_calls.lock().unwrap(),
            )
        }
    }

    #[async_trait]
    impl RunkeeperClient for MockClient {
        fn site(&self) -> &str {
            "http://mock"
        }

        async fn profile_username(&self) -> Result<String, RunkeeperError> {
            Ok("runner".into())
        }

        async fn get_activities_month(
            &self,
            _month: &str,
            _year: Option<&str>,
        ) -> Result<Vec<Activity>, RunkeeperError> {
            Ok(vec![])
        }

        async fn get_activity_details(
            &self,
            _activity_id: &str,
        ) -> Result<serde_json::Value, RunkeeperError> {
            *self.detail_calls.lock().unwrap() += 1;
            let mut queue = self.details.lock().unwrap();
            if queue.len() > 1 {
                queue.remove(0)
            } else {
                match &queue[0] {
                    Ok(v) => Ok(v.clone()),
                    Err(e) => Err(RunkeeperError::InvalidActivityId(e.to_string())),
                }
            }
        }

        async fn get_activity_page(&self, _activity_id: &str) -> Result<String, RunkeeperError> {
            *self.page_calls.lock().unwrap() += 1;
            Ok(self.page.clone())
        }
    }

    fn activity() -> Activity {
        Activity::from_summary(&json!({"activity_id": 42, "type": "RUN"})).unwrap()
    }

    #[tokio::test]
    async fn first_access_populates_everything_once() {
        let client = MockClient::new(json!({
            "statsCalories": 120,
            "statsElevation": 5,
            "statsPace": "5:30",
            "statsSpeed": 10.9,
            "points": []
        }));
        let mut act = activity();
        assert!(!act.is_populated());

        assert_eq!(act.calories(&client).await.unwrap(), Some(&json!(120)));
        assert_eq!(client.calls(), (1, 1));

        assert_eq!(act.elevation(&client).await.unwrap(), Some(&json!(5)));
        assert_eq!(act.pace(&client).await.unwrap(), Some(&json!("5:30")));
        assert_eq!(act.speed(&client).await.unwrap(), Some(&json!(10.9)));
        let dt = act.datetime(&client).await.unwrap();
        assert_eq!(dt.to_string(), "2024-01-05 14:30:00");
        assert_eq!(client.calls(), (1, 1));
    }

    #[tokio::test]
    async fn zero_statistics_stay_cached() {
        let client = MockClient::new(json!({
            "statsCalories": 0,
            "statsElevation": 0,
            "statsPace": "",
            "statsSpeed": 0.0
        }));
        let mut act = activity();
        assert_eq!(act.calories(&client).await.unwrap(), Some(&json!(0)));
        assert_eq!(act.elevation(&client).await.unwrap(), Some(&json!(0)));
        assert_eq!(act.pace(&client).await.unwrap(), Some(&json!("")));
        assert_eq!(client.calls(), (1, 1));
    }

    #[tokio::test]
    async fn missing_statistics_are_none_and_cached() {
        let client = MockClient::new(json!({"statsPace": null}));
        let mut act = activity();
        assert_eq!(act.calories(&client).await.unwrap(), None);
        assert_eq!(act.pace(&client).await.unwrap(), None);
        assert_eq!(client.calls(), (1, 1));
    }

    #[tokio::test]
    async fn failed_population_is_retryable() {
        let client = MockClient::with_responses(vec![
            Err(RunkeeperError::InvalidActivityId("42".into())),
            Ok(json!({"statsCalories": 300})),
        ]);
        let mut act = activity();

        let err = act.calories(&client).await.unwrap_err();
        assert!(matches!(err, RunkeeperError::InvalidActivityId(_)));
        assert!(!act.is_populated());
        assert!(act.last_failure().is_some());

        assert_eq!(act.speed(&client).await.unwrap(), None);
        assert_eq!(act.calories(&client).await.unwrap(), Some(&json!(300)));
        assert!(act.is_populated());
        assert!(act.last_failure().is_none());
        assert_eq!(client.calls(), (2, 1));
    }

    #[tokio::test]
    async fn missing_activity_id_fails_without_fetching() {
        let client = MockClient::new(json!({}));
        let mut act = Activity::from_summary(&json!({"type": "RUN"})).unwrap();
        let err = act.datetime(&client).await.unwrap_err();
        assert!(matches!(err, RunkeeperError::InvalidActivityId(_)));
        assert_eq!(client.calls(), (0, 0));
    }

    #[test]
    fn from_summary_rejects_non_objects() {
        let err = Activity::from_summary(&json!(["not", "an", "entry"])).unwrap_err();
        assert!(matches!(err, RunkeeperError::InvalidActivityId(_)));
    }

    #[test]
    fn from_summary_copies_listing_fields() {
        let act = Activity::from_summary(&json!({
            "username": "runner",
            "distance": 3.1,
            "distanceUnits": "mi",
            "activity_id": "871234",
            "elapsedTime": "25:43",
            "live": true,
            "mainText": "Lunch run",
            "type": "RUN"
        }))
        .unwrap();
        assert_eq!(act.username(), Some("runner"));
        assert_eq!(act.distance(), Some("3.1"));
        assert_eq!(act.distance_units(), Some("mi"));
        assert_eq!(act.activity_id(), Some("871234"));
        assert_eq!(act.elapsed_time(), Some("25:43"));
        assert_eq!(act.live(), Some(true));
        assert_eq!(act.caption(), Some("Lunch run"));
        assert_eq!(act.activity_type(), Some("RUN"));
        assert!(!act.is_populated());
    }

    #[test]
    fn stats_ignore_non_object_payload() {
        assert_eq!(
            ActivityStats::from_details(&json!([1, 2])),
            ActivityStats::default()
        );
    }
}
