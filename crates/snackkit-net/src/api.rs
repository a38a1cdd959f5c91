//! Typed bindings for the SnackStopper backend API.
//!
//! The backend owns all check-in accounting and savings computation; this
//! module only mirrors the wire shapes and drives requests through the
//! [`Fetch`] seam.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{Fetch, NetError, Request, Response};

/// Aggregate check-in statistics, `GET /api/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub streak: u32,
    pub total_saved: f64,
    pub total_days: u32,
    pub days_passed: u32,
    pub checked_in_today: bool,
    /// `None` until today's check-in exists.
    pub today_passed: Option<bool>,
}

/// One day of check-in history, `GET /api/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub date: String,
    pub passed: bool,
    pub amount_saved: f64,
    #[serde(default)]
    pub note: String,
}

/// Reminder settings, `GET`/`POST /api/settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub reminder_time: String,
    pub average_amount: f64,
}

/// Acknowledgement of a check-in: the backend echoes the stored day.
pub type CheckinAck = HistoryEntry;

#[derive(Debug, Serialize)]
struct CheckinRequest {
    passed: bool,
}

/// Client for the backend API boundary.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    checkin_path: String,
    fetcher: Arc<dyn Fetch>,
}

impl ApiClient {
    pub fn new(base: Url, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            base,
            checkin_path: "/api/checkin".to_string(),
            fetcher,
        }
    }

    /// Override the endpoint receiving check-ins.
    pub fn with_checkin_path(mut self, path: impl Into<String>) -> Self {
        self.checkin_path = path.into();
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, NetError> {
        self.base
            .join(path)
            .map_err(|e| NetError::InvalidUrl(e.to_string()))
    }

    /// Require a 2xx response, surfacing anything else as a request failure.
    fn require_ok(response: Response) -> Result<Response, NetError> {
        if response.ok() {
            Ok(response)
        } else {
            Err(NetError::RequestFailed(format!(
                "{} returned {}",
                response.url, response.status
            )))
        }
    }

    /// Fetch aggregate statistics.
    pub async fn stats(&self) -> Result<Stats, NetError> {
        let url = self.endpoint("/api/stats")?;
        let response = Self::require_ok(self.fetcher.fetch(Request::get(url)).await?)?;
        response.json()
    }

    /// Record today's check-in.
    pub async fn checkin(&self, passed: bool) -> Result<CheckinAck, NetError> {
        let url = self.endpoint(&self.checkin_path)?;
        debug!(passed, "posting check-in");
        let request = Request::post_json(url, &CheckinRequest { passed })?;
        let response = Self::require_ok(self.fetcher.fetch(request).await?)?;
        response.json()
    }

    /// Fetch the last 30 days of history.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, NetError> {
        let url = self.endpoint("/api/history")?;
        let response = Self::require_ok(self.fetcher.fetch(Request::get(url)).await?)?;
        response.json()
    }

    /// Fetch the reminder settings.
    pub async fn settings(&self) -> Result<Settings, NetError> {
        let url = self.endpoint("/api/settings")?;
        let response = Self::require_ok(self.fetcher.fetch(Request::get(url)).await?)?;
        response.json()
    }

    /// Update the reminder settings.
    pub async fn update_settings(&self, settings: &Settings) -> Result<(), NetError> {
        let url = self.endpoint("/api/settings")?;
        let request = Request::post_json(url, settings)?;
        Self::require_ok(self.fetcher.fetch(request).await?)?;
        Ok(())
    }

    /// Register a platform push subscription. The descriptor is opaque to
    /// the client and stored verbatim by the backend.
    pub async fn subscribe(&self, subscription: &Value) -> Result<(), NetError> {
        let url = self.endpoint("/api/subscribe")?;
        let request = Request::post_json(url, subscription)?;
        Self::require_ok(self.fetcher.fetch(request).await?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoaderConfig, ResourceLoader};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let base = Url::parse(&server.uri()).unwrap();
        let loader = ResourceLoader::new(LoaderConfig::default()).unwrap();
        ApiClient::new(base, Arc::new(loader))
    }

    #[tokio::test]
    async fn test_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "streak": 3,
                "total_saved": 22.5,
                "total_days": 5,
                "days_passed": 4,
                "checked_in_today": false,
                "today_passed": null,
            })))
            .mount(&server)
            .await;

        let stats = client_for(&server).stats().await.unwrap();
        assert_eq!(stats.streak, 3);
        assert_eq!(stats.total_saved, 22.5);
        assert_eq!(stats.today_passed, None);
    }

    #[tokio::test]
    async fn test_checkin_posts_passed_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/checkin"))
            .and(body_json(serde_json::json!({"passed": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7,
                "date": "2025-11-02",
                "passed": false,
                "amount_saved": 0.0,
                "note": "",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = client_for(&server).checkin(false).await.unwrap();
        assert!(!ack.passed);
        assert_eq!(ack.amount_saved, 0.0);
    }

    #[tokio::test]
    async fn test_checkin_honors_custom_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/alternate-checkin"))
            .and(body_json(serde_json::json!({"passed": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 9,
                "date": "2025-11-03",
                "passed": true,
                "amount_saved": 7.5,
                "note": "",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_checkin_path("/api/alternate-checkin");
        let ack = client.checkin(true).await.unwrap();
        assert!(ack.passed);
    }

    #[tokio::test]
    async fn test_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 2, "date": "2025-11-02", "passed": true, "amount_saved": 7.5, "note": ""},
                {"id": 1, "date": "2025-11-01", "passed": false, "amount_saved": 0.0, "note": "moeilijk"},
            ])))
            .mount(&server)
            .await;

        let history = client_for(&server).history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].note, "moeilijk");
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "reminder_time": "16:50",
                "average_amount": 7.5,
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let settings = client.settings().await.unwrap();
        assert_eq!(settings.reminder_time, "16:50");
        client.update_settings(&settings).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_opaque_descriptor() {
        let server = MockServer::start().await;
        let descriptor = serde_json::json!({
            "endpoint": "https://push.example/sub/abc",
            "keys": {"p256dh": "key", "auth": "secret"},
        });
        Mock::given(method("POST"))
            .and(path("/api/subscribe"))
            .and(body_json(descriptor.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).subscribe(&descriptor).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server).stats().await;
        assert!(matches!(result, Err(NetError::RequestFailed(_))));
    }
}
