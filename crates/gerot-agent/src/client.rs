use gerot_core::{
    ExecutionReport, PendingDashboard, PendingDashboardsResponse, PendingRpa, PendingRpasResponse,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{Error, Result};

pub const API_KEY_HEADER: &str = "X-API-Key";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the agent endpoints of the GeRot API.
///
/// Polling never fails: anything other than a successful response is logged
/// and treated as "no work".
pub struct GerotClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GerotClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gerot-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_pending_rpas(&self) -> Vec<PendingRpa> {
        self.fetch::<PendingRpasResponse>("/api/agent/rpas/pending", "RPAs")
            .await
            .rpas
    }

    pub async fn fetch_pending_dashboards(&self) -> Vec<PendingDashboard> {
        self.fetch::<PendingDashboardsResponse>("/api/agent/dashboards/pending", "dashboards")
            .await
            .dashboards
    }

    pub async fn send_rpa_result(&self, id: i64, report: &ExecutionReport) -> bool {
        let path = format!("/api/agent/rpa/{}/result", id);
        match self.submit(&path, report).await {
            Ok(()) => {
                tracing::info!("Result sent for RPA #{}", id);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send result for RPA #{}: {}", id, e);
                false
            }
        }
    }

    pub async fn send_dashboard_result(&self, id: i64, report: &ExecutionReport) -> bool {
        let path = format!("/api/agent/dashboard/{}/result", id);
        match self.submit(&path, report).await {
            Ok(()) => {
                tracing::info!("Result sent for dashboard #{}", id);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send result for dashboard #{}: {}", id, e);
                false
            }
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn fetch<T>(&self, path: &str, what: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .timeout(FETCH_TIMEOUT);

        let response = match self.authorize(request).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Could not reach GeRot at {}: {}", self.base_url, e);
                return T::default();
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // older servers without the agent routes
            return T::default();
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Fetching pending {} failed: {} - {}", what, status, body);
            return T::default();
        }

        match response.json::<T>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Invalid pending {} payload: {}", what, e);
                T::default()
            }
        }
    }

    async fn submit(&self, path: &str, report: &ExecutionReport) -> Result<()> {
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .timeout(SUBMIT_TIMEOUT)
            .json(report);

        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(Error::Api(format!("status {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    const RPAS_BODY: &str = r#"{"rpas":[{"id":7,"name":"Fretes do dia","description":null,
        "parameters":{"query":"SELECT * FROM fretes"},"priority":"high","type_name":"Data Extraction"}]}"#;

    #[tokio::test]
    async fn test_fetch_pending_rpas_with_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/rpas/pending")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RPAS_BODY)
            .create_async()
            .await;

        let client = GerotClient::new(server.url(), Some("secret".to_string())).unwrap();
        let rpas = client.fetch_pending_rpas().await;

        mock.assert_async().await;
        assert_eq!(rpas.len(), 1);
        assert_eq!(rpas[0].id, 7);
        assert_eq!(rpas[0].type_name.as_deref(), Some("Data Extraction"));
    }

    #[tokio::test]
    async fn test_no_key_header_when_unset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/dashboards/pending")
            .match_header("x-api-key", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"dashboards":[]}"#)
            .create_async()
            .await;

        let client = GerotClient::new(format!("{}/", server.url()), Some("  ".to_string())).unwrap();
        assert!(client.fetch_pending_dashboards().await.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_and_errors_mean_no_work() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/api/agent/rpas/pending")
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/api/agent/dashboards/pending")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = GerotClient::new(server.url(), None).unwrap();
        assert!(client.fetch_pending_rpas().await.is_empty());
        assert!(client.fetch_pending_dashboards().await.is_empty());

        let offline = GerotClient::new("http://127.0.0.1:1", None).unwrap();
        assert!(offline.fetch_pending_rpas().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_result() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("POST", "/api/agent/rpa/7/result")
            .match_header("x-api-key", "secret")
            .match_body(Matcher::PartialJson(json!({"success": true, "row_count": 1})))
            .with_status(200)
            .with_body(r#"{"message":"ok"}"#)
            .create_async()
            .await;
        let rejected = server
            .mock("POST", "/api/agent/dashboard/3/result")
            .with_status(401)
            .create_async()
            .await;

        let client = GerotClient::new(server.url(), Some("secret".to_string())).unwrap();
        let row = json!({"total": 12}).as_object().cloned().unwrap();
        let report = ExecutionReport {
            success: true,
            data: Some(vec![row]),
            row_count: 1,
            ..Default::default()
        };

        assert!(client.send_rpa_result(7, &report).await);
        assert!(!client.send_dashboard_result(3, &report).await);
        ok.assert_async().await;
        rejected.assert_async().await;
    }
}
