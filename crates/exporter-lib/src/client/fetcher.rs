//! Typed fetcher for the management API

use super::normalize::normalize;
use crate::error::{ExporterError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Client-side bound on every request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the management API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://api.example.com`
    pub endpoint: String,
    /// Static bearer token
    pub token: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Issues authenticated GETs and normalizes whatever comes back
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        Url::parse(&endpoint)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ExporterError::Transport {
                path: endpoint.clone(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint,
            token: config.token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.endpoint, path))?)
    }

    /// GET `path` with `query` and decode the body into records
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.url(path)?;
        debug!(path = %path, "Fetching from management API");

        let response = self
            .client
            .get(url)
            .query(query)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ExporterError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ExporterError::Transport {
                path: path.to_string(),
                source,
            })?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            warn!(
                path = %path,
                status = status.as_u16(),
                body = %body,
                "Non-2xx response from management API"
            );
            return Err(ExporterError::Fetch {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        normalize(&body)
    }

    /// Like [`fetch`](Self::fetch) but yields the first record only.
    ///
    /// An empty result is [`ExporterError::NotFound`].
    pub async fn fetch_one<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.fetch(path, query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ExporterError::NotFound {
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthCheck, Project};
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(ClientConfig::new(server.url(), "secret-token")).unwrap()
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let err = ApiClient::new(ClientConfig::new("not a url", "t")).unwrap_err();
        assert!(matches!(err, ExporterError::InvalidUrl(_)));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:8080/", "t")).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080");
        assert_eq!(
            client.url("/health-check").unwrap().as_str(),
            "http://localhost:8080/health-check"
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_auth_and_accept_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/admin/projects")
            .match_header("authorization", "Bearer secret-token")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(r#"[{"projectId": "proj-1"}, {"projectId": "proj-2"}]"#)
            .create_async()
            .await;

        let projects: Vec<Project> = client_for(&server)
            .fetch("/admin/projects", &[])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].project_id, "proj-2");
    }

    #[tokio::test]
    async fn test_fetch_passes_query_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/admin/reports/autoscale/stats")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start".into(), "2025-01-01T00:00:00Z".into()),
                Matcher::UrlEncoded("projectIds".into(), "a,b".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let stats: Vec<HealthCheck> = client_for(&server)
            .fetch(
                "/admin/reports/autoscale/stats",
                &[
                    ("start", "2025-01-01T00:00:00Z".to_string()),
                    ("projectIds", "a,b".to_string()),
                ],
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health-check")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client_for(&server)
            .fetch::<HealthCheck>("/health-check", &[])
            .await
            .unwrap_err();

        match err {
            ExporterError::Fetch { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_one_returns_first_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health-check")
            .with_status(200)
            .with_body(r#"{"data": [{"status": "up"}, {"status": "down"}]}"#)
            .create_async()
            .await;

        let check: HealthCheck = client_for(&server)
            .fetch_one("/health-check", &[])
            .await
            .unwrap();
        assert_eq!(check.status, "up");
    }

    #[tokio::test]
    async fn test_fetch_one_empty_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health-check")
            .with_status(200)
            .with_body(r#"{"status": 200, "data": []}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .fetch_one::<HealthCheck>("/health-check", &[])
            .await;
        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, ExporterError::NotFound { .. }));
    }
}
