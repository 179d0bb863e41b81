use crate::check::{CheckFuture, ConnectivityCheck};
use crate::config::ProbeConfig;
use crate::error::{GraphitiError, Result};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// HTTP health probe against a Graphiti server.
pub struct HttpProbe {
    config: ProbeConfig,
    http_client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn health_url(&self) -> String {
        let base = self.config.url.trim_end_matches('/');
        let path = self.config.health_path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Issue one health request. Any non-2xx answer is an error carrying status and body.
    pub async fn ping(&self) -> Result<()> {
        let url = self.health_url();

        let mut request = self
            .http_client
            .get(&url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!(
                "Graphiti request failed: {} {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                text
            );
            return Err(GraphitiError::Probe(message.trim_end().to_string()));
        }

        tracing::debug!("[GRAPHITI] probe {} -> {}", url, status);
        Ok(())
    }
}

impl ConnectivityCheck for HttpProbe {
    fn check(&self) -> CheckFuture<'_> {
        Box::pin(async move { self.ping().await.map(|()| true) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_health_url_joins_slashes() {
        let mut config = ProbeConfig::new("http://graphiti:8000/");
        config.health_path = "/healthcheck".into();
        let probe = HttpProbe::new(config).unwrap();
        assert_eq!(probe.health_url(), "http://graphiti:8000/healthcheck");

        let mut config = ProbeConfig::new("http://graphiti:8000");
        config.health_path = "health".into();
        let probe = HttpProbe::new(config).unwrap();
        assert_eq!(probe.health_url(), "http://graphiti:8000/health");
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(HttpProbe::new(ProbeConfig::new("graphiti:8000")).is_err());
    }

    #[tokio::test]
    async fn test_check_ok_on_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthcheck"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "healthy"})))
            .expect(1)
            .mount(&server)
            .await;

        let probe = HttpProbe::new(ProbeConfig::new(server.uri())).unwrap();
        assert!(probe.check().await.unwrap());
    }

    #[tokio::test]
    async fn test_check_sends_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthcheck"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = ProbeConfig::new(server.uri());
        config.api_key = Some("secret".into());
        let probe = HttpProbe::new(config).unwrap();
        assert!(probe.check().await.unwrap());
    }

    #[tokio::test]
    async fn test_check_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthcheck"))
            .respond_with(ResponseTemplate::new(503).set_body_string("neo4j unavailable"))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(ProbeConfig::new(server.uri())).unwrap();
        let err = probe.check().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Graphiti request failed: 503 Service Unavailable neo4j unavailable"
        );
    }

    #[tokio::test]
    async fn test_check_error_when_unreachable() {
        let mut config = ProbeConfig::new("http://127.0.0.1:1");
        config.timeout_ms = 500;
        let probe = HttpProbe::new(config).unwrap();
        let err = probe.check().await.unwrap_err();
        assert!(matches!(err, GraphitiError::Http(_)));
    }
}
