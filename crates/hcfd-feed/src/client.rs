//! HTTP telemetry client for the CWB open-data endpoints

use hcfd_core::{FeedSource, FetchError, FetchResult, TelemetryClient};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Endpoint and credentials for both feed documents
#[derive(Debug, Clone)]
pub struct FeedEndpoint {
    pub base_url: String,
    pub rainfall_dataset: String,
    pub hazard_dataset: String,
    pub auth_key: String,
    pub timeout: Duration,
}

pub struct CwbClient {
    client: Client,
    base_url: Url,
    rainfall_dataset: String,
    hazard_dataset: String,
    auth_key: String,
}

impl CwbClient {
    pub fn new(endpoint: FeedEndpoint) -> FetchResult<Self> {
        let base_url = Url::parse(&endpoint.base_url)
            .map_err(|e| FetchError::Endpoint(format!("{}: {}", endpoint.base_url, e)))?;
        let client = Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            rainfall_dataset: endpoint.rainfall_dataset,
            hazard_dataset: endpoint.hazard_dataset,
            auth_key: endpoint.auth_key,
        })
    }

    fn dataset(&self, source: FeedSource) -> &str {
        match source {
            FeedSource::Rainfall => &self.rainfall_dataset,
            FeedSource::Hazard => &self.hazard_dataset,
        }
    }

    /// Full request URL for `source`, credentials included
    pub fn endpoint(&self, source: FeedSource) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("dataid", self.dataset(source))
            .append_pair("authorizationkey", &self.auth_key);
        url
    }
}

#[async_trait::async_trait]
impl TelemetryClient for CwbClient {
    #[instrument(skip(self))]
    async fn fetch(&self, source: FeedSource) -> FetchResult<Vec<u8>> {
        let resp = self
            .client
            .get(self.endpoint(source))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        debug!(dataset = self.dataset(source), bytes = body.len(), "Fetched feed document");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn endpoint(base_url: String) -> FeedEndpoint {
        FeedEndpoint {
            base_url,
            rainfall_dataset: "O-A0002-001".to_string(),
            hazard_dataset: "W-C0033-001".to_string(),
            auth_key: "CWB-TEST-KEY".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Serve one canned HTTP response and return the base URL
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = stream.read(&mut buf).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{}/opendataapi", addr)
    }

    #[test]
    fn test_endpoint_carries_dataset_and_key() {
        let client = CwbClient::new(endpoint(
            "https://opendata.cwb.gov.tw/opendataapi".to_string(),
        ))
        .unwrap();

        let url = client.endpoint(FeedSource::Hazard);
        assert_eq!(
            url.as_str(),
            "https://opendata.cwb.gov.tw/opendataapi?dataid=W-C0033-001&authorizationkey=CWB-TEST-KEY"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = CwbClient::new(endpoint("not a url".to_string()));
        assert!(matches!(result, Err(FetchError::Endpoint(_))));
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 14\r\nConnection: close\r\n\r\n<cwbopendata/>",
        )
        .await;
        let client = CwbClient::new(endpoint(base)).unwrap();

        let body = client.fetch(FeedSource::Rainfall).await.unwrap();
        assert_eq!(body, b"<cwbopendata/>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let base = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let client = CwbClient::new(endpoint(base)).unwrap();

        let result = client.fetch(FeedSource::Hazard).await;
        assert!(matches!(result, Err(FetchError::Status(503))));
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let base =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let client = CwbClient::new(endpoint(base)).unwrap();

        let result = client.fetch(FeedSource::Rainfall).await;
        assert!(matches!(result, Err(FetchError::EmptyBody)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = CwbClient::new(endpoint(format!("http://{}/opendataapi", addr))).unwrap();

        let result = client.fetch(FeedSource::Rainfall).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
