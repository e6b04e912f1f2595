use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use std::time::Duration;

use super::{QuerySpec, RawPayload, SourceFetcher};
use crate::error::FetchError;

/// Calls the narrative workflow webhook: one POST, no body, no query string.
#[derive(Clone)]
pub struct WebhookFetcher {
    url: String,
    client: Client,
    timeout: Duration,
}

impl WebhookFetcher {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SourceFetcher for WebhookFetcher {
    async fn fetch(&self, _query: &QuerySpec) -> Result<RawPayload, FetchError> {
        let resp = match self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "fetch", error = %e, url = %self.url, "webhook unreachable");
                counter!("webhook_transport_errors_total").increment(1);
                return Err(FetchError::Unreachable(e.to_string()));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Unreachable(format!("reading webhook body: {e}")))?;
        let doc: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(RawPayload::Document(doc))
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
