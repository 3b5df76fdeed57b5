use crate::adapters::http::HealthResponse;
use crate::utils::error::{DispatchError, Result};
use crate::utils::validation::validate_url;
use reqwest::Client;
use std::time::Duration;

/// 呼叫執行中服務的 /health
pub struct HealthClient {
    base_url: String,
    client: Client,
}

impl HealthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        validate_url("url", base_url)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn check(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        tracing::debug!("Requesting {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<HealthResponse>().await?)
    }
}
