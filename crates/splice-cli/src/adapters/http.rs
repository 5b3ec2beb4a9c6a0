//! HTTP client for remote includes.

use async_trait::async_trait;
use splice_core::capability::{CapabilityError, HttpClient};
use std::time::Duration;

pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("splice/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn classify(error: reqwest::Error) -> CapabilityError {
    if error.is_timeout() {
        CapabilityError::Timeout
    } else if let Some(status) = error.status() {
        CapabilityError::Status(status.as_u16())
    } else {
        CapabilityError::Transport(error.without_url().to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_url(
        &self,
        url: &str,
        timeout: Duration,
        max_size: usize,
    ) -> Result<String, CapabilityError> {
        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Status(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|length| length > max_size as u64)
        {
            return Err(CapabilityError::TooLarge(max_size));
        }

        // The declared length may be absent or wrong; enforce the limit while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > max_size {
                return Err(CapabilityError::TooLarge(max_size));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
