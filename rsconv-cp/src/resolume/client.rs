//! HTTP client for the Resolume control API
//!
//! One explicitly constructed `reqwest::Client` per `ResolumeClient`; callers
//! pass the client down instead of reaching for a process-wide default.

use super::types::{Clip, Composition, Layer, PatchFields};
use super::CompositionService;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("rsconv-cp/", env!("CARGO_PKG_VERSION"));

/// Control API client errors
#[derive(Debug, Error)]
pub enum ResolumeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error during {call}: {message}")]
    Network { call: String, message: String },

    #[error("{call} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        call: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {call} response: {message}")]
    Decode { call: String, message: String },
}

/// Resolume control API client
#[derive(Debug, Clone)]
pub struct ResolumeClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ResolumeClient {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:8089/api/v1/`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ResolumeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ResolumeError::Network {
                call: "client setup".to_string(),
                message: e.to_string(),
            })?;

        Self::with_client(http_client, base_url)
    }

    /// Wrap an already configured `reqwest::Client`
    pub fn with_client(http_client: reqwest::Client, base_url: &str) -> Result<Self, ResolumeError> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ResolumeError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ResolumeError> {
        self.base_url
            .join(path)
            .map_err(|e| ResolumeError::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn send(
        &self,
        call: &str,
        request: reqwest::RequestBuilder,
        accepted: &[StatusCode],
    ) -> Result<reqwest::Response, ResolumeError> {
        tracing::debug!(call = %call, "Sending control API request");

        let response = request.send().await.map_err(|e| ResolumeError::Network {
            call: call.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !accepted.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ResolumeError::UnexpectedStatus {
                call: call.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ResolumeError> {
        let call = format!("GET {}", path);
        let url = self.endpoint(path)?;
        let response = self
            .send(&call, self.http_client.get(url), &[StatusCode::OK])
            .await?;

        response.json().await.map_err(|e| ResolumeError::Decode {
            call,
            message: e.to_string(),
        })
    }

    /// Read a single clip by id
    pub async fn get_clip(&self, clip_id: i64) -> Result<Clip, ResolumeError> {
        self.get_json(&format!("composition/clips/by-id/{}", clip_id))
            .await
    }

    /// Read the clip currently selected in the remote UI
    pub async fn get_selected_clip(&self) -> Result<Clip, ResolumeError> {
        self.get_json("composition/clips/selected").await
    }

    pub async fn get_layers(&self) -> Result<Vec<Layer>, ResolumeError> {
        Ok(self.get_composition().await?.layers)
    }

    /// Fetch the PNG thumbnail of a clip
    pub async fn get_thumbnail(&self, clip_id: i64) -> Result<Vec<u8>, ResolumeError> {
        let path = format!("composition/clips/by-id/{}/thumbnail", clip_id);
        let call = format!("GET {}", path);
        let url = self.endpoint(&path)?;
        let response = self
            .send(&call, self.http_client.get(url), &[StatusCode::OK])
            .await?;

        let bytes = response.bytes().await.map_err(|e| ResolumeError::Decode {
            call,
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CompositionService for ResolumeClient {
    async fn get_composition(&self) -> Result<Composition, ResolumeError> {
        self.get_json("composition").await
    }

    async fn open_clip(&self, clip_id: i64, file_path: &Path) -> Result<(), ResolumeError> {
        let file_url = Url::from_file_path(file_path).map_err(|_| {
            ResolumeError::InvalidUrl(format!(
                "not an absolute file path: {}",
                file_path.display()
            ))
        })?;

        let path = format!("composition/clips/by-id/{}/open", clip_id);
        let call = format!("POST {}", path);
        let url = self.endpoint(&path)?;

        tracing::debug!(clip_id, file = %file_url, "Opening file into clip");

        let request = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(file_url.to_string());
        self.send(&call, request, &[StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    async fn patch_clip(&self, clip_id: i64, fields: &PatchFields) -> Result<(), ResolumeError> {
        let path = format!("composition/clips/by-id/{}", clip_id);
        let call = format!("PUT {}", path);
        let url = self.endpoint(&path)?;

        let request = self.http_client.put(url).json(fields);
        self.send(&call, request, &[StatusCode::OK, StatusCode::NO_CONTENT])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ResolumeClient::new("http://127.0.0.1:8089/api/v1", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8089/api/v1/");

        let url = client.endpoint("composition/clips/selected").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8089/api/v1/composition/clips/selected"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ResolumeClient::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(ResolumeError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_open_clip_rejects_relative_path() {
        let client = ResolumeClient::new("http://127.0.0.1:1/api/v1/", Duration::from_secs(1))
            .unwrap();

        let result = client.open_clip(1, Path::new("relative/a.mov")).await;
        assert!(matches!(result, Err(ResolumeError::InvalidUrl(_))));
    }
}
