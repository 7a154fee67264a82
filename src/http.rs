//! HTTP-backed implementations of the auth and files collaborators.
//!
//! One client per instance, with the timeout baked in at construction so
//! every request shares it. Non-2xx statuses are mapped to
//! [`CheckoutError::Api`] before the body is touched; a 200 with a
//! malformed body maps to the same variant with a decode reason.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::ApiFile;
use crate::error::CheckoutError;
use crate::services::{AuthApi, FilesApi};

/// Client for the checkout backend (`/files`, `/auth` endpoints).
pub struct HttpCheckoutApi {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct FileListResponse {
    files: Vec<ApiFile>,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

impl HttpCheckoutApi {
    /// Build a client against `base_url` (no trailing slash) with a
    /// per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, CheckoutError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CheckoutError::Internal(format!("http client: {e}")))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { base_url, client })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, CheckoutError> {
        let url = format!("{}{endpoint}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| api_error(endpoint, &e))?;

        if !response.status().is_success() {
            return Err(CheckoutError::Api {
                endpoint: endpoint.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.json::<T>().await.map_err(|e| CheckoutError::Api {
            endpoint: endpoint.to_string(),
            reason: format!("response decode: {e}"),
        })
    }
}

fn api_error(endpoint: &str, e: &reqwest::Error) -> CheckoutError {
    CheckoutError::Api {
        endpoint: endpoint.to_string(),
        reason: if e.is_timeout() {
            "request timed out".to_string()
        } else {
            e.to_string()
        },
    }
}

#[async_trait]
impl FilesApi for HttpCheckoutApi {
    async fn list_files(&self) -> Result<Vec<ApiFile>, CheckoutError> {
        let body: FileListResponse = self.get_json("/files").await?;
        Ok(body.files)
    }

    async fn download_url(&self, file_id: &str) -> Result<String, CheckoutError> {
        let body: UrlResponse = self
            .get_json(&format!("/files/{file_id}/download"))
            .await?;
        Ok(body.url)
    }

    async fn edited_download_url(&self, file_id: &str) -> Result<String, CheckoutError> {
        let body: UrlResponse = self.get_json(&format!("/files/{file_id}/edited")).await?;
        Ok(body.url)
    }
}

#[async_trait]
impl AuthApi for HttpCheckoutApi {
    async fn exchange_token(&self, token: &str) -> Result<(), CheckoutError> {
        let endpoint = "/auth/by-email-token";
        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| api_error(endpoint, &e))?;

        if !response.status().is_success() {
            return Err(CheckoutError::Api {
                endpoint: endpoint.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        Ok(())
    }
}
