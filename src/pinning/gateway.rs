//! Etherith API gateway client
//!
//! Endpoints: `GET /health`, `GET /api/pinata/test`, `POST /api/files`.
//! Every response is wrapped in `{ success, data, error }`.

use reqwest::blocking::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{PinMetadata, PinReceipt, PinningService};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    ipfs_hash: String,
    file_size: u64,
    mime_type: Option<String>,
    gateway_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinataStatus {
    connection_status: String,
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Unwrap the response envelope, turning `success: false` or an HTTP
    /// error status into [`Error::Upload`].
    fn unwrap_envelope<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text()?;
        let envelope: Option<Envelope<T>> = serde_json::from_str(&body).ok();

        match envelope {
            Some(Envelope {
                success: true,
                data: Some(data),
                ..
            }) if status.is_success() => Ok(data),
            Some(Envelope {
                error: Some(err), ..
            }) => {
                debug!(code = %err.code, "gateway rejected request");
                Err(Error::Upload {
                    status: status.as_u16(),
                    message: err.message,
                })
            }
            _ => Err(Error::Upload {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string(),
            }),
        }
    }
}

impl PinningService for GatewayClient {
    fn name(&self) -> &str {
        "gateway"
    }

    fn upload(&self, path: &Path, metadata: &PinMetadata) -> Result<PinReceipt> {
        let mut form = multipart::Form::new().file("file", path)?;
        if !metadata.title.is_empty() {
            form = form.text("title", metadata.title.clone());
        }
        if !metadata.description.is_empty() {
            form = form.text("description", metadata.description.clone());
        }
        if !metadata.tags.is_empty() {
            form = form.text("tags", metadata.tags.join(","));
        }

        info!(path = %path.display(), "uploading through gateway");
        let response = self.client.post(self.url("/api/files")).multipart(form).send()?;
        let uploaded: UploadedFile = Self::unwrap_envelope(response)?;

        info!(hash = %uploaded.ipfs_hash, size = uploaded.file_size, "upload pinned");
        Ok(PinReceipt {
            content_hash: uploaded.ipfs_hash,
            size: uploaded.file_size,
            mime_type: uploaded.mime_type,
            gateway_url: uploaded.gateway_url,
        })
    }

    fn check_connection(&self) -> Result<()> {
        let health = self.client.get(self.url("/health")).send()?;
        if !health.status().is_success() {
            return Err(Error::Upload {
                status: health.status().as_u16(),
                message: "gateway health check failed".to_string(),
            });
        }

        let response = self.client.get(self.url("/api/pinata/test")).send()?;
        let status: PinataStatus = Self::unwrap_envelope(response)?;
        if status.connection_status != "connected" {
            return Err(Error::Upload {
                status: 503,
                message: format!("pinning service {}", status.connection_status),
            });
        }
        Ok(())
    }
}
