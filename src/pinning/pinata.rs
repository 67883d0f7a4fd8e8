//! Direct Pinata client, using credentials stored in the vault config

use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::{PinMetadata, PinReceipt, PinningService};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
    pin_size: u64,
}

pub struct PinataClient {
    client: Client,
    base_url: String,
    gateway_url: String,
    api_key: String,
    secret_key: String,
}

impl PinataClient {
    pub fn new(
        base_url: &str,
        gateway_url: &str,
        api_key: &str,
        secret_key: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_key)
    }

    pub fn gateway_link(&self, content_hash: &str) -> String {
        format!("{}/{}", self.gateway_url, content_hash)
    }
}

/// `pinataMetadata` form field: display name plus searchable key/values
fn pin_metadata(filename: &str, metadata: &PinMetadata) -> serde_json::Value {
    let name = if metadata.title.is_empty() {
        filename
    } else {
        metadata.title.as_str()
    };
    json!({
        "name": name,
        "keyvalues": {
            "title": metadata.title,
            "description": metadata.description,
            "tags": metadata.tags.join(","),
        }
    })
}

impl PinningService for PinataClient {
    fn name(&self) -> &str {
        "pinata"
    }

    fn upload(&self, path: &Path, metadata: &PinMetadata) -> Result<PinReceipt> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let form = multipart::Form::new()
            .file("file", path)?
            .text("pinataMetadata", pin_metadata(&filename, metadata).to_string())
            .text("pinataOptions", json!({ "cidVersion": 1 }).to_string());

        info!(path = %path.display(), "pinning directly");
        let response = self
            .authorized(self.client.post(format!("{}/pinning/pinFileToIPFS", self.base_url)))
            .multipart(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(Error::Upload {
                status: status.as_u16(),
                message,
            });
        }

        let pinned: PinResponse = response.json()?;
        info!(hash = %pinned.ipfs_hash, size = pinned.pin_size, "upload pinned");
        Ok(PinReceipt {
            gateway_url: self.gateway_link(&pinned.ipfs_hash),
            content_hash: pinned.ipfs_hash,
            size: pinned.pin_size,
            mime_type: None,
        })
    }

    fn check_connection(&self) -> Result<()> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/data/testAuthentication", self.base_url)),
            )
            .send()?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Upload {
                status: status.as_u16(),
                message: "pinning service rejected credentials".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_response_parsing() {
        let body = r#"{"IpfsHash":"bafkreiabc","PinSize":1234,"Timestamp":"2025-01-01T00:00:00.000Z"}"#;
        let pinned: PinResponse = serde_json::from_str(body).unwrap();
        assert_eq!(pinned.ipfs_hash, "bafkreiabc");
        assert_eq!(pinned.pin_size, 1234);
    }

    #[test]
    fn test_pin_metadata_falls_back_to_filename() {
        let meta = PinMetadata {
            title: String::new(),
            description: "d".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
        };
        let value = pin_metadata("letter.pdf", &meta);
        assert_eq!(value["name"], "letter.pdf");
        assert_eq!(value["keyvalues"]["tags"], "a,b");
    }

    #[test]
    fn test_gateway_link() {
        let client = PinataClient::new(
            "https://api.pinata.cloud",
            "https://gateway.pinata.cloud/ipfs/",
            "k",
            "s",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.gateway_link("bafy"),
            "https://gateway.pinata.cloud/ipfs/bafy"
        );
    }
}
