use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::ports::ImageStore;

/// Well-known references used when no image was supplied or the pinning
/// service is unavailable. The workflow never blocks on upload availability.
pub const PLACEHOLDER_IMAGE_CID: &str = "bafybeiplaceholderbatchimage";
pub const PLACEHOLDER_METADATA_CID: &str = "bafkreiplaceholderbatchmetadata";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("pinning request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("pinning service rejected the upload ({status}): {message}")]
    Service { status: u16, message: String },
}

/// Resolved image reference for a batch: either a pinned content identifier
/// with its `ipfs://` URL, or the placeholder pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub cid: String,
    pub url: String,
}

impl ImageAsset {
    pub fn pinned(cid: String) -> Self {
        let url = format!("ipfs://{cid}");
        Self { cid, url }
    }

    pub fn placeholder(product_name: &str) -> Self {
        Self {
            cid: PLACEHOLDER_IMAGE_CID.to_string(),
            url: format!("/placeholder-{}.jpg", product_slug(product_name)),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.cid == PLACEHOLDER_IMAGE_CID
    }
}

fn product_slug(name: &str) -> String {
    let mut slug = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Client for the content-addressed pinning service. Uploads run under the
/// platform's pinning token; callers treat failures as non-fatal.
#[derive(Clone)]
pub struct PinningClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl PinningClient {
    pub fn new(base_url: String, api_token: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            api_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn pin_file_to_ipfs(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/pinning/pinFileToIPFS"))
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await?;

        Self::read_pin_response(response).await
    }

    pub async fn pin_json_to_ipfs(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<String, UploadError> {
        let response = self
            .client
            .post(self.endpoint("/pinning/pinJSONToIPFS"))
            .bearer_auth(&self.api_token)
            .json(&json!({
                "pinataMetadata": { "name": name },
                "pinataContent": document,
            }))
            .send()
            .await?;

        Self::read_pin_response(response).await
    }

    async fn read_pin_response(response: reqwest::Response) -> Result<String, UploadError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = response.json::<PinResponse>().await?;
        Ok(parsed.ipfs_hash)
    }
}

#[async_trait]
impl ImageStore for PinningClient {
    async fn pin_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        self.pin_file_to_ipfs(filename, bytes).await
    }

    async fn pin_json(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<String, UploadError> {
        self.pin_json_to_ipfs(name, document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_asset_uses_ipfs_url() {
        let asset = ImageAsset::pinned("bafybeirealcid".to_string());
        assert_eq!(asset.url, "ipfs://bafybeirealcid");
        assert!(!asset.is_placeholder());
    }

    #[test]
    fn placeholder_asset_is_deterministic() {
        let first = ImageAsset::placeholder("Roma Tomatoes");
        let second = ImageAsset::placeholder("Roma Tomatoes");

        assert_eq!(first, second);
        assert_eq!(first.cid, PLACEHOLDER_IMAGE_CID);
        assert_eq!(first.url, "/placeholder-roma-tomatoes.jpg");
        assert!(first.is_placeholder());
    }

    #[test]
    fn slugs_strip_awkward_characters() {
        assert_eq!(product_slug("Gala  Apples!"), "gala-apples");
        assert_eq!(product_slug("--"), "");
        assert_eq!(product_slug("KG"), "kg");
    }

    #[tokio::test]
    async fn pin_json_returns_cid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/pinning/pinJSONToIPFS")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"IpfsHash": "bafkreimetadatacid"}"#)
            .create_async()
            .await;

        let client = PinningClient::new(server.url(), "pinning-jwt".to_string());
        let cid = client
            .pin_json_to_ipfs("B-1A2B3C4D-metadata.json", &json!({"name": "Batch"}))
            .await
            .expect("pin succeeds");

        assert_eq!(cid, "bafkreimetadatacid");
    }

    #[tokio::test]
    async fn pin_file_returns_cid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/pinning/pinFileToIPFS")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"IpfsHash": "bafybeimagecid"}"#)
            .create_async()
            .await;

        let client = PinningClient::new(server.url(), "pinning-jwt".to_string());
        let cid = client
            .pin_file_to_ipfs("tomatoes.jpg", vec![0xff, 0xd8, 0xff])
            .await
            .expect("pin succeeds");

        assert_eq!(cid, "bafybeimagecid");
    }

    #[tokio::test]
    async fn service_errors_carry_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/pinning/pinFileToIPFS")
            .with_status(401)
            .with_body("invalid token")
            .create_async()
            .await;

        let client = PinningClient::new(server.url(), "expired".to_string());
        let result = client.pin_file_to_ipfs("tomatoes.jpg", vec![1, 2, 3]).await;

        assert!(matches!(
            result,
            Err(UploadError::Service { status: 401, .. })
        ));
    }
}
