use anyhow::{Context, Result};
use async_trait::async_trait;
use gm_api_types::{ContentRef, ImageFile, TokenMetadata};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::PinningService;

pub const DEFAULT_PINATA_URL: &str = "https://api.pinata.cloud";

/// Pinata pinning API client authenticated with a JWT.
pub struct PinataClient {
    endpoint: String,
    jwt: String,
    http: reqwest::Client,
}

impl PinataClient {
    pub fn new(endpoint: Option<String>, jwt: impl Into<String>) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_PINATA_URL.to_string());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            jwt: jwt.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// ── Pinata REST API types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PinataMetadata<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinJsonRequest<'a> {
    pinata_content: &'a TokenMetadata,
    pinata_metadata: PinataMetadata<'a>,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

pub(crate) fn parse_pin_response(body: &str) -> Result<ContentRef> {
    let response: PinResponse =
        serde_json::from_str(body).with_context(|| format!("unexpected pinata response: {body}"))?;
    Ok(ContentRef::from_cid(&response.ipfs_hash))
}

impl PinataClient {
    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<ContentRef> {
        let response = request
            .bearer_auth(&self.jwt)
            .send()
            .await
            .with_context(|| format!("pinata {what} transport"))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("pinata {what} HTTP {status}: {text}");
        }

        let reference = parse_pin_response(&text)?;
        info!(%reference, "pinned {what}");
        Ok(reference)
    }
}

#[async_trait(?Send)]
impl PinningService for PinataClient {
    async fn pin_file(&self, file: &ImageFile) -> Result<ContentRef> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .context("invalid image mime type")?;
        let metadata = serde_json::to_string(&PinataMetadata {
            name: &file.file_name,
        })?;
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata);

        let url = format!("{}/pinning/pinFileToIPFS", self.endpoint);
        self.send(self.http.post(&url).multipart(form), "file").await
    }

    async fn pin_json(&self, metadata: &TokenMetadata) -> Result<ContentRef> {
        let name = format!("{}.json", metadata.name);
        let body = PinJsonRequest {
            pinata_content: metadata,
            pinata_metadata: PinataMetadata { name: &name },
        };

        let url = format!("{}/pinning/pinJSONToIPFS", self.endpoint);
        self.send(self.http.post(&url).json(&body), "metadata").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn pin_response_yields_ipfs_reference() {
        let reference = parse_pin_response(
            r#"{"IpfsHash":"bafkreib","PinSize":1234,"Timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .expect("parsed");
        assert_eq!(reference.as_str(), "ipfs://bafkreib");

        assert!(parse_pin_response(r#"{"error":"invalid JWT"}"#).is_err());
    }

    #[test]
    fn json_request_uses_pinata_field_names() {
        let metadata = TokenMetadata {
            name: "Harbor".to_owned(),
            description: "boats".to_owned(),
            image: "ipfs://bafkimage".to_owned(),
        };
        let body = serde_json::to_value(PinJsonRequest {
            pinata_content: &metadata,
            pinata_metadata: PinataMetadata { name: "Harbor.json" },
        })
        .expect("serialize");
        assert_eq!(body["pinataContent"]["image"], "ipfs://bafkimage");
        assert_eq!(body["pinataMetadata"]["name"], "Harbor.json");
    }

    #[test]
    fn endpoint_defaults_to_public_api() {
        assert_eq!(PinataClient::new(None, "jwt").endpoint(), DEFAULT_PINATA_URL);
        assert_eq!(
            PinataClient::new(Some("http://localhost:3001/".to_owned()), "jwt").endpoint(),
            "http://localhost:3001"
        );
    }

    #[tokio::test]
    async fn live_pinata_round_trip() -> anyhow::Result<()> {
        let jwt = match env::var("TEST_PINATA_JWT") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => return Ok(()),
        };

        let client = PinataClient::new(env::var("TEST_PINATA_URL").ok(), jwt);
        let reference = client
            .pin_json(&TokenMetadata {
                name: "gallerymint-test".to_owned(),
                description: "integration test".to_owned(),
                image: "ipfs://bafkimage".to_owned(),
            })
            .await?;
        assert!(reference.cid().is_some());

        Ok(())
    }
}
