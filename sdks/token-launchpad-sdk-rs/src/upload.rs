//! Off-chain metadata upload.
//!
//! The JSON document is posted once, as a raw file, to a Cloudinary-style upload endpoint
//! (`<api_base>/<cloud_name>/raw/upload`). There are no retries; a failed upload aborts the
//! launch before anything touches the ledger.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{UploadError, ValidationError};

pub const CLOUD_NAME_ENV: &str = "CLOUDINARY_CLOUD_NAME";
pub const UPLOAD_PRESET_ENV: &str = "CLOUDINARY_UPLOAD_PRESET";
pub const API_BASE_ENV: &str = "CLOUDINARY_API_BASE";

pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";
pub const DEFAULT_UPLOAD_PRESET: &str = "token_launchpad_upload_preset";
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Off-chain metadata document referenced by the on-chain `uri`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataJson {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub attributes: Vec<MetadataAttribute>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: String,
}

impl MetadataJson {
    pub fn new(name: &str, symbol: &str, description: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: description.to_string(),
            image: image.to_string(),
            attributes: vec![MetadataAttribute {
                trait_type: "Item".to_string(),
                value: "Developer Portal".to_string(),
            }],
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() || self.symbol.is_empty() {
            return Err(ValidationError::MissingNameOrSymbol);
        }
        Ok(())
    }
}

/// Anything that turns a metadata document into a durable URI.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn upload(&self, json: &MetadataJson) -> Result<String, UploadError>;
}

/// Cloudinary account settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Required at upload time; absence is a configuration error
    pub cloud_name: Option<String>,
    pub upload_preset: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            upload_preset: DEFAULT_UPLOAD_PRESET.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: UPLOAD_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Read `CLOUDINARY_*` variables. Missing optional values fall back to defaults.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            cloud_name: non_empty(CLOUD_NAME_ENV),
            upload_preset: non_empty(UPLOAD_PRESET_ENV).unwrap_or(defaults.upload_preset),
            api_base: non_empty(API_BASE_ENV).unwrap_or(defaults.api_base),
            timeout: defaults.timeout,
        }
    }

    pub fn upload_url(&self) -> Result<String, UploadError> {
        let cloud_name = self.cloud_name.as_deref().ok_or_else(|| {
            UploadError::Configuration(format!(
                "cloud name is not configured; set {} in the environment",
                CLOUD_NAME_ENV
            ))
        })?;
        Ok(format!(
            "{}/{}/raw/upload",
            self.api_base.trim_end_matches('/'),
            cloud_name
        ))
    }
}

/// Uploads metadata as a raw file to Cloudinary.
pub struct CloudinaryStore {
    config: StoreConfig,
    http: reqwest::Client,
}

impl CloudinaryStore {
    pub fn new(config: StoreConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UploadError::Configuration(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn classify(&self, e: reqwest::Error) -> UploadError {
        if e.is_timeout() {
            UploadError::Timeout(self.config.timeout)
        } else {
            UploadError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl MetadataStore for CloudinaryStore {
    async fn upload(&self, json: &MetadataJson) -> Result<String, UploadError> {
        json.validate()?;
        let url = self.config.upload_url()?;

        let body = serde_json::to_vec(json)
            .map_err(|e| UploadError::Protocol(format!("failed to encode metadata: {}", e)))?;
        let file_name = metadata_file_name(SystemTime::now());
        debug!(%url, %file_name, bytes = body.len(), "uploading token metadata");

        let file = Part::bytes(body)
            .file_name(file_name)
            .mime_str("application/json")
            .map_err(|e| UploadError::Protocol(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("upload_preset", self.config.upload_preset.clone())
            .text("resource_type", "raw");

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        let uri = interpret_response(status, &body)?;
        info!(%uri, "token metadata uploaded");
        Ok(uri)
    }
}

/// `token-metadata-<unix millis>.json`
pub fn metadata_file_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("token-metadata-{}.json", millis)
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// Map a store response to the uploaded file's URL.
pub fn interpret_response(status: u16, body: &str) -> Result<String, UploadError> {
    if !(200..300).contains(&status) {
        return Err(UploadError::Remote {
            status,
            body: body.to_string(),
        });
    }
    let parsed: UploadResponse = serde_json::from_str(body)
        .map_err(|e| UploadError::Protocol(format!("invalid json ({}): {}", e, body)))?;
    parsed
        .secure_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| UploadError::Protocol(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_returns_secure_url() {
        let uri = interpret_response(
            200,
            r#"{"secure_url":"https://res.cloudinary.com/demo/raw/upload/v1/x.json","bytes":120}"#,
        )
        .unwrap();
        assert_eq!(uri, "https://res.cloudinary.com/demo/raw/upload/v1/x.json");
    }

    #[test]
    fn non_2xx_is_remote_error_with_body() {
        let err = interpret_response(401, r#"{"error":{"message":"Unknown API key"}}"#)
            .unwrap_err();
        match err {
            UploadError::Remote { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Unknown API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_secure_url_is_protocol_error() {
        assert!(matches!(
            interpret_response(200, r#"{"url":"http://insecure"}"#),
            Err(UploadError::Protocol(_))
        ));
        assert!(matches!(
            interpret_response(201, "<html>"),
            Err(UploadError::Protocol(_))
        ));
    }

    #[test]
    fn upload_url_requires_cloud_name() {
        assert!(matches!(
            StoreConfig::default().upload_url(),
            Err(UploadError::Configuration(_))
        ));

        let config = StoreConfig {
            cloud_name: Some("demo".into()),
            api_base: "https://api.cloudinary.com/v1_1/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.upload_url().unwrap(),
            "https://api.cloudinary.com/v1_1/demo/raw/upload"
        );
    }

    #[test]
    fn file_name_carries_timestamp() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(metadata_file_name(t), "token-metadata-1700000000123.json");
    }

    #[tokio::test]
    async fn empty_symbol_fails_before_request() {
        let store = CloudinaryStore::new(StoreConfig {
            cloud_name: Some("demo".into()),
            api_base: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();
        let json = MetadataJson::new("Token", "", "", "");
        assert!(matches!(
            store.upload(&json).await,
            Err(UploadError::Validation(ValidationError::MissingNameOrSymbol))
        ));
    }
}
