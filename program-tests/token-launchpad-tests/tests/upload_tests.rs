use std::time::Duration;

use serial_test::serial;
use token_launchpad_sdk::{
    upload::{API_BASE_ENV, CLOUD_NAME_ENV, DEFAULT_UPLOAD_PRESET, UPLOAD_PRESET_ENV},
    CloudinaryStore, MetadataJson, MetadataStore, StoreConfig, UploadError, ValidationError,
};
use token_launchpad_tests::refused_address;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn config(api_base: &str, timeout: Duration) -> StoreConfig {
    StoreConfig {
        cloud_name: Some("demo".into()),
        upload_preset: "launch_preset".into(),
        api_base: api_base.into(),
        timeout,
    }
}

fn document() -> MetadataJson {
    MetadataJson::new(
        "Test Token",
        "TEST",
        "A token for testing",
        "https://example.com/token.png",
    )
}

#[tokio::test]
async fn upload_posts_a_raw_multipart_file() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/demo/raw/upload"))
        .and(body_string_contains("name=\"upload_preset\""))
        .and(body_string_contains("launch_preset"))
        .and(body_string_contains("name=\"resource_type\""))
        .and(body_string_contains("name=\"file\"; filename=\"token-metadata-"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "secure_url": "https://res.cloudinary.com/demo/raw/upload/v1/meta.json",
            "resource_type": "raw"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let store = CloudinaryStore::new(config(&server.uri(), Duration::from_secs(5)))?;

    let uri = store.upload(&document()).await?;
    assert_eq!(uri, "https://res.cloudinary.com/demo/raw/upload/v1/meta.json");

    let requests = server.received_requests().await.unwrap_or_default();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("application/json"));
    assert!(body.contains("\"symbol\":\"TEST\""));
    assert!(body.contains("Developer Portal"));
    Ok(())
}

#[tokio::test]
async fn non_2xx_is_a_remote_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "Upload preset not found" }
        })))
        .mount(&server)
        .await;
    let store = CloudinaryStore::new(config(&server.uri(), Duration::from_secs(5)))?;

    match store.upload(&document()).await {
        Err(UploadError::Remote { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Upload preset not found"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_secure_url_is_a_protocol_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "public_id": "meta" })),
        )
        .mount(&server)
        .await;
    let store = CloudinaryStore::new(config(&server.uri(), Duration::from_secs(5)))?;

    assert!(matches!(
        store.upload(&document()).await,
        Err(UploadError::Protocol(_))
    ));
    Ok(())
}

#[tokio::test]
async fn slow_store_times_out() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "secure_url": "https://late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let store = CloudinaryStore::new(config(&server.uri(), Duration::from_millis(200)))?;

    assert!(matches!(
        store.upload(&document()).await,
        Err(UploadError::Timeout(_))
    ));
    Ok(())
}

#[tokio::test]
async fn unreachable_store_is_a_network_error() -> anyhow::Result<()> {
    let base = refused_address().await?;
    let store = CloudinaryStore::new(config(&base, Duration::from_secs(5)))?;

    assert!(matches!(
        store.upload(&document()).await,
        Err(UploadError::Network(_))
    ));
    Ok(())
}

#[tokio::test]
async fn document_without_symbol_is_rejected_before_sending() -> anyhow::Result<()> {
    let base = refused_address().await?;
    let store = CloudinaryStore::new(config(&base, Duration::from_secs(5)))?;
    let mut json = document();
    json.symbol.clear();

    assert!(matches!(
        store.upload(&json).await,
        Err(UploadError::Validation(ValidationError::MissingNameOrSymbol))
    ));
    Ok(())
}

#[tokio::test]
async fn missing_cloud_name_is_a_configuration_error() -> anyhow::Result<()> {
    let store = CloudinaryStore::new(StoreConfig::default())?;

    assert!(matches!(
        store.upload(&document()).await,
        Err(UploadError::Configuration(_))
    ));
    Ok(())
}

#[test]
#[serial]
fn store_config_reads_environment() {
    std::env::set_var(CLOUD_NAME_ENV, "my-cloud");
    std::env::remove_var(UPLOAD_PRESET_ENV);
    std::env::set_var(API_BASE_ENV, "http://127.0.0.1:9/v1_1/");

    let config = StoreConfig::from_env();
    assert_eq!(config.cloud_name.as_deref(), Some("my-cloud"));
    assert_eq!(config.upload_preset, DEFAULT_UPLOAD_PRESET);
    assert_eq!(
        config.upload_url().unwrap(),
        "http://127.0.0.1:9/v1_1/my-cloud/raw/upload"
    );

    std::env::remove_var(CLOUD_NAME_ENV);
    std::env::remove_var(API_BASE_ENV);
    assert_eq!(StoreConfig::from_env().cloud_name, None);
}
