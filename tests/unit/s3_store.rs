//! S3 publishing against a mock S3-compatible endpoint

use firds_etl::publisher::{PublishError, Publisher, PublisherConfig, StoreCredentials};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OBJECT_PATH: &str = "/audit-stock-market/steel_eye_etl.csv";

fn s3_error(code: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>{code}</Code><Message>{code} raised by test endpoint</Message><RequestId>4442587FB7D0A2F9</RequestId></Error>"#
    )
}

fn publisher_for(server: &MockServer) -> Publisher {
    Publisher::new(
        PublisherConfig::new("audit-stock-market", "steel_eye_etl.csv")
            .with_credentials(StoreCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI"))
            .with_region("us-east-1")
            .with_endpoint_url(server.uri()),
    )
}

fn write_csv(temp_dir: &TempDir) -> std::path::PathBuf {
    let path = temp_dir.path().join("output.csv");
    std::fs::write(&path, "Issr\nLEI\n").unwrap();
    path
}

async fn mount_put(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("PUT"))
        .and(path(OBJECT_PATH))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_successful_put_publishes() {
    let server = MockServer::start().await;
    mount_put(
        &server,
        ResponseTemplate::new(200).insert_header("ETag", "\"9b2cf535f27731c974343645a3985328\""),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let published = publisher_for(&server)
        .publish(&write_csv(&temp_dir))
        .await
        .unwrap();

    assert!(published);
}

#[tokio::test]
async fn test_unknown_access_key_is_unpublished() {
    let server = MockServer::start().await;
    mount_put(
        &server,
        ResponseTemplate::new(403)
            .insert_header("Content-Type", "application/xml")
            .set_body_string(s3_error("InvalidAccessKeyId")),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let publisher = publisher_for(&server);
    let csv = write_csv(&temp_dir);

    assert!(!publisher.publish(&csv).await.unwrap());
}

#[tokio::test]
async fn test_bad_signature_is_credentials_error() {
    let server = MockServer::start().await;
    mount_put(
        &server,
        ResponseTemplate::new(403)
            .insert_header("Content-Type", "application/xml")
            .set_body_string(s3_error("SignatureDoesNotMatch")),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let err = publisher_for(&server)
        .try_publish(&write_csv(&temp_dir))
        .await
        .unwrap_err();

    match err {
        PublishError::Credentials(detail) => assert!(detail.contains("SignatureDoesNotMatch")),
        other => panic!("expected credentials error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_bucket_is_upload_error() {
    let server = MockServer::start().await;
    mount_put(
        &server,
        ResponseTemplate::new(404)
            .insert_header("Content-Type", "application/xml")
            .set_body_string(s3_error("NoSuchBucket")),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let err = publisher_for(&server)
        .publish(&write_csv(&temp_dir))
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Upload(_)));
}
