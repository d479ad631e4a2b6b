//! Binary runs: stage markers on stdout, logs on stderr

use crate::fixtures::{dltins_document, search_doc, search_response, zip_bytes, RecordSpec};
use assert_cmd::Command;
use std::process::Output;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_register(server: &MockServer) {
    let link = format!("{}/files/DLTINS_20210117_01of01.zip", server.uri());
    let document = dltins_document(&[
        RecordSpec::kfw(),
        RecordSpec::complete("DE000A1R07V4", "SECOND", "LEI2"),
    ]);

    Mock::given(method("GET"))
        .and(path("/solr/select"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(search_response(&[search_doc("DLTINS", Some(&link))])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/DLTINS_20210117_01of01.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[(
            "DLTINS_20210117_01of01.xml",
            document.as_bytes(),
        )])))
        .mount(server)
        .await;
}

/// Run the binary in `work_dir` without store credentials
async fn run_binary(
    work_dir: &TempDir,
    search_url: String,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Output {
    let dir = work_dir.path().to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let envs: Vec<(String, String)> = envs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("firds-etl")
            .unwrap()
            .current_dir(dir)
            .env("FIRDS_SEARCH_URL", search_url)
            .env("RUST_LOG", "firds_etl=info")
            .env_remove("ACCESS_KEY")
            .env_remove("SECRET_KEY")
            .env_remove("LOG_FORMAT")
            .envs(envs)
            .args(args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stage_markers_on_stdout_logs_on_stderr() {
    let server = MockServer::start().await;
    mount_register(&server).await;
    let work_dir = TempDir::new().unwrap();

    let output = run_binary(&work_dir, format!("{}/solr/select", server.uri()), &[], &[]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.first(), Some(&"STARTED"));
    assert_eq!(lines.last(), Some(&"COMPLETED"));
    for marker in ["QUERIED ", "FOUND ", "SAVED ", "UNZIPPED 1 file(s)", "2 CSV ROWS WRITTEN", "UPLOADING"] {
        assert!(
            lines.iter().any(|line| line.starts_with(marker)),
            "missing {marker:?} in {stdout}"
        );
    }
    assert!(stdout.contains("Credentials not available"));
    assert!(!stdout.contains("INFO"));

    assert!(stderr.contains("INFO"));
    assert!(stderr.contains("Upload skipped, credentials unavailable"));

    let csv = std::fs::read_to_string(work_dir.path().join("output.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(work_dir.path().join("tmp").join("DLTINS_one.zip").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_limit_is_echoed() {
    let server = MockServer::start().await;
    mount_register(&server).await;
    let work_dir = TempDir::new().unwrap();

    let output = run_binary(&work_dir, format!("{}/solr/select", server.uri()), &["1"], &[]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|line| line == "LIMIT 1"));
    assert!(stdout.lines().any(|line| line == "1 CSV ROWS WRITTEN"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_log_format() {
    let server = MockServer::start().await;
    mount_register(&server).await;
    let work_dir = TempDir::new().unwrap();

    let output = run_binary(
        &work_dir,
        format!("{}/solr/select", server.uri()),
        &[],
        &[("LOG_FORMAT", "json")],
    )
    .await;

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let log_lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    assert!(!log_lines.is_empty());
    assert!(log_lines.iter().all(|line| line.starts_with('{') && line.ends_with('}')));
    assert!(stderr.contains(r#""level":"INFO""#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_failure_exits_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let work_dir = TempDir::new().unwrap();

    let output = run_binary(&work_dir, server.uri(), &[], &[]).await;

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("STARTED"));
    assert!(!stdout.contains("COMPLETED"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Pipeline failed"));
    assert!(!work_dir.path().join("output.csv").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_window_exits_with_error() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    let output = run_binary(
        &work_dir,
        server.uri(),
        &[],
        &[("FIRDS_FROM", "2030-01-01T00:00:00Z")],
    )
    .await;

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("configuration error"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
