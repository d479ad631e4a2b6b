//! Archive download and extraction tests

use crate::fixtures::zip_bytes;
use firds_etl::fetcher::archive::{extract_archive, ArchiveDownloader};
use firds_etl::fetcher::FetcherError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_download_writes_served_bytes_exactly() {
    let server = MockServer::start().await;
    // Not a multiple of the chunk size, with every byte value present
    let body: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    Mock::given(method("GET"))
        .and(path("/DLTINS_20210117_01of01.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("tmp").join("DLTINS_one.zip");
    let url = format!("{}/DLTINS_20210117_01of01.zip", server.uri());

    let written = ArchiveDownloader::new(reqwest::Client::new())
        .download(&url, &dest)
        .await
        .unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn test_download_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("empty.zip");

    let written = ArchiveDownloader::new(reqwest::Client::new())
        .with_chunk_size(4096)
        .download(&server.uri(), &dest)
        .await
        .unwrap();

    assert_eq!(written, 0);
    assert!(std::fs::read(&dest).unwrap().is_empty());
}

#[tokio::test]
async fn test_download_not_found_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("missing.zip");

    let err = ArchiveDownloader::new(reqwest::Client::new())
        .download(&server.uri(), &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::NetworkError(_)));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_downloaded_archive_extracts() {
    let server = MockServer::start().await;
    let archive = zip_bytes(&[("DLTINS_20210117_01of01.xml", b"<BizData/>")]);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let archive_path = temp_dir.path().join("DLTINS_one.zip");
    let extract_dir = temp_dir.path().join("dltins_one");

    ArchiveDownloader::new(reqwest::Client::new())
        .download(&server.uri(), &archive_path)
        .await
        .unwrap();
    let files = extract_archive(&archive_path, &extract_dir).unwrap();

    assert_eq!(files, vec![extract_dir.join("DLTINS_20210117_01of01.xml")]);
    assert_eq!(
        std::fs::read_to_string(&files[0]).unwrap(),
        "<BizData/>"
    );
}
