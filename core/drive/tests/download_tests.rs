mod common;

use adrive_drive::Error;
use futures::StreamExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{file_item, mount_refresh, setup};

async fn mount_item(server: &MockServer, item: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/v2/file/get"))
        .and(body_partial_json(serde_json::json!({"file_id": item["file_id"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(item))
        .mount(server)
        .await;
}

fn with_download_url(server: &MockServer, file_id: &str) -> serde_json::Value {
    let mut item = file_item(file_id, "movie.mp4");
    item["download_url"] = serde_json::json!(format!("{}/content/{}", server.uri(), file_id));
    item
}

#[tokio::test]
async fn download_streams_content() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    mount_item(&server, with_download_url(&server, "f1")).await;
    Mock::given(method("GET"))
        .and(path("/content/f1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"file content".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let mut stream = drive.download("f1").await.unwrap();

    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        data.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(data, b"file content");
}

#[tokio::test]
async fn download_of_folder_is_rejected() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    mount_item(
        &server,
        serde_json::json!({"file_id": "dir1", "name": "Photos", "type": "folder"}),
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let result = drive.download("dir1").await;
    assert!(matches!(result, Err(Error::NotAFile(_))));
}

#[tokio::test]
async fn non_200_content_fetch_fails() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    mount_item(&server, with_download_url(&server, "f1")).await;
    Mock::given(method("GET"))
        .and(path("/content/f1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let drive = setup(&server);
    let result = drive.download("f1").await;
    assert!(matches!(result, Err(Error::DownloadFailed(_))));
}

#[tokio::test]
async fn download_falls_back_to_download_url_lookup() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    mount_item(&server, file_item("f2", "notes.txt")).await;
    Mock::given(method("POST"))
        .and(path("/v2/file/get_download_url"))
        .and(body_partial_json(serde_json::json!({"file_id": "f2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": format!("{}/content/f2", server.uri()),
            "expiration": "2021-06-01T10:15:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/f2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"notes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("notes.txt");

    let written = drive.download_to_path("f2", &target).await.unwrap();
    assert_eq!(written, 5);
    assert_eq!(std::fs::read(&target).unwrap(), b"notes");
}

#[tokio::test]
async fn empty_download_url_fails() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/file/get_download_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"url": ""})))
        .mount(&server)
        .await;

    let drive = setup(&server);
    let result = drive.download_url("f3").await;
    assert!(matches!(result, Err(Error::DownloadFailed(_))));
}

#[tokio::test]
async fn failed_download_leaves_no_target_file() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    mount_item(&server, with_download_url(&server, "f1")).await;
    Mock::given(method("GET"))
        .and(path("/content/f1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let drive = setup(&server);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.bin");

    assert!(drive.download_to_path("f1", &target).await.is_err());
    assert!(!target.exists());
}
