mod common;

use adrive_drive::{Error, ListLimit, ListOptions, OrderBy, OrderDirection};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{file_item, mount_refresh, setup, DRIVE_ID};

fn page(ids: &[&str], next_marker: &str) -> serde_json::Value {
    let items: Vec<_> = ids.iter().map(|id| file_item(id, id)).collect();
    serde_json::json!({ "items": items, "next_marker": next_marker })
}

#[tokio::test]
async fn unlimited_listing_follows_markers() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .and(body_partial_json(serde_json::json!({"marker": "m1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["c", "d"], "m2")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .and(body_partial_json(serde_json::json!({"marker": "m2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["e"], "")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .and(body_partial_json(serde_json::json!({
            "all": true,
            "parent_file_id": "root",
            "order_by": "name",
            "order_direction": "DESC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["a", "b"], "m1")))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let listing = drive
        .list_items("", None, &ListOptions::default())
        .await
        .unwrap();

    let ids: Vec<&str> = listing.items.iter().map(|i| i.file_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    assert!(listing.next_marker.is_empty());
}

#[tokio::test]
async fn limited_listing_returns_single_page() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .and(body_partial_json(serde_json::json!({
            "all": false,
            "limit": 2,
            "marker": "start",
            "parent_file_id": "folder-1",
            "order_by": "updated_at",
            "order_direction": "ASC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["a", "b"], "next")))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let options = ListOptions::default()
        .with_limit(ListLimit::Limited(2))
        .with_order_by(OrderBy::UpdatedAt)
        .with_order_direction(OrderDirection::Asc);
    let listing = drive
        .list_items("folder-1", Some("start"), &options)
        .await
        .unwrap();

    assert_eq!(listing.items.len(), 2);
    assert_eq!(listing.next_marker, "next");
}

#[tokio::test]
async fn repeated_marker_is_protocol_error() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["a"], "stuck")))
        .expect(2)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let result = drive.list_items("root", None, &ListOptions::default()).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn marker_cycle_is_protocol_error() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .and(body_partial_json(serde_json::json!({"marker": "A"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["b"], "B")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .and(body_partial_json(serde_json::json!({"marker": "B"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["c"], "A")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/file/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["a"], "A")))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let result = drive.list_items("root", None, &ListOptions::default()).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn mkdir_returns_folder() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/adrive/v2/file/createWithFolders"))
        .and(body_partial_json(serde_json::json!({
            "check_name_mode": "auto_rename",
            "type": "folder",
            "drive_id": DRIVE_ID,
            "name": "Photos",
            "parent_file_id": "root"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "parent_file_id": "root",
            "type": "folder",
            "file_id": "folder-9",
            "domain_id": "dom",
            "drive_id": DRIVE_ID,
            "file_name": "Photos",
            "encrypt_mode": "none"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let folder = drive.mkdir("root", "Photos").await.unwrap();
    assert!(folder.is_folder());
    assert_eq!(folder.file_id, "folder-9");
    assert_eq!(folder.name, "Photos");
}

#[tokio::test]
async fn remove_selects_trash_or_delete() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    let ack = serde_json::json!({
        "async_task_id": "task-1",
        "domain_id": "dom",
        "drive_id": DRIVE_ID,
        "file_id": "f1"
    });
    Mock::given(method("POST"))
        .and(path("/v2/recyclebin/trash"))
        .respond_with(ResponseTemplate::new(202).set_body_json(ack.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/file/delete"))
        .respond_with(ResponseTemplate::new(202).set_body_json(ack))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    drive.remove("f1", false).await.unwrap();
    drive.remove("f1", true).await.unwrap();
}

#[tokio::test]
async fn unacknowledged_remove_fails() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/recyclebin/trash"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"file_id": "f1"})))
        .mount(&server)
        .await;

    let drive = setup(&server);
    let result = drive.remove("f1", false).await;
    assert!(matches!(result, Err(Error::RemoveFailed(_))));
}

#[tokio::test]
async fn batch_remove_returns_verdict_per_id() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/batch"))
        .and(body_partial_json(serde_json::json!({"resource": "file"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responses": [
                {"id": "f1", "status": 202, "body": {"async_task_id": "t1", "file_id": "f1"}},
                {"id": "f2", "status": 404, "body": {"code": "NotFound.File"}},
                {"id": "f3", "status": 202, "body": {"async_task_id": "t3", "file_id": "f3"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let ids = vec!["f1".to_string(), "f2".to_string(), "f3".to_string()];
    let verdicts = drive.batch_remove(&ids, false).await.unwrap();

    assert_eq!(verdicts.len(), ids.len());
    assert!(verdicts[0].is_ok());
    assert!(matches!(verdicts[1], Err(Error::RemoveFailed(_))));
    assert!(verdicts[2].is_ok());

    let requests = server.received_requests().await.unwrap();
    let batch = requests
        .iter()
        .find(|r| r.url.path() == "/v2/batch")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&batch.body).unwrap();
    assert_eq!(body["requests"].as_array().unwrap().len(), 3);
    assert_eq!(body["requests"][0]["url"], "/recyclebin/trash");
    assert_eq!(body["requests"][1]["body"]["file_id"], "f2");
}

#[tokio::test]
async fn batch_remove_count_mismatch_fails_wholesale() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responses": [
                {"id": "f1", "status": 202, "body": {"async_task_id": "t1", "file_id": "f1"}}
            ]
        })))
        .mount(&server)
        .await;

    let drive = setup(&server);
    let ids = vec!["f1".to_string(), "f2".to_string()];
    let result = drive.batch_remove(&ids, true).await;
    assert!(matches!(
        result,
        Err(Error::BatchMismatch {
            requested: 2,
            received: 1
        })
    ));
}

#[tokio::test]
async fn empty_batch_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let drive = setup(&server);
    let verdicts = drive.batch_remove(&[], false).await.unwrap();
    assert!(verdicts.is_empty());
}
