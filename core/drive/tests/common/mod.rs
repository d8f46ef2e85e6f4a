#![allow(dead_code)]

use adrive_drive::{Drive, DriveConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DRIVE_ID: &str = "drive-1";

pub fn config(server: &MockServer) -> DriveConfig {
    DriveConfig::with_base_url(server.uri())
}

pub fn setup(server: &MockServer) -> Drive {
    Drive::new(config(server), "rt-0").unwrap()
}

pub fn refresh_body(access: &str, refresh: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 7200,
        "default_drive_id": DRIVE_ID,
        "token_type": "Bearer"
    })
}

/// Mount a refresh endpoint that always succeeds.
pub async fn mount_refresh(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("at-1", "rt-1")))
        .mount(server)
        .await;
}

pub fn file_item(file_id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "drive_id": DRIVE_ID,
        "file_id": file_id,
        "parent_file_id": "root",
        "name": name,
        "type": "file",
        "size": 10,
        "created_at": "2021-06-01T10:00:00.000Z",
        "updated_at": "2021-06-01T10:00:00.000Z"
    })
}
