//! A mock video host for integration tests.

#![allow(dead_code)]

use recording_uploader::{Config, Credentials, Endpoints, VideoHostClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "ya29.mock-access-token";
pub const REFRESH_TOKEN: &str = "1//mock-refresh-token";
pub const UPLOAD_PATH: &str = "/upload/youtube/v3/videos";
pub const SESSION_PATH: &str = "/upload/session/abc";
pub const VIDEOS_PATH: &str = "/youtube/v3/videos";

pub fn config(server: &MockServer) -> Config {
    Config {
        credentials: Credentials::new("client-id", "client-secret", REFRESH_TOKEN),
        endpoints: Endpoints::with_base(&server.uri()),
        ..Config::default()
    }
}

pub fn client(server: &MockServer) -> VideoHostClient {
    VideoHostClient::new(config(server))
}

/// Answers refresh-token exchanges with a fresh hour-long token, `expected` times.
pub async fn mount_token_endpoint(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3599,
        })))
        .expect(expected)
        .named("token refresh")
        .mount(server)
        .await;
}

/// Accepts session creation, pointing the client at [`SESSION_PATH`], `expected` times.
pub async fn mount_initiation(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", format!("{}{SESSION_PATH}", server.uri())),
        )
        .expect(expected)
        .named("session initiation")
        .mount(server)
        .await;
}

pub fn created_video(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({
        "kind": "youtube#video",
        "id": id,
        "snippet": {
            "title": "Checkout button does nothing",
            "thumbnails": {
                "default": { "url": format!("https://i.ytimg.com/vi/{id}/default.jpg") },
                "high": { "url": format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg") },
            },
        },
        "status": {
            "uploadStatus": "uploaded",
            "privacyStatus": "unlisted",
        },
    }))
}

/// Deterministic filler that is not mistaken for any container format.
pub fn recording(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
