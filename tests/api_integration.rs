use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use videolink::api::{EDITOR_COOKIE, create_signed_cookie};
use videolink::{Config, create_app};

const SECRET: &str = "test-secret";

const CATALOG: &str = r#"
[[products]]
id = 10
name = "Trail Shoe"
main_image = 1
gallery = [2, 3]

[[products]]
id = 11
name = "Gift Card"

[[attachments]]
id = 1
file = "front.jpg"

[[attachments]]
id = 2
file = "side.jpg"

[[attachments]]
id = 3
file = "manual.pdf"
"#;

fn create_test_config(temp_dir: &TempDir) -> Config {
    let root = temp_dir.path();
    fs::create_dir_all(root.join("static")).unwrap();
    fs::create_dir_all(root.join("media")).unwrap();
    fs::write(root.join("catalog.toml"), CATALOG).unwrap();

    let mut config = Config::default();
    config.app.editor_secret = SECRET.to_string();
    config.app.editor_password = "letmein".to_string();
    config.templates.directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
    config.static_files.directory = root.join("static");
    config.catalog.file = root.join("catalog.toml");
    config.catalog.media_directory = root.join("media");
    config.video.store_file = root.join("data").join("video_links.toml");
    config
}

async fn create_test_server(temp_dir: &TempDir) -> TestServer {
    let app = create_app(create_test_config(temp_dir)).await.unwrap();
    TestServer::new(app).unwrap()
}

fn cookie_header() -> HeaderName {
    HeaderName::from_static("cookie")
}

fn editor_cookie() -> HeaderValue {
    let signed = create_signed_cookie(SECRET, "editor").unwrap();
    HeaderValue::from_str(&format!("{}={}", EDITOR_COOKIE, signed)).unwrap()
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir).await;

    let response = server.get("/api/v1/attachment/1/video-link").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "rest_forbidden");
    assert_eq!(body["data"]["status"], 401);

    let forged = HeaderValue::from_static("editor_session=editor:bm90LWEtc2lnbmF0dXJl");
    let response = server
        .post("/api/v1/attachment/1/video-link")
        .add_header(cookie_header(), forged)
        .json(&json!({ "video_url": "https://vimeo.com/1" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_sets_editor_session() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir).await;

    let response = server
        .post("/api/auth")
        .json(&json!({ "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["success"], false);

    let response = server
        .post("/api/auth")
        .json(&json!({ "password": "letmein" }))
        .await;
    response.assert_status_ok();
    let set_cookie = response.header("set-cookie");
    let set_cookie = set_cookie.to_str().unwrap();
    assert!(set_cookie.starts_with("editor_session=editor:"));
    assert!(set_cookie.contains("HttpOnly"));

    let session = set_cookie.split(';').next().unwrap().to_string();
    let response = server
        .get("/api/verify")
        .add_header(cookie_header(), HeaderValue::from_str(&session).unwrap())
        .await;
    assert_eq!(response.json::<Value>()["authorized"], true);

    let response = server.get("/api/verify").await;
    assert_eq!(response.json::<Value>()["authorized"], false);
}

#[tokio::test]
async fn test_set_get_and_remove_video_link() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir).await;

    let response = server
        .post("/api/v1/attachment/1/video-link")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({ "video_url": " https://youtu.be/dQw4w9WgXcQ " }))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "success": true,
            "message": "Video link updated",
            "attachment_id": 1,
            "video_url": "https://youtu.be/dQw4w9WgXcQ",
        })
    );

    let response = server
        .get("/api/v1/attachment/1/video-link")
        .add_header(cookie_header(), editor_cookie())
        .await;
    let body: Value = response.json();
    assert_eq!(body["has_video"], true);
    assert_eq!(body["playback"]["kind"], "embed");
    assert_eq!(
        body["playback"]["url"],
        "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0&modestbranding=1"
    );

    // Links persist to the store file
    let stored = fs::read_to_string(temp_dir.path().join("data/video_links.toml")).unwrap();
    assert!(stored.contains("https://youtu.be/dQw4w9WgXcQ"));

    let response = server
        .put("/api/v1/attachment/1/video-link")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({ "video_url": "javascript:alert(1)" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["message"], "Video link removed");
    assert_eq!(body["video_url"], "");

    let response = server
        .get("/api/v1/attachment/1/video-link")
        .add_header(cookie_header(), editor_cookie())
        .await;
    let body: Value = response.json();
    assert_eq!(body["has_video"], false);
    assert_eq!(body["video_url"], "");
    assert!(body.get("playback").is_none());
}

#[tokio::test]
async fn test_non_image_attachment_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir).await;

    for id in [3, 404] {
        let response = server
            .post(&format!("/api/v1/attachment/{}/video-link", id))
            .add_header(cookie_header(), editor_cookie())
            .json(&json!({ "video_url": "https://vimeo.com/1" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], "invalid_attachment");
    }
}

#[tokio::test]
async fn test_main_image_video_link() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir).await;

    let response = server
        .post("/api/v1/product/10/main-image/video-link")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({ "video_url": "https://vimeo.com/76979871" }))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "success": true,
            "message": "Video link added to main image",
            "product_id": 10,
            "main_image_id": 1,
            "video_url": "https://vimeo.com/76979871",
        })
    );

    let response = server
        .post("/api/v1/product/10/main-image/video-link")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({}))
        .await;
    assert_eq!(
        response.json::<Value>()["message"],
        "Video link removed from main image"
    );

    let response = server
        .post("/api/v1/product/11/main-image/video-link")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({ "video_url": "https://vimeo.com/1" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "no_main_image");

    let response = server
        .post("/api/v1/product/99/main-image/video-link")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({ "video_url": "https://vimeo.com/1" }))
        .await;
    response.assert_status_not_found();
    assert_eq!(response.json::<Value>()["code"], "invalid_product");
}

#[tokio::test]
async fn test_bulk_gallery_video_links() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir).await;

    let response = server
        .post("/api/v1/product/10/gallery/video-links")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({
            "video_links": [
                { "attachment_id": 1, "video_url": "/uploads/front.mp4" },
                { "attachment_id": "2", "video_url": "https://vimeo.com/2" },
                { "attachment_id": 3, "video_url": "https://vimeo.com/3" },
                { "video_url": "https://vimeo.com/4" },
            ]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["product_id"], 10);
    assert_eq!(
        body["updated"],
        json!([
            { "attachment_id": 1, "video_url": "/uploads/front.mp4" },
            { "attachment_id": 2, "video_url": "https://vimeo.com/2" },
        ])
    );
    assert_eq!(
        body["errors"],
        json!([
            "Attachment 3 is not an image",
            "Missing attachment_id in video_links entry",
        ])
    );

    let response = server
        .get("/api/v1/product/10/gallery/video-links")
        .add_header(cookie_header(), editor_cookie())
        .await;
    let body: Value = response.json();
    let images = body["gallery_images"].as_array().unwrap();
    assert_eq!(images.len(), 3);
    assert_eq!(images[0]["type"], "main");
    assert_eq!(images[0]["image_url"], "/media/front.jpg");
    assert_eq!(images[0]["video_url"], "/uploads/front.mp4");
    assert_eq!(images[1]["type"], "gallery");
    assert_eq!(images[1]["has_video"], true);
    assert_eq!(images[2]["attachment_id"], 3);
    assert_eq!(images[2]["has_video"], false);
}

#[tokio::test]
async fn test_bulk_update_continues_past_storage_failure() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir).await;

    server
        .post("/api/v1/attachment/1/video-link")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({ "video_url": "https://vimeo.com/1" }))
        .await
        .assert_status_ok();

    // The store directory turns into a plain file, so writes now fail
    let data_dir = temp_dir.path().join("data");
    fs::remove_dir_all(&data_dir).unwrap();
    fs::write(&data_dir, "not a directory").unwrap();

    let response = server
        .put("/api/v1/product/10/gallery/video-links")
        .add_header(cookie_header(), editor_cookie())
        .json(&json!({
            "video_links": [
                { "attachment_id": 1, "video_url": "https://vimeo.com/11" },
                { "attachment_id": 2 },
                { "attachment_id": 3, "video_url": "https://vimeo.com/3" },
            ]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["updated"],
        json!([{ "attachment_id": 2, "video_url": "" }])
    );
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(
        errors[0]
            .as_str()
            .unwrap()
            .starts_with("Failed to save video link for attachment 1:")
    );
    assert_eq!(errors[1], "Attachment 3 is not an image");

    // The failed write did not change what is served
    let response = server
        .get("/api/v1/attachment/1/video-link")
        .add_header(cookie_header(), editor_cookie())
        .await;
    assert_eq!(response.json::<Value>()["video_url"], "https://vimeo.com/1");
}

#[tokio::test]
async fn test_links_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let server = create_test_server(&temp_dir).await;
        server
            .post("/api/v1/attachment/2/video-link")
            .add_header(cookie_header(), editor_cookie())
            .json(&json!({ "video_url": "https://vimeo.com/22" }))
            .await
            .assert_status_ok();
    }

    let server = create_test_server(&temp_dir).await;
    let response = server
        .get("/api/v1/attachment/2/video-link")
        .add_header(cookie_header(), editor_cookie())
        .await;
    assert_eq!(response.json::<Value>()["video_url"], "https://vimeo.com/22");
}
