use axum::{
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Json, Response},
};
use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::Sha256;
use thiserror::Error;

use crate::AppState;
use crate::catalog::ImageRole;
use crate::store::{StoreError, VideoLinkStore};
use crate::video::{self, PlaybackDirective};

type HmacSha256 = Hmac<Sha256>;

pub const EDITOR_COOKIE: &str = "editor_session";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Attachment must be an image")]
    InvalidAttachment,

    #[error("Product not found")]
    InvalidProduct,

    #[error("Product has no main image")]
    NoMainImage,

    #[error("Sorry, you are not allowed to edit video links")]
    Forbidden,

    #[error("Failed to save video link")]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidAttachment => "invalid_attachment",
            ApiError::InvalidProduct => "invalid_product",
            ApiError::NoMainImage => "no_main_image",
            ApiError::Forbidden => "rest_forbidden",
            ApiError::Storage(_) => "storage_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidAttachment | ApiError::NoMainImage => StatusCode::BAD_REQUEST,
            ApiError::InvalidProduct => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::UNAUTHORIZED,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(e) = &self {
            tracing::error!("Video link store failure: {}", e);
        }

        let status = self.status();
        let body = json!({
            "code": self.code(),
            "message": self.to_string(),
            "data": { "status": status.as_u16() },
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
pub struct AuthRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    authorized: bool,
}

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "Invalid secret key")?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

pub fn verify_signed_cookie(secret: &str, signed_value: &str) -> bool {
    if let Some((value, signature_b64)) = signed_value.split_once(':')
        && let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64)
        && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
    {
        mac.update(value.as_bytes());
        return mac.verify_slice(&signature).is_ok();
    }
    false
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

fn has_editor_session(headers: &HeaderMap, secret: &str) -> bool {
    get_cookie_value(headers, EDITOR_COOKIE)
        .is_some_and(|signed_value| verify_signed_cookie(secret, &signed_value))
}

pub async fn authenticate_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    tracing::info!("Editor authentication attempt received");
    let config = &app_state.config;

    if payload.password != config.app.editor_password {
        tracing::warn!("Editor authentication failed - invalid password");
        let response = AuthResponse {
            success: false,
            message: "Invalid password".to_string(),
        };
        return Ok((StatusCode::UNAUTHORIZED, HeaderMap::new(), Json(response)));
    }

    let signed_value = create_signed_cookie(&config.app.editor_secret, "editor").map_err(|e| {
        tracing::error!("Failed to sign editor session: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let cookie = format!(
        "{}={}; Path=/; Max-Age=86400; HttpOnly; SameSite=Lax",
        EDITOR_COOKIE, signed_value
    );

    let mut headers = HeaderMap::new();
    let cookie = HeaderValue::from_str(&cookie).map_err(|e| {
        tracing::error!("Editor session cookie is not a valid header: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    headers.insert(SET_COOKIE, cookie);

    tracing::info!("Editor authentication successful");
    let response = AuthResponse {
        success: true,
        message: "Authentication successful".to_string(),
    };
    Ok((StatusCode::OK, headers, Json(response)))
}

pub async fn verify_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Json<VerifyResponse> {
    let authorized = has_editor_session(&headers, &app_state.config.app.editor_secret);
    Json(VerifyResponse { authorized })
}

/// Extractor that admits only requests carrying a valid editor session cookie.
pub struct EditorSession;

impl FromRequestParts<AppState> for EditorSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        if has_editor_session(&parts.headers, &state.config.app.editor_secret) {
            Ok(EditorSession)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected request without editor session");
            Err(ApiError::Forbidden)
        }
    }
}

/// Sanitizes `raw` and stores it, or deletes the link when nothing usable remains.
/// Returns the stored URL.
async fn apply_video_link(
    store: &VideoLinkStore,
    attachment_id: u64,
    raw: Option<&str>,
) -> Result<Option<String>, StoreError> {
    match raw.and_then(video::sanitize_video_url) {
        Some(video_url) => {
            store.set_video_url(attachment_id, &video_url).await?;
            tracing::info!(attachment_id, video_url = %video_url, "Video link updated");
            Ok(Some(video_url))
        }
        None => {
            store.delete_video_url(attachment_id).await?;
            tracing::info!(attachment_id, "Video link removed");
            Ok(None)
        }
    }
}

#[derive(Serialize)]
pub struct VideoLinkResponse {
    attachment_id: u64,
    video_url: String,
    has_video: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    playback: Option<PlaybackDirective>,
}

pub async fn get_video_link_handler(
    _editor: EditorSession,
    State(app_state): State<AppState>,
    Path(attachment_id): Path<u64>,
) -> Result<Json<VideoLinkResponse>, ApiError> {
    if !app_state.catalog.is_image(attachment_id) {
        return Err(ApiError::InvalidAttachment);
    }

    let video_url = app_state.store.get_video_url(attachment_id).await;
    Ok(Json(VideoLinkResponse {
        attachment_id,
        has_video: video_url.is_some(),
        playback: video_url.as_deref().map(video::resolve),
        video_url: video_url.unwrap_or_default(),
    }))
}

#[derive(Deserialize)]
pub struct SetVideoLinkRequest {
    #[serde(default)]
    video_url: Option<Value>,
}

impl SetVideoLinkRequest {
    fn video_url(&self) -> Option<&str> {
        self.video_url.as_ref().and_then(Value::as_str)
    }
}

#[derive(Serialize)]
pub struct SetVideoLinkResponse {
    success: bool,
    message: &'static str,
    attachment_id: u64,
    video_url: String,
}

pub async fn set_video_link_handler(
    _editor: EditorSession,
    State(app_state): State<AppState>,
    Path(attachment_id): Path<u64>,
    Json(request): Json<SetVideoLinkRequest>,
) -> Result<Json<SetVideoLinkResponse>, ApiError> {
    if !app_state.catalog.is_image(attachment_id) {
        return Err(ApiError::InvalidAttachment);
    }

    let stored = apply_video_link(&app_state.store, attachment_id, request.video_url()).await?;
    Ok(Json(SetVideoLinkResponse {
        success: true,
        message: if stored.is_some() {
            "Video link updated"
        } else {
            "Video link removed"
        },
        attachment_id,
        video_url: stored.unwrap_or_default(),
    }))
}

#[derive(Serialize)]
pub struct MainImageVideoResponse {
    success: bool,
    message: &'static str,
    product_id: u64,
    main_image_id: u64,
    video_url: String,
}

pub async fn set_main_image_video_handler(
    _editor: EditorSession,
    State(app_state): State<AppState>,
    Path(product_id): Path<u64>,
    Json(request): Json<SetVideoLinkRequest>,
) -> Result<Json<MainImageVideoResponse>, ApiError> {
    let product = app_state
        .catalog
        .product(product_id)
        .ok_or(ApiError::InvalidProduct)?;
    let main_image_id = product.main_image.ok_or(ApiError::NoMainImage)?;

    let stored = apply_video_link(&app_state.store, main_image_id, request.video_url()).await?;
    Ok(Json(MainImageVideoResponse {
        success: true,
        message: if stored.is_some() {
            "Video link added to main image"
        } else {
            "Video link removed from main image"
        },
        product_id,
        main_image_id,
        video_url: stored.unwrap_or_default(),
    }))
}

#[derive(Serialize)]
pub struct GalleryImageVideo {
    attachment_id: u64,
    #[serde(rename = "type")]
    role: ImageRole,
    image_url: String,
    video_url: String,
    has_video: bool,
}

#[derive(Serialize)]
pub struct GalleryVideosResponse {
    product_id: u64,
    gallery_images: Vec<GalleryImageVideo>,
}

pub async fn get_gallery_videos_handler(
    _editor: EditorSession,
    State(app_state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Result<Json<GalleryVideosResponse>, ApiError> {
    let product = app_state
        .catalog
        .product(product_id)
        .ok_or(ApiError::InvalidProduct)?;

    let mut gallery_images = Vec::new();
    for (attachment_id, role) in product.image_ids() {
        let video_url = app_state.store.get_video_url(attachment_id).await;
        gallery_images.push(GalleryImageVideo {
            attachment_id,
            role,
            image_url: app_state
                .catalog
                .attachment(attachment_id)
                .map(|attachment| attachment.url())
                .unwrap_or_default(),
            has_video: video_url.is_some(),
            video_url: video_url.unwrap_or_default(),
        });
    }

    Ok(Json(GalleryVideosResponse {
        product_id,
        gallery_images,
    }))
}

#[derive(Deserialize)]
pub struct BulkVideoLinksRequest {
    #[serde(default)]
    video_links: Vec<BulkVideoLink>,
}

#[derive(Deserialize)]
pub struct BulkVideoLink {
    #[serde(default)]
    attachment_id: Option<Value>,
    #[serde(default)]
    video_url: Option<Value>,
}

#[derive(Serialize)]
pub struct UpdatedVideoLink {
    attachment_id: u64,
    video_url: String,
}

#[derive(Serialize)]
pub struct BulkVideoLinksResponse {
    success: bool,
    product_id: u64,
    updated: Vec<UpdatedVideoLink>,
    errors: Vec<String>,
}

/// Ids arrive as JSON numbers or numeric strings.
fn coerce_attachment_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub async fn set_gallery_videos_handler(
    _editor: EditorSession,
    State(app_state): State<AppState>,
    Path(product_id): Path<u64>,
    Json(request): Json<BulkVideoLinksRequest>,
) -> Result<Json<BulkVideoLinksResponse>, ApiError> {
    if app_state.catalog.product(product_id).is_none() {
        return Err(ApiError::InvalidProduct);
    }

    let mut updated = Vec::new();
    let mut errors = Vec::new();

    for entry in &request.video_links {
        let Some(attachment_id) = entry.attachment_id.as_ref().and_then(coerce_attachment_id)
        else {
            errors.push("Missing attachment_id in video_links entry".to_string());
            continue;
        };

        if !app_state.catalog.is_image(attachment_id) {
            errors.push(format!("Attachment {} is not an image", attachment_id));
            continue;
        }

        let raw = entry.video_url.as_ref().and_then(Value::as_str);
        match apply_video_link(&app_state.store, attachment_id, raw).await {
            Ok(stored) => updated.push(UpdatedVideoLink {
                attachment_id,
                video_url: stored.unwrap_or_default(),
            }),
            Err(e) => {
                tracing::error!(attachment_id, "Failed to save video link: {}", e);
                errors.push(format!(
                    "Failed to save video link for attachment {}: {}",
                    attachment_id, e
                ));
            }
        }
    }

    if !errors.is_empty() {
        tracing::warn!(product_id, ?errors, "Skipped invalid video link entries");
    }

    Ok(Json(BulkVideoLinksResponse {
        success: true,
        product_id,
        updated,
        errors,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_cookie_roundtrip() {
        let signed = create_signed_cookie("secret", "editor").unwrap();
        assert!(signed.starts_with("editor:"));
        assert!(verify_signed_cookie("secret", &signed));
        assert!(!verify_signed_cookie("other-secret", &signed));
        assert!(!verify_signed_cookie("secret", "editor:forged"));
        assert!(!verify_signed_cookie("secret", "no-signature"));
    }

    #[test]
    fn test_get_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; editor_session=abc:def ; other=1"),
        );
        assert_eq!(
            get_cookie_value(&headers, EDITOR_COOKIE).as_deref(),
            Some("abc:def")
        );
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_coerce_attachment_id() {
        assert_eq!(coerce_attachment_id(&json!(42)), Some(42));
        assert_eq!(coerce_attachment_id(&json!("42")), Some(42));
        assert_eq!(coerce_attachment_id(&json!(" 7 ")), Some(7));
        assert_eq!(coerce_attachment_id(&json!("abc")), None);
        assert_eq!(coerce_attachment_id(&json!(-1)), None);
        assert_eq!(coerce_attachment_id(&json!(null)), None);
    }

    #[test]
    fn test_error_codes_and_statuses() {
        assert_eq!(ApiError::InvalidAttachment.code(), "invalid_attachment");
        assert_eq!(ApiError::InvalidAttachment.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidProduct.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NoMainImage.code(), "no_main_image");
        assert_eq!(ApiError::Forbidden.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_apply_video_link_sanitizes_or_deletes() {
        let store = VideoLinkStore::in_memory();

        let stored = apply_video_link(&store, 5, Some("  https://vimeo.com/76979871 "))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("https://vimeo.com/76979871"));

        let stored = apply_video_link(&store, 5, Some("javascript:alert(1)"))
            .await
            .unwrap();
        assert_eq!(stored, None);
        assert_eq!(store.get_video_url(5).await, None);

        store.set_video_url(5, "https://vimeo.com/1").await.unwrap();
        assert_eq!(apply_video_link(&store, 5, None).await.unwrap(), None);
        assert_eq!(store.get_video_url(5).await, None);
    }
}
