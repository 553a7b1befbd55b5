use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::AppState;
use crate::catalog::{Catalog, ImageRole, Product};
use crate::store::VideoLinkStore;
use crate::video::{self, DisplayMode, player};

/// Player timings and display mode, embedded in product pages as JSON.
///
/// The browser script that implements [`PlayerSurface`](crate::video::player::PlayerSurface)
/// is not part of this crate; it reads these settings from `#video-link-settings`.
#[derive(Debug, Serialize)]
pub struct ClientSettings {
    pub display_mode: DisplayMode,
    pub load_timeout_ms: u64,
    pub embed_settle_ms: u64,
}

impl ClientSettings {
    pub fn new(display_mode: DisplayMode) -> Self {
        Self {
            display_mode,
            load_timeout_ms: player::LOAD_TIMEOUT.as_millis() as u64,
            embed_settle_ms: player::EMBED_SETTLE.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryImageView {
    pub attachment_id: u64,
    /// DOM id of the image container, used as the owner of its inline overlay.
    pub element_id: String,
    pub role: ImageRole,
    pub image_url: String,
    pub title: String,
    pub has_video: bool,
    pub video_url: String,
    /// `"file"` or `"embed"` when a video is attached.
    pub player: String,
    pub mime_type: String,
    pub embed_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub thumbnail_url: String,
    pub image_count: usize,
    pub video_count: usize,
}

/// Images of `product` in display order. Missing and non-image attachments are skipped.
pub async fn gallery_images(
    catalog: &Catalog,
    store: &VideoLinkStore,
    product: &Product,
) -> Vec<GalleryImageView> {
    let mut images = Vec::new();

    for (attachment_id, role) in product.image_ids() {
        let Some(attachment) = catalog.attachment(attachment_id) else {
            warn!(
                product_id = product.id,
                attachment_id, "Product references a missing attachment"
            );
            continue;
        };
        if !attachment.is_image() {
            debug!(attachment_id, "Skipping non-image attachment in gallery");
            continue;
        }

        let video_url = store.get_video_url(attachment_id).await;
        let directive = video_url.as_deref().map(video::resolve);

        images.push(GalleryImageView {
            attachment_id,
            element_id: format!("product-{}-image-{}", product.id, attachment_id),
            role,
            image_url: attachment.url(),
            title: attachment.display_title().to_string(),
            has_video: video_url.is_some(),
            player: match &directive {
                Some(directive) if directive.is_file() => "file".to_string(),
                Some(_) => "embed".to_string(),
                None => String::new(),
            },
            mime_type: directive
                .as_ref()
                .and_then(|directive| directive.mime_type)
                .unwrap_or_default()
                .to_string(),
            embed_url: directive
                .filter(|directive| !directive.is_file())
                .map(|directive| directive.url)
                .unwrap_or_default(),
            video_url: video_url.unwrap_or_default(),
        });
    }

    images
}

async fn page_globals(app_state: &AppState) -> liquid::Object {
    let stylesheet = app_state
        .static_handler
        .get_versioned_url("/static/video-link.css")
        .await;

    liquid::object!({
        "site_name": app_state.config.app.name.clone(),
        "base_url": app_state.config.app.base_url.clone().unwrap_or_default(),
        "stylesheet_url": stylesheet,
    })
}

fn render_error(status: StatusCode) -> Response {
    status.into_response()
}

pub async fn product_index_handler(State(app_state): State<AppState>) -> Response {
    let mut products = Vec::new();
    for product in app_state.catalog.products() {
        let images = gallery_images(&app_state.catalog, &app_state.store, product).await;
        products.push(ProductSummary {
            id: product.id,
            name: product.name.clone(),
            url: format!("/product/{}", product.id),
            thumbnail_url: images
                .first()
                .map(|image| image.image_url.clone())
                .unwrap_or_default(),
            image_count: images.len(),
            video_count: images.iter().filter(|image| image.has_video).count(),
        });
    }

    let mut globals = page_globals(&app_state).await;
    globals.insert(
        "page_title".into(),
        liquid::model::Value::Scalar(app_state.config.app.name.clone().into()),
    );
    globals.insert(
        "products".into(),
        liquid::model::to_value(&products).unwrap_or(liquid::model::Value::Nil),
    );

    match app_state
        .template_engine
        .render_page("index.html.liquid", globals)
        .await
    {
        Ok(html) => html.into_response(),
        Err(status) => render_error(status),
    }
}

pub async fn product_page_handler(
    State(app_state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Response {
    let Some(product) = app_state.catalog.product(product_id) else {
        debug!(product_id, "Product not found");
        return (StatusCode::NOT_FOUND, Html("Product not found")).into_response();
    };

    let display_mode = app_state.config.video.display_mode;
    let images = gallery_images(&app_state.catalog, &app_state.store, product).await;

    let settings_json = match serde_json::to_string(&ClientSettings::new(display_mode)) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize client settings: {}", e);
            return render_error(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut globals = page_globals(&app_state).await;
    globals.insert(
        "page_title".into(),
        liquid::model::Value::Scalar(product.name.clone().into()),
    );
    globals.insert(
        "product".into(),
        liquid::model::to_value(product).unwrap_or(liquid::model::Value::Nil),
    );
    globals.insert(
        "images".into(),
        liquid::model::to_value(&images).unwrap_or(liquid::model::Value::Nil),
    );
    globals.insert(
        "display_mode".into(),
        liquid::model::Value::Scalar(display_mode.as_str().into()),
    );
    globals.insert(
        "settings_json".into(),
        liquid::model::Value::Scalar(settings_json.into()),
    );

    match app_state
        .template_engine
        .render_page("product.html.liquid", globals)
        .await
    {
        Ok(html) => html.into_response(),
        Err(status) => render_error(status),
    }
}
