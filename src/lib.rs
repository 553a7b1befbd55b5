use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod api;
pub mod catalog;
pub mod product;
pub mod startup_checks;
pub mod static_files;
pub mod store;
pub mod templating;
pub mod video;

use video::DisplayMode;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub templates: TemplateConfig,
    pub static_files: StaticConfig,
    pub catalog: CatalogConfig,
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    /// Key used to sign editor session cookies.
    pub editor_secret: String,
    pub editor_password: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// TOML file listing products and attachments.
    pub file: PathBuf,
    /// Directory attachment files are served from under `/media/`.
    pub media_directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    #[serde(default)]
    pub display_mode: DisplayMode,
    pub store_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Video Link".to_string(),
                log_level: "info".to_string(),
                editor_secret: "change-me-in-production".to_string(),
                editor_password: "password".to_string(),
                base_url: None,
            },
            templates: TemplateConfig {
                directory: PathBuf::from("templates"),
            },
            static_files: StaticConfig {
                directory: PathBuf::from("static"),
            },
            catalog: CatalogConfig {
                file: PathBuf::from("catalog.toml"),
                media_directory: PathBuf::from("media"),
            },
            video: VideoConfig {
                display_mode: DisplayMode::Inline,
                store_file: PathBuf::from("data/video_links.toml"),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Video link store error: {0}")]
    Store(#[from] store::StoreError),
}

use axum::{
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub template_engine: Arc<templating::TemplateEngine>,
    pub static_handler: static_files::StaticFileHandler,
    pub media_handler: static_files::StaticFileHandler,
    pub catalog: Arc<catalog::Catalog>,
    pub store: store::SharedStore,
    pub config: Config,
}

async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    app_state
        .static_handler
        .serve(&path, query.contains_key("v"))
        .await
}

async fn media_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    app_state.media_handler.serve(&path, false).await
}

pub async fn create_app(config: Config) -> Result<Router, AppError> {
    let template_engine = Arc::new(templating::TemplateEngine::new(
        config.templates.directory.clone(),
    ));

    let static_handler =
        static_files::StaticFileHandler::new(config.static_files.directory.clone());
    static_handler.refresh_file_versions().await;
    let media_handler =
        static_files::StaticFileHandler::new(config.catalog.media_directory.clone());

    let catalog = Arc::new(catalog::Catalog::load_from_file(&config.catalog.file).await?);
    let store = Arc::new(store::VideoLinkStore::open(config.video.store_file.clone()).await?);

    let app_state = AppState {
        template_engine,
        static_handler,
        media_handler,
        catalog,
        store,
        config: config.clone(),
    };

    Ok(Router::new()
        .route("/", get(product::product_index_handler))
        .route("/product/{id}", get(product::product_page_handler))
        .route("/api/auth", axum::routing::post(api::authenticate_handler))
        .route("/api/verify", get(api::verify_handler))
        .route(
            "/api/v1/attachment/{id}/video-link",
            get(api::get_video_link_handler)
                .post(api::set_video_link_handler)
                .put(api::set_video_link_handler),
        )
        .route(
            "/api/v1/product/{id}/main-image/video-link",
            axum::routing::post(api::set_main_image_video_handler)
                .put(api::set_main_image_video_handler),
        )
        .route(
            "/api/v1/product/{id}/gallery/video-links",
            get(api::get_gallery_videos_handler)
                .post(api::set_gallery_videos_handler)
                .put(api::set_gallery_videos_handler),
        )
        .route("/media/{*path}", get(media_file_handler))
        .route("/static/{*path}", get(static_file_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let method = request.method();
                    let uri = request.uri();
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %method,
                        path = %uri.path(),
                        query = ?uri.query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state))
}
