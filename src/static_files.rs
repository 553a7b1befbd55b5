use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::UNIX_EPOCH,
};
use tokio::{fs::File, sync::RwLock};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

/// Serves files from one directory, with mtime-based version strings for stylesheets.
#[derive(Clone)]
pub struct StaticFileHandler {
    pub root_dir: PathBuf,
    file_versions: Arc<RwLock<HashMap<String, u64>>>,
}

impl StaticFileHandler {
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            file_versions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn refresh_file_versions(&self) {
        info!("Refreshing static file versions in {:?}", self.root_dir);
        let mut versions = self.file_versions.write().await;
        versions.clear();

        let Ok(mut entries) = tokio::fs::read_dir(&self.root_dir).await else {
            return;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(metadata) = entry.metadata().await
                && metadata.is_file()
            {
                let path = entry.path();
                if let Some(ext) = path.extension()
                    && ext == "css"
                    && let Ok(modified) = metadata.modified()
                    && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
                    && let Some(file_name) = path.file_name().and_then(|name| name.to_str())
                {
                    versions.insert(file_name.to_string(), duration.as_secs());
                    debug!("File version: {} -> {}", file_name, duration.as_secs());
                }
            }
        }
    }

    pub async fn get_file_version(&self, filename: &str) -> Option<u64> {
        let versions = self.file_versions.read().await;
        versions.get(filename).copied()
    }

    pub async fn get_versioned_url(&self, path: &str) -> String {
        let filename = path.rsplit('/').next().unwrap_or(path);

        if let Some(version) = self.get_file_version(filename).await {
            format!("{}?v={}", path, version)
        } else {
            path.to_string()
        }
    }

    pub async fn serve(&self, path: &str, has_version: bool) -> Response {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            error!("Path traversal attempt: {:?}", path);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }

        let file_path = self.root_dir.join(relative);
        debug!("Attempting to serve file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            Err(e) => {
                debug!("Failed to get metadata for {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();

        let body = Body::from_stream(ReaderStream::new(file));

        let cache_control = if has_version {
            "public, max-age=31536000, immutable"
        } else if content_type.starts_with("image/") || content_type.starts_with("video/") {
            "public, max-age=31536000"
        } else if content_type.starts_with("text/css") {
            "public, max-age=300, must-revalidate"
        } else {
            "public, max-age=3600"
        };

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, cache_control);

        if let Ok(modified) = metadata.modified()
            && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
        {
            response = response.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));

            // mtime and size are enough to tell versions of a file apart
            let etag = format!("\"{}-{}\"", duration.as_secs(), metadata.len());
            response = response.header(header::ETAG, etag);
        }

        response.body(body).unwrap_or_else(|e| {
            error!("Failed to build response for {:?}: {}", file_path, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_versioned_url_uses_mtime() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("video-link.css"), "body {}").unwrap();
        std::fs::write(temp_dir.path().join("poster.png"), [0u8; 4]).unwrap();

        let handler = StaticFileHandler::new(temp_dir.path().to_path_buf());
        assert_eq!(
            handler.get_versioned_url("/static/video-link.css").await,
            "/static/video-link.css"
        );

        handler.refresh_file_versions().await;
        let url = handler.get_versioned_url("/static/video-link.css").await;
        assert!(url.starts_with("/static/video-link.css?v="));
        assert_eq!(
            handler.get_versioned_url("/static/poster.png").await,
            "/static/poster.png"
        );
    }

    #[tokio::test]
    async fn test_serve_rejects_parent_components() {
        let temp_dir = TempDir::new().unwrap();
        let handler = StaticFileHandler::new(temp_dir.path().join("public"));

        let response = handler.serve("../secret.txt", false).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_serve_sets_headers() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("clip.mp4"), [0u8; 16]).unwrap();
        let handler = StaticFileHandler::new(temp_dir.path().to_path_buf());

        let response = handler.serve("clip.mp4", false).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=31536000"
        );
        assert!(response.headers().contains_key(header::ETAG));

        let missing = handler.serve("nothing.mp4", true).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stylesheet_cache_depends_on_version() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("video-link.css"), "body {}").unwrap();
        let handler = StaticFileHandler::new(temp_dir.path().to_path_buf());

        let response = handler.serve("video-link.css", false).await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=300, must-revalidate"
        );

        let response = handler.serve("video-link.css", true).await;
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=31536000, immutable"
        );
    }
}
