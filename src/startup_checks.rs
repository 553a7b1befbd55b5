use crate::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create video link store directory: {0}")]
    StoreDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Static files directory does not exist")]
    StaticDirectoryMissing,

    #[error("Catalog file does not exist: {0}")]
    CatalogMissing(String),

    #[error("Media directory is not accessible: {0}")]
    MediaDirectoryInaccessible(String),
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    // The store writes next to its file, so the directory must exist before the first save
    if let Some(store_dir) = config.video.store_file.parent()
        && !store_dir.as_os_str().is_empty()
    {
        if store_dir.exists() {
            info!("Video link store directory exists: {:?}", store_dir);
        } else {
            info!(
                "Video link store directory does not exist, creating: {:?}",
                store_dir
            );
            if let Err(e) = tokio::fs::create_dir_all(store_dir).await {
                error!("Failed to create video link store directory: {}", e);
                errors.push(StartupCheckError::StoreDirectoryCreationFailed(e));
            }
        }
    }

    let static_dir = &config.static_files.directory;
    if static_dir.exists() {
        info!("Static files directory exists: {:?}", static_dir);
    } else {
        warn!("Static files directory does not exist: {:?}", static_dir);
        errors.push(StartupCheckError::StaticDirectoryMissing);
    }

    let catalog_file = &config.catalog.file;
    if catalog_file.exists() {
        info!("Catalog file exists: {:?}", catalog_file);
    } else {
        error!("Catalog file does not exist: {:?}", catalog_file);
        errors.push(StartupCheckError::CatalogMissing(
            catalog_file.display().to_string(),
        ));
    }

    let media_dir = &config.catalog.media_directory;
    match tokio::fs::read_dir(media_dir).await {
        Ok(_) => info!("Media directory is accessible: {:?}", media_dir),
        Err(e) => {
            error!("Media directory {:?} is not accessible: {}", media_dir, e);
            errors.push(StartupCheckError::MediaDirectoryInaccessible(
                media_dir.display().to_string(),
            ));
        }
    }

    let templates_dir = Path::new(&config.templates.directory);
    if !templates_dir.exists() {
        warn!("Templates directory does not exist: {:?}", templates_dir);
        warn!("This may cause issues with page rendering");
    } else {
        info!("Templates directory exists: {:?}", templates_dir);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
