use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::TomlError),

    #[error("TOML decoding error: {0}")]
    DecodeError(#[from] toml_edit::de::Error),

    #[error("TOML encoding error: {0}")]
    EncodeError(#[from] toml_edit::ser::Error),
}

/// A video URL attached to an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLink {
    pub attachment_id: u64,
    pub video_url: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    links: Vec<VideoLink>,
}

/// Image id to video URL associations, persisted to a TOML file after every change.
#[derive(Debug)]
pub struct VideoLinkStore {
    path: Option<PathBuf>,
    links: RwLock<BTreeMap<u64, VideoLink>>,
}

pub type SharedStore = Arc<VideoLinkStore>;

impl VideoLinkStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            links: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load the store at `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let links = if tokio::fs::try_exists(&path).await? {
            load_links(&path).await?
        } else {
            debug!("Video link store {:?} not found, starting empty", path);
            BTreeMap::new()
        };

        info!("Loaded {} video links from {:?}", links.len(), path);
        Ok(Self {
            path: Some(path),
            links: RwLock::new(links),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn get_video_url(&self, attachment_id: u64) -> Option<String> {
        let links = self.links.read().await;
        links.get(&attachment_id).map(|link| link.video_url.clone())
    }

    pub async fn set_video_url(&self, attachment_id: u64, video_url: &str) -> Result<(), StoreError> {
        let mut links = self.links.write().await;
        let mut next = links.clone();
        next.insert(
            attachment_id,
            VideoLink {
                attachment_id,
                video_url: video_url.to_string(),
                updated_at: Utc::now(),
            },
        );
        self.persist(&next).await?;
        *links = next;
        debug!(attachment_id, video_url, "stored video link");
        Ok(())
    }

    /// Returns whether a link was removed.
    pub async fn delete_video_url(&self, attachment_id: u64) -> Result<bool, StoreError> {
        let mut links = self.links.write().await;
        let mut next = links.clone();
        if next.remove(&attachment_id).is_none() {
            return Ok(false);
        }
        self.persist(&next).await?;
        *links = next;
        debug!(attachment_id, "removed video link");
        Ok(true)
    }

    /// All links ordered by attachment id.
    pub async fn list(&self) -> Vec<VideoLink> {
        let links = self.links.read().await;
        links.values().cloned().collect()
    }

    // Runs under the write lock so concurrent writers cannot interleave file contents.
    // Callers swap `links` into memory only after this succeeds.
    async fn persist(&self, links: &BTreeMap<u64, VideoLink>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = StoreFile {
            links: links.values().cloned().collect(),
        };
        let document = toml_edit::ser::to_document(&file)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, document.to_string()).await?;
        Ok(())
    }
}

async fn load_links(path: &Path) -> Result<BTreeMap<u64, VideoLink>, StoreError> {
    let contents = tokio::fs::read_to_string(path).await?;
    let document = contents.parse::<toml_edit::DocumentMut>()?;
    let file: StoreFile = toml_edit::de::from_document(document)?;

    Ok(file
        .links
        .into_iter()
        .map(|link| (link.attachment_id, link))
        .collect())
}
