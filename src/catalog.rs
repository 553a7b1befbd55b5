use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::de::Error),

    #[error("Duplicate attachment id: {0}")]
    DuplicateAttachment(u64),

    #[error("Duplicate product id: {0}")]
    DuplicateProduct(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub main_image: Option<u64>,
    #[serde(default)]
    pub gallery: Vec<u64>,
}

impl Product {
    /// Main image first, then the gallery in order.
    pub fn image_ids(&self) -> impl Iterator<Item = (u64, ImageRole)> + '_ {
        self.main_image
            .map(|id| (id, ImageRole::Main))
            .into_iter()
            .chain(self.gallery.iter().map(|&id| (id, ImageRole::Gallery)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Main,
    Gallery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    /// Path relative to the media directory.
    pub file: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        mime_guess::from_path(&self.file)
            .first()
            .is_some_and(|mime| mime.type_().as_str() == "image")
    }

    pub fn url(&self) -> String {
        let encoded: Vec<_> = self
            .file
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("/media/{}", encoded.join("/"))
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| {
            Path::new(&self.file)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(&self.file)
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

/// Products and their media, loaded once at startup.
#[derive(Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    product_index: HashMap<u64, usize>,
    attachments: HashMap<u64, Attachment>,
}

impl Catalog {
    pub fn from_toml(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml_edit::de::from_str(contents)?;

        let mut attachments = HashMap::new();
        for attachment in file.attachments {
            let id = attachment.id;
            if attachments.insert(id, attachment).is_some() {
                return Err(CatalogError::DuplicateAttachment(id));
            }
        }

        let mut product_index = HashMap::new();
        for (index, product) in file.products.iter().enumerate() {
            if product_index.insert(product.id, index).is_some() {
                return Err(CatalogError::DuplicateProduct(product.id));
            }
        }

        Ok(Self {
            products: file.products,
            product_index,
            attachments,
        })
    }

    pub async fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            debug!("Catalog file {:?} not found, starting empty", path);
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_toml(&contents)?;
        info!(
            "Loaded catalog with {} products and {} attachments",
            catalog.products.len(),
            catalog.attachments.len()
        );
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: u64) -> Option<&Product> {
        self.product_index.get(&id).map(|&index| &self.products[index])
    }

    pub fn attachment(&self, id: u64) -> Option<&Attachment> {
        self.attachments.get(&id)
    }

    /// True when `id` names an existing attachment whose file is an image.
    pub fn is_image(&self, id: u64) -> bool {
        self.attachment(id).is_some_and(Attachment::is_image)
    }
}
