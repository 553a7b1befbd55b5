use axum::{http::StatusCode, response::Html};
use std::{collections::HashMap, path::PathBuf, sync::Arc, time::SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

const HEADER_TEMPLATE: &str = "_header.html.liquid";
const FOOTER_TEMPLATE: &str = "_footer.html.liquid";

pub struct TemplateEngine {
    template_dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, CachedTemplate>>>,
}

struct CachedTemplate {
    content: String,
    modified: SystemTime,
}

impl TemplateEngine {
    pub fn new(template_dir: PathBuf) -> Self {
        Self {
            template_dir,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Reads a template, reusing the cached copy until the file's mtime moves.
    async fn load_template(&self, path: &str) -> Result<String, String> {
        let template_path = self.template_dir.join(path);

        let metadata = tokio::fs::metadata(&template_path)
            .await
            .map_err(|e| format!("Failed to get metadata for {}: {}", path, e))?;

        let modified = metadata
            .modified()
            .map_err(|e| format!("Failed to get modified time: {}", e))?;

        let mut cache = self.cache.write().await;

        if let Some(cached) = cache.get(path)
            && cached.modified >= modified
        {
            debug!("Using cached template for {}", path);
            return Ok(cached.content.clone());
        }

        info!("Loading template: {}", path);

        let content = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|e| format!("Failed to read template {}: {}", path, e))?;

        cache.insert(
            path.to_string(),
            CachedTemplate {
                content: content.clone(),
                modified,
            },
        );

        Ok(content)
    }

    async fn render_partial(&self, name: &str, globals: &liquid::Object) -> String {
        let source = match self.load_template(name).await {
            Ok(source) => source,
            Err(e) => {
                error!("Failed to load {}: {}", name, e);
                return String::new();
            }
        };

        let rendered = build_parser().and_then(|parser| {
            parser
                .parse(&source)
                .and_then(|template| template.render(globals))
                .map_err(|e| e.to_string())
        });

        rendered.unwrap_or_else(|e| {
            error!("Failed to render {}: {}", name, e);
            String::new()
        })
    }

    /// Renders `template_name` with `globals`. The header and footer partials see
    /// the same globals and are exposed to the page as `header` and `footer`.
    pub async fn render_template(
        &self,
        template_name: &str,
        globals: liquid::Object,
    ) -> Result<String, String> {
        let template_content = self.load_template(template_name).await?;

        let template = build_parser()?
            .parse(&template_content)
            .map_err(|e| format!("Failed to parse template: {}", e))?;

        let header = self.render_partial(HEADER_TEMPLATE, &globals).await;
        let footer = self.render_partial(FOOTER_TEMPLATE, &globals).await;

        let mut full_globals = globals;
        full_globals.insert("header".into(), liquid::model::Value::Scalar(header.into()));
        full_globals.insert("footer".into(), liquid::model::Value::Scalar(footer.into()));

        template
            .render(&full_globals)
            .map_err(|e| format!("Failed to render template: {}", e))
    }

    pub async fn render_page(
        &self,
        template_name: &str,
        globals: liquid::Object,
    ) -> Result<Html<String>, StatusCode> {
        match self.render_template(template_name, globals).await {
            Ok(html) => Ok(Html(html)),
            Err(e) => {
                error!("Template rendering error: {}", e);
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn build_parser() -> Result<liquid::Parser, String> {
    liquid::ParserBuilder::with_stdlib()
        .build()
        .map_err(|e| format!("Failed to create parser: {}", e))
}
