use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::EntitySource;
use crate::cache::RecordCache;
use crate::config::SourceConfig;
use crate::error::{GraphError, Result};
use crate::record::{Catalog, EntityRecord};

/// Response structure from the git tree API
#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Entity documents served from a static host laid out as
/// `{base_url}/{org}/{repo}/{branch}/{api_dir}/{entity}.json`.
pub struct HttpEntitySource {
    client: Client,
    base_url: String,
    org: String,
    repo: String,
    branch: String,
    api_dir: String,
    catalog_path: Option<String>,
    tree_api_url: String,
    cache: Option<Arc<RecordCache>>,
}

impl HttpEntitySource {
    /// Create a source from configuration. A record cache is attached when
    /// `cache_capacity > 0`.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("entgraph/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GraphError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let cache = if config.cache_capacity > 0 {
            Some(Arc::new(RecordCache::new(config.cache_capacity)))
        } else {
            None
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            org: config.org.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            api_dir: config.api_dir.trim_matches('/').to_string(),
            catalog_path: config
                .catalog_path
                .as_ref()
                .map(|p| p.trim_start_matches('/').to_string())
                .filter(|p| !p.is_empty()),
            tree_api_url: config.tree_api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    fn branch_root(&self) -> String {
        format!("{}/{}/{}/{}", self.base_url, self.org, self.repo, self.branch)
    }

    /// Document URL for `entity`. The name is fully percent-encoded so that
    /// punctuation (`/`, `?`, `#`, `&`, ...) can't alter the path.
    pub fn entity_url(&self, entity: &str) -> String {
        let encoded = urlencoding::encode(entity);
        if self.api_dir.is_empty() {
            format!("{}/{}.json", self.branch_root(), encoded)
        } else {
            format!("{}/{}/{}.json", self.branch_root(), self.api_dir, encoded)
        }
    }

    pub fn catalog_url(&self) -> Option<String> {
        self.catalog_path
            .as_ref()
            .map(|path| format!("{}/{}", self.branch_root(), path))
    }

    pub fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.tree_api_url, self.org, self.repo, self.branch
        )
    }

    /// GET `url` and return the body, treating any non-2xx status as a
    /// failure attributed to `label`.
    async fn get_bytes(&self, url: &str, label: &str) -> Result<Vec<u8>> {
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| GraphError::Network(format!("Request for '{}' failed: {}", label, e)))?;

        let status = response.status();
        if !status.is_success() {
            log::debug!("GET {} returned {}", url, status);
            return Err(GraphError::Fetch {
                entity: label.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GraphError::Network(format!("Failed to read body for '{}': {}", label, e)))?;

        Ok(body.to_vec())
    }

    /// Names of every entity document under `api_dir`, from the git tree
    /// listing of the branch. Nested directories are skipped.
    pub async fn list_entities(&self) -> Result<Vec<String>> {
        let body = self.get_bytes(&self.tree_url(), "git tree").await?;
        let tree: TreeResponse = serde_json::from_slice(&body)
            .map_err(|e| GraphError::Parse(format!("Failed to parse git tree: {}", e)))?;

        let prefix = format!("{}/", self.api_dir);
        let names = tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .filter_map(|entry| {
                let rest = if self.api_dir.is_empty() {
                    entry.path.as_str()
                } else {
                    entry.path.strip_prefix(&prefix)?
                };
                if rest.contains('/') {
                    return None;
                }
                rest.strip_suffix(".json").map(str::to_string)
            })
            .collect();

        Ok(names)
    }
}

#[async_trait]
impl EntitySource for HttpEntitySource {
    async fn fetch_record(&self, entity: &str) -> Result<EntityRecord> {
        if let Some(cache) = &self.cache {
            if let Some(record) = cache.get(entity) {
                log::debug!("Cache hit for entity: {}", entity);
                return Ok(record);
            }
        }

        let start = std::time::Instant::now();
        let body = self.get_bytes(&self.entity_url(entity), entity).await?;
        let record = EntityRecord::from_slice(entity, &body)?;
        log::debug!("Fetched '{}' in {:?}", entity, start.elapsed());

        if let Some(cache) = &self.cache {
            cache.put(entity.to_string(), record.clone());
        }

        Ok(record)
    }

    async fn fetch_catalog(&self) -> Result<Option<Catalog>> {
        let Some(url) = self.catalog_url() else {
            return Ok(None);
        };

        let body = self.get_bytes(&url, "catalog").await?;
        let catalog = Catalog::from_slice(&body)?;
        log::info!("Loaded catalog with {} categorized entities", catalog.len());

        Ok(Some(catalog))
    }
}
