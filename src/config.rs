use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::graph::{DedupPolicy, NormalizeOptions};
use crate::session::UpdateMode;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub entgraph: EntgraphConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct EntgraphConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EntgraphConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where entity documents live.
///
/// Documents are addressed as
/// `{base_url}/{org}/{repo}/{branch}/{api_dir}/{entity}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_org")]
    pub org: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_api_dir")]
    pub api_dir: String,
    /// Merged knowledge graph used to attach categories to nodes.
    /// Relative to the branch root, e.g. `00_API/00_Merged/merged-knowledge-graph.json`.
    #[serde(default)]
    pub catalog_path: Option<String>,
    /// Git tree API host used by `list`.
    #[serde(default = "default_tree_api_url")]
    pub tree_api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 0 disables the record cache.
    #[serde(default)]
    pub cache_capacity: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            org: default_org(),
            repo: default_repo(),
            branch: default_branch(),
            api_dir: default_api_dir(),
            catalog_path: None,
            tree_api_url: default_tree_api_url(),
            timeout_secs: default_timeout_secs(),
            cache_capacity: 0,
        }
    }
}

/// Graph shaping options
#[derive(Debug, Clone, Deserialize)]
pub struct BuilderConfig {
    #[serde(default = "default_true")]
    pub dedup_nodes: bool,
    #[serde(default = "default_true")]
    pub dedup_links: bool,
    #[serde(default = "default_true")]
    pub mark_root: bool,
    #[serde(default = "default_true")]
    pub tag_node_parent: bool,
    #[serde(default)]
    pub update_mode: UpdateMode,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            dedup_nodes: true,
            dedup_links: true,
            mark_root: true,
            tag_node_parent: true,
            update_mode: UpdateMode::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_org() -> String {
    "UNDP-Data".to_string()
}

fn default_repo() -> String {
    "dsc-energy-knowledge-graph".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_dir() -> String {
    "00_API".to_string()
}

fn default_tree_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_http_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    // Empty means any origin (local dev)
    vec![]
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in ENTGRAPH_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (defaults are used if absent)
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match std::env::var("ENTGRAPH_CONFIG") {
            Ok(path) => Self::from_file(PathBuf::from(path))?,
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    log::debug!("No config.toml found, using defaults");
                    Config::default()
                }
            }
        };

        config.validate()?;

        Ok(config)
    }

    fn from_file(config_path: PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let source = &self.source;
        for (name, value) in [
            ("source.base_url", &source.base_url),
            ("source.org", &source.org),
            ("source.repo", &source.repo),
            ("source.branch", &source.branch),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must not be empty", name);
            }
        }

        url::Url::parse(&source.base_url)
            .with_context(|| format!("source.base_url is not a valid URL: {}", source.base_url))?;
        url::Url::parse(&source.tree_api_url).with_context(|| {
            format!("source.tree_api_url is not a valid URL: {}", source.tree_api_url)
        })?;

        if source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        DedupPolicy {
            nodes: self.builder.dedup_nodes,
            links: self.builder.dedup_links,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            mark_root: self.builder.mark_root,
            tag_node_parent: self.builder.tag_node_parent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide cwd and env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[entgraph]
log_level = "debug"

[source]
base_url = "http://localhost:9000/api"
org = "acme"
repo = "energy-kg"
catalog_path = "00_API/00_Merged/merged-knowledge-graph.json"
cache_capacity = 16

[builder]
dedup_links = false
update_mode = "merge"

[http_server]
port = 9090
"#;

    /// Restores cwd when dropped (e.g. on panic).
    struct CwdGuard(std::path::PathBuf);
    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    fn with_config_env(config_path: Option<&std::path::Path>, f: impl FnOnce()) {
        let original = std::env::var("ENTGRAPH_CONFIG").ok();
        match config_path {
            Some(p) => std::env::set_var("ENTGRAPH_CONFIG", p),
            None => std::env::remove_var("ENTGRAPH_CONFIG"),
        }
        f();
        std::env::remove_var("ENTGRAPH_CONFIG");
        if let Some(val) = original {
            std::env::set_var("ENTGRAPH_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(Some(&config_path), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.entgraph.log_level, "debug");
            assert_eq!(config.source.org, "acme");
            assert_eq!(config.source.branch, "main");
            assert_eq!(config.source.cache_capacity, 16);
            assert_eq!(config.http_server.port, 9090);
            assert_eq!(config.builder.update_mode, UpdateMode::Merge);
            assert!(config.builder.dedup_nodes);
            assert!(!config.builder.dedup_links);
        });
    }

    #[test]
    fn test_config_defaults_without_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let _cwd = CwdGuard(std::env::current_dir().unwrap());
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(None, || {
            let config = Config::load().unwrap();
            assert_eq!(config.source.base_url, "https://raw.githubusercontent.com");
            assert_eq!(config.source.api_dir, "00_API");
            assert_eq!(config.builder.update_mode, UpdateMode::Replace);
            assert_eq!(config.dedup_policy(), DedupPolicy::default());
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Some(std::path::Path::new("nonexistent.toml")), || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("nonexistent.toml"));
        });
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.source.org = "  ".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("source.org"));

        let mut config = Config::default();
        config.source.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
