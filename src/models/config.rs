//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::EntityKind;
use crate::pipeline::MappingSpec;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where records are read from
    pub source: SourceConfig,

    /// Where records are written to
    pub destination: DestinationConfig,

    /// HTTP client and interceptor settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Phase behavior
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON (`.json`) or TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }

        match &self.destination {
            DestinationConfig::Vanilla(vanilla) => {
                validate_base_url("destination.base_url", &vanilla.base_url)?;
                if let Some(bypass) = &vanilla.bypass {
                    if bypass.name.trim().is_empty() {
                        return Err(AppError::config("destination.bypass.name is empty"));
                    }
                }
            }
        }

        match &self.source {
            SourceConfig::File(file) => {
                if file.path.as_os_str().is_empty() {
                    return Err(AppError::config("source.path is empty"));
                }
            }
            SourceConfig::Zendesk(zendesk) => {
                validate_base_url("source.base_url", &zendesk.base_url)?;
                if zendesk.page_size == 0 {
                    return Err(AppError::config("source.page_size must be > 0"));
                }
            }
        }
        Ok(())
    }
}

fn validate_base_url(key: &str, value: &str) -> Result<()> {
    let url = url::Url::parse(value)
        .map_err(|e| AppError::config(format!("{key} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::config(format!("{key} must be http(s)")));
    }
    Ok(())
}

/// Source adapter selection, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    File(FileSourceConfig),
    Zendesk(ZendeskSourceConfig),
}

/// A JSON export on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSourceConfig {
    pub path: PathBuf,

    /// Optional per-kind mappings; records pass through unchanged without one
    #[serde(default)]
    pub mappings: FileMappings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMappings {
    #[serde(default)]
    pub knowledge_base: Option<MappingSpec>,
    #[serde(default)]
    pub category: Option<MappingSpec>,
    #[serde(default)]
    pub article: Option<MappingSpec>,
    #[serde(default)]
    pub translation: Option<MappingSpec>,
}

impl FileMappings {
    pub fn for_kind(&self, kind: EntityKind) -> Option<&MappingSpec> {
        match kind {
            EntityKind::KnowledgeBase => self.knowledge_base.as_ref(),
            EntityKind::Category => self.category.as_ref(),
            EntityKind::Article => self.article.as_ref(),
            EntityKind::Translation => self.translation.as_ref(),
        }
    }
}

/// Zendesk Help Center REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZendeskSourceConfig {
    /// e.g. `https://acme.zendesk.com`
    pub base_url: String,

    /// OAuth access token, or an API token when `email` is set
    #[serde(default)]
    pub token: Option<String>,

    /// Agent email; switches `token` to basic `{email}/token` auth
    #[serde(default)]
    pub email: Option<String>,

    /// Prefix applied to every Zendesk ID to form the foreign ID
    #[serde(default = "defaults::foreign_id_prefix")]
    pub prefix: String,

    #[serde(default = "defaults::locale")]
    pub locale: String,

    #[serde(default = "defaults::page_size")]
    pub page_size: u32,
}

/// Destination selection, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationConfig {
    Vanilla(VanillaDestinationConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VanillaDestinationConfig {
    /// API root, e.g. `https://forum.example.com/api/v2`
    pub base_url: String,

    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Credential that lets requests through a maintenance/staging gate
    #[serde(default)]
    pub bypass: Option<BypassConfig>,
}

/// How the bypass credential is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BypassKind {
    #[default]
    Header,
    Cookie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassConfig {
    #[serde(default)]
    pub kind: BypassKind,
    /// Header or cookie name
    pub name: String,
    pub value: String,
}

/// HTTP client and interceptor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Default lifetime of cached GET responses; 0 disables the cache
    #[serde(default = "defaults::cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Minimum spacing between consecutive requests
    #[serde(default = "defaults::min_interval")]
    pub min_interval_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            cache_ttl_secs: defaults::cache_ttl(),
            min_interval_ms: defaults::min_interval(),
        }
    }
}

/// Phase behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Retry categories whose parent did not exist yet, once, after the phase
    #[serde(default = "defaults::enabled")]
    pub retry_categories: bool,

    /// Log and count validation failures instead of aborting the run
    #[serde(default = "defaults::enabled")]
    pub isolate_validation_errors: bool,

    /// Post translation records after the article phase
    #[serde(default = "defaults::enabled")]
    pub translations: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_categories: true,
            isolate_validation_errors: true,
            translations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    pub fn user_agent() -> String {
        concat!("kbsync/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn cache_ttl() -> u64 {
        300
    }
    pub fn min_interval() -> u64 {
        1000
    }
    pub fn enabled() -> bool {
        true
    }
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn foreign_id_prefix() -> String {
        "zd-".into()
    }
    pub fn locale() -> String {
        "en-us".into()
    }
    pub fn page_size() -> u32 {
        100
    }
}
