// Configuration loading and parsing (barbershop.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::editor::{EditorPolicy, FullListPolicy, LengthPolicy};
use crate::model::SEARCH_PAGE_SIZE;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub db_path: String,
    pub seed_csv: Option<String>,
    pub editor: EditorPolicy,
    pub search: SearchConfig,
    pub hosted: HostedConfig,
    pub credentials: CredentialsConfig,
}

/// Which storage backend serves the catalog, rankings, and aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Sqlite,
    Hosted,
}

// ---------------------------------------------------------------------------
// barbershop.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire barbershop.toml file.
#[derive(Debug, Clone, Deserialize)]
struct BarbershopFile {
    backend: BackendSection,
    database: DatabaseSection,
    #[serde(default)]
    catalog: CatalogSection,
    #[serde(default)]
    editor: EditorSection,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    hosted: HostedConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct BackendSection {
    kind: BackendKind,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogSection {
    seed_csv: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EditorSection {
    #[serde(default)]
    length_policy: LengthPolicy,
    #[serde(default)]
    full_list_policy: FullListPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a query is issued.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_page_size() -> usize {
    SEARCH_PAGE_SIZE
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostedConfig {
    /// Base URL of the REST endpoint, e.g. `https://xyz.example.co/rest/v1`.
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/barbershop.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let main_path = config_dir.join("barbershop.toml");
    let main_text = read_file(&main_path)?;
    let file: BarbershopFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        backend: file.backend.kind,
        db_path: file.database.path,
        seed_csv: file.catalog.seed_csv,
        editor: EditorPolicy {
            length: file.editor.length_policy,
            full_list: file.editor.full_list_policy,
        },
        search: file.search,
        hosted: file.hosted,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// into `config/` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    let page = config.search.page_size;
    if page == 0 || page > SEARCH_PAGE_SIZE {
        return Err(ConfigError::ValidationError {
            field: "search.page_size".into(),
            message: format!("must be between 1 and {SEARCH_PAGE_SIZE}, got {page}"),
        });
    }

    if config.search.debounce_ms > 5_000 {
        return Err(ConfigError::ValidationError {
            field: "search.debounce_ms".into(),
            message: format!("must be at most 5000, got {}", config.search.debounce_ms),
        });
    }

    if config.backend == BackendKind::Hosted {
        let url = config.hosted.url.as_deref().unwrap_or("").trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: "hosted.url".into(),
                message: "an http(s) URL is required when backend.kind = \"hosted\"".into(),
            });
        }
        if config.credentials.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                field: "credentials.api_key".into(),
                message: "required when backend.kind = \"hosted\"".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
