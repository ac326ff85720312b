//! Dashboard configuration file.
//!
//! # Responsibility
//! - Parse `tadash.toml`: backend selection, logging and sheet names.
//! - Open the configured storage backend.
//!
//! # Invariants
//! - Every field has a default, so an empty file is a valid config.
//! - Access tokens are never stored in the file; only the name of the
//!   environment variable holding one.

use crate::logging::default_log_level;
use crate::model::catalog;
use crate::storage::sheets::DEFAULT_BASE_URL;
use crate::storage::{
    SheetsBackend, SheetsSettings, SqliteWorkbook, StorageBackend, StorageError,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_CONFIG_FILE: &str = "tadash.toml";
pub const DEFAULT_TOKEN_ENV: &str = "TADASH_SHEETS_TOKEN";
const DEFAULT_DB_FILE: &str = "tadash.db";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    /// The environment variable naming the access token is unset or blank.
    MissingToken(String),
    Storage(StorageError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::MissingToken(var) => {
                write!(f, "environment variable `{var}` holds no access token")
            }
            Self::Storage(err) => write!(f, "failed to open storage: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Storage(err) => Some(err),
            Self::MissingToken(_) => None,
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sheets: SheetNames,
}

/// Where tables live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Local SQLite workbook file.
    Sqlite {
        #[serde(default = "default_db_path")]
        path: PathBuf,
    },
    /// Remote spreadsheet.
    Sheets {
        spreadsheet_id: String,
        #[serde(default = "default_token_env")]
        token_env: String,
        #[serde(default = "default_base_url")]
        base_url: String,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build-mode default when omitted.
    pub level: Option<String>,
    /// Absolute log directory; file logging is off when omitted.
    pub dir: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or_else(|| default_log_level())
    }
}

/// Sheet name of every table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub calendar: String,
    pub country_calls: String,
    pub advisors: String,
    pub countries: String,
    pub types: String,
    pub risk_matrix: String,
    pub programmes: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            calendar: catalog::CALENDAR.to_string(),
            country_calls: catalog::COUNTRY_CALLS.to_string(),
            advisors: catalog::ADVISORS.to_string(),
            countries: catalog::COUNTRIES.to_string(),
            types: catalog::TYPES.to_string(),
            risk_matrix: catalog::RISK_MATRIX.to_string(),
            programmes: catalog::PROGRAMMES.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Reads a config file.
    ///
    /// # Errors
    /// - `ConfigError::Io` when the file cannot be read.
    /// - `ConfigError::Parse` when it is not valid config TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

impl BackendConfig {
    /// Opens the configured backend. Remote tokens are read from the
    /// environment at call time.
    pub fn open(&self) -> Result<Arc<dyn StorageBackend>, ConfigError> {
        match self {
            Self::Sqlite { path } => {
                let workbook = SqliteWorkbook::open(path).map_err(StorageError::from)?;
                Ok(Arc::new(workbook))
            }
            Self::Sheets {
                spreadsheet_id,
                token_env,
                base_url,
            } => {
                let access_token = std::env::var(token_env)
                    .ok()
                    .filter(|token| !token.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingToken(token_env.clone()))?;
                let backend = SheetsBackend::new(SheetsSettings {
                    spreadsheet_id: spreadsheet_id.clone(),
                    access_token,
                    base_url: base_url.clone(),
                })?;
                Ok(Arc::new(backend))
            }
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
