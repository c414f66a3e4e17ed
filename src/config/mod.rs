use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::graph::GraphConfig;
use crate::views::ViewMode;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub graph: GraphConfig,
    pub view: ViewPreferences,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Initial view state handed to the investigation workspace.
///
/// Persisting these between sessions is the host's concern; the workspace
/// only reads them once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPreferences {
    /// View tab shown first.
    pub default_view: ViewMode,
    /// Whether dead paths are listed in path chips and selectable.
    pub show_dead_paths: bool,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            default_view: ViewMode::Flow,
            show_dead_paths: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH")
                    .unwrap_or_else(|_| "./data/investigations.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = GraphConfig::default();
        let graph = GraphConfig {
            default_confidence: env::var("GRAPH_DEFAULT_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_confidence),
            dead_path_strength: env::var("GRAPH_DEAD_PATH_STRENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dead_path_strength),
            ..defaults
        };

        let default_view = match env::var("VIEW_DEFAULT") {
            Ok(value) => value.parse::<ViewMode>().map_err(|e| AppError::Config {
                message: e.to_string(),
            })?,
            Err(_) => ViewMode::Flow,
        };

        let view = ViewPreferences {
            default_view,
            show_dead_paths: env::var("VIEW_SHOW_DEAD_PATHS")
                .ok()
                .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        Ok(Config {
            database,
            logging,
            graph,
            view,
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/investigations.db"),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
