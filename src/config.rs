use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "MedSafe";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const BIND_ADDR_ENV: &str = "MEDSAFE_BIND_ADDR";
pub const KNOWLEDGE_DIR_ENV: &str = "MEDSAFE_KNOWLEDGE_DIR";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Get the application data directory: ~/.medsafe/
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".medsafe")
}

/// Default knowledge base directory (interaction, allergy and alias tables).
pub fn knowledge_dir() -> PathBuf {
    app_data_dir().join("knowledge")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medsafe_lib=info,tower_http=warn"
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid MEDSAFE_BIND_ADDR value {0:?}")]
    InvalidBindAddr(String),
}

/// Where the knowledge base is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeSource {
    Directory(PathBuf),
    /// Tables compiled into the binary.
    Bundled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub knowledge: KnowledgeSource,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), &knowledge_dir())
    }

    /// An explicitly configured directory is always used, so a missing one
    /// fails at load. The default directory is used only if it exists.
    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_knowledge_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let raw_addr = lookup(BIND_ADDR_ENV)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(raw_addr.clone()))?;

        let knowledge = match lookup(KNOWLEDGE_DIR_ENV).filter(|s| !s.trim().is_empty()) {
            Some(dir) => KnowledgeSource::Directory(PathBuf::from(dir.trim())),
            None if default_knowledge_dir.is_dir() => {
                KnowledgeSource::Directory(default_knowledge_dir.to_path_buf())
            }
            None => KnowledgeSource::Bundled,
        };

        Ok(Self {
            bind_addr,
            knowledge,
        })
    }
}
