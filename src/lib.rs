pub mod api; // HTTP surface for the editor and dashboard
pub mod boundary; // Editor / patient record shapes <-> engine types
pub mod catalog;
pub mod config;
pub mod models;
pub mod phi_audit;
pub mod safety; // Knowledge base, conflict detection, override ledger
pub mod sessions; // Per-draft state behind per-session locks

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::catalog::DrugCatalog;
use crate::config::{ConfigError, KnowledgeSource, ServiceConfig};
use crate::safety::{DefaultSafetyEngine, KnowledgeBase, KnowledgeBaseError};
use crate::sessions::SessionRegistry;

/// Startup failures. Every variant is fatal: no request is served.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    KnowledgeBase(#[from] KnowledgeBaseError),
    #[error("Drug catalog failed to load: {0}")]
    Catalog(#[from] serde_json::Error),
    #[error("{0}")]
    Server(String),
}

/// Load the knowledge base from its configured source and log what was loaded.
pub fn load_knowledge_base(source: &KnowledgeSource) -> Result<KnowledgeBase, KnowledgeBaseError> {
    let kb = match source {
        KnowledgeSource::Directory(dir) => {
            tracing::info!(dir = %dir.display(), "Loading knowledge base from directory");
            KnowledgeBase::load_from_dir(dir)?
        }
        KnowledgeSource::Bundled => {
            tracing::info!("Loading bundled knowledge base");
            KnowledgeBase::bundled()?
        }
    };

    let stats = kb.stats();
    tracing::info!(
        interaction_rules = stats.interaction_rules,
        allergy_rules = stats.allergy_rules,
        aliases = stats.aliases,
        "Knowledge base ready"
    );
    Ok(kb)
}

/// Run the service until Ctrl-C. The knowledge base is loaded before the
/// listener binds; a load failure is returned and nothing is served.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::from_env()?;
    let kb = Arc::new(load_knowledge_base(&config.knowledge)?);
    let catalog = Arc::new(DrugCatalog::bundled()?);
    let registry = Arc::new(SessionRegistry::new(Arc::new(DefaultSafetyEngine::new(kb))));

    let mut server = api::start_api_server(config.bind_addr, registry, catalog)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(addr = %server.info.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn bundled_source_loads() {
        let kb = load_knowledge_base(&KnowledgeSource::Bundled).unwrap();
        assert!(kb.stats().interaction_rules > 0);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let source = KnowledgeSource::Directory(tmp.path().join("absent"));
        assert!(matches!(
            load_knowledge_base(&source),
            Err(KnowledgeBaseError::Io(..))
        ));
    }

    #[test]
    fn corrupt_directory_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(safety::reference::INTERACTIONS_FILE),
            r#"[{"drugA": "Warfarin", "drugB": "", "severity": "high"}]"#,
        )
        .unwrap();
        fs::write(tmp.path().join(safety::reference::ALLERGIES_FILE), "[]").unwrap();

        let err = load_knowledge_base(&KnowledgeSource::Directory(tmp.path().to_path_buf()))
            .unwrap_err();
        assert!(matches!(err, KnowledgeBaseError::InvalidRecord { index: 0, .. }));
    }
}
