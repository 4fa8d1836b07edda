//! Wiring of configuration, credential, backend and diagram engine.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tutor_application::{AssemblyOptions, BlockAssembler, DiagramCompiler, SessionManager};
use tutor_core::config::ClientConfig;
use tutor_infrastructure::{
    ConfigService, CredentialStore, HttpTutorBackend, MermaidCliEngine, TutorPaths,
};

/// Global options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_dir: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub token: Option<String>,
    pub repeat_narrative: bool,
    pub mermaid_bin: Option<String>,
}

pub struct AppContext {
    pub paths: TutorPaths,
    pub config: ClientConfig,
    token: Option<String>,
}

impl AppContext {
    /// Loads configuration and applies command line overrides on top.
    pub fn load(options: &GlobalOptions) -> Result<Self> {
        let paths = TutorPaths::new(options.config_dir.as_deref());
        let service = ConfigService::with_path(paths.config_file()?);
        let mut config = service
            .get_config()
            .with_context(|| format!("failed to load {}", service.path().display()))?;

        if let Some(url) = &options.backend_url {
            config.backend.base_url = url.clone();
        }
        if let Some(bin) = &options.mermaid_bin {
            config.diagram.mermaid_bin = bin.clone();
        }
        if options.repeat_narrative {
            config.rendering.repeat_narrative_after_diagram = true;
        }

        Ok(Self {
            paths,
            config,
            token: options.token.clone(),
        })
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.config.logging.log_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(self.paths.log_dir()?),
        }
    }

    /// Builds the assembler from the diagram and rendering settings.
    pub fn assembler(&self) -> Arc<BlockAssembler> {
        let engine = Arc::new(MermaidCliEngine::from_config(&self.config.diagram));
        Arc::new(BlockAssembler::new(
            DiagramCompiler::new(engine),
            AssemblyOptions::from(&self.config.rendering),
        ))
    }

    /// Builds a session manager talking to the configured backend.
    pub fn session_manager(&self) -> Result<SessionManager> {
        let credential = CredentialStore::from_paths(&self.paths)?
            .load(self.token.as_deref())
            .context("no usable access token")?;
        let backend = Arc::new(HttpTutorBackend::from_config(&self.config.backend));

        tracing::info!(
            "[App] Using backend {} (repeat narrative: {})",
            self.config.backend.base_url,
            self.config.rendering.repeat_narrative_after_diagram
        );
        Ok(SessionManager::new(backend, self.assembler(), credential))
    }
}
