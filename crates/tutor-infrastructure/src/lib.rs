pub mod config_service;
pub mod credential_store;
pub mod http_backend;
pub mod mermaid;
pub mod paths;
mod wire;

pub use config_service::ConfigService;
pub use credential_store::CredentialStore;
pub use http_backend::HttpTutorBackend;
pub use mermaid::MermaidCliEngine;
pub use paths::TutorPaths;
