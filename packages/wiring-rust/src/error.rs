use std::path::PathBuf;

use daisychain_core::BuildError;

/// Errors raised while loading a chain configuration or assembling it.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("failed to read chain configuration {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid chain configuration")]
    Parse(#[from] serde_json::Error),

    #[error("configuration is for interface {configured}, expected {expected}")]
    InterfaceMismatch { configured: String, expected: String },

    #[error("no target registered as {name}")]
    UnknownTarget { name: String },

    #[error("no appendix owner registered as {name}")]
    UnknownOwner { name: String },

    #[error("chain could not be built")]
    Build(#[from] BuildError),
}
