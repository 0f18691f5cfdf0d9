//! CLI error types.

use web2050_config::ConfigError;
use web2050_pipeline::PathError;
use web2050_store::StoreError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("{0}")]
    Server(String),
}
