use std::path::PathBuf;

use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] stockflow_core::ValidationError),

    #[error("could not read seed file {path}: {source}")]
    SeedRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("seed file {path} is not a JSON product list: {source}")]
    SeedFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid products url '{0}'")]
    ProductsUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::ProductsUrl(_) => 2,
            Self::SeedRead { .. } | Self::SeedFormat { .. } => 4,
            Self::Io(_) => 10,
        }
    }
}
