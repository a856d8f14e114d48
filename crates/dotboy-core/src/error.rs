use std::path::PathBuf;

use thiserror::Error;

/// Failures at the edges of the core: file system and configuration.
///
/// Nothing on the per-dot path returns this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("boot ROM must be {expected} bytes, got {actual}")]
    BootRomSize { expected: usize, actual: usize },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
