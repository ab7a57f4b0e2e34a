use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize settings: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("invalid settings: {0}")]
    ConfigInvalid(String),

    #[error("failed to encode OSC packet: {0}")]
    Encode(#[from] rosc::OscError),

    #[error("network error: {0}")]
    Net(#[from] std::io::Error),

    #[error("depth source: {0}")]
    Source(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
