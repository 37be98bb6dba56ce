use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read settings from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write settings to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings")]
    Parse(#[from] serde_json::Error),

    #[error("failed to parse settings file")]
    ParseLenient(#[from] serde_json_lenient::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("no configuration directory available on this platform")]
    NoConfigDir,

    #[error("settings lock poisoned")]
    LockPoisoned,

    #[error("file watcher error")]
    Watcher(#[from] notify::Error),
}
