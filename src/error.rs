use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Oracle {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("Failed to resolve {key}: {source}")]
    Resolve {
        key: String,
        #[source]
        source: Box<StatsError>,
    },
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<gix::discover::Error> for StatsError {
    fn from(err: gix::discover::Error) -> Self {
        StatsError::GitDiscover(Box::new(err))
    }
}
