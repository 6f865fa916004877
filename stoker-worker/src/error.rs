use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("missing environment variable {0}")]
    MissingEnvironment(&'static str),
    #[error("invalid value for environment variable {0}")]
    InvalidEnvironment(&'static str),
    #[error("unknown group: {0}")]
    UnknownGroup(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("privilege drop failed: {0}")]
    Privilege(String),
    #[error("handler registry error: {0}")]
    Registry(String),
    #[error("worker IO error: {0}")]
    Io(#[from] std::io::Error),
}
