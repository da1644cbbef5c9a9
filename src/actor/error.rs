use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActorError>;

/// Failures talking to the actor platform
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Actor API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Actor run {run_id} finished with status {status}")]
    RunFailed { run_id: String, status: String },
}
