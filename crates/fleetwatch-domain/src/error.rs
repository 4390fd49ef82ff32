use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("push gateway error: {0}")]
    GatewayError(String),

    #[error("push gateway did not answer within {seconds}s")]
    GatewayTimeout { seconds: u64 },

    #[error("dispatch queue is full")]
    DispatchQueueFull,

    #[error("dispatch worker is no longer running")]
    DispatchWorkerStopped,

    #[error("repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
