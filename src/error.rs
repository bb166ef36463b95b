use thiserror::Error;

/// Failure of a single request/response cycle, or of preparing the request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, timeout or protocol failure reported by the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request template could not be turned into a request.
    #[error("invalid request: {0}")]
    Build(String),

    /// The prepared request cannot be sent a second time.
    #[error("request body cannot be replayed")]
    NotReplayable,

    /// I/O failure outside the HTTP client.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a worker stopped before finishing its assignment.
#[derive(Debug, Error)]
pub enum WorkerFailure {
    #[error("setup failed: {0}")]
    Setup(#[source] TransportError),

    #[error("request {iteration} failed: {source}")]
    Request {
        iteration: u64,
        #[source]
        source: TransportError,
    },
}

/// Errors surfaced by a run or by its configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid progress template: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    /// Every worker dropped its end of a phase before the coordinator heard from all of them.
    #[error("{phase} barrier broken: received {received} of {expected} signals")]
    Barrier {
        phase: &'static str,
        received: usize,
        expected: usize,
    },

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
