use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum OpsError {
    #[error("unknown service: {0}")]
    #[diagnostic(code(opsctl::unknown_service))]
    UnknownService(String),

    #[error("malformed snapshot: {0}")]
    #[diagnostic(code(opsctl::malformed_snapshot))]
    MalformedSnapshot(String),

    #[error("{service}.{function} exited with status {status}")]
    #[diagnostic(code(opsctl::call_failed), help("{output}"))]
    CallFailed {
        service: String,
        function: String,
        status: i32,
        output: String,
    },

    #[error("failed to start `{program}`: {source}")]
    #[diagnostic(
        code(opsctl::spawn),
        help("check that woorl is installed or point --woorl at it")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{service}.{function} did not finish within {secs}s")]
    #[diagnostic(code(opsctl::timeout))]
    Timeout {
        service: String,
        function: String,
        secs: u64,
    },

    #[error("no objects removed in attempt #{attempt} ({failed} commits rejected)")]
    #[diagnostic(
        code(opsctl::no_progress),
        help("every commit of the attempt was rejected, further attempts cannot converge")
    )]
    NoProgress { attempt: u32, failed: u64 },

    #[error("row {row}: {reason}")]
    #[diagnostic(code(opsctl::invalid_row))]
    InvalidRow { row: u64, reason: String },

    #[error("JSON error: {0}")]
    #[diagnostic(code(opsctl::json))]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    #[diagnostic(code(opsctl::csv))]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(opsctl::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OpsError>;
