use http::StatusCode;
use std::path::PathBuf;

/// A failure while reading or parsing a mock file.
///
/// Configuration problems are fatal: they are reported by
/// [`MockServerBuilder::start`] and prevent the server from starting, so they
/// can never surface mid-request.
///
/// [`MockServerBuilder::start`]: crate::MockServerBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read mock file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The mock file extension is not one of `.json`, `.yaml` or `.yml`.
    #[error("unsupported file type '{0}'")]
    UnsupportedFormat(String),
    #[error("failed to parse mock file '{}'", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse mock file '{}'", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    /// A `response.status` value outside the valid HTTP status range.
    #[error("invalid status code {status} for endpoint '{path}'")]
    InvalidStatus { path: String, status: u16 },
    /// A method key that is not a valid HTTP method token.
    #[error("invalid HTTP method '{method}' for endpoint '{path}'")]
    InvalidMethod { path: String, method: String },
}

/// A failure while starting a [`MockServer`].
///
/// [`MockServer`]: crate::MockServer
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind the mock server listener")]
    Bind(#[source] std::io::Error),
}

/// A failure while resolving an incoming request to a configured response.
///
/// Every variant maps to an HTTP status code and is written out by the
/// dispatcher as a JSON error envelope: `{ "message": "<text>" }`.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The requested path+method combination is not registered in either the
    /// custom or the file-defined endpoint table.
    #[error("Endpoint '{path}:{method}' not found")]
    NotFound { path: String, method: http::Method },
    /// The endpoint+method exists, but no candidate predicate matched and no
    /// unconditional fallback candidate is configured.
    ///
    /// `queries` describes the predicates that were attempted, for operator
    /// visibility. It is not meant to be machine-parsed.
    #[error("No response matches for endpoint '{path}': Queries: {}", queries.join(", "))]
    NoMatch { path: String, queries: Vec<String> },
    /// A predicate expression could not be evaluated, a response body could
    /// not be serialized, or the response could not be produced.
    #[error("{0}")]
    Internal(String),
}

impl ResolveError {
    /// The HTTP status code carried alongside the error envelope.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::NotFound { .. } | ResolveError::NoMatch { .. } => StatusCode::NOT_FOUND,
            ResolveError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
