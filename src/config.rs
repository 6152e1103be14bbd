//! The on-disk mock-file schema and its loader.
//!
//! A mock file maps endpoint paths to HTTP methods to an ordered list of
//! response entries:
//!
//! ```yaml
//! /users:
//!   GET:
//!     - requestQuery:
//!         url: "name = 'John'"
//!       response:
//!         status: 200
//!         body:
//!           name: John
//!     - response:
//!         status: 404
//!         body:
//!           message: no such user
//! ```
//!
//! The same structure is accepted as JSON. The serialization format is picked
//! from the file extension; anything other than `.json`, `.yaml` or `.yml`
//! fails with [`ConfigError::UnsupportedFormat`].

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

/// The parsed mock file: endpoint path -> HTTP method -> ordered entries.
///
/// Order within an entry list is significant and preserved exactly as
/// authored; the resolution engine walks it left to right.
pub(crate) type MockFile = HashMap<String, HashMap<String, Vec<ResponseEntry>>>;

/// One candidate response for an endpoint+method.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseEntry {
    /// Optional predicate. Absent (or present with neither expression set)
    /// means the entry matches unconditionally.
    #[serde(rename = "requestQuery", default)]
    pub(crate) request_query: Option<RequestQuery>,
    pub(crate) response: ResponseDefinition,
}

/// Query expressions guarding a candidate. Both may be set at once; the
/// engine evaluates `url` first and either match selects the candidate.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RequestQuery {
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) body: Option<String>,
}

impl RequestQuery {
    pub(crate) fn is_empty(&self) -> bool {
        self.url.is_none() && self.body.is_none()
    }
}

/// The response payload of a file-defined candidate: a status code and an
/// arbitrary JSON value serialized verbatim into the response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseDefinition {
    pub(crate) status: u16,
    pub(crate) body: Value,
}

/// Read and parse a mock file.
pub(crate) fn load(path: &Path) -> Result<MockFile, ConfigError> {
    let contents = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "json" => serde_json::from_slice(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        "yaml" | "yml" => serde_yaml::from_slice(&contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ConfigError::UnsupportedFormat(format!(".{extension}"))),
    }
}
