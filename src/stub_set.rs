//! The resolution engine: given a buffered request and the two endpoint
//! tables, deterministically select exactly one candidate response or report
//! a precise failure.
//!
//! Selection semantics:
//! - the custom table overrides the file table at path+method granularity,
//!   never merging the two candidate lists;
//! - candidates are walked in registration order, first eligible predicate
//!   wins immediately;
//! - unconditional candidates are remembered as the fallback without stopping
//!   the walk, and a later unconditional entry overwrites an earlier one, so
//!   the *last* unconditional candidate is the effective default.

use std::collections::HashMap;
use std::str::FromStr;

use http::Method;
use log::debug;
use serde_json::Value;

use crate::config::MockFile;
use crate::error::{ConfigError, ResolveError};
use crate::query;
use crate::request::Request;
use crate::stub::{Candidate, MockResponse, Predicate, ResponseKind};

/// Endpoint path -> HTTP method -> ordered candidate list.
pub(crate) type EndpointTable = HashMap<String, HashMap<Method, Vec<Candidate>>>;

/// The immutable pair of endpoint tables a server instance resolves against.
///
/// Both tables are sealed before the server starts accepting connections and
/// are only ever read afterwards, which is what allows sharing a `StubSet`
/// across connection tasks without any locking.
pub(crate) struct StubSet {
    file: EndpointTable,
    custom: EndpointTable,
}

impl StubSet {
    /// Build the stub set from a parsed mock file and the programmatically
    /// registered custom table, validating status codes and method names.
    pub(crate) fn new(mock_file: MockFile, custom: EndpointTable) -> Result<Self, ConfigError> {
        let mut file: EndpointTable = HashMap::new();
        for (path, methods) in mock_file {
            let mut by_method = HashMap::new();
            for (method, entries) in methods {
                let parsed = Method::from_str(&method.to_ascii_uppercase()).map_err(|_| {
                    ConfigError::InvalidMethod {
                        path: path.clone(),
                        method: method.clone(),
                    }
                })?;
                let candidates = entries
                    .into_iter()
                    .map(|entry| Candidate::from_entry(entry, &path))
                    .collect::<Result<Vec<_>, _>>()?;
                by_method.insert(parsed, candidates);
            }
            file.insert(path, by_method);
        }
        Ok(Self { file, custom })
    }

    /// Every path+method pair this set can serve, for startup logging.
    pub(crate) fn served_endpoints(&self) -> Vec<(String, Method)> {
        let mut endpoints: Vec<(String, Method)> = self
            .custom
            .iter()
            .chain(self.file.iter())
            .flat_map(|(path, methods)| {
                methods
                    .keys()
                    .map(move |method| (path.clone(), method.clone()))
            })
            .collect();
        endpoints.sort();
        endpoints.dedup();
        endpoints
    }

    /// Resolve `request` to a response, or to the error the dispatcher will
    /// translate into the wire envelope.
    pub(crate) fn handle_request(&self, request: &Request) -> Result<MockResponse, ResolveError> {
        let path = request.url.path();
        let candidates = self.lookup(path, &request.method)?;
        let candidate = select(request, candidates)?;
        match &candidate.response {
            ResponseKind::Fixed(stub) => stub.build(path),
            ResponseKind::Producer(producer) => producer.respond(request).map_err(|error| {
                debug!("response producer failed for endpoint '{path}': {error}");
                ResolveError::Internal(format!(
                    "Could not produce response for endpoint '{path}'"
                ))
            }),
        }
    }

    fn lookup(&self, path: &str, method: &Method) -> Result<&[Candidate], ResolveError> {
        if let Some(candidates) = self.custom.get(path).and_then(|methods| methods.get(method)) {
            return Ok(candidates);
        }
        if let Some(candidates) = self.file.get(path).and_then(|methods| methods.get(method)) {
            return Ok(candidates);
        }
        Err(ResolveError::NotFound {
            path: path.to_string(),
            method: method.clone(),
        })
    }
}

/// Walk the ordered candidate list and pick the winner.
fn select<'a>(
    request: &Request,
    candidates: &'a [Candidate],
) -> Result<&'a Candidate, ResolveError> {
    let path = request.url.path();
    let mut fallback: Option<&Candidate> = None;
    let mut attempted: Vec<String> = Vec::new();
    // Both documents are built at most once per request, and only when a
    // candidate actually needs them.
    let mut query_document: Option<Value> = None;
    let mut body_document: Option<Value> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        match &candidate.predicate {
            Predicate::Unconditional => {
                fallback = Some(candidate);
            }
            Predicate::Functional(matcher) => {
                if matcher.matches(request) {
                    debug!("using response #{index} for endpoint '{path}'");
                    return Ok(candidate);
                }
                attempted.push("Functional".to_string());
            }
            Predicate::Query(queries) => {
                if let Some(expr) = &queries.url {
                    let document =
                        query_document.get_or_insert_with(|| request.query_document());
                    match query::matches(expr, document) {
                        Ok(true) => {
                            debug!("using response #{index} for endpoint '{path}'");
                            return Ok(candidate);
                        }
                        Ok(false) => attempted.push(format!("URL[{expr}]")),
                        Err(error) => {
                            debug!("{error}");
                            return Err(ResolveError::Internal(format!(
                                "Could not parse URL query for endpoint '{path}'"
                            )));
                        }
                    }
                }
                // Body queries only apply to requests that carry a body;
                // for other methods they are skipped without diagnostics.
                if let Some(expr) = &queries.body {
                    if request.method == Method::POST || request.method == Method::PUT {
                        let document = match &mut body_document {
                            Some(document) => &*document,
                            slot @ None => {
                                let parsed =
                                    serde_json::from_slice(&request.body).map_err(|_| {
                                        ResolveError::Internal(format!(
                                            "Could not parse body query for endpoint '{path}'"
                                        ))
                                    })?;
                                &*slot.insert(parsed)
                            }
                        };
                        match query::matches(expr, document) {
                            Ok(true) => {
                                debug!("using response #{index} for endpoint '{path}'");
                                return Ok(candidate);
                            }
                            Ok(false) => attempted.push(format!("Body[{expr}]")),
                            Err(error) => {
                                debug!("{error}");
                                return Err(ResolveError::Internal(format!(
                                    "Could not parse body query for endpoint '{path}'"
                                )));
                            }
                        }
                    }
                }
            }
        }
    }

    match fallback {
        Some(candidate) => Ok(candidate),
        None => Err(ResolveError::NoMatch {
            path: path.to_string(),
            queries: attempted,
        }),
    }
}
