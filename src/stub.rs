use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use http_body_util::Full;
use hyper::body::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::config::{RequestQuery, ResponseDefinition, ResponseEntry};
use crate::error::{ConfigError, ResolveError};
use crate::request::Request;

/// A boxed error, used by custom response producers to report any failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The HTTP response type produced by this crate.
pub type MockResponse = Response<Full<Bytes>>;

/// A functional predicate: anything that implements `Match` can guard a
/// custom [`Candidate`].
///
/// It is evaluated directly against the live [`Request`] - method, headers,
/// query, path - with no JSON conversion.
///
/// `Fn` closures that take an immutable [`Request`] reference as input and
/// return a boolean automatically implement `Match`:
///
/// ```rust
/// use mockfile::{Match, Request};
///
/// let matcher = |request: &Request| request.url.query_pairs().any(|(k, v)| k == "name" && v == "test");
/// fn assert_match<M: Match>(_: M) {}
/// assert_match(matcher);
/// ```
pub trait Match: Send + Sync {
    /// Given a reference to a `Request`, determine whether this candidate is
    /// eligible for it.
    fn matches(&self, request: &Request) -> bool;
}

impl<F> Match for F
where
    F: Fn(&Request) -> bool,
    F: Send + Sync,
{
    fn matches(&self, request: &Request) -> bool {
        self(request)
    }
}

/// A response producer: anything that implements `Respond` can answer for a
/// custom [`Candidate`].
///
/// The producer owns the status and body of the response it returns; the
/// dispatcher only pre-sets `Content-Type: application/json` when the
/// producer did not set a content type itself. Any error it reports is
/// surfaced to the client as a 500 with the JSON error envelope.
///
/// `Fn` closures with a compatible signature implement `Respond` out of the
/// box, and so does [`StubResponse`] for fixed JSON payloads.
pub trait Respond: Send + Sync {
    fn respond(&self, request: &Request) -> Result<MockResponse, BoxError>;
}

impl<F> Respond for F
where
    F: Fn(&Request) -> Result<MockResponse, BoxError>,
    F: Send + Sync,
{
    fn respond(&self, request: &Request) -> Result<MockResponse, BoxError> {
        self(request)
    }
}

impl Respond for StubResponse {
    fn respond(&self, request: &Request) -> Result<MockResponse, BoxError> {
        self.build(request.url.path()).map_err(Into::into)
    }
}

/// A fixed response payload: an HTTP status code plus an arbitrary JSON body,
/// serialized verbatim into the response.
///
/// This is the in-memory form of a mock file's `response` object. It can also
/// be used as a [`Respond`] implementation for custom candidates:
///
/// ```rust
/// use mockfile::{Candidate, StubResponse};
/// use serde_json::json;
///
/// let candidate = Candidate::unconditional()
///     .respond_with(StubResponse::new(200).set_body_json(json!({ "custom": "blaa" })));
/// ```
#[derive(Debug, Clone)]
pub struct StubResponse {
    status: StatusCode,
    body: Value,
}

impl StubResponse {
    /// Start building a `StubResponse` from a status code.
    ///
    /// Panics on an invalid status code: this is a testing crate, and a bad
    /// literal status in a test is a mistake to surface loudly, not to handle.
    pub fn new<S>(status: S) -> Self
    where
        S: TryInto<StatusCode>,
        <S as TryInto<StatusCode>>::Error: std::fmt::Debug,
    {
        let status = status
            .try_into()
            .expect("Failed to convert into status code.");
        Self {
            status,
            body: Value::Null,
        }
    }

    /// Set the response body from a JSON-serializable value.
    pub fn set_body_json<B: Serialize>(mut self, body: B) -> Self {
        self.body = serde_json::to_value(body).expect("Failed to convert into a JSON body.");
        self
    }

    pub(crate) fn from_definition(
        definition: ResponseDefinition,
        path: &str,
    ) -> Result<Self, ConfigError> {
        let status =
            StatusCode::from_u16(definition.status).map_err(|_| ConfigError::InvalidStatus {
                path: path.to_string(),
                status: definition.status,
            })?;
        Ok(Self {
            status,
            body: definition.body,
        })
    }

    pub(crate) fn build(&self, path: &str) -> Result<MockResponse, ResolveError> {
        let body = serde_json::to_vec(&self.body).map_err(|_| {
            ResolveError::Internal(format!("Could not marshal response for endpoint '{path}'"))
        })?;
        Response::builder()
            .status(self.status)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|_| {
                ResolveError::Internal(format!("Could not write response for endpoint '{path}'"))
            })
    }
}

/// The condition guarding a [`Candidate`]. Absence of a condition makes the
/// candidate an unconditional fallback.
pub(crate) enum Predicate {
    Unconditional,
    /// Query expressions from the mock file, evaluated against the URL query
    /// parameters and/or the JSON request body.
    Query(RequestQuery),
    /// A host-supplied function, custom registrations only.
    Functional(Box<dyn Match>),
}

pub(crate) enum ResponseKind {
    /// A file-defined payload: status + JSON body.
    Fixed(StubResponse),
    /// A custom producer that builds the HTTP response itself.
    Producer(Box<dyn Respond>),
}

/// One potential response for an endpoint+method, guarded by an optional
/// predicate. The resolution engine selects exactly one candidate per request
/// out of the ordered list registered for the endpoint.
pub struct Candidate {
    pub(crate) predicate: Predicate,
    pub(crate) response: ResponseKind,
}

impl Candidate {
    /// Start building a candidate guarded by a functional predicate.
    pub fn when<M: Match + 'static>(matcher: M) -> CandidateBuilder {
        CandidateBuilder {
            predicate: Predicate::Functional(Box::new(matcher)),
        }
    }

    /// Start building an unconditional candidate.
    ///
    /// An unconditional candidate acts as the fallback when no guarded
    /// candidate matches. If several unconditional candidates are registered
    /// for the same endpoint+method, the last one wins.
    pub fn unconditional() -> CandidateBuilder {
        CandidateBuilder {
            predicate: Predicate::Unconditional,
        }
    }

    pub(crate) fn from_entry(entry: ResponseEntry, path: &str) -> Result<Self, ConfigError> {
        let predicate = match entry.request_query {
            Some(query) if !query.is_empty() => Predicate::Query(query),
            _ => Predicate::Unconditional,
        };
        Ok(Self {
            predicate,
            response: ResponseKind::Fixed(StubResponse::from_definition(entry.response, path)?),
        })
    }
}

/// Second half of the [`Candidate`] fluent builder: attach the response.
pub struct CandidateBuilder {
    predicate: Predicate,
}

impl CandidateBuilder {
    /// Finalise the candidate with a response producer.
    pub fn respond_with<R: Respond + 'static>(self, responder: R) -> Candidate {
        Candidate {
            predicate: self.predicate,
            response: ResponseKind::Producer(Box::new(responder)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_payloads_serialize_the_configured_body() {
        let stub = StubResponse::new(201).set_body_json(json!({ "id": 7 }));
        let response = stub.build("/things").unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(
            response.headers()[CONTENT_TYPE.as_str()],
            "application/json"
        );
    }

    #[test]
    fn invalid_configured_status_is_a_config_error() {
        let definition = ResponseDefinition {
            status: 99,
            body: Value::Null,
        };
        assert!(matches!(
            StubResponse::from_definition(definition, "/things"),
            Err(ConfigError::InvalidStatus { status: 99, .. })
        ));
    }

    #[test]
    fn entries_without_expressions_are_unconditional() {
        let entry = ResponseEntry {
            request_query: Some(RequestQuery {
                url: None,
                body: None,
            }),
            response: ResponseDefinition {
                status: 200,
                body: Value::Null,
            },
        };
        let candidate = Candidate::from_entry(entry, "/things").unwrap();
        assert!(matches!(candidate.predicate, Predicate::Unconditional));
    }
}
