use std::collections::BTreeMap;
use std::fmt;

use http::{HeaderMap, Method};
use http_body_util::BodyExt;
use hyper::body::Body;
use serde::de::DeserializeOwned;
use url::Url;

use crate::stub::BoxError;

/// An incoming request to an instance of [`MockServer`].
///
/// Functional predicates get an immutable reference to a `Request` in the
/// [`matches`] method of the [`Match`] trait, and custom response producers
/// receive one in [`Respond::respond`].
///
/// [`MockServer`]: crate::MockServer
/// [`matches`]: crate::Match::matches
/// [`Match`]: crate::Match
/// [`Respond::respond`]: crate::Respond::respond
///
/// ### Implementation notes:
/// We can't hand `hyper`'s request type to predicates directly: extracting the
/// body consumes it, and the same request must be inspected by every candidate
/// in the walk. The body is therefore buffered once, when the request arrives,
/// and all predicates read from the same immutable snapshot.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Request {
    /// Deserialize the request body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The URL query parameters as a JSON object, one entry per parameter
    /// name mapping to the array of its values.
    ///
    /// This is the document URL-query predicates are evaluated against.
    pub(crate) fn query_document(&self) -> serde_json::Value {
        let mut parameters: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in self.url.query_pairs() {
            parameters
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        serde_json::json!(parameters)
    }

    pub(crate) async fn from_hyper<B>(request: hyper::Request<B>) -> Result<Request, RequestError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let url: Url = match parts.uri.authority() {
            Some(_) => parts.uri.to_string(),
            None => format!("http://localhost{}", parts.uri),
        }
        .parse()
        .map_err(RequestError::Url)?;

        let body = body
            .collect()
            .await
            .map_err(|error| RequestError::Body(error.into()))?
            .to_bytes();

        Ok(Self {
            url,
            method: parts.method,
            headers: parts.headers,
            body: body.to_vec(),
        })
    }
}

/// A failure while buffering an incoming request. The dispatcher translates
/// each variant into an `Internal` envelope naming the failing step.
#[derive(Debug)]
pub(crate) enum RequestError {
    Body(BoxError),
    Url(url::ParseError),
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(path_and_query: &str) -> Request {
        Request {
            url: format!("http://localhost{}", path_and_query).parse().unwrap(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    #[test]
    fn query_parameters_become_arrays_of_values() {
        let document = request("/users?name=John&role=admin&role=staff").query_document();
        assert_eq!(
            document,
            json!({ "name": ["John"], "role": ["admin", "staff"] })
        );
    }

    #[test]
    fn missing_query_string_becomes_an_empty_object() {
        assert_eq!(request("/users").query_document(), json!({}));
    }

    #[tokio::test]
    async fn asterisk_form_request_targets_never_panic() {
        // `OPTIONS * HTTP/1.1` arrives with the bare `*` as its uri.
        let raw = hyper::Request::builder()
            .method(Method::OPTIONS)
            .uri("*")
            .body(http_body_util::Full::new(hyper::body::Bytes::new()))
            .unwrap();

        match Request::from_hyper(raw).await {
            Ok(buffered) => assert_eq!(buffered.method, Method::OPTIONS),
            Err(RequestError::Url(_)) => {}
            Err(other) => panic!("unexpected buffering failure: {other:?}"),
        }
    }
}
