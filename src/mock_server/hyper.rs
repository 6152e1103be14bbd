use std::convert::Infallible;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::HeaderValue;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::debug;

use crate::error::ResolveError;
use crate::request::{Request, RequestError};
use crate::stub::MockResponse;
use crate::stub_set::StubSet;

/// The actual HTTP server answering incoming requests from the sealed stub
/// set. One task per connection; the stub set is shared read-only, so no
/// locking happens on the request path.
pub(super) async fn run_server(
    listener: std::net::TcpListener,
    stubs: Arc<StubSet>,
    mut shutdown_signal: tokio::sync::oneshot::Receiver<()>,
) {
    listener
        .set_nonblocking(true)
        .expect("Failed to switch the listener to non-blocking mode.");
    let listener = tokio::net::TcpListener::from_std(listener)
        .expect("Failed to adopt the listener into the runtime.");

    loop {
        tokio::select! {
            // Resolves when either half of the shutdown channel is used or
            // dropped, i.e. when the owning `MockServer` goes out of scope.
            _ = &mut shutdown_signal => break,
            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(connection) => connection,
                    Err(error) => {
                        debug!("failed to accept a connection: {error}");
                        continue;
                    }
                };
                let stubs = stubs.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |request: hyper::Request<Incoming>| {
                        let stubs = stubs.clone();
                        async move { Ok::<_, Infallible>(handle(request, &stubs).await) }
                    });
                    if let Err(error) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("connection error: {error}");
                    }
                });
            }
        }
    }
}

/// The dispatcher: buffer the request, delegate to the resolution engine and
/// translate failures into the JSON error envelope.
async fn handle(raw: hyper::Request<Incoming>, stubs: &StubSet) -> MockResponse {
    let path = raw.uri().path().to_string();
    let request = match Request::from_hyper(raw).await {
        Ok(request) => request,
        Err(RequestError::Body(error)) => {
            debug!("failed to read the request body for '{path}': {error}");
            return error_response(&ResolveError::Internal(format!(
                "Could not read body for endpoint '{path}'"
            )));
        }
        Err(RequestError::Url(error)) => {
            debug!("failed to parse the request url for '{path}': {error}");
            return error_response(&ResolveError::Internal(format!(
                "Could not parse URL for endpoint '{path}'"
            )));
        }
    };
    debug!("{request}");

    let mut response = match stubs.handle_request(&request) {
        Ok(response) => response,
        Err(error) => error_response(&error),
    };
    // The content type is pre-set on every response, custom producers
    // included. A producer that set its own content type wins.
    response
        .headers_mut()
        .entry(CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));
    response
}

/// The wire format for all engine-signaled failures:
/// `{ "message": "<text>" }`, with the HTTP status carried out-of-band as the
/// response status code. If writing the envelope itself fails there is
/// nothing left to try; the connection is simply closed.
fn error_response(error: &ResolveError) -> MockResponse {
    let envelope = serde_json::json!({ "message": error.to_string() });
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| b"{}".to_vec());
    http::Response::builder()
        .status(error.status_code())
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("a response from static parts cannot fail to build")
}
