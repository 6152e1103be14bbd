//! `mockfile` is an embeddable HTTP mock server for black-box testing: it
//! stands in for a real backend by answering incoming requests with
//! pre-configured responses, selected from a declarative set of endpoint
//! definitions.
//!
//! Endpoints come from two sources:
//! - a **mock file** (JSON or YAML) mapping paths and methods to ordered
//!   candidate responses, each optionally guarded by a query expression over
//!   the request's URL parameters or JSON body;
//! - **custom registrations**: programmatically supplied candidates guarded
//!   by functional predicates ([`Match`]) and answered by response producers
//!   ([`Respond`]). A custom path+method pair entirely replaces the
//!   file-defined list for that pair.
//!
//! For every request the server walks the candidate list in order and picks
//! the first one whose predicate matches; unconditional candidates act as the
//! fallback when nothing matches. Unresolvable requests get a JSON error
//! envelope (`{ "message": "..." }`) with a 404, evaluation faults a 500.
//!
//! ## Getting started
//! ```rust
//! use mockfile::{Candidate, MockServer, StubResponse};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Start a background HTTP server on a random local port.
//!     let mock_server = MockServer::builder()
//!         .register(
//!             "/hello",
//!             "GET",
//!             vec![Candidate::unconditional()
//!                 .respond_with(StubResponse::new(200).set_body_json(json!({ "hello": "world" })))],
//!         )
//!         .start()
//!         .unwrap();
//!
//!     // Probe it with any HTTP client.
//!     let response = reqwest::get(format!("{}/hello", mock_server.uri()))
//!         .await
//!         .unwrap();
//!     assert_eq!(response.status(), 200);
//!
//!     // Anything not configured yields a 404 with a JSON error envelope.
//!     let missing = reqwest::get(format!("{}/missing", mock_server.uri()))
//!         .await
//!         .unwrap();
//!     assert_eq!(missing.status(), 404);
//! }
//! ```
//!
//! ## Mock files
//!
//! A mock file declares, per path and method, an ordered list of candidate
//! responses:
//!
//! ```yaml
//! /endpoint1:
//!   GET:
//!     - requestQuery:
//!         url: "name = 'John'"
//!       response:
//!         status: 200
//!         body:
//!           greeting: hello John
//!     - response:
//!         status: 404
//!         body:
//!           message: who are you?
//! ```
//!
//! `requestQuery.url` is evaluated against the URL query parameters
//! (rendered as a JSON object, parameter name to array of values) and
//! `requestQuery.body` against the JSON request body (POST and PUT only).
//! A candidate may carry both; either match selects it. Entries without a
//! `requestQuery` match unconditionally.
//!
//! Load one with [`MockServerBuilder::mock_file`]. The format is chosen from
//! the file extension; anything but `.json`, `.yaml` or `.yml` is rejected
//! at startup.
//!
//! ## Custom endpoints
//!
//! Custom candidates pair a functional predicate with a response producer.
//! Closures work for both sides - see [`Match`] and [`Respond`]:
//!
//! ```rust,no_run
//! use mockfile::{Candidate, MockServer, Request, StubResponse};
//! use serde_json::json;
//!
//! let mock_server = MockServer::builder()
//!     .mock_file("testfiles/mock.yaml")
//!     .register(
//!         "/custom",
//!         "GET",
//!         vec![
//!             Candidate::when(|request: &Request| {
//!                 request.url.query_pairs().any(|(k, v)| k == "name" && v == "test")
//!             })
//!             .respond_with(StubResponse::new(200).set_body_json(json!({ "custom": "valueForQuery" }))),
//!             Candidate::unconditional()
//!                 .respond_with(StubResponse::new(200).set_body_json(json!({ "custom": "blaa" }))),
//!         ],
//!     )
//!     .start()
//!     .unwrap();
//! ```
//!
//! ## Test isolation
//!
//! Each [`MockServer`] instance is fully isolated: it owns its endpoint
//! tables and listens on its own port, so one instance per test gives full
//! isolation and no cross-test interference. The endpoint tables are sealed
//! when [`MockServerBuilder::start`] returns and never change afterwards;
//! when the instance goes out of scope the background server shuts down and
//! frees its port.
mod config;
mod error;
mod mock_server;
mod query;
mod request;
mod stub;
mod stub_set;

pub use error::{ConfigError, ResolveError, StartError};
pub use mock_server::{MockServer, MockServerBuilder};
pub use request::Request;
pub use stub::{BoxError, Candidate, CandidateBuilder, Match, MockResponse, Respond, StubResponse};
