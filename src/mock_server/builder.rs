use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use log::info;

use crate::config::{self, MockFile};
use crate::error::StartError;
use crate::mock_server::MockServer;
use crate::stub::Candidate;
use crate::stub_set::{EndpointTable, StubSet};

/// A builder providing a fluent API to assemble a [`MockServer`] step-by-step.
/// Use [`MockServer::builder`] to get started.
pub struct MockServerBuilder {
    mock_file: Option<PathBuf>,
    listener: Option<std::net::TcpListener>,
    port: Option<u16>,
    custom: EndpointTable,
}

impl MockServerBuilder {
    pub(super) fn new() -> Self {
        Self {
            mock_file: None,
            listener: None,
            port: None,
            custom: EndpointTable::new(),
        }
    }

    /// Load file-defined endpoints from a mock file (JSON or YAML, chosen by
    /// extension).
    ///
    /// Without a mock file, only [`register`]ed custom endpoints are served.
    ///
    /// [`register`]: MockServerBuilder::register
    pub fn mock_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.mock_file = Some(path.into());
        self
    }

    /// Bind the server to a fixed local port instead of a random free one.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Each instance of [`MockServer`] is, by default, running on a random
    /// port available on your local machine.
    /// With `MockServerBuilder::listener` you can choose to start the
    /// `MockServer` instance on a specific port you have already bound.
    ///
    /// ### Example:
    /// ```rust
    /// use mockfile::MockServer;
    ///
    /// let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    /// let expected_server_address = listener
    ///     .local_addr()
    ///     .expect("Failed to get server address.");
    ///
    /// let mock_server = MockServer::builder().listener(listener).start().unwrap();
    ///
    /// assert_eq!(&expected_server_address, mock_server.address());
    /// ```
    pub fn listener(mut self, listener: std::net::TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Register custom candidates for a path+method pair.
    ///
    /// A registered pair entirely replaces the file-defined candidate list
    /// for that same pair - the two lists are never merged. Registering the
    /// same pair twice overwrites the earlier list: last registration wins.
    ///
    /// Panics on an invalid HTTP method token, like every other builder
    /// misuse in this crate.
    pub fn register<P, M>(mut self, path: P, method: M, candidates: Vec<Candidate>) -> Self
    where
        P: Into<String>,
        M: AsRef<str>,
    {
        let method = Method::from_str(&method.as_ref().to_ascii_uppercase())
            .expect("Failed to convert into HTTP method.");
        self.custom
            .entry(path.into())
            .or_default()
            .insert(method, candidates);
        self
    }

    /// Finalise the builder and launch the [`MockServer`] instance.
    ///
    /// This loads and validates the mock file, seals both endpoint tables,
    /// binds the listener and spawns the background server thread. All
    /// configuration failures are reported here; none can occur mid-request.
    pub fn start(self) -> Result<MockServer, StartError> {
        let mock_file = match &self.mock_file {
            Some(path) => config::load(path)?,
            None => MockFile::new(),
        };
        let stubs = Arc::new(StubSet::new(mock_file, self.custom)?);

        let listener = match (self.listener, self.port) {
            (Some(listener), _) => listener,
            (None, Some(port)) => {
                std::net::TcpListener::bind(("127.0.0.1", port)).map_err(StartError::Bind)?
            }
            (None, None) => {
                std::net::TcpListener::bind("127.0.0.1:0").map_err(StartError::Bind)?
            }
        };

        let endpoints = stubs.served_endpoints();
        let server = MockServer::start_with(listener, stubs);
        info!("Started mock server at {}", server.uri());
        for (path, method) in endpoints {
            info!(" [{:>6}] {}{}", method, server.uri(), path);
        }
        Ok(server)
    }
}
