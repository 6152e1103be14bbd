//! All bits and pieces concerning the HTTP mock server are in this module.
//!
//! [`MockServer`] is a handle to a `hyper` HTTP server running in the
//! background on a dedicated thread, defined in the `hyper` sub-module. The
//! endpoint tables it resolves against are assembled by
//! [`MockServerBuilder`] and sealed before the first connection is accepted.
mod builder;
mod hyper;

pub use builder::MockServerBuilder;

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::stub_set::StubSet;

/// An HTTP web-server running in the background, answering requests from a
/// declarative set of endpoint definitions for testing purposes.
///
/// Each instance is fully isolated: by default [`MockServerBuilder::start`]
/// finds a random port available on your local machine and assigns it to the
/// new `MockServer`. The endpoint tables are owned by the instance, so any
/// number of servers can coexist in one process without interference.
///
/// When a `MockServer` instance goes out of scope (e.g. the test finishes),
/// the background HTTP server is shut down to free up the port it was using.
pub struct MockServer {
    server_address: SocketAddr,
    // When `_shutdown_trigger` gets dropped the listening server terminates
    // gracefully.
    _shutdown_trigger: tokio::sync::oneshot::Sender<()>,
}

impl MockServer {
    /// Start assembling a `MockServer` instance: mock file, custom endpoints,
    /// listening port.
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    pub(crate) fn start_with(listener: std::net::TcpListener, stubs: Arc<StubSet>) -> MockServer {
        let (shutdown_trigger, shutdown_receiver) = tokio::sync::oneshot::channel();
        let server_address = listener
            .local_addr()
            .expect("Failed to get server address.");

        std::thread::spawn(move || {
            let server_future = hyper::run_server(listener, stubs, shutdown_receiver);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Cannot build local tokio runtime");

            runtime.block_on(server_future);
        });
        for _ in 0..40 {
            if TcpStream::connect_timeout(&server_address, Duration::from_millis(25)).is_ok() {
                break;
            }
            std::thread::sleep(Duration::from_millis(25));
        }

        Self {
            server_address,
            _shutdown_trigger: shutdown_trigger,
        }
    }

    /// Return the base uri of this running instance of `MockServer`, e.g.
    /// `http://127.0.0.1:4372`.
    ///
    /// Use this method to compose uris when interacting with this instance of
    /// `MockServer` via an HTTP client.
    pub fn uri(&self) -> String {
        format!("http://{}", self.server_address)
    }

    /// Return the socket address of this running instance of `MockServer`,
    /// e.g. `127.0.0.1:4372`.
    pub fn address(&self) -> &SocketAddr {
        &self.server_address
    }
}
