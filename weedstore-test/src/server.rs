//! Exposes an in-process HTTP server for use in integration tests.
//!
//! ```
//! use axum::Router;
//! use axum::routing::get;
//! use weedstore_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let router = Router::new().route("/status", get(|| async { "ok" }));
//!    let server = TestServer::with_router(router).await;
//!    let url = server.url("/status");
//!    // use the URL in tests...
//! }
//! ```

use std::net::SocketAddr;

use axum::Router;

/// An in-process HTTP server serving an arbitrary [`Router`].
///
/// It listens on a random available port on localhost and stops when dropped.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
}

impl TestServer {
    /// Binds a random port and starts serving `router` in the background.
    pub async fn with_router(router: Router) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let socket = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { handle, socket }
    }

    /// Returns the port the server listens on.
    pub fn port(&self) -> u16 {
        self.socket.port()
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.socket.port(), path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
