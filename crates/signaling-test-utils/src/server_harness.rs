//! Test server harness for E2E testing
//!
//! Provides `TestSignalingServer` for spawning real server instances in tests.

use metrics_exporter_prometheus::PrometheusBuilder;
use signaling_server::config::Config;
use signaling_server::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the signaling server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let server = TestSignalingServer::spawn().await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestSignalingServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestSignalingServer {
    /// Spawn a server with default configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn a server with extra environment-style configuration.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Use fresh in-memory stores
    /// - Use a local Prometheus recorder (no global install)
    pub async fn spawn_with_vars(mut vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string());
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        // A global recorder can only be installed once per process, so each
        // harness renders from its own recorder's handle.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let state = Arc::new(AppState::in_memory(config, metrics_handle));
        state.health.start_accepting();
        let app = routes::build_routes(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            // Use into_make_service_with_connect_info to support SocketAddr extraction
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL for a room.
    pub fn ws_url(&self, room_id: &str) -> String {
        format!("ws://{}/ws/{}", self.addr, room_id)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &signaling_server::config::Config {
        &self.state.config
    }

    /// Shared application state, for inspecting rooms and users directly.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for TestSignalingServer {
    fn drop(&mut self) {
        self.state.shutdown.cancel();
        self._handle.abort();
    }
}
