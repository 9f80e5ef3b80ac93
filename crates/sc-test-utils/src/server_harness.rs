//! Test server harness for E2E testing
//!
//! Provides `TestScServer` for spawning real scholarship-service instances in
//! tests, backed by the `#[sqlx::test]` database and an in-memory file store.

use crate::client::ApiClient;
use crate::fixtures::TestUser;
use scholarship_service::config::Config;
use scholarship_service::observability::metrics::init_metrics_recorder;
use scholarship_service::routes::{self, AppState};
use scholarship_service::services::MemoryFileStore;
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the scholarship service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_health(pool: PgPool) -> Result<()> {
///     let server = TestScServer::spawn(pool).await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestScServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    file_store: Arc<MemoryFileStore>,
    _handle: JoinHandle<()>,
}

impl TestScServer {
    /// Spawn a server with default test configuration.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with_env(pool, &[]).await
    }

    /// Spawn a server, overriding configuration variables (e.g.
    /// `MAX_UPLOAD_BYTES`).
    pub async fn spawn_with_env(
        pool: PgPool,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            // Lowest accepted cost keeps login tests fast
            ("BCRYPT_COST".to_string(), "10".to_string()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let file_store = Arc::new(MemoryFileStore::new());
        let state = Arc::new(
            AppState::new(pool.clone(), config.clone(), file_store.clone())
                .map_err(|e| anyhow::anyhow!("Failed to create app state: {}", e))?,
        );

        // The global recorder can be installed only once per process; later
        // servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            file_store,
            _handle: handle,
        })
    }

    /// Get reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The in-memory store holding uploaded documents.
    pub fn file_store(&self) -> &MemoryFileStore {
        &self.file_store
    }

    /// HTTP client authenticated as `user`.
    pub fn client(&self, user: &TestUser) -> ApiClient {
        ApiClient::new(self.url(), Some(user.token.clone()))
    }

    /// HTTP client without credentials.
    pub fn anonymous(&self) -> ApiClient {
        ApiClient::new(self.url(), None)
    }
}

impl Drop for TestScServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
