//! Spins up a live roster server on an ephemeral port for end-to-end tests.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, connect};
use roster_server::{AppConfig, AppState, build_router};
use tokio::{net::TcpListener, task::JoinHandle};

pub struct TestServer {
    pub addr: SocketAddr,
    pub uploads: PathBuf,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serves a fresh in-memory database and a temporary uploads directory.
    pub async fn spawn() -> Result<Self> {
        let pool = connect(&DatabaseSettings::new("sqlite::memory:")).await?;
        Migrator::up(&pool, None).await?;

        let uploads = std::env::temp_dir().join(format!("roster-e2e-{}", uuid::Uuid::new_v4()));
        let config = Arc::new(AppConfig {
            uploads_dir: uploads.clone(),
            cors_allowed_origins: Vec::new(),
            auto_migrate: false,
        });
        let router = build_router(AppState::build(pool, config).await?);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self {
            addr,
            uploads,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stored_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.uploads)
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
        let _ = std::fs::remove_dir_all(&self.uploads);
    }
}
