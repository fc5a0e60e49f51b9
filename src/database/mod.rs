use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::Snapshot;
use surrealdb::engine::any::{connect, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tokio::sync::OnceCell;

/// Where finished snapshots go.
#[allow(async_fn_in_trait)]
pub trait SnapshotSink {
    async fn persist(&self, snapshot: &Snapshot) -> Result<()>;
}

/// SurrealDB-backed snapshot collection. The connection is opened on first use and
/// reused for the life of the store; dropping the store closes it.
pub struct SnapshotStore {
    config: DatabaseConfig,
    db: OnceCell<Surreal<Any>>,
}

impl SnapshotStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.db.initialized()
    }

    pub async fn acquire(&self) -> Result<&Surreal<Any>> {
        self.db.get_or_try_init(|| Self::connect(&self.config)).await
    }

    async fn connect(config: &DatabaseConfig) -> Result<Surreal<Any>> {
        let db = connect(config.url.as_str())
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to sign in: {}", e)))?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to select namespace/database: {}", e))
            })?;

        tracing::info!("Connected to database at {}", config.url);
        Ok(db)
    }

    pub async fn snapshots(&self) -> Result<Vec<Snapshot>> {
        let db = self.acquire().await?;
        let result: Vec<Snapshot> = db.select(self.config.table.clone()).await?;
        Ok(result)
    }
}

impl SnapshotSink for SnapshotStore {
    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let db = self.acquire().await?;
        let created: Option<Snapshot> = db
            .create(self.config.table.clone())
            .content(snapshot.clone())
            .await?;

        created
            .map(|_| ())
            .ok_or_else(|| AppError::Database("Failed to save snapshot".into()))
    }
}

/// Logs the snapshot as JSON instead of storing it.
pub struct DryRunSink;

impl SnapshotSink for DryRunSink {
    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        tracing::info!("Dry run, snapshot not stored:\n{}", json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "mem://".to_string(),
            ..DatabaseConfig::default()
        }
    }

    fn sample_snapshot() -> Snapshot {
        let timestamp = DateTime::from_timestamp_millis(1_546_300_800_000).unwrap();
        let names = vec!["Control Warrior".to_string()];
        Snapshot::assemble(timestamp, &names, &[54.2], &[12.35], "./screenshots").unwrap()
    }

    #[tokio::test]
    async fn test_connection_is_lazy_and_reused() {
        let store = SnapshotStore::new(memory_config());
        assert!(!store.is_connected());

        let first = store.acquire().await.unwrap() as *const Surreal<Any>;
        let second = store.acquire().await.unwrap() as *const Surreal<Any>;
        assert!(store.is_connected());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_persist_stores_one_record() {
        let store = SnapshotStore::new(memory_config());
        let snapshot = sample_snapshot();

        store.persist(&snapshot).await.unwrap();

        let stored = store.snapshots().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].decks, snapshot.decks);
    }

    #[tokio::test]
    async fn test_dry_run_sink_accepts_snapshot() {
        assert!(DryRunSink.persist(&sample_snapshot()).await.is_ok());
    }
}
