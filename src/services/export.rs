use crate::database::SnapshotSink;
use crate::error::Result;
use crate::models::Snapshot;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing was extracted; the sink was not touched.
    Skipped,
    Persisted { decks: usize },
}

pub struct SnapshotExporter<S> {
    sink: S,
    screenshot_dir: String,
}

impl<S: SnapshotSink> SnapshotExporter<S> {
    pub fn new(sink: S, screenshot_dir: impl Into<String>) -> Self {
        Self {
            sink,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn export(
        &self,
        archetypes: &[String],
        winrates: &[f64],
        popularity: &[f64],
        timestamp: DateTime<Utc>,
    ) -> Result<ExportOutcome> {
        if archetypes.is_empty() {
            tracing::warn!("No archetypes to export, skipping snapshot");
            return Ok(ExportOutcome::Skipped);
        }

        let snapshot = Snapshot::assemble(
            timestamp,
            archetypes,
            winrates,
            popularity,
            &self.screenshot_dir,
        )?;

        self.sink.persist(&snapshot).await?;
        tracing::info!("{} archetypes exported", snapshot.decks.len());

        Ok(ExportOutcome::Persisted {
            decks: snapshot.decks.len(),
        })
    }
}
