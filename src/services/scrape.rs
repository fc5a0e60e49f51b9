use super::export::{ExportOutcome, SnapshotExporter};
use super::retry::Pipeline;
use crate::aggregation::compute_popularity;
use crate::browser::{extract_texts, ChromeSession, DomQuery, PageSource, SessionNavigator};
use crate::config::{Config, SelectorConfig};
use crate::database::SnapshotSink;
use crate::error::{AppError, Result};
use crate::models::run_timestamp;
use chrono::{DateTime, Utc};

/// Archetype names from the statistics table. An empty result means the selectors no
/// longer match the page and is reported as [`AppError::EmptyExtraction`].
pub async fn read_archetypes<P: DomQuery>(
    page: &P,
    selectors: &SelectorConfig,
) -> Result<Vec<String>> {
    let archetypes = extract_texts(page, &selectors.archetypes).await?;
    if archetypes.is_empty() {
        return Err(AppError::EmptyExtraction(format!(
            "selector {:?} matched nothing",
            selectors.archetypes
        )));
    }
    tracing::debug!("archetypes: {:?}", archetypes);
    Ok(archetypes)
}

/// Weighted popularity for the first `archetype_count` rows of the statistics table.
pub async fn read_popularity<P: DomQuery>(
    page: &P,
    selectors: &SelectorConfig,
    archetype_count: usize,
) -> Result<Vec<f64>> {
    let popularity_cells = extract_texts(page, &selectors.popularity).await?;
    let games_played = extract_texts(page, &selectors.games_played).await?;

    let popularity = compute_popularity(&popularity_cells, &games_played, archetype_count)?;
    tracing::debug!("popularity: {:?}", popularity);
    Ok(popularity)
}

/// Login, scrape and export against the live site, using one browser for all attempts.
pub struct ScrapePipeline<S, B = ChromeSession> {
    config: Config,
    session: B,
    exporter: SnapshotExporter<S>,
}

impl<S: SnapshotSink, B: PageSource> ScrapePipeline<S, B> {
    pub fn new(config: Config, session: B, sink: S) -> Self {
        let exporter = SnapshotExporter::new(sink, config.output.screenshot_dir.clone());
        Self {
            config,
            session,
            exporter,
        }
    }

    async fn scrape(
        &self,
        navigator: &mut SessionNavigator<'_, B>,
        timestamp: DateTime<Utc>,
    ) -> Result<ExportOutcome> {
        let selectors = &self.config.selectors;

        navigator.login().await?;
        navigator.open_data_page().await?;

        let archetypes = read_archetypes(navigator.page(), selectors).await?;
        tracing::info!("Found {} archetypes", archetypes.len());

        let captures = navigator.visit_archetypes(&archetypes, timestamp).await?;
        let winrates: Vec<f64> = captures.iter().map(|c| c.winrate).collect();
        tracing::debug!("winrates: {:?}", winrates);

        let popularity = read_popularity(navigator.page(), selectors, archetypes.len()).await?;

        self.exporter
            .export(&archetypes, &winrates, &popularity, timestamp)
            .await
    }
}

impl<S: SnapshotSink, B: PageSource> Pipeline for ScrapePipeline<S, B> {
    type Output = ExportOutcome;

    async fn run_once(&self, attempt: u32) -> Result<ExportOutcome> {
        let timestamp = run_timestamp();
        tracing::debug!("attempt {} keyed at {}", attempt, timestamp.timestamp_millis());

        let mut navigator = SessionNavigator::open(&self.session, &self.config).await?;
        let result = self.scrape(&mut navigator, timestamp).await;
        navigator.close().await;
        result
    }

    async fn release(&mut self) -> Result<()> {
        self.session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{position, test_config, CallLog, ScriptedBrowser};
    use crate::models::Snapshot;

    struct LoggingSink {
        log: CallLog,
    }

    impl SnapshotSink for LoggingSink {
        async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
            self.log
                .borrow_mut()
                .push(format!("persist {} decks", snapshot.decks.len()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_attempt_runs_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let selectors = config.selectors.clone();
        let site = config.site.clone();

        let browser = ScriptedBrowser::new(&config, false);
        let log = browser.log();
        let sink = LoggingSink { log: log.clone() };
        let mut pipeline = ScrapePipeline::new(config, browser, sink);

        let outcome = pipeline.run_once(1).await.unwrap();
        assert_eq!(outcome, ExportOutcome::Persisted { decks: 2 });
        pipeline.release().await.unwrap();

        let log = log.borrow();
        let login = position(&log, &format!("goto {}", site.login_url));
        let submit = position(&log, &format!("click {}", selectors.blizzard_login));
        let data_page = position(&log, &format!("goto {}", site.meta_url));
        let archetypes = position(&log, &format!("query {}", selectors.archetypes));
        let last_detail = position(
            &log,
            &format!("close https://hsreplay.net/archetypes/2/big-priest{}", site.detail_fragment),
        );
        let popularity = position(&log, &format!("query {}", selectors.popularity));
        let persisted = position(&log, "persist 2 decks");
        let release = position(&log, "release");

        assert!(login < submit);
        assert!(submit < data_page);
        assert!(data_page < archetypes);
        assert!(archetypes < last_detail);
        assert!(last_detail < popularity);
        assert!(popularity < persisted);
        assert!(persisted < release);
    }

    #[tokio::test]
    async fn test_failed_attempt_closes_main_page_and_skips_export() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let meta_url = config.site.meta_url.clone();
        let browser = ScriptedBrowser::new(&config, true).with_broken_detail("control-warrior");
        let log = browser.log();
        let sink = LoggingSink { log: log.clone() };
        let pipeline = ScrapePipeline::new(config, browser, sink);

        let err = pipeline.run_once(1).await.unwrap_err();
        assert!(err.is_timeout());

        let log = log.borrow();
        assert!(!log.iter().any(|e| e.starts_with("persist")));
        assert_eq!(log.last(), Some(&format!("close {}", meta_url)));
    }
}
