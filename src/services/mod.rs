pub mod export;
pub mod retry;
pub mod scrape;

pub use export::{ExportOutcome, SnapshotExporter};
pub use retry::{run_with_retries, Pipeline, RetryOutcome, RetryPolicy};
pub use scrape::{read_archetypes, read_popularity, ScrapePipeline};
