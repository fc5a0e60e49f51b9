use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckRecord {
    pub name: String,
    pub winrate: f64,
    pub popularity: f64,
    pub screenshot: String,
}

/// One complete scrape. Built once through [`Snapshot::assemble`] and persisted as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub decks: Vec<DeckRecord>,
}

/// Current time truncated to whole milliseconds, so the stored timestamp and the
/// millisecond key in screenshot file names always agree.
pub fn run_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// `<dir>/<name>_<millis>.png`
pub fn screenshot_path(dir: &str, archetype: &str, timestamp: DateTime<Utc>) -> String {
    let name: String = archetype
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    format!(
        "{}/{}_{}.png",
        dir.trim_end_matches('/'),
        name,
        timestamp.timestamp_millis()
    )
}

impl Snapshot {
    /// Zips the per-archetype sequences of one run into deck records.
    pub fn assemble(
        timestamp: DateTime<Utc>,
        archetypes: &[String],
        winrates: &[f64],
        popularity: &[f64],
        screenshot_dir: &str,
    ) -> Result<Self> {
        if archetypes.len() != winrates.len() || archetypes.len() != popularity.len() {
            return Err(AppError::DataQuality(format!(
                "sequence lengths differ: {} archetypes, {} winrates, {} popularity values",
                archetypes.len(),
                winrates.len(),
                popularity.len()
            )));
        }

        let mut decks = Vec::with_capacity(archetypes.len());
        for ((name, &winrate), &pop) in archetypes.iter().zip(winrates).zip(popularity) {
            if !winrate.is_finite() {
                return Err(AppError::DataQuality(format!("non-numeric winrate for {}", name)));
            }
            if !pop.is_finite() {
                return Err(AppError::DataQuality(format!(
                    "non-numeric popularity for {} (no games played?)",
                    name
                )));
            }
            decks.push(DeckRecord {
                name: name.clone(),
                winrate,
                popularity: pop,
                screenshot: screenshot_path(screenshot_dir, name, timestamp),
            });
        }

        Ok(Self { timestamp, decks })
    }
}
