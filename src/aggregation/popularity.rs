use super::parse::{parse_count, parse_percent};
use crate::error::{AppError, Result};

/// Skill-rank segments the popularity table reports separately.
pub const RANK_BUCKETS: usize = 6;

/// Cells per archetype row: one per rank bucket plus a trailing column that is not
/// part of the weighting.
pub const BUCKETS_PER_ARCHETYPE: usize = 7;

/// Games-played weighted popularity per archetype, in percent, rounded to 2 decimals.
///
/// `popularity_cells` is the flattened table, row by row; `games_played_cells` holds
/// the sample size of each rank bucket. An archetype whose buckets carry no games
/// yields `NaN`, which callers must reject.
pub fn compute_popularity(
    popularity_cells: &[String],
    games_played_cells: &[String],
    archetype_count: usize,
) -> Result<Vec<f64>> {
    let needed = archetype_count * BUCKETS_PER_ARCHETYPE;
    if popularity_cells.len() < needed {
        return Err(AppError::DataQuality(format!(
            "expected at least {} popularity cells for {} archetypes, found {}",
            needed,
            archetype_count,
            popularity_cells.len()
        )));
    }
    if archetype_count > 0 && games_played_cells.len() < RANK_BUCKETS {
        return Err(AppError::DataQuality(format!(
            "expected {} games-played cells, found {}",
            RANK_BUCKETS,
            games_played_cells.len()
        )));
    }

    let games = games_played_cells
        .iter()
        .take(RANK_BUCKETS)
        .map(|cell| parse_count(cell))
        .collect::<Result<Vec<f64>>>()?;

    let mut values = Vec::with_capacity(archetype_count);
    for row in popularity_cells.chunks(BUCKETS_PER_ARCHETYPE).take(archetype_count) {
        let mut weighted = 0.0;
        let mut total_games = 0.0;
        for (cell, &count) in row.iter().take(RANK_BUCKETS).zip(&games) {
            let share = parse_percent(cell)? / 100.0;
            tracing::trace!(cell = %cell, share, count, "popularity bucket");
            weighted += count * share;
            total_games += count;
        }
        values.push(round2((weighted / total_games) * 100.0));
    }

    Ok(values)
}

/// Two-decimal rounding on the exact binary value, so 0.015 (stored just below the
/// midpoint) goes down. Exact midpoints such as 0.125 round away from zero.
fn round2(value: f64) -> f64 {
    let hundredths = value * 100.0;
    if (value * 8.0).fract() == 0.0 && hundredths.fract().abs() == 0.5 {
        return hundredths.round() / 100.0;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}
