use metagame_scraper::aggregation::{compute_popularity, BUCKETS_PER_ARCHETYPE};

fn table(rows: &[[f64; 6]]) -> Vec<String> {
    let mut cells = Vec::with_capacity(rows.len() * BUCKETS_PER_ARCHETYPE);
    for row in rows {
        cells.extend(row.iter().map(|v| format!("{}%", v)));
        cells.push("n/a".to_string());
    }
    cells
}

fn counts(values: &[u64; 6]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

const ROWS: [[f64; 6]; 4] = [
    [12.5, 11.0, 9.75, 8.0, 7.25, 6.0],
    [0.4, 0.9, 1.3, 2.2, 3.1, 4.8],
    [30.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [2.0, 2.0, 2.0, 2.0, 2.0, 2.0],
];

#[test]
fn output_has_one_value_per_archetype() {
    let games = counts(&[310, 1_250, 4_800, 9_100, 15_000, 22_500]);
    for n in 0..=ROWS.len() {
        let result = compute_popularity(&table(&ROWS), &games, n).unwrap();
        assert_eq!(result.len(), n);
    }
}

#[test]
fn uniform_scaling_of_games_played_does_not_change_result() {
    let base = [310, 1_250, 4_800, 9_100, 15_000, 22_500];
    let expected = compute_popularity(&table(&ROWS), &counts(&base), ROWS.len()).unwrap();

    for factor in [2, 8, 1_024] {
        let scaled: [u64; 6] = base.map(|g| g * factor);
        let result = compute_popularity(&table(&ROWS), &counts(&scaled), ROWS.len()).unwrap();
        for (a, b) in expected.iter().zip(&result) {
            assert!((a - b).abs() < 1e-9, "factor {}: {} vs {}", factor, a, b);
        }
    }
}

#[test]
fn grouping_separators_match_plain_counts() {
    let plain = counts(&[1_000, 2_000, 3_000, 4_000, 5_000, 6_000]);
    let grouped: Vec<String> = ["1,000", "2,000", "3,000", "4,000", "5,000", "6,000"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    assert_eq!(
        compute_popularity(&table(&ROWS), &plain, ROWS.len()).unwrap(),
        compute_popularity(&table(&ROWS), &grouped, ROWS.len()).unwrap()
    );
}
