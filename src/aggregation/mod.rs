mod parse;
mod popularity;

pub use parse::{parse_count, parse_percent};
pub use popularity::{compute_popularity, BUCKETS_PER_ARCHETYPE, RANK_BUCKETS};
