use log::warn;
use std::collections::HashMap;

use crate::db::VoteStore;
use crate::error::StatsError;
use crate::models::{HOURS_PER_DAY, HourlyTotal};

pub async fn compute(store: &dyn VoteStore, round_id: i64) -> Result<Vec<HourlyTotal>, StatsError> {
    let counts = store
        .count_votes_by_hour(round_id)
        .await
        .map_err(StatsError::store)?;

    Ok(fill_hours(&counts))
}

/// Dense 24-entry series, hour 0 first, zero for hours without votes.
pub fn fill_hours(counts: &HashMap<u32, u64>) -> Vec<HourlyTotal> {
    for hour in counts.keys().filter(|hour| **hour >= HOURS_PER_DAY) {
        warn!("Ignoring vote count for out-of-range hour {}", hour);
    }

    (0..HOURS_PER_DAY)
        .map(|hour| HourlyTotal {
            hour,
            total_votes: counts.get(&hour).copied().unwrap_or(0),
        })
        .collect()
}
