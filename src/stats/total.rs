use crate::db::VoteStore;
use crate::error::StatsError;
use crate::models::TotalStat;

pub async fn compute(store: &dyn VoteStore, round_id: i64) -> Result<TotalStat, StatsError> {
    let total_votes = store.count_votes(round_id).await.map_err(StatsError::store)?;

    Ok(TotalStat {
        voting_round_id: round_id,
        total_votes,
    })
}
