//! Cache-aside access to vote statistics.
//!
//! Each request looks the statistic up in the cache, falls back to computing
//! it from the store, and writes the fresh value back with a fixed TTL.
//! Entries are never invalidated when a vote is written, so a result can lag
//! behind the store by up to one TTL. Cache failures of any kind degrade to
//! a recomputation; only store failures reach the caller.

use log::{debug, error, warn};
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{hourly, participant, total};
use crate::cache::StatsCache;
use crate::db::VoteStore;
use crate::error::StatsError;
use crate::models::{HourlyTotal, ParticipantTotal, TotalStat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Total,
    Participant,
    Hourly,
}

impl StatKind {
    pub fn prefix(self) -> &'static str {
        match self {
            StatKind::Total => "stats:total",
            StatKind::Participant => "stats:participant",
            StatKind::Hourly => "stats:hourly",
        }
    }

    pub fn key(self, round_id: i64) -> String {
        format!("{}:{}", self.prefix(), round_id)
    }
}

pub struct StatsService {
    store: Arc<dyn VoteStore>,
    cache: Arc<dyn StatsCache>,
    ttl: Duration,
}

impl StatsService {
    pub fn new(store: Arc<dyn VoteStore>, cache: Arc<dyn StatsCache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// Existence check callers run before asking for statistics.
    pub async fn require_round(&self, round_id: i64) -> Result<(), StatsError> {
        match self.store.round_exists(round_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StatsError::RoundNotFound(round_id)),
            Err(e) => {
                error!("Failed to look up voting round {}: {}", round_id, e);
                Err(StatsError::store(e))
            }
        }
    }

    pub async fn total_votes(&self, round_id: i64) -> Result<TotalStat, StatsError> {
        let compute = total::compute(self.store.as_ref(), round_id);
        self.read_through(StatKind::Total, round_id, compute).await
    }

    pub async fn participant_totals(
        &self,
        round_id: i64,
    ) -> Result<Vec<ParticipantTotal>, StatsError> {
        let compute = participant::compute(self.store.as_ref(), round_id);
        self.read_through(StatKind::Participant, round_id, compute).await
    }

    pub async fn hourly_totals(&self, round_id: i64) -> Result<Vec<HourlyTotal>, StatsError> {
        let compute = hourly::compute(self.store.as_ref(), round_id);
        self.read_through(StatKind::Hourly, round_id, compute).await
    }

    // `compute` is only polled on a miss. If the caller drops this future
    // while the store is still working, nothing is written to the cache.
    async fn read_through<T, F>(
        &self,
        kind: StatKind,
        round_id: i64,
        compute: F,
    ) -> Result<T, StatsError>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T, StatsError>>,
    {
        let key = kind.key(round_id);

        if let Some(cached) = self.lookup::<T>(&key).await {
            return Ok(cached);
        }

        let value = match compute.await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to compute {} for round {}: {}", kind.prefix(), round_id, e);
                return Err(e);
            }
        };

        self.write_back(&key, &value).await;

        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(value) => {
                    debug!("Cache hit for {}", key);
                    Some(value)
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss for {}", key);
                None
            }
            Err(e) => {
                warn!("Cache read failed for {}, computing from store: {}", key, e);
                None
            }
        }
    }

    async fn write_back<T: Serialize>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize {} for caching: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.cache.set(key, payload, self.ttl).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::Database;
    use crate::models::Vote;

    #[test]
    fn keys_are_distinct_per_kind() {
        assert_eq!(StatKind::Total.key(7), "stats:total:7");
        assert_eq!(StatKind::Participant.key(7), "stats:participant:7");
        assert_eq!(StatKind::Hourly.key(7), "stats:hourly:7");
    }

    #[tokio::test]
    async fn serves_cached_value_until_it_expires() {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let round = db.create_voting_round("Final").await.unwrap();
        let alice = db.create_participant("Alice", "").await.unwrap();
        db.attach_participant(round.id, alice.id).await.unwrap();
        db.save_vote(&Vote::new(alice.id, round.id)).await.unwrap();

        let cache = Arc::new(MemoryCache::new());
        let service = StatsService::new(db.clone(), cache.clone(), Duration::from_millis(300));

        assert_eq!(service.total_votes(round.id).await.unwrap().total_votes, 1);

        // A new vote is not visible while the entry is live
        db.save_vote(&Vote::new(alice.id, round.id)).await.unwrap();
        assert_eq!(service.total_votes(round.id).await.unwrap().total_votes, 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(service.total_votes(round.id).await.unwrap().total_votes, 2);
    }

    #[tokio::test]
    async fn undecodable_entry_is_recomputed_and_replaced() {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let round = db.create_voting_round("Final").await.unwrap();
        let cache = Arc::new(MemoryCache::new());
        cache
            .set(&StatKind::Hourly.key(round.id), "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let service = StatsService::new(db, cache.clone(), Duration::from_secs(60));
        let hourly = service.hourly_totals(round.id).await.unwrap();

        assert_eq!(hourly.len(), 24);
        let cached = cache.get(&StatKind::Hourly.key(round.id)).await.unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Vec<HourlyTotal>>(&cached).unwrap(), hourly);
    }

    #[tokio::test]
    async fn require_round_reports_missing_round() {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let round = db.create_voting_round("Final").await.unwrap();
        let service = StatsService::new(db, Arc::new(MemoryCache::new()), Duration::from_secs(1));

        assert!(service.require_round(round.id).await.is_ok());
        assert!(matches!(
            service.require_round(round.id + 1).await,
            Err(StatsError::RoundNotFound(id)) if id == round.id + 1
        ));
    }
}
