use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{
    Row,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::BoxError;
use crate::models::{Participant, Vote, VotingRound};

/// Read-only queries the statistics core needs from the vote store.
///
/// Grouped counts only contain keys that have at least one vote.
/// Hours are UTC hours of the vote timestamp.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn count_votes(&self, round_id: i64) -> Result<u64, BoxError>;

    /// Participants attached to the round, in attachment order.
    async fn list_participants(&self, round_id: i64) -> Result<Vec<Participant>, BoxError>;

    async fn count_votes_by_participant(
        &self,
        round_id: i64,
    ) -> Result<HashMap<i64, u64>, BoxError>;

    async fn count_votes_by_hour(&self, round_id: i64) -> Result<HashMap<u32, u64>, BoxError>;

    async fn round_exists(&self, round_id: i64) -> Result<bool, BoxError>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(db_url: &str) -> Result<Self, BoxError> {
        // Create the database file if it doesn't exist
        let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    // A private in-memory database lives only as long as its single connection
    pub async fn in_memory() -> Result<Self, BoxError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                photo_url TEXT NOT NULL DEFAULT ''
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voting_rounds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // rowid preserves attachment order
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voting_round_participants (
                voting_round_id INTEGER NOT NULL,
                participant_id INTEGER NOT NULL,
                PRIMARY KEY (voting_round_id, participant_id),
                FOREIGN KEY (voting_round_id) REFERENCES voting_rounds(id) ON DELETE CASCADE,
                FOREIGN KEY (participant_id) REFERENCES participants(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // No uniqueness: a participant can be voted for any number of times
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                participant_id INTEGER NOT NULL,
                voting_round_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (participant_id) REFERENCES participants(id) ON DELETE CASCADE,
                FOREIGN KEY (voting_round_id) REFERENCES voting_rounds(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_votes_round ON votes (voting_round_id)")
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn create_participant(
        &self,
        name: &str,
        photo_url: &str,
    ) -> Result<Participant, BoxError> {
        let result = sqlx::query("INSERT INTO participants (name, photo_url) VALUES (?, ?)")
            .bind(name)
            .bind(photo_url)
            .execute(&self.pool)
            .await?;

        Ok(Participant {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            photo_url: photo_url.to_string(),
        })
    }

    pub async fn create_voting_round(&self, description: &str) -> Result<VotingRound, BoxError> {
        let result = sqlx::query("INSERT INTO voting_rounds (description) VALUES (?)")
            .bind(description)
            .execute(&self.pool)
            .await?;

        Ok(VotingRound {
            id: result.last_insert_rowid(),
            description: description.to_string(),
        })
    }

    // Attaching twice keeps the first position
    pub async fn attach_participant(
        &self,
        round_id: i64,
        participant_id: i64,
    ) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO voting_round_participants (voting_round_id, participant_id)
            VALUES (?, ?)
            "#,
        )
        .bind(round_id)
        .bind(participant_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_vote(&self, vote: &Vote) -> Result<(), BoxError> {
        // First verify the participant and round exist
        let participant_exists = sqlx::query("SELECT 1 FROM participants WHERE id = ?")
            .bind(vote.participant_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if !participant_exists {
            return Err(format!("Participant {} not found", vote.participant_id).into());
        }

        if !self.round_exists(vote.voting_round_id).await? {
            return Err(format!("Voting round {} not found", vote.voting_round_id).into());
        }

        sqlx::query(
            r#"
            INSERT INTO votes (participant_id, voting_round_id, timestamp)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(vote.participant_id)
        .bind(vote.voting_round_id)
        .bind(vote.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl VoteStore for Database {
    async fn count_votes(&self, round_id: i64) -> Result<u64, BoxError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM votes WHERE voting_round_id = ?")
            .bind(round_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(to_count(row.try_get::<i64, _>("total")?))
    }

    async fn list_participants(&self, round_id: i64) -> Result<Vec<Participant>, BoxError> {
        let participants = sqlx::query(
            r#"
            SELECT p.id, p.name, p.photo_url
            FROM participants p
            JOIN voting_round_participants vrp ON p.id = vrp.participant_id
            WHERE vrp.voting_round_id = ?
            ORDER BY vrp.rowid
            "#,
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(Participant {
                id: row.try_get::<i64, _>("id")?,
                name: row.try_get::<String, _>("name")?,
                photo_url: row.try_get::<String, _>("photo_url")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(participants)
    }

    async fn count_votes_by_participant(
        &self,
        round_id: i64,
    ) -> Result<HashMap<i64, u64>, BoxError> {
        let rows = sqlx::query(
            r#"
            SELECT participant_id, COUNT(*) AS total
            FROM votes
            WHERE voting_round_id = ?
            GROUP BY participant_id
            "#,
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let participant_id = row.try_get::<i64, _>("participant_id")?;
            let total = row.try_get::<i64, _>("total")?;
            counts.insert(participant_id, to_count(total));
        }

        Ok(counts)
    }

    async fn count_votes_by_hour(&self, round_id: i64) -> Result<HashMap<u32, u64>, BoxError> {
        // Timestamps are stored in UTC, so strftime groups by UTC hour
        let rows = sqlx::query(
            r#"
            SELECT CAST(strftime('%H', timestamp) AS INTEGER) AS hour, COUNT(*) AS total
            FROM votes
            WHERE voting_round_id = ? AND strftime('%H', timestamp) IS NOT NULL
            GROUP BY hour
            ORDER BY hour
            "#,
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let hour = row.try_get::<i64, _>("hour")?;
            let total = row.try_get::<i64, _>("total")?;
            let hour = u32::try_from(hour).map_err(|e| format!("Invalid hour {}: {}", hour, e))?;
            counts.insert(hour, to_count(total));
        }

        Ok(counts)
    }

    async fn round_exists(&self, round_id: i64) -> Result<bool, BoxError> {
        let exists = sqlx::query("SELECT 1 FROM voting_rounds WHERE id = ?")
            .bind(round_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    async fn seeded() -> (Database, i64, i64, i64) {
        let db = Database::in_memory().await.unwrap();
        let round = db.create_voting_round("Week 1").await.unwrap();
        let alice = db.create_participant("Alice", "alice.png").await.unwrap();
        let bob = db.create_participant("Bob", "bob.png").await.unwrap();
        db.attach_participant(round.id, bob.id).await.unwrap();
        db.attach_participant(round.id, alice.id).await.unwrap();
        (db, round.id, alice.id, bob.id)
    }

    #[tokio::test]
    async fn lists_participants_in_attachment_order() {
        let (db, round_id, alice_id, bob_id) = seeded().await;
        db.attach_participant(round_id, bob_id).await.unwrap();

        let ids: Vec<i64> = db
            .list_participants(round_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids, vec![bob_id, alice_id]);
    }

    #[tokio::test]
    async fn counts_repeated_votes() {
        let (db, round_id, alice_id, _) = seeded().await;
        for _ in 0..3 {
            db.save_vote(&Vote::new(alice_id, round_id)).await.unwrap();
        }

        assert_eq!(db.count_votes(round_id).await.unwrap(), 3);
        let by_participant = db.count_votes_by_participant(round_id).await.unwrap();
        assert_eq!(by_participant.len(), 1);
        assert_eq!(by_participant[&alice_id], 3);
    }

    #[tokio::test]
    async fn groups_votes_by_utc_hour() {
        let (db, round_id, alice_id, bob_id) = seeded().await;
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 10, h, 15, 0).unwrap();
        db.save_vote(&Vote::at(alice_id, round_id, at(9))).await.unwrap();
        db.save_vote(&Vote::at(bob_id, round_id, at(9))).await.unwrap();
        db.save_vote(&Vote::at(bob_id, round_id, at(23))).await.unwrap();

        let by_hour = db.count_votes_by_hour(round_id).await.unwrap();
        assert_eq!(by_hour.len(), 2);
        assert_eq!(by_hour[&9], 2);
        assert_eq!(by_hour[&23], 1);
    }

    #[tokio::test]
    async fn rejects_votes_for_unknown_round() {
        let (db, round_id, alice_id, _) = seeded().await;

        assert!(db.save_vote(&Vote::new(alice_id, round_id + 100)).await.is_err());
        assert!(db.save_vote(&Vote::new(alice_id + 100, round_id)).await.is_err());
        assert_eq!(db.count_votes(round_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn undecodable_participant_row_is_an_error() {
        let db = Database::in_memory().await.unwrap();
        let round = db.create_voting_round("Week 1").await.unwrap();

        // Loosen the schema so a NULL photo can reach the decoder
        sqlx::query("DROP TABLE participants").execute(&db.pool).await.unwrap();
        sqlx::query(
            r#"
            CREATE TABLE participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                photo_url TEXT
            );
            "#,
        )
        .execute(&db.pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO participants (id, name, photo_url) VALUES (1, 'Ghost', NULL)")
            .execute(&db.pool)
            .await
            .unwrap();
        db.attach_participant(round.id, 1).await.unwrap();

        assert!(db.list_participants(round.id).await.is_err());
    }

    #[tokio::test]
    async fn reports_round_existence() {
        let (db, round_id, _, _) = seeded().await;

        assert!(db.round_exists(round_id).await.unwrap());
        assert!(!db.round_exists(round_id + 1).await.unwrap());
    }
}
