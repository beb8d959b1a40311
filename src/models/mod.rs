use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub name: String,
    pub photo_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingRound {
    pub id: i64,
    pub description: String,
}

// A vote is an append-only fact; the same participant may be voted for many times
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub participant_id: i64,
    pub voting_round_id: i64,
    pub timestamp: DateTime<Utc>,
}

impl Vote {
    pub fn new(participant_id: i64, voting_round_id: i64) -> Self {
        Self {
            participant_id,
            voting_round_id,
            timestamp: Utc::now(),
        }
    }

    pub fn at(participant_id: i64, voting_round_id: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            participant_id,
            voting_round_id,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStat {
    pub voting_round_id: i64,
    pub total_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantTotal {
    pub participant_id: i64,
    pub name: String,
    pub total_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyTotal {
    pub hour: u32,
    pub total_votes: u64,
}
