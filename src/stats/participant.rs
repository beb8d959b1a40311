use std::collections::HashMap;

use crate::db::VoteStore;
use crate::error::StatsError;
use crate::models::{Participant, ParticipantTotal};

pub async fn compute(
    store: &dyn VoteStore,
    round_id: i64,
) -> Result<Vec<ParticipantTotal>, StatsError> {
    let participants = store
        .list_participants(round_id)
        .await
        .map_err(StatsError::store)?;
    let counts = store
        .count_votes_by_participant(round_id)
        .await
        .map_err(StatsError::store)?;

    Ok(tally(&participants, &counts))
}

/// One entry per attached participant, in attachment order.
///
/// Participants without votes get a total of zero. Votes for participants
/// that are not attached to the round are left out.
pub fn tally(participants: &[Participant], counts: &HashMap<i64, u64>) -> Vec<ParticipantTotal> {
    participants
        .iter()
        .map(|participant| ParticipantTotal {
            participant_id: participant.id,
            name: participant.name.clone(),
            total_votes: counts.get(&participant.id).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: i64, name: &str) -> Participant {
        Participant {
            id,
            name: name.to_string(),
            photo_url: String::new(),
        }
    }

    #[test]
    fn zero_fills_participants_without_votes() {
        let participants = vec![participant(1, "A"), participant(2, "B")];
        let counts = HashMap::from([(1, 3)]);

        let totals = tally(&participants, &counts);

        assert_eq!(
            totals,
            vec![
                ParticipantTotal {
                    participant_id: 1,
                    name: "A".to_string(),
                    total_votes: 3,
                },
                ParticipantTotal {
                    participant_id: 2,
                    name: "B".to_string(),
                    total_votes: 0,
                },
            ]
        );
    }

    #[test]
    fn keeps_attachment_order_instead_of_sorting() {
        let participants = vec![participant(7, "Low"), participant(3, "High")];
        let counts = HashMap::from([(7, 1), (3, 10)]);

        let ids: Vec<i64> = tally(&participants, &counts)
            .into_iter()
            .map(|t| t.participant_id)
            .collect();

        assert_eq!(ids, vec![7, 3]);
    }

    #[test]
    fn ignores_votes_for_detached_participants() {
        let participants = vec![participant(1, "A")];
        let counts = HashMap::from([(1, 2), (99, 5)]);

        let totals = tally(&participants, &counts);

        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total_votes, 2);
    }

    #[test]
    fn empty_round_yields_empty_list() {
        assert!(tally(&[], &HashMap::from([(1, 4)])).is_empty());
    }
}
