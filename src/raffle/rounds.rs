// Round configuration and schedule resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One discrete drawing event, gated by a minimum point threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// Configured round id. 1-based and contiguous by convention, but the
    /// engine never assumes so: schedules with ids 10/20/30 are valid.
    pub id: u32,
    /// Display name of the round.
    pub name: String,
    /// Minimum points a participant needs to qualify for this round's draw.
    pub point_threshold: u32,
    /// Prize description shown alongside the winner.
    pub description: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("round schedule is empty")]
    Empty,

    #[error("duplicate round id {0}")]
    DuplicateId(u32),

    #[error("round {id} has an empty name")]
    EmptyName { id: u32 },
}

/// A validated, ordered sequence of rounds.
///
/// Round ids and array positions are distinct keys that only coincide when
/// ids happen to be a contiguous 1..N sequence. The schedule's canonical key
/// is the array position; `position_of` is the one place an id is resolved
/// to a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSchedule {
    rounds: Vec<Round>,
}

impl RoundSchedule {
    /// Validate and build a schedule. Rejects an empty round list,
    /// duplicate ids, and empty round names.
    pub fn new(rounds: Vec<Round>) -> Result<Self, ScheduleError> {
        if rounds.is_empty() {
            return Err(ScheduleError::Empty);
        }
        for (i, round) in rounds.iter().enumerate() {
            if round.name.trim().is_empty() {
                return Err(ScheduleError::EmptyName { id: round.id });
            }
            if rounds[..i].iter().any(|r| r.id == round.id) {
                return Err(ScheduleError::DuplicateId(round.id));
            }
        }
        Ok(RoundSchedule { rounds })
    }

    /// Number of rounds in the schedule.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Always false: `new` rejects empty schedules.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// The round at an array position.
    pub fn get(&self, position: usize) -> Option<&Round> {
        self.rounds.get(position)
    }

    /// Resolve a configured round id to its array position.
    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.rounds.iter().position(|r| r.id == id)
    }

    /// All rounds in order.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(id: u32, name: &str, threshold: u32) -> Round {
        Round {
            id,
            name: name.to_string(),
            point_threshold: threshold,
            description: format!("{name} prize"),
        }
    }

    #[test]
    fn builds_valid_schedule() {
        let schedule = RoundSchedule::new(vec![
            round(1, "Round 1", 0),
            round(2, "Round 2", 250),
            round(3, "Round 3", 500),
        ])
        .unwrap();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.get(1).unwrap().point_threshold, 250);
    }

    #[test]
    fn rejects_empty_schedule() {
        assert_eq!(RoundSchedule::new(vec![]).unwrap_err(), ScheduleError::Empty);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = RoundSchedule::new(vec![round(1, "A", 0), round(1, "B", 100)]).unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateId(1));
    }

    #[test]
    fn rejects_empty_round_name() {
        let err = RoundSchedule::new(vec![round(1, "  ", 0)]).unwrap_err();
        assert_eq!(err, ScheduleError::EmptyName { id: 1 });
    }

    #[test]
    fn position_of_contiguous_ids() {
        let schedule = RoundSchedule::new(vec![
            round(1, "A", 0),
            round(2, "B", 100),
            round(3, "C", 200),
        ])
        .unwrap();
        assert_eq!(schedule.position_of(1), Some(0));
        assert_eq!(schedule.position_of(3), Some(2));
        assert_eq!(schedule.position_of(4), None);
    }

    #[test]
    fn position_of_non_contiguous_ids() {
        // Ids and positions diverge here: indexing an array by id would
        // be out of bounds or hit the wrong round.
        let schedule = RoundSchedule::new(vec![
            round(10, "A", 0),
            round(20, "B", 100),
            round(30, "C", 200),
        ])
        .unwrap();
        assert_eq!(schedule.position_of(10), Some(0));
        assert_eq!(schedule.position_of(20), Some(1));
        assert_eq!(schedule.position_of(30), Some(2));
        assert_eq!(schedule.position_of(1), None);
        assert_eq!(schedule.get(1).unwrap().id, 20);
    }

    #[test]
    fn thresholds_need_not_be_monotonic() {
        // Non-decreasing thresholds are a convention, not a rule.
        let schedule =
            RoundSchedule::new(vec![round(1, "A", 500), round(2, "B", 0)]).unwrap();
        assert_eq!(schedule.len(), 2);
    }
}
