// Session snapshot persistence: the JSON shape written to the storage
// collaborator and its conversion to and from `RaffleState`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Database;
use crate::raffle::model::RaffleModel;
use crate::raffle::participant::Participant;
use crate::raffle::rounds::{Round, RoundSchedule};
use crate::raffle::state::{RaffleError, RaffleState, WinnerRecord};

/// Key under which the session snapshot is stored.
const SESSION_KEY: &str = "session";

/// The persisted session snapshot.
///
/// `remaining_teams` is denormalized for display consumers; on restore the
/// authoritative pool is re-derived from participant statuses. `is_drawing`
/// is a presentation flag (draw animation in flight) and is always false in
/// engine-produced snapshots: every engine operation runs to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub teams: Vec<Participant>,
    pub current_round: usize,
    pub rounds: Vec<Round>,
    pub winners: Vec<WinnerRecord>,
    pub remaining_teams: Vec<String>,
    pub is_drawing: bool,
    pub raffle_started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_winner: Option<String>,
    pub withdrawn_players: Vec<String>,
}

impl SessionSnapshot {
    /// Capture the current engine state.
    pub fn capture(state: &RaffleState) -> Self {
        SessionSnapshot {
            teams: state.teams.clone(),
            current_round: state.current_round_index,
            rounds: state.rounds.rounds().to_vec(),
            winners: state.winners.clone(),
            remaining_teams: state
                .remaining_teams()
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            is_drawing: false,
            raffle_started: state.raffle_started,
            pending_winner: state.pending_winner.clone(),
            withdrawn_players: state.withdrawn_players.clone(),
        }
    }

    /// Rebuild an engine state from this snapshot. The drawing model is not
    /// part of the persisted shape; it comes from configuration.
    pub fn restore(self, model: RaffleModel) -> Result<RaffleState, RaffleError> {
        let rounds = RoundSchedule::new(self.rounds)?;
        Ok(RaffleState {
            teams: self.teams,
            rounds,
            current_round_index: self.current_round,
            winners: self.winners,
            pending_winner: self.pending_winner,
            withdrawn_players: self.withdrawn_players,
            raffle_started: self.raffle_started,
            model,
        })
    }
}

/// Persist the session snapshot for crash recovery.
pub fn save_session(db: &Database, state: &RaffleState) -> Result<()> {
    let snapshot = SessionSnapshot::capture(state);
    let value = serde_json::to_value(&snapshot).context("failed to encode session snapshot")?;
    db.save_state(SESSION_KEY, &value)
}

/// Restore a previously saved session, if one exists.
pub fn load_session(db: &Database, model: RaffleModel) -> Result<Option<RaffleState>> {
    let Some(value) = db.load_state(SESSION_KEY)? else {
        return Ok(None);
    };
    let snapshot: SessionSnapshot =
        serde_json::from_value(value).context("failed to decode session snapshot")?;
    let state = snapshot
        .restore(model)
        .context("failed to rebuild session from snapshot")?;
    info!(
        "restored session: round {}, {} winners, {} withdrawn",
        state.current_round_index + 1,
        state.winners.len(),
        state.withdrawn_players.len()
    );
    Ok(Some(state))
}
