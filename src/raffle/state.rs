// Raffle state machine: round progression and the confirm/reject workflow.
//
// `RaffleState` is the single mutable aggregate for an interactive session.
// It is mutated only through the named operations below; every rejected
// operation returns an error and leaves the state untouched. Completion is
// a lazy predicate, never a stored flag, so the answer stays consistent
// after any mutation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::draw::{self, DrawError};
use super::model::RaffleModel;
use super::participant::{Participant, ParticipantStatus};
use super::rounds::{Round, RoundSchedule, ScheduleError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RaffleError {
    #[error("no participants are loaded")]
    NoParticipants,

    #[error("the raffle has not been started")]
    NotStarted,

    #[error("the raffle has already been started")]
    AlreadyStarted,

    #[error("the raffle is complete")]
    RaffleComplete,

    #[error("a pending winner is already awaiting confirmation")]
    PendingWinnerExists,

    #[error("no pending winner to resolve")]
    NoPendingWinner,

    #[error("unknown participant `{0}`")]
    UnknownParticipant(String),

    #[error("participant `{0}` is not eligible for the current round")]
    NotEligible(String),

    #[error(transparent)]
    Draw(#[from] DrawError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// A confirmed winner, recorded in draw order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    /// Name of the winning participant.
    pub team: String,
    /// 1-based display number of the round that was won (array position + 1,
    /// not the configured round id).
    pub round: u32,
    /// Name of the round at the time of the win.
    pub round_name: String,
    /// Prize description from the round configuration.
    pub prize: String,
}

/// The complete state of an interactive raffle session.
#[derive(Debug, Clone)]
pub struct RaffleState {
    /// Full roster, insertion order preserved. Winners and withdrawn
    /// participants stay in this list for display and audit.
    pub teams: Vec<Participant>,
    /// The active round configuration.
    pub rounds: RoundSchedule,
    /// Array position of the round currently open for drawing.
    pub current_round_index: usize,
    /// Confirmed winners in draw order. Append-only until reset.
    pub winners: Vec<WinnerRecord>,
    /// Name of a drawn-but-unconfirmed participant, at most one at a time.
    pub pending_winner: Option<String>,
    /// Participants rejected at least once, in rejection order.
    pub withdrawn_players: Vec<String>,
    /// Session lifecycle marker set by `start_raffle`.
    pub raffle_started: bool,
    /// Drawing strategy for this session (weighted vs. uniform).
    pub model: RaffleModel,
}

impl RaffleState {
    /// Create an empty session with a round schedule and drawing model.
    pub fn new(rounds: RoundSchedule, model: RaffleModel) -> Self {
        RaffleState {
            teams: Vec::new(),
            rounds,
            current_round_index: 0,
            winners: Vec::new(),
            pending_winner: None,
            withdrawn_players: Vec::new(),
            raffle_started: false,
            model,
        }
    }

    /// Load (or replace) the participant roster.
    ///
    /// Valid only before `start_raffle` or after `reset_raffle`. Recomputes
    /// every ticket count, resets every status to eligible, and clears any
    /// progress left over from a previous roster.
    pub fn load_participants(&mut self, mut list: Vec<Participant>) -> Result<(), RaffleError> {
        if self.raffle_started {
            return Err(RaffleError::AlreadyStarted);
        }
        for p in &mut list {
            p.status = ParticipantStatus::Eligible;
            p.dropped_in_round = None;
            p.recompute_tickets();
        }
        info!("loaded {} participants", list.len());
        self.teams = list;
        self.winners.clear();
        self.withdrawn_players.clear();
        self.pending_winner = None;
        self.current_round_index = 0;
        Ok(())
    }

    /// Mark the session started and open the first round. Does not draw.
    pub fn start_raffle(&mut self) -> Result<(), RaffleError> {
        if self.raffle_started {
            return Err(RaffleError::AlreadyStarted);
        }
        if self.teams.is_empty() {
            return Err(RaffleError::NoParticipants);
        }
        self.raffle_started = true;
        self.current_round_index = 0;
        info!("raffle started with {} participants", self.teams.len());
        Ok(())
    }

    /// The round currently open for drawing, if any remain.
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.get(self.current_round_index)
    }

    /// Participants eligible for the current round's draw, per the active
    /// model's policy. Empty when the round cannot proceed.
    pub fn eligible_for_current_round(&self) -> Vec<&Participant> {
        match self.current_round() {
            Some(round) => draw::eligible_for_round(
                &self.teams,
                round,
                self.model.policy().requires_tickets(),
            ),
            None => Vec::new(),
        }
    }

    /// Whether a draw can be attempted right now.
    pub fn can_start_round(&self) -> bool {
        self.raffle_started && self.pending_winner.is_none() && !self.is_complete()
    }

    /// Whether the raffle has finished: all rounds consumed, or nobody is
    /// eligible for the round that is open. Evaluated lazily on demand.
    pub fn is_complete(&self) -> bool {
        self.current_round_index >= self.rounds.len()
            || self.eligible_for_current_round().is_empty()
    }

    /// Draw a pending winner for the current round using the active model's
    /// selector. The draw is attempted only when the raffle is started, no
    /// pending winner exists, and the round can proceed.
    pub fn draw_winner<R: Rng>(&mut self, rng: &mut R) -> Result<Participant, RaffleError> {
        self.check_can_draw()?;

        let round = self
            .current_round()
            .ok_or(RaffleError::RaffleComplete)?;
        let policy = self.model.policy();
        let eligible = draw::eligible_for_round(&self.teams, round, policy.requires_tickets());
        if eligible.is_empty() {
            return Err(RaffleError::RaffleComplete);
        }
        let winner = if policy.weighted_system {
            draw::draw_weighted(&eligible, rng)?
        } else {
            draw::draw_uniform(&eligible, rng)?
        };
        let name = winner.name.clone();

        self.mark_pending(&name);
        info!(
            "drew pending winner `{}` for round {}",
            name,
            self.current_round_index + 1
        );
        self.participant(&name)
            .cloned()
            .ok_or_else(|| RaffleError::UnknownParticipant(name))
    }

    /// Explicitly select a pending winner by name (e.g. from a manual
    /// override in the UI). Rejects unknown names and participants that are
    /// not eligible for the current round; state is unchanged on error.
    pub fn select_winner(&mut self, name: &str) -> Result<(), RaffleError> {
        self.check_can_draw()?;

        if self.participant(name).is_none() {
            return Err(RaffleError::UnknownParticipant(name.to_string()));
        }
        let eligible = self.eligible_for_current_round();
        if !eligible.iter().any(|p| p.name == name) {
            return Err(RaffleError::NotEligible(name.to_string()));
        }

        self.mark_pending(name);
        info!(
            "selected pending winner `{}` for round {}",
            name,
            self.current_round_index + 1
        );
        Ok(())
    }

    /// Confirm the pending winner: terminal winner status, an appended
    /// `WinnerRecord`, and the next round opens.
    pub fn confirm_winner(&mut self) -> Result<WinnerRecord, RaffleError> {
        let name = self
            .pending_winner
            .clone()
            .ok_or(RaffleError::NoPendingWinner)?;
        let round = self
            .current_round()
            .ok_or(RaffleError::RaffleComplete)?;
        let record = WinnerRecord {
            team: name.clone(),
            round: (self.current_round_index + 1) as u32,
            round_name: round.name.clone(),
            prize: round.description.clone(),
        };

        if let Some(p) = self.participant_mut(&name) {
            p.status = ParticipantStatus::Winner;
        }
        self.winners.push(record.clone());
        self.pending_winner = None;
        self.current_round_index += 1;
        info!("confirmed `{}` as winner of {}", record.team, record.round_name);
        Ok(record)
    }

    /// Reject the pending winner: they are withdrawn from all future draws
    /// and the same round stays open for another draw. The round index
    /// never advances here.
    pub fn reject_winner(&mut self) -> Result<(), RaffleError> {
        let name = self
            .pending_winner
            .clone()
            .ok_or(RaffleError::NoPendingWinner)?;

        if let Some(p) = self.participant_mut(&name) {
            p.status = ParticipantStatus::Withdrawn;
        }
        if !self.withdrawn_players.contains(&name) {
            self.withdrawn_players.push(name.clone());
        }
        self.pending_winner = None;
        info!(
            "rejected `{}`; round {} stays open",
            name,
            self.current_round_index + 1
        );
        Ok(())
    }

    /// Reset all session progress. The roster is retained; every
    /// participant returns to eligible with tickets recomputed.
    pub fn reset_raffle(&mut self) {
        for p in &mut self.teams {
            p.status = ParticipantStatus::Eligible;
            p.dropped_in_round = None;
            p.recompute_tickets();
        }
        self.winners.clear();
        self.withdrawn_players.clear();
        self.pending_winner = None;
        self.current_round_index = 0;
        self.raffle_started = false;
        info!("raffle reset; roster of {} retained", self.teams.len());
    }

    /// Replace the round configuration wholesale. Progress is not reset;
    /// callers wanting a restart call `reset_raffle` as well.
    pub fn update_rounds(&mut self, rounds: Vec<Round>) -> Result<(), RaffleError> {
        let schedule = RoundSchedule::new(rounds)?;
        if self.current_round_index > 0 && self.current_round_index >= schedule.len() {
            warn!(
                "round schedule replaced with {} rounds while round {} was open",
                schedule.len(),
                self.current_round_index + 1
            );
        }
        self.rounds = schedule;
        Ok(())
    }

    /// Participants still visible in the pool: everyone not withdrawn or
    /// removed. Confirmed winners remain here so totals and displays can
    /// still show them; their status keeps them out of eligibility.
    pub fn remaining_teams(&self) -> Vec<&Participant> {
        self.teams.iter().filter(|p| p.status.is_active()).collect()
    }

    /// Look up a participant by name.
    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.teams.iter().find(|p| p.name == name)
    }

    fn participant_mut(&mut self, name: &str) -> Option<&mut Participant> {
        self.teams.iter_mut().find(|p| p.name == name)
    }

    fn check_can_draw(&self) -> Result<(), RaffleError> {
        if !self.raffle_started {
            return Err(RaffleError::NotStarted);
        }
        if self.pending_winner.is_some() {
            return Err(RaffleError::PendingWinnerExists);
        }
        if self.current_round_index >= self.rounds.len() {
            return Err(RaffleError::RaffleComplete);
        }
        Ok(())
    }

    fn mark_pending(&mut self, name: &str) {
        if let Some(p) = self.participant_mut(name) {
            p.status = ParticipantStatus::PendingWinner;
        }
        self.pending_winner = Some(name.to_string());
    }
}
