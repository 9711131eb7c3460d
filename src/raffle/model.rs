// Raffle model registry and the batch round runner.
//
// Models are a closed set of named strategies, each a tuple of policies
// consumed by the eligibility filter and the selectors. The batch runner
// executes whole rounds without the interactive confirm/reject gate and
// leaves an auditable record per round.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::draw;
use super::participant::{Participant, ParticipantStatus};
use super::rounds::RoundSchedule;
use super::state::RaffleError;

/// The policies a model applies to each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPolicy {
    /// Ticket-weighted draw when set; uniform draw over the eligible set
    /// when not.
    pub weighted_system: bool,
    /// Whether a round winner is excluded from subsequent eligibility.
    pub remove_winners: bool,
    /// Whether each round ends with a random drop-off that removes a
    /// computed number of active participants.
    pub drop_off_after_round: bool,
}

impl ModelPolicy {
    /// Whether the eligibility filter should require at least one ticket.
    /// Uniform draws ignore tickets wholesale, so only weighted models
    /// filter on them.
    pub fn requires_tickets(&self) -> bool {
        self.weighted_system
    }
}

/// Named drawing strategies.
///
/// The elimination variants keep winners in the pool (`remove_winners` is
/// false): under those models the drop-off is the exit mechanism, and a
/// prize does not retire its winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RaffleModel {
    /// Ticket-weighted draw, winners retired. The default.
    Weighted,
    /// Equal-chance draw, winners retired.
    Uniform,
    /// Ticket-weighted draw with a per-round random drop-off.
    WeightedElimination,
    /// Equal-chance draw with a per-round random drop-off.
    UniformElimination,
}

impl RaffleModel {
    /// Parse a model name from configuration.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "weighted" => Some(RaffleModel::Weighted),
            "uniform" => Some(RaffleModel::Uniform),
            "weighted-elimination" => Some(RaffleModel::WeightedElimination),
            "uniform-elimination" => Some(RaffleModel::UniformElimination),
            _ => None,
        }
    }

    /// The configuration name of this model.
    pub fn name(&self) -> &'static str {
        match self {
            RaffleModel::Weighted => "weighted",
            RaffleModel::Uniform => "uniform",
            RaffleModel::WeightedElimination => "weighted-elimination",
            RaffleModel::UniformElimination => "uniform-elimination",
        }
    }

    /// All registered models.
    pub fn all() -> [RaffleModel; 4] {
        [
            RaffleModel::Weighted,
            RaffleModel::Uniform,
            RaffleModel::WeightedElimination,
            RaffleModel::UniformElimination,
        ]
    }

    /// The policy tuple this model applies.
    pub fn policy(&self) -> ModelPolicy {
        match self {
            RaffleModel::Weighted => ModelPolicy {
                weighted_system: true,
                remove_winners: true,
                drop_off_after_round: false,
            },
            RaffleModel::Uniform => ModelPolicy {
                weighted_system: false,
                remove_winners: true,
                drop_off_after_round: false,
            },
            RaffleModel::WeightedElimination => ModelPolicy {
                weighted_system: true,
                remove_winners: false,
                drop_off_after_round: true,
            },
            RaffleModel::UniformElimination => ModelPolicy {
                weighted_system: false,
                remove_winners: false,
                drop_off_after_round: true,
            },
        }
    }
}

impl Default for RaffleModel {
    fn default() -> Self {
        RaffleModel::Weighted
    }
}

/// Audit record for one batch round execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based round number (array position + 1).
    pub round_number: u32,
    /// Name of the model the round ran under.
    pub model: String,
    /// Active participants before the round ran.
    pub participants_before: Vec<String>,
    /// Active participants after winner handling and drop-off.
    pub participants_after: Vec<String>,
    /// The drawn winner, if anyone was eligible.
    pub winner: Option<String>,
    /// Participants removed by the drop-off step, in selection order.
    pub eliminated: Vec<String>,
    /// When the round was executed.
    pub timestamp: DateTime<Utc>,
}

/// Batch raffle execution: runs whole rounds under a model's policies,
/// with no human gate between draw and commit. Shares the ticket math,
/// eligibility filter, and selectors with the interactive state machine.
#[derive(Debug, Clone)]
pub struct BatchRaffle {
    participants: Vec<Participant>,
    rounds: RoundSchedule,
    model: RaffleModel,
    current_round: usize,
    records: Vec<RoundRecord>,
}

impl BatchRaffle {
    /// Create a batch raffle over a fresh roster.
    pub fn new(mut participants: Vec<Participant>, rounds: RoundSchedule, model: RaffleModel) -> Self {
        for p in &mut participants {
            p.status = ParticipantStatus::Eligible;
            p.dropped_in_round = None;
            p.recompute_tickets();
        }
        BatchRaffle {
            participants,
            rounds,
            model,
            current_round: 0,
            records: Vec::new(),
        }
    }

    /// Whether every round has been run.
    pub fn is_complete(&self) -> bool {
        self.current_round >= self.rounds.len()
    }

    /// Execute the next round: draw a winner per the model's policy, retire
    /// the winner when the policy says so, then apply the drop-off step.
    ///
    /// A round with no eligible participants records no winner and still
    /// runs its drop-off; it is not an error. Errors only when all rounds
    /// have already run.
    pub fn run_round<R: Rng>(&mut self, rng: &mut R) -> Result<RoundRecord, RaffleError> {
        let round = self
            .rounds
            .get(self.current_round)
            .ok_or(RaffleError::RaffleComplete)?
            .clone();
        let round_number = (self.current_round + 1) as u32;
        let policy = self.model.policy();

        let participants_before = self.active_names();

        let winner = {
            let eligible =
                draw::eligible_for_round(&self.participants, &round, policy.requires_tickets());
            let result = if policy.weighted_system {
                draw::draw_weighted(&eligible, rng)
            } else {
                draw::draw_uniform(&eligible, rng)
            };
            match result {
                Ok(p) => Some(p.name.clone()),
                Err(e) => {
                    warn!("round {round_number} produced no winner: {e}");
                    None
                }
            }
        };

        if let (Some(name), true) = (&winner, policy.remove_winners) {
            if let Some(p) = self.participants.iter_mut().find(|p| &p.name == name) {
                p.status = ParticipantStatus::Winner;
            }
        }

        let eliminated = if policy.drop_off_after_round {
            self.drop_off(round_number, rng)
        } else {
            Vec::new()
        };

        let record = RoundRecord {
            round_number,
            model: self.model.name().to_string(),
            participants_before,
            participants_after: self.active_names(),
            winner,
            eliminated,
            timestamp: Utc::now(),
        };
        info!(
            "round {} complete: winner={:?}, eliminated={}",
            round_number,
            record.winner,
            record.eliminated.len()
        );

        self.current_round += 1;
        self.records.push(record.clone());
        Ok(record)
    }

    /// Remove `roster_size / round_count` participants at random from the
    /// drawable pool, capped at the number remaining. Eliminated
    /// participants are tagged with the round that dropped them.
    fn drop_off<R: Rng>(&mut self, round_number: u32, rng: &mut R) -> Vec<String> {
        let quota = self.participants.len() / self.rounds.len();
        let drawable: Vec<usize> = self
            .participants
            .iter()
            .enumerate()
            .filter(|(_, p)| p.status.is_drawable())
            .map(|(i, _)| i)
            .collect();
        let count = quota.min(drawable.len());

        let chosen: Vec<usize> = drawable.choose_multiple(rng, count).copied().collect();
        let mut eliminated = Vec::with_capacity(chosen.len());
        for idx in chosen {
            let p = &mut self.participants[idx];
            p.status = ParticipantStatus::Removed;
            p.dropped_in_round = Some(round_number);
            eliminated.push(p.name.clone());
        }
        eliminated
    }

    fn active_names(&self) -> Vec<String> {
        self.participants
            .iter()
            .filter(|p| p.status.is_active())
            .map(|p| p.name.clone())
            .collect()
    }

    /// The roster, including retired and removed participants.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// The audit trail so far.
    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// The model this batch runs under.
    pub fn model(&self) -> RaffleModel {
        self.model
    }
}
