// Participant records, status lifecycle, and ticket math.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points required to earn a single raffle ticket.
pub const POINTS_PER_TICKET: u32 = 100;

/// Convert a point total into a ticket count.
///
/// Integer division: partial hundreds never round up, so a participant with
/// fewer than 100 points holds zero tickets and cannot win a weighted draw.
pub fn tickets_for_points(points: u32) -> u32 {
    points / POINTS_PER_TICKET
}

/// Where a participant stands within the current raffle session.
///
/// A participant holds exactly one status at a time. `Winner` is terminal for
/// that participant; `Withdrawn` and `Removed` exclude them from all future
/// draws while keeping them visible for display and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantStatus {
    /// In the pool and drawable for rounds whose threshold they meet.
    Eligible,
    /// Drawn and awaiting a confirm/reject decision.
    PendingWinner,
    /// Confirmed as a round winner.
    Winner,
    /// Rejected after a draw; out of all future draws this session.
    Withdrawn,
    /// Dropped by an elimination model's round drop-off.
    Removed,
}

impl ParticipantStatus {
    /// Parse a status string from ingestion data.
    ///
    /// Accepts a few spellings seen in exported rosters ("pending",
    /// "pending_winner", "inactive"). Returns None for anything else.
    pub fn from_str_status(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eligible" | "active" => Some(ParticipantStatus::Eligible),
            "pending" | "pendingwinner" | "pending_winner" => Some(ParticipantStatus::PendingWinner),
            "winner" => Some(ParticipantStatus::Winner),
            "withdrawn" => Some(ParticipantStatus::Withdrawn),
            "removed" | "inactive" | "eliminated" => Some(ParticipantStatus::Removed),
            _ => None,
        }
    }

    /// Display string for this status.
    pub fn display_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Eligible => "eligible",
            ParticipantStatus::PendingWinner => "pending",
            ParticipantStatus::Winner => "winner",
            ParticipantStatus::Withdrawn => "withdrawn",
            ParticipantStatus::Removed => "removed",
        }
    }

    /// Whether a participant with this status can be drawn.
    pub fn is_drawable(&self) -> bool {
        matches!(self, ParticipantStatus::Eligible)
    }

    /// Whether a participant with this status is still part of the active
    /// pool for display purposes. Winners stay visible; withdrawn and
    /// removed participants do not.
    pub fn is_active(&self) -> bool {
        !matches!(self, ParticipantStatus::Withdrawn | ParticipantStatus::Removed)
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A single raffle participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable unique identifier (team name from the ingested roster).
    pub name: String,
    /// Point total from the ingested roster. Immutable once loaded.
    pub points: u32,
    /// Number of submissions behind the point total.
    pub submissions: u32,
    /// Date of the most recent submission, if the roster provided one.
    #[serde(default)]
    pub last_submission: Option<NaiveDate>,
    /// Current session status.
    pub status: ParticipantStatus,
    /// Derived ticket count, recomputed from `points` on load and reset.
    pub tickets: u32,
    /// The 1-based round in which an elimination model dropped this
    /// participant. None while still in the pool or for non-elimination
    /// models.
    #[serde(default)]
    pub dropped_in_round: Option<u32>,
}

impl Participant {
    /// Create a fresh eligible participant with tickets derived from points.
    pub fn new(name: &str, points: u32, submissions: u32) -> Self {
        Participant {
            name: name.to_string(),
            points,
            submissions,
            last_submission: None,
            status: ParticipantStatus::Eligible,
            tickets: tickets_for_points(points),
            dropped_in_round: None,
        }
    }

    /// Recompute the derived ticket count from the point total.
    pub fn recompute_tickets(&mut self) {
        self.tickets = tickets_for_points(self.points);
    }
}
