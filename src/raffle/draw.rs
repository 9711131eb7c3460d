// Eligibility filtering and winner selection.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use super::participant::Participant;
use super::rounds::Round;

/// Number of independent shuffle passes applied to the weighted pool before
/// the final draw. Each pass is a uniform Fisher-Yates permutation, so the
/// selection distribution is unchanged; the passes exist to break up any
/// patterning in a weak upstream randomness source (defense in depth, not a
/// fairness requirement).
pub const DECORRELATION_PASSES: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    /// No participants qualify for the draw.
    #[error("no participants are eligible for this draw")]
    EmptyPool,

    /// Participants qualify but hold zero tickets in total, so no winner is
    /// possible under a ticket-weighted draw.
    #[error("eligible participants hold zero tickets in total")]
    NoTickets,
}

/// Filter participants down to those eligible for a round's draw.
///
/// A participant qualifies iff their status is drawable, their points meet
/// the round's threshold, and (when `require_tickets` is set, i.e. under a
/// ticket-weighted model) they hold at least one ticket. Uniform-draw models
/// ignore tickets wholesale, so they pass `require_tickets = false`.
///
/// An empty result means the round cannot proceed; it is never an error.
pub fn eligible_for_round<'a>(
    participants: &'a [Participant],
    round: &Round,
    require_tickets: bool,
) -> Vec<&'a Participant> {
    participants
        .iter()
        .filter(|p| {
            p.status.is_drawable()
                && p.points >= round.point_threshold
                && (!require_tickets || p.tickets > 0)
        })
        .collect()
}

/// Draw one winner with probability proportional to ticket count.
///
/// Builds a weighted pool containing each participant's index repeated once
/// per ticket, permutes it `DECORRELATION_PASSES` times, then takes a single
/// uniform index draw over the pool.
pub fn draw_weighted<'a, R: Rng>(
    eligible: &[&'a Participant],
    rng: &mut R,
) -> Result<&'a Participant, DrawError> {
    if eligible.is_empty() {
        return Err(DrawError::EmptyPool);
    }
    let total: u64 = eligible.iter().map(|p| u64::from(p.tickets)).sum();
    if total == 0 {
        return Err(DrawError::NoTickets);
    }

    let mut pool: Vec<usize> = Vec::with_capacity(total as usize);
    for (idx, participant) in eligible.iter().enumerate() {
        pool.extend(std::iter::repeat(idx).take(participant.tickets as usize));
    }

    for _ in 0..DECORRELATION_PASSES {
        pool.shuffle(rng);
    }

    let slot = rng.random_range(0..pool.len());
    Ok(eligible[pool[slot]])
}

/// Draw one winner with equal probability per eligible participant,
/// ignoring ticket counts.
pub fn draw_uniform<'a, R: Rng>(
    eligible: &[&'a Participant],
    rng: &mut R,
) -> Result<&'a Participant, DrawError> {
    if eligible.is_empty() {
        return Err(DrawError::EmptyPool);
    }
    let slot = rng.random_range(0..eligible.len());
    Ok(eligible[slot])
}
