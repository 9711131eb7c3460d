// Win-odds computation, kept mathematically consistent with the selector.
//
// Both this module and `draw` consume the output of `eligible_for_round`, so
// the denominator here is always the same ticket total the weighted draw
// samples from.

use super::participant::Participant;

/// Sum of tickets over an eligible set.
pub fn total_tickets(eligible: &[&Participant]) -> u64 {
    eligible.iter().map(|p| u64::from(p.tickets)).sum()
}

/// A participant's win odds under the ticket-weighted draw, as a percentage
/// in [0, 100].
///
/// Returns 0.0 when the participant is not in the eligible set, holds zero
/// tickets, or the set's ticket total is zero.
pub fn win_odds(name: &str, eligible: &[&Participant]) -> f64 {
    let total = total_tickets(eligible);
    if total == 0 {
        return 0.0;
    }
    match eligible.iter().find(|p| p.name == name) {
        Some(p) => f64::from(p.tickets) / total as f64 * 100.0,
        None => 0.0,
    }
}

/// A participant's win odds under the uniform draw: an equal share for
/// every eligible participant.
pub fn uniform_odds(eligible: &[&Participant]) -> f64 {
    if eligible.is_empty() {
        return 0.0;
    }
    100.0 / eligible.len() as f64
}

/// The full odds distribution for an eligible set, in set order.
pub fn odds_table(eligible: &[&Participant]) -> Vec<(String, f64)> {
    eligible
        .iter()
        .map(|p| (p.name.clone(), win_odds(&p.name, eligible)))
        .collect()
}
