// Integration tests for the raffle assistant.
//
// These tests exercise the full system end-to-end using the library crate's
// public API. They verify that the major subsystems (CSV ingestion, the
// raffle state machine, odds computation, batch model execution, and session
// persistence) work together correctly.

use std::collections::HashMap;

use raffle_assistant::config;
use raffle_assistant::db::Database;
use raffle_assistant::ingest;
use raffle_assistant::raffle::draw;
use raffle_assistant::raffle::model::{BatchRaffle, RaffleModel};
use raffle_assistant::raffle::odds;
use raffle_assistant::raffle::participant::{Participant, ParticipantStatus};
use raffle_assistant::raffle::rounds::{Round, RoundSchedule};
use raffle_assistant::raffle::state::{RaffleError, RaffleState};
use raffle_assistant::session::{self, SessionSnapshot};

use rand::rngs::StdRng;
use rand::SeedableRng;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the package root, which is the cwd
/// for `cargo test`).
const FIXTURES: &str = "tests/fixtures";

/// Build the standard three-round schedule -- single source of truth for
/// round configuration.
fn standard_rounds() -> RoundSchedule {
    RoundSchedule::new(vec![
        Round {
            id: 1,
            name: "Round 1".into(),
            point_threshold: 0,
            description: "Open draw".into(),
        },
        Round {
            id: 2,
            name: "Round 2".into(),
            point_threshold: 250,
            description: "Mid-tier prize".into(),
        },
        Round {
            id: 3,
            name: "Round 3".into(),
            point_threshold: 500,
            description: "Grand prize".into(),
        },
    ])
    .unwrap()
}

/// Load the fixture roster from tests/fixtures/participants.csv.
fn fixture_roster() -> Vec<Participant> {
    ingest::load_participants(format!("{FIXTURES}/participants.csv"))
        .expect("fixture roster should load")
}

/// Build a started session over the fixture roster.
fn started_session() -> RaffleState {
    let mut state = RaffleState::new(standard_rounds(), RaffleModel::Weighted);
    state.load_participants(fixture_roster()).unwrap();
    state.start_raffle().unwrap();
    state
}

// ===========================================================================
// Ingestion
// ===========================================================================

#[test]
fn fixture_roster_loads_with_derived_tickets() {
    let roster = fixture_roster();
    assert_eq!(roster.len(), 7);

    let by_name: HashMap<&str, &Participant> =
        roster.iter().map(|p| (p.name.as_str(), p)).collect();
    assert_eq!(by_name["Alpha Squad"].tickets, 69);
    assert_eq!(by_name["Beta Crew"].tickets, 68);
    assert_eq!(by_name["Gamma Works"].tickets, 66);
    assert_eq!(by_name["Delta Forge"].tickets, 65);
    assert_eq!(by_name["Epsilon Labs"].tickets, 61);
    assert_eq!(by_name["Fresh Start"].tickets, 1);
    assert_eq!(by_name["Lurkers"].tickets, 0);
    assert!(by_name["Lurkers"].last_submission.is_none());
}

// ===========================================================================
// Full interactive session
// ===========================================================================

#[test]
fn full_session_draw_confirm_through_all_rounds() {
    let mut state = started_session();
    let mut rng = StdRng::seed_from_u64(1234);

    while !state.is_complete() {
        let winner = state.draw_winner(&mut rng).unwrap();
        // Every drawn winner must meet the open round's threshold and hold
        // at least one ticket under the weighted model.
        let round = state.current_round().unwrap();
        assert!(winner.points >= round.point_threshold);
        assert!(winner.tickets > 0);
        state.confirm_winner().unwrap();
    }

    assert_eq!(state.winners.len(), 3);
    let mut teams: Vec<&str> = state.winners.iter().map(|w| w.team.as_str()).collect();
    teams.sort_unstable();
    teams.dedup();
    assert_eq!(teams.len(), 3, "no duplicate winners in one session");
    assert!(!state.can_start_round());
}

#[test]
fn reject_reopens_round_and_withdraws() {
    let mut state = started_session();
    state.select_winner("Alpha Squad").unwrap();
    state.reject_winner().unwrap();

    assert_eq!(state.current_round_index, 0, "reject never advances the round");
    assert_eq!(state.withdrawn_players, vec!["Alpha Squad".to_string()]);

    let mut rng = StdRng::seed_from_u64(2);
    let winner = state.draw_winner(&mut rng).unwrap();
    assert_ne!(winner.name, "Alpha Squad");
}

#[test]
fn zero_ticket_teams_never_win_weighted_rounds() {
    // Run many complete sessions; Lurkers (42 points, 0 tickets) must never
    // appear in any winner list.
    for seed in 0..20 {
        let mut state = started_session();
        let mut rng = StdRng::seed_from_u64(seed);
        while !state.is_complete() {
            state.draw_winner(&mut rng).unwrap();
            state.confirm_winner().unwrap();
        }
        assert!(state.winners.iter().all(|w| w.team != "Lurkers"));
    }
}

#[test]
fn low_point_team_only_eligible_for_open_round() {
    // Fresh Start (100 points) qualifies only for the threshold-0 round.
    let state = started_session();
    let round1: Vec<&str> = state
        .eligible_for_current_round()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert!(round1.contains(&"Fresh Start"));

    for (position, round) in state.rounds.rounds().iter().enumerate().skip(1) {
        assert_eq!(state.rounds.position_of(round.id), Some(position));
        let eligible = draw::eligible_for_round(&state.teams, round, true);
        assert!(
            eligible.iter().all(|p| p.name != "Fresh Start"),
            "Fresh Start must not qualify at threshold {}",
            round.point_threshold
        );
    }
}

#[test]
fn reset_and_reload_reproduces_initial_state() {
    let mut state = started_session();
    let mut rng = StdRng::seed_from_u64(77);
    state.draw_winner(&mut rng).unwrap();
    state.confirm_winner().unwrap();

    state.reset_raffle();
    state.load_participants(fixture_roster()).unwrap();

    assert!(!state.raffle_started);
    assert_eq!(state.current_round_index, 0);
    assert!(state.winners.is_empty());
    assert!(state.withdrawn_players.is_empty());
    assert!(state.pending_winner.is_none());
    assert!(state
        .teams
        .iter()
        .all(|p| p.status == ParticipantStatus::Eligible));
}

// ===========================================================================
// Odds consistency with the selector
// ===========================================================================

#[test]
fn odds_sum_to_one_hundred_for_each_round() {
    let state = started_session();
    for round in state.rounds.rounds() {
        let eligible = draw::eligible_for_round(&state.teams, round, true);
        let total: f64 = odds::odds_table(&eligible).iter().map(|(_, pct)| pct).sum();
        assert!(
            (total - 100.0).abs() < 1e-9,
            "round {} odds summed to {total}",
            round.id
        );
    }
}

#[test]
fn empirical_win_rates_match_computed_odds() {
    // Draw the first round 2000 times with a fixed seed and compare each
    // team's empirical win rate against OddsCalculator's percentages.
    let state = started_session();
    let round = state.current_round().unwrap();
    let eligible = draw::eligible_for_round(&state.teams, round, true);

    let mut rng = StdRng::seed_from_u64(31337);
    let mut wins: HashMap<String, u32> = HashMap::new();
    let trials = 2000;
    for _ in 0..trials {
        let winner = draw::draw_weighted(&eligible, &mut rng).unwrap();
        *wins.entry(winner.name.clone()).or_insert(0) += 1;
    }

    for (name, pct) in odds::odds_table(&eligible) {
        let empirical = f64::from(wins.get(&name).copied().unwrap_or(0)) / trials as f64 * 100.0;
        assert!(
            (empirical - pct).abs() < 4.0,
            "{name}: computed {pct:.2}%, observed {empirical:.2}%"
        );
    }
}

#[test]
fn heavy_favorite_wins_about_ninety_five_percent() {
    // Two teams with 20 and 1 tickets: the favorite should win ~95% of
    // 1000 draws, strictly between 85% and 100%.
    let teams = vec![
        Participant::new("Heavy", 2000, 20),
        Participant::new("Light", 100, 1),
    ];
    let refs: Vec<&Participant> = teams.iter().collect();
    let mut rng = StdRng::seed_from_u64(4242);

    let mut heavy = 0u32;
    for _ in 0..1000 {
        if draw::draw_weighted(&refs, &mut rng).unwrap().name == "Heavy" {
            heavy += 1;
        }
    }
    assert!((851..1000).contains(&heavy), "Heavy won {heavy}/1000");
}

// ===========================================================================
// Session persistence
// ===========================================================================

#[test]
fn session_survives_database_round_trip() {
    let db = Database::open(":memory:").unwrap();
    let mut state = started_session();
    let mut rng = StdRng::seed_from_u64(9);

    state.draw_winner(&mut rng).unwrap();
    state.confirm_winner().unwrap();
    state.draw_winner(&mut rng).unwrap();
    state.reject_winner().unwrap();
    session::save_session(&db, &state).unwrap();

    let mut restored = session::load_session(&db, RaffleModel::Weighted)
        .unwrap()
        .expect("session should restore");

    assert_eq!(restored.current_round_index, state.current_round_index);
    assert_eq!(restored.winners, state.winners);
    assert_eq!(restored.withdrawn_players, state.withdrawn_players);

    // The restored session keeps drawing where the original left off.
    while !restored.is_complete() {
        restored.draw_winner(&mut rng).unwrap();
        restored.confirm_winner().unwrap();
    }
    assert_eq!(restored.winners.len(), 3);
}

#[test]
fn snapshot_shape_matches_storage_contract() {
    let state = started_session();
    let value = serde_json::to_value(SessionSnapshot::capture(&state)).unwrap();
    for key in [
        "teams",
        "currentRound",
        "rounds",
        "winners",
        "remainingTeams",
        "isDrawing",
        "raffleStarted",
        "withdrawnPlayers",
    ] {
        assert!(value.get(key).is_some(), "snapshot missing key {key}");
    }
}

// ===========================================================================
// Batch model execution
// ===========================================================================

#[test]
fn batch_elimination_trail_is_persisted() {
    let db = Database::open(":memory:").unwrap();
    let mut batch = BatchRaffle::new(
        fixture_roster(),
        standard_rounds(),
        RaffleModel::WeightedElimination,
    );
    let mut rng = StdRng::seed_from_u64(55);

    while !batch.is_complete() {
        let record = batch.run_round(&mut rng).unwrap();
        db.record_round(&record).unwrap();
    }

    let trail = db.load_round_records().unwrap();
    assert_eq!(trail.len(), 3);
    assert_eq!(
        trail.iter().map(|r| r.round_number).collect::<Vec<_>>(),
        [1, 2, 3]
    );
    // 7 participants over 3 rounds: quota = 2 eliminated per round.
    for record in &trail {
        assert_eq!(record.model, "weighted-elimination");
        assert_eq!(record.eliminated.len(), 2);
    }
    let removed = batch
        .participants()
        .iter()
        .filter(|p| p.status == ParticipantStatus::Removed)
        .count();
    assert_eq!(removed, 6);
}

#[test]
fn uniform_batch_gives_zero_ticket_teams_a_chance() {
    // Under the uniform model Lurkers (0 tickets) can win; check that a
    // multi-seed sweep eventually produces it.
    let mut lurkers_won = false;
    for seed in 0..200 {
        let mut batch = BatchRaffle::new(
            fixture_roster(),
            standard_rounds(),
            RaffleModel::Uniform,
        );
        let mut rng = StdRng::seed_from_u64(seed);
        let record = batch.run_round(&mut rng).unwrap();
        if record.winner.as_deref() == Some("Lurkers") {
            lurkers_won = true;
            break;
        }
    }
    assert!(lurkers_won, "a uniform draw should eventually pick a zero-ticket team");
}

// ===========================================================================
// Configuration
// ===========================================================================

#[test]
fn default_config_file_loads() {
    // Copy the shipped defaults into a temp base dir and load them.
    let tmp = std::env::temp_dir().join("raffle_integration_default_config");
    let _ = std::fs::remove_dir_all(&tmp);
    std::fs::create_dir_all(tmp.join("defaults")).unwrap();
    std::fs::copy("defaults/raffle.toml", tmp.join("defaults/raffle.toml")).unwrap();

    let copied = config::ensure_config_files(&tmp).unwrap();
    assert_eq!(copied.len(), 1);

    let config = config::load_config_from(&tmp).unwrap();
    assert_eq!(config.name, "Community Prize Raffle");
    assert_eq!(config.model, RaffleModel::Weighted);
    assert_eq!(config.schedule.len(), 3);
    assert_eq!(config.schedule.get(2).unwrap().point_threshold, 500);

    let _ = std::fs::remove_dir_all(&tmp);
}

// ===========================================================================
// Error surface
// ===========================================================================

#[test]
fn out_of_turn_operations_are_rejected_without_state_change() {
    let mut state = RaffleState::new(standard_rounds(), RaffleModel::Weighted);
    state.load_participants(fixture_roster()).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(state.draw_winner(&mut rng).unwrap_err(), RaffleError::NotStarted);
    assert_eq!(state.confirm_winner().unwrap_err(), RaffleError::NoPendingWinner);
    assert_eq!(state.reject_winner().unwrap_err(), RaffleError::NoPendingWinner);

    state.start_raffle().unwrap();
    assert_eq!(
        state.select_winner("Nobody").unwrap_err(),
        RaffleError::UnknownParticipant("Nobody".into())
    );
    assert_eq!(
        state.select_winner("Lurkers").unwrap_err(),
        RaffleError::NotEligible("Lurkers".into())
    );
    assert!(state.pending_winner.is_none());
    assert_eq!(state.winners.len(), 0);
}
