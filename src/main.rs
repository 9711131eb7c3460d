// Raffle assistant entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not the terminal prompt)
// 2. Load config
// 3. Open database
// 4. Restore a saved session, or ingest the roster fresh
// 5. Run the interactive command loop (or a batch run with `raffle batch`)

use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::info;

use raffle_assistant::config::{self, Config};
use raffle_assistant::db::Database;
use raffle_assistant::ingest;
use raffle_assistant::raffle::model::BatchRaffle;
use raffle_assistant::raffle::odds;
use raffle_assistant::raffle::state::RaffleState;
use raffle_assistant::session;

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, terminal stays clean for the prompt)
    init_tracing()?;
    info!("Raffle assistant starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: raffle={}, {} rounds, model={}",
        config.name,
        config.schedule.len(),
        config.model.name()
    );

    // 3. Open database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // Batch mode runs the configured model over every round and exits.
    if std::env::args().nth(1).as_deref() == Some("batch") {
        return run_batch(&config, &db);
    }

    // 4. Restore a saved session, or ingest the roster fresh
    let mut state = match session::load_session(&db, config.model)
        .context("failed to restore saved session")?
    {
        Some(state) => {
            println!(
                "Restored session: round {} of {}, {} winner(s) so far",
                state.current_round_index + 1,
                state.rounds.len(),
                state.winners.len()
            );
            state
        }
        None => {
            let roster = ingest::load_participants(&config.data_paths.participants)
                .context("failed to load participant roster")?;
            println!(
                "Loaded {} participants from {}",
                roster.len(),
                config.data_paths.participants
            );
            let mut state = RaffleState::new(config.schedule.clone(), config.model);
            state
                .load_participants(roster)
                .context("failed to load roster into engine")?;
            state
        }
    };

    // 5. Interactive command loop
    println!("{} ({} model). Type `help` for commands.", config.name, config.model.name());
    run_loop(&mut state, &db)
}

fn run_loop(state: &mut RaffleState, db: &Database) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut rng = rand::rng();

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        let (command, arg) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        let result = match command {
            "" => continue,
            "help" => {
                print_help();
                Ok(())
            }
            "status" => {
                print_status(state);
                Ok(())
            }
            "odds" => {
                print_odds(state);
                Ok(())
            }
            "start" => state.start_raffle().map(|()| {
                println!("Raffle started.");
            }),
            "draw" => state.draw_winner(&mut rng).map(|winner| {
                println!(
                    "Drew {} ({} tickets). `confirm` or `reject`?",
                    winner.name, winner.tickets
                );
            }),
            "pick" => state.select_winner(arg).map(|()| {
                println!("Selected {arg}. `confirm` or `reject`?");
            }),
            "confirm" => state.confirm_winner().and_then(|record| {
                println!("{} wins {} ({})", record.team, record.round_name, record.prize);
                if let Err(e) = db.record_winner(&record) {
                    tracing::warn!("failed to mirror winner to database: {e}");
                }
                Ok(())
            }),
            "reject" => state.reject_winner().map(|()| {
                println!("Rejected; the round stays open.");
            }),
            "reset" => {
                state.reset_raffle();
                db.clear_session().context("failed to clear session data")?;
                println!("Raffle reset; roster retained.");
                Ok(())
            }
            "quit" | "exit" => break,
            other => {
                println!("Unknown command `{other}`; type `help`.");
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("Cannot do that: {e}");
            continue;
        }

        session::save_session(db, state).context("failed to persist session")?;
        if state.raffle_started && state.is_complete() {
            println!("The raffle is complete. `status` for results, `reset` to start over.");
        }
    }

    Ok(())
}

fn run_batch(config: &Config, db: &Database) -> anyhow::Result<()> {
    let roster = ingest::load_participants(&config.data_paths.participants)
        .context("failed to load participant roster")?;
    println!(
        "Batch run: {} participants, {} rounds, {} model",
        roster.len(),
        config.schedule.len(),
        config.model.name()
    );

    let mut batch = BatchRaffle::new(roster, config.schedule.clone(), config.model);
    let mut rng = rand::rng();
    while !batch.is_complete() {
        let record = batch.run_round(&mut rng).context("round execution failed")?;
        db.record_round(&record)
            .context("failed to persist round record")?;
        match &record.winner {
            Some(winner) => println!(
                "Round {}: {} wins ({} eliminated, {} remain)",
                record.round_number,
                winner,
                record.eliminated.len(),
                record.participants_after.len()
            ),
            None => println!(
                "Round {}: no eligible participants ({} remain)",
                record.round_number,
                record.participants_after.len()
            ),
        }
    }
    println!("Batch run complete; audit trail stored.");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  status        show round, pool, and winners");
    println!("  odds          show win odds for the current round");
    println!("  start         start the raffle");
    println!("  draw          draw a pending winner for the current round");
    println!("  pick <team>   select a specific eligible team as pending winner");
    println!("  confirm       confirm the pending winner and open the next round");
    println!("  reject        withdraw the pending winner; the round stays open");
    println!("  reset         clear all progress, keep the roster");
    println!("  quit          exit");
}

fn print_status(state: &RaffleState) {
    match state.current_round() {
        Some(round) if state.raffle_started => println!(
            "Round {} of {}: {} (threshold {} points)",
            state.current_round_index + 1,
            state.rounds.len(),
            round.name,
            round.point_threshold
        ),
        Some(_) => println!("Not started ({} rounds configured).", state.rounds.len()),
        None => println!("All {} rounds drawn.", state.rounds.len()),
    }
    if let Some(pending) = &state.pending_winner {
        println!("Pending winner: {pending}");
    }
    println!(
        "Pool: {} in play, {} eligible this round, {} withdrawn",
        state.remaining_teams().len(),
        state.eligible_for_current_round().len(),
        state.withdrawn_players.len()
    );
    for winner in &state.winners {
        println!("  {} won {} ({})", winner.team, winner.round_name, winner.prize);
    }
    if state.raffle_started && state.is_complete() {
        println!("The raffle is complete.");
    }
}

fn print_odds(state: &RaffleState) {
    let eligible = state.eligible_for_current_round();
    if eligible.is_empty() {
        println!("Nobody is eligible for the current round.");
        return;
    }
    if state.model.policy().weighted_system {
        println!("{} tickets in the pool:", odds::total_tickets(&eligible));
        for (name, pct) in odds::odds_table(&eligible) {
            println!("  {name:<24} {pct:5.2}%");
        }
    } else {
        let share = odds::uniform_odds(&eligible);
        for p in &eligible {
            println!("  {:<24} {share:5.2}%", p.name);
        }
    }
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the interactive prompt).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("raffle-assistant.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("raffle_assistant=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
