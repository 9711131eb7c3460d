// Participant roster ingestion.
//
// Reads leaderboard-export CSVs: one row per team with a Points total, a
// Submissions count, a "Last Submission" date column, and an optional
// status column. Extra columns are silently ignored.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::raffle::participant::{Participant, ParticipantStatus};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Leaderboard CSV row. Extra columns are absorbed via `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
#[allow(dead_code, non_snake_case)]
struct RawTeamRow {
    Team: String,
    Points: u32,
    Submissions: u32,
    #[serde(rename = "Last Submission", default)]
    LastSubmission: String,
    #[serde(default)]
    status: String,
    /// Absorb any extra columns the export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a submission date. Exports use ISO dates or US-style slashes;
/// anything else degrades to None with a warning.
fn parse_submission_date(team: &str, raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .map_err(|_| {
            warn!("team '{team}': unparseable Last Submission date '{trimmed}'");
        })
        .ok()
}

// ---------------------------------------------------------------------------
// Reader-based loader (private, enables testing without temp files)
// ---------------------------------------------------------------------------

fn load_participants_from_reader<R: Read>(rdr: R) -> Result<Vec<Participant>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut participants: Vec<Participant> = Vec::new();

    for result in reader.deserialize::<RawTeamRow>() {
        match result {
            Ok(raw) => {
                let name = raw.Team.trim().to_string();
                if name.is_empty() {
                    warn!("skipping row with empty team name");
                    continue;
                }
                if participants.iter().any(|p| p.name == name) {
                    warn!("duplicate team '{name}', keeping first occurrence");
                    continue;
                }

                let status = match raw.status.trim() {
                    "" => ParticipantStatus::Eligible,
                    s => ParticipantStatus::from_str_status(s).unwrap_or_else(|| {
                        warn!("team '{name}': unknown status '{s}', treating as eligible");
                        ParticipantStatus::Eligible
                    }),
                };

                let mut participant = Participant::new(&name, raw.Points, raw.Submissions);
                participant.last_submission = parse_submission_date(&name, &raw.LastSubmission);
                participant.status = status;
                participants.push(participant);
            }
            Err(e) => {
                warn!("skipping malformed roster row: {e}");
            }
        }
    }

    Ok(participants)
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load the participant roster from a leaderboard CSV export.
///
/// Malformed rows and duplicate team names are skipped with a warning;
/// only an unreadable file or a broken CSV stream is an error.
pub fn load_participants(path: impl AsRef<Path>) -> Result<Vec<Participant>, IngestError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_participants_from_reader(file).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}
