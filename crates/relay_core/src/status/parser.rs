//! Validation of `GAME_STATUS:` payloads.

use super::types::{Scalar, Spectator, StatusUpdate, Team};
use serde::Deserialize;

/// Address value backends report when no join address is configured.
pub const UNSET_SERVER_ADDRESS: &str = "unreal://";

/// Reasons a status payload is rejected.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The payload is not a JSON object of the expected shape
    #[error("Invalid status payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required field is absent or empty
    #[error("Status payload is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Wire shape of the payload before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    server_name: Option<String>,
    game_mode: Option<String>,
    map: Option<String>,
    time_remaining: Option<Scalar>,
    red_team: Option<Team>,
    blue_team: Option<Team>,
    spectators: Option<Vec<Spectator>>,
    #[serde(rename = "serverIP")]
    server_ip: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, StatusError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(StatusError::MissingField(field))
}

/// Parses and validates a status payload (the text after `GAME_STATUS:`).
///
/// Fails when the payload is not a JSON object, or when `serverName`,
/// `gameMode` or `map` is missing or empty. The fields are checked in that
/// order and the first missing one is reported.
pub fn parse_status(payload: &str) -> Result<StatusUpdate, StatusError> {
    let raw: RawStatus = serde_json::from_str(payload.trim())?;

    let server_name = required(raw.server_name, "serverName")?;
    let game_mode = required(raw.game_mode, "gameMode")?;
    let map = required(raw.map, "map")?;

    let server_address = raw
        .server_ip
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty() && address != UNSET_SERVER_ADDRESS);

    Ok(StatusUpdate {
        server_name,
        game_mode,
        map,
        time_remaining: raw.time_remaining,
        red_team: raw.red_team,
        blue_team: raw.blue_team,
        spectators: raw.spectators,
        server_address,
    })
}
