//! Domain types for a validated status update.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A loosely typed scalar reported by the backend.
///
/// Game servers are inconsistent about whether scores, efficiencies and
/// remaining time arrive as numbers or pre-formatted strings, so both are
/// accepted and rendered as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

/// One player on a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: Option<Scalar>,
    #[serde(default)]
    pub efficiency: Option<Scalar>,
}

/// A team with its aggregate score and ordered player list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub score: Option<Scalar>,
    #[serde(default)]
    pub players: Vec<Player>,
}

impl Team {
    /// Whether the team has anyone to show.
    pub fn has_players(&self) -> bool {
        !self.players.is_empty()
    }
}

/// A connected spectator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectator {
    #[serde(default)]
    pub name: String,
}

/// A validated snapshot of a running match.
///
/// `server_name`, `game_mode` and `map` are guaranteed non-empty. Optional
/// sections keep the distinction between "absent" (`None`) and "present but
/// empty" (`Some(vec![])`), which matters for spectator rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub server_name: String,
    pub game_mode: String,
    pub map: String,
    pub time_remaining: Option<Scalar>,
    pub red_team: Option<Team>,
    pub blue_team: Option<Team>,
    pub spectators: Option<Vec<Spectator>>,
    /// Join address, already filtered for the unset placeholder value
    pub server_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_accepts_numbers_and_strings() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[42, 87.5, "5:00"]"#).unwrap();
        assert_eq!(values[0], Scalar::Integer(42));
        assert_eq!(values[1], Scalar::Float(87.5));
        assert_eq!(values[2], Scalar::Text("5:00".to_string()));
        assert_eq!(values[0].to_string(), "42");
        assert_eq!(values[1].to_string(), "87.5");
        assert_eq!(values[2].to_string(), "5:00");
    }

    #[test]
    fn test_team_defaults_missing_fields() {
        let team: Team = serde_json::from_str(r#"{"players":[{"name":"Malcolm"}]}"#).unwrap();
        assert_eq!(team.score, None);
        assert!(team.has_players());
        assert_eq!(team.players[0].name, "Malcolm");
        assert_eq!(team.players[0].efficiency, None);
    }
}
