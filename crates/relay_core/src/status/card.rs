//! Default presentational rendering of a [`StatusUpdate`].
//!
//! Chat platforms reject empty field values, so every field produced here
//! carries non-empty content. Sinks that talk to a real platform map a
//! [`StatusCard`] onto its native rich-message format.

use super::types::{Player, StatusUpdate, Team};
use serde::Serialize;
use std::fmt::Write as _;

/// Placeholder shown when a spectator list is present but empty.
pub const NO_SPECTATORS: &str = "No spectators";

const UNNAMED: &str = "Unnamed";

/// A single titled field of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl CardField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Chat-neutral rich rendering of a status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCard {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub fields: Vec<CardField>,
}

impl StatusCard {
    /// Looks up a field by its name.
    #[cfg(test)]
    pub(crate) fn field(&self, name: &str) -> Option<&CardField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Renders the card as plain multi-line text.
    pub fn to_text(&self) -> String {
        let mut text = format!("**{}**\n{}", self.title, self.description);
        if let Some(url) = &self.url {
            let _ = write!(text, "\n{url}");
        }
        for field in &self.fields {
            let _ = write!(text, "\n\n__{}__\n{}", field.name, field.value);
        }
        text
    }
}

fn player_line(player: &Player) -> String {
    let name = if player.name.trim().is_empty() {
        UNNAMED
    } else {
        player.name.as_str()
    };
    let mut line = name.to_string();
    if let Some(score) = &player.score {
        let _ = write!(line, " - {score}");
    }
    if let Some(efficiency) = &player.efficiency {
        let _ = write!(line, " ({efficiency})");
    }
    line
}

fn team_field(label: &str, team: &Team) -> CardField {
    let name = match &team.score {
        Some(score) => format!("{label} ({score})"),
        None => label.to_string(),
    };
    let value = team
        .players
        .iter()
        .map(player_line)
        .collect::<Vec<_>>()
        .join("\n");
    CardField::new(name, value, true)
}

impl From<&StatusUpdate> for StatusCard {
    fn from(status: &StatusUpdate) -> Self {
        let mut fields = Vec::new();

        if let Some(time_remaining) = &status.time_remaining {
            fields.push(CardField::new("Time Remaining", time_remaining.to_string(), false));
        }

        for (label, team) in [("Red Team", &status.red_team), ("Blue Team", &status.blue_team)] {
            if let Some(team) = team.as_ref().filter(|team| team.has_players()) {
                fields.push(team_field(label, team));
            }
        }

        if let Some(spectators) = &status.spectators {
            let value = if spectators.is_empty() {
                NO_SPECTATORS.to_string()
            } else {
                spectators
                    .iter()
                    .map(|spectator| match spectator.name.trim() {
                        "" => UNNAMED,
                        name => name,
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            fields.push(CardField::new("Spectators", value, false));
        }

        if let Some(address) = &status.server_address {
            fields.push(CardField::new("Join", address.clone(), false));
        }

        Self {
            title: status.server_name.clone(),
            description: format!("{} on {}", status.game_mode, status.map),
            url: status.server_address.clone(),
            fields,
        }
    }
}
