//! Structured status updates.
//!
//! A backend announces the live state of a match by sending a
//! `GAME_STATUS:` message carrying a JSON object. This module validates that
//! payload into a [`StatusUpdate`] and provides [`StatusCard`], the default
//! chat-neutral rendering of an update.

pub mod card;
pub mod parser;
pub mod types;

pub use card::{CardField, StatusCard, NO_SPECTATORS};
pub use parser::{parse_status, StatusError, UNSET_SERVER_ADDRESS};
pub use types::{Player, Scalar, Spectator, StatusUpdate, Team};
