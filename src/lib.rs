//! # Parlor
//!
//! This library provides the core of a real-time party game server. It hosts
//! three two-player turn-based modes (question/dare, would-you-rather, and
//! two truths and a lie) in named lobbies, keeps per-lobby turn timers,
//! seats returning players back into their old slots, and pushes every state
//! change to the players of a lobby.
//!
//! The library does no I/O. The host owns the connections and hands the
//! [`hub::Hub`] a tunnel finder for sending messages and a scheduler for
//! timer alarms.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod constants;

pub mod bounded;
pub mod broadcast;
pub mod chat;
pub mod config;
pub mod content;
pub mod directory;
pub mod game;
pub mod hub;
pub mod lobby;
pub mod mode;
pub mod names;
pub mod registry;
pub mod session;
pub mod timer;

/// Messages sent to bring a session fully up to date
///
/// Sync messages carry complete state, for example when a session joins a
/// lobby and has to render it from scratch.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Lobby state snapshots
    Lobby(lobby::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages sent to update specific aspects of a lobby
///
/// Update messages notify clients about incremental changes, such as a new
/// turn holder, a timer step, or a finished round.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Lobby, turn, timer, and chat updates
    Lobby(lobby::UpdateMessage),
    /// Question/dare round updates
    QuestionDare(game::question_dare::UpdateMessage),
    /// Would-you-rather round updates
    WouldYouRather(game::would_you_rather::UpdateMessage),
    /// Two truths and a lie round updates
    TwoTruths(game::two_truths::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Alarm messages the host schedules and feeds back to the hub
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Turn timer alarms
    Timer(timer::AlarmMessage),
}

/// Errors reported back to the session whose request failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::From)]
pub enum Error {
    /// A lobby or display name was rejected
    #[error(transparent)]
    Name(names::Error),
    /// A lobby could not be created, found, or deleted
    #[error(transparent)]
    Directory(directory::Error),
    /// A seat could not be taken
    #[error(transparent)]
    Join(lobby::reconnect::Error),
    /// A round submission was rejected
    #[error(transparent)]
    Game(game::Error),
    /// A chat message was rejected
    #[error(transparent)]
    Chat(chat::Error),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::registry::Id;

    #[test]
    fn test_update_message_serializes_externally_tagged() {
        let message: UpdateMessage = lobby::UpdateMessage::UpdateTimer(42).into();
        assert_eq!(message.to_message(), r#"{"Lobby":{"UpdateTimer":42}}"#);
    }

    #[test]
    fn test_alarm_message_round_trips() {
        let alarm: AlarmMessage = timer::AlarmMessage::Tick {
            mode: mode::GameMode::TwoTruths,
            lobby: "room1".to_owned(),
            token: Id::new(),
        }
        .into();
        let json = serde_json::to_string(&alarm).unwrap();
        let back: AlarmMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(alarm, back);
    }

    #[test]
    fn test_error_messages_pass_through() {
        let error: Error = directory::Error::NotFound.into();
        assert_eq!(error.to_string(), "lobby not found");
        let error: Error = lobby::reconnect::Error::LobbyFull.into();
        assert_eq!(error.to_string(), "lobby full");
    }
}
