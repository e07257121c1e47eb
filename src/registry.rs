//! Session registry
//!
//! This module tracks every connected session and, per game mode, the lobby
//! and display name it is currently bound to. The reverse mapping doubles as
//! the broadcast room membership for each lobby.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    str::FromStr,
};

use enum_map::EnumMap;
use itertools::Itertools;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use crate::mode::GameMode;

/// A unique identifier for a connection
///
/// The transport assigns a fresh identity to every connection, so a player
/// who refreshes their page comes back with a new `Id`.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an identity from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The lobby a session sits in for one game mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Name of the lobby inside the mode's directory
    pub lobby: String,
    /// Display name the session joined with
    pub display_name: String,
}

/// Registry of connected sessions and their per-mode bindings
#[derive(Debug, Default)]
pub struct Sessions {
    /// Connected sessions and their binding in each mode
    mapping: HashMap<Id, EnumMap<GameMode, Option<Binding>>>,

    /// Lobby name to bound sessions, per mode
    reverse_mapping: EnumMap<GameMode, HashMap<String, HashSet<Id>>>,
}

impl Sessions {
    /// Registers a freshly connected session with no bindings
    pub fn connect(&mut self, id: Id) {
        self.mapping.entry(id).or_default();
    }

    /// Whether the session is currently connected
    pub fn is_connected(&self, id: Id) -> bool {
        self.mapping.contains_key(&id)
    }

    /// All connected sessions, in a stable order
    pub fn connected(&self) -> Vec<Id> {
        self.mapping.keys().copied().sorted().collect_vec()
    }

    /// Forgets a session and returns the bindings it held
    pub fn disconnect(&mut self, id: Id) -> Vec<(GameMode, Binding)> {
        let Some(bindings) = self.mapping.remove(&id) else {
            return Vec::new();
        };

        bindings
            .into_iter()
            .filter_map(|(mode, binding)| binding.map(|b| (mode, b)))
            .inspect(|(mode, binding)| self.remove_member(*mode, &binding.lobby, id))
            .collect_vec()
    }

    /// Binds a session to a lobby of the given mode
    ///
    /// Unknown sessions are registered on the fly. Returns the binding that
    /// was replaced, if any.
    pub fn bind(&mut self, id: Id, mode: GameMode, binding: Binding) -> Option<Binding> {
        self.reverse_mapping[mode]
            .entry(binding.lobby.clone())
            .or_default()
            .insert(id);

        let previous = self.mapping.entry(id).or_default()[mode].replace(binding);

        if let Some(previous) = &previous {
            let still_here = self.mapping[&id][mode]
                .as_ref()
                .is_some_and(|b| b.lobby == previous.lobby);
            if !still_here {
                self.remove_member(mode, &previous.lobby, id);
            }
        }

        previous
    }

    /// Removes the session's binding for a mode
    pub fn unbind(&mut self, id: Id, mode: GameMode) -> Option<Binding> {
        let binding = self.mapping.get_mut(&id)?[mode].take()?;
        self.remove_member(mode, &binding.lobby, id);
        Some(binding)
    }

    /// Gets the session's binding for a mode
    pub fn binding(&self, id: Id, mode: GameMode) -> Option<&Binding> {
        self.mapping.get(&id)?[mode].as_ref()
    }

    /// Sessions bound to a lobby, in a stable order
    pub fn members(&self, mode: GameMode, lobby: &str) -> Vec<Id> {
        self.reverse_mapping[mode]
            .get(lobby)
            .map(|ids| ids.iter().copied().sorted().collect_vec())
            .unwrap_or_default()
    }

    /// Unbinds every session from a lobby and returns who was evicted
    pub fn evict(&mut self, mode: GameMode, lobby: &str) -> Vec<Id> {
        let evicted = self.reverse_mapping[mode]
            .remove(lobby)
            .map(|ids| ids.into_iter().sorted().collect_vec())
            .unwrap_or_default();

        for id in &evicted {
            if let Some(bindings) = self.mapping.get_mut(id) {
                bindings[mode] = None;
            }
        }

        evicted
    }

    fn remove_member(&mut self, mode: GameMode, lobby: &str, id: Id) {
        if let Some(ids) = self.reverse_mapping[mode].get_mut(lobby) {
            ids.remove(&id);
            if ids.is_empty() {
                self.reverse_mapping[mode].remove(lobby);
            }
        }
    }
}
