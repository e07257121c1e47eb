//! Per-mode lobby directory
//!
//! Each game mode has its own [`Directory`], so lobby names only need to be
//! unique within a mode.

use std::collections::{BTreeMap, btree_map::Entry};

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::Options,
    constants,
    lobby::{Lobby, LobbySummary, Visibility},
    mode::GameMode,
    registry::Id,
};

/// Errors that can occur when managing lobbies
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Another lobby of this mode already uses the name
    #[error("lobby name already taken")]
    NameTaken,
    /// A private lobby was requested without a password
    #[error("password is required for private lobbies")]
    MissingPassword,
    /// The password exceeds the maximum allowed length
    #[error("password is too long")]
    PasswordTooLong,
    /// No lobby with that name exists
    #[error("lobby not found")]
    NotFound,
    /// The requester may not delete the lobby
    #[error("not allowed to delete this lobby")]
    Unauthorized,
}

/// The lobbies of one game mode, keyed by name
#[derive(Debug)]
pub struct Directory {
    mode: GameMode,
    lobbies: BTreeMap<String, Lobby>,
}

impl Directory {
    /// Creates an empty directory for a mode
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            lobbies: BTreeMap::new(),
        }
    }

    /// Creates a lobby, seating nobody
    ///
    /// Public lobbies never keep a password.
    ///
    /// # Errors
    ///
    /// * `Error::NameTaken` - A lobby with the name exists
    /// * `Error::MissingPassword` - Private lobby without a non-empty password
    /// * `Error::PasswordTooLong` - Password over the length limit
    pub fn create(
        &mut self,
        name: &str,
        visibility: Visibility,
        password: Option<String>,
        creator: Id,
        creator_name: &str,
        options: &Options,
    ) -> Result<&mut Lobby, Error> {
        let password = match visibility {
            Visibility::Public => None,
            Visibility::Private => {
                let password = password
                    .filter(|p| !p.is_empty())
                    .ok_or(Error::MissingPassword)?;
                if password.len() > constants::lobby::MAX_PASSWORD_LENGTH {
                    return Err(Error::PasswordTooLong);
                }
                Some(password)
            }
        };

        match self.lobbies.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(Error::NameTaken),
            Entry::Vacant(entry) => Ok(entry.insert(Lobby::new(
                name.to_owned(),
                visibility,
                password,
                creator,
                creator_name.to_owned(),
                self.mode,
                options,
            ))),
        }
    }

    /// Gets a lobby by name
    pub fn get(&self, name: &str) -> Option<&Lobby> {
        self.lobbies.get(name)
    }

    /// Gets a lobby by name, mutably
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Lobby> {
        self.lobbies.get_mut(name)
    }

    /// Lobby list entries, ordered by name
    pub fn list(&self) -> Vec<LobbySummary> {
        self.lobbies.values().map(Lobby::summary).collect_vec()
    }

    /// Number of lobbies
    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    /// Whether the directory has no lobbies
    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    /// Removes a lobby and returns it
    ///
    /// A public lobby can only be deleted by its creator. A private lobby can
    /// be deleted by anyone holding its password.
    ///
    /// # Errors
    ///
    /// * `Error::NotFound` - No lobby with that name exists
    /// * `Error::Unauthorized` - The requester is not allowed to delete it
    pub fn delete(
        &mut self,
        name: &str,
        requester: Id,
        password: Option<&str>,
    ) -> Result<Lobby, Error> {
        let lobby = self.lobbies.get(name).ok_or(Error::NotFound)?;

        let authorized = match lobby.visibility() {
            Visibility::Public => lobby.creator() == requester,
            Visibility::Private => password.is_some() && password == lobby.password(),
        };
        if !authorized {
            return Err(Error::Unauthorized);
        }

        self.lobbies.remove(name).ok_or(Error::NotFound)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn create(
        directory: &mut Directory,
        name: &str,
        visibility: Visibility,
        password: Option<&str>,
        creator: Id,
    ) -> Result<(), Error> {
        directory
            .create(
                name,
                visibility,
                password.map(str::to_owned),
                creator,
                "Alice",
                &Options::default(),
            )
            .map(|_| ())
    }

    #[test]
    fn test_create_and_list() {
        let mut directory = Directory::new(GameMode::QuestionDare);
        let alice = Id::new();
        create(&mut directory, "b-room", Visibility::Public, None, alice).unwrap();
        create(&mut directory, "a-room", Visibility::Private, Some("pw"), alice).unwrap();

        let list = directory.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "a-room");
        assert_eq!(list[0].visibility, Visibility::Private);
        assert_eq!(list[1].creator, "Alice");
        assert_eq!(list[1].live_count, 0);
        assert_eq!(
            directory.get("a-room").unwrap().game().mode(),
            GameMode::QuestionDare
        );
    }

    #[test]
    fn test_name_taken() {
        let mut directory = Directory::new(GameMode::TwoTruths);
        let alice = Id::new();
        create(&mut directory, "room1", Visibility::Public, None, alice).unwrap();
        assert_eq!(
            create(&mut directory, "room1", Visibility::Public, None, Id::new()),
            Err(Error::NameTaken)
        );
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_private_lobby_requires_password() {
        let mut directory = Directory::new(GameMode::WouldYouRather);
        let alice = Id::new();
        assert_eq!(
            create(&mut directory, "room1", Visibility::Private, None, alice),
            Err(Error::MissingPassword)
        );
        assert_eq!(
            create(&mut directory, "room1", Visibility::Private, Some(""), alice),
            Err(Error::MissingPassword)
        );
        let long = "p".repeat(constants::lobby::MAX_PASSWORD_LENGTH + 1);
        assert_eq!(
            create(&mut directory, "room1", Visibility::Private, Some(&long), alice),
            Err(Error::PasswordTooLong)
        );
        assert!(directory.is_empty());
    }

    #[test]
    fn test_public_lobby_drops_password() {
        let mut directory = Directory::new(GameMode::QuestionDare);
        create(&mut directory, "room1", Visibility::Public, Some("pw"), Id::new()).unwrap();
        assert_eq!(directory.get("room1").unwrap().password(), None);
    }

    #[test]
    fn test_delete_public_requires_creator() {
        let mut directory = Directory::new(GameMode::QuestionDare);
        let alice = Id::new();
        create(&mut directory, "room1", Visibility::Public, None, alice).unwrap();

        assert_eq!(
            directory.delete("room1", Id::new(), None).unwrap_err(),
            Error::Unauthorized
        );
        assert!(directory.delete("room1", alice, None).is_ok());
        assert_eq!(
            directory.delete("room1", alice, None).unwrap_err(),
            Error::NotFound
        );
    }

    #[test]
    fn test_delete_private_requires_password() {
        let mut directory = Directory::new(GameMode::QuestionDare);
        let alice = Id::new();
        create(&mut directory, "room1", Visibility::Private, Some("pw"), alice).unwrap();

        assert_eq!(
            directory.delete("room1", alice, None).unwrap_err(),
            Error::Unauthorized
        );
        assert_eq!(
            directory.delete("room1", alice, Some("nope")).unwrap_err(),
            Error::Unauthorized
        );
        assert!(directory.delete("room1", Id::new(), Some("pw")).is_ok());
        assert!(directory.is_empty());
    }
}
