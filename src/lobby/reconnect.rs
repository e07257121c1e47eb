//! Seating a joining session
//!
//! Sessions have no lasting identity, so a player who comes back is matched
//! to their old seat by display name. A stranger may take over a seat whose
//! holder disconnected; otherwise a new seat is added while there is room.

use serde::Serialize;
use thiserror::Error;

use super::{Lobby, PlayerSlot, Visibility};
use crate::{constants, registry::Id};

/// Errors that can occur when taking a seat
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The password does not match the private lobby's
    #[error("incorrect password")]
    IncorrectPassword,
    /// A password was given for a public lobby
    #[error("public lobbies do not require passwords")]
    PasswordNotAllowed,
    /// Every seat is held by a connected player
    #[error("lobby full")]
    LobbyFull,
    /// The session holds a seat and asked for another player's name
    #[error("already seated in this lobby under another name")]
    AlreadySeated,
}

/// How a session was seated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Took back the seat with the same display name
    Reused {
        /// Identity that held the seat before
        previous: Id,
    },
    /// Took over a seat whose holder disconnected
    Recycled {
        /// Identity that held the seat before
        previous: Id,
    },
    /// Got a new seat
    Seated,
}

impl Lobby {
    /// Checks a join password against the lobby's visibility
    ///
    /// # Errors
    ///
    /// * `Error::IncorrectPassword` - Private lobby, password missing or wrong
    /// * `Error::PasswordNotAllowed` - Public lobby, non-empty password given
    pub fn check_password(&self, password: Option<&str>) -> Result<(), Error> {
        match self.visibility {
            Visibility::Private if password != self.password.as_deref() => {
                Err(Error::IncorrectPassword)
            }
            Visibility::Public if password.is_some_and(|p| !p.is_empty()) => {
                Err(Error::PasswordNotAllowed)
            }
            _ => Ok(()),
        }
    }

    /// Seats `identity` under `display_name`
    ///
    /// Seats without a game record are dropped first. A session that already
    /// holds a seat keeps it, renamed if the new name is free. Otherwise, in
    /// order: a seat with the same name is taken back, a disconnected seat is
    /// taken over, or a new seat is added while fewer than two are live. A
    /// moved seat carries its game record and its turn. The creator role only
    /// follows a seat taken back by name.
    ///
    /// # Errors
    ///
    /// * `Error::IncorrectPassword` / `Error::PasswordNotAllowed` - See
    ///   [`Lobby::check_password`]
    /// * `Error::AlreadySeated` - The session holds a seat and another seat
    ///   uses `display_name`
    /// * `Error::LobbyFull` - Two live seats and no seat to take back
    pub fn resolve(
        &mut self,
        password: Option<&str>,
        display_name: &str,
        identity: Id,
    ) -> Result<Placement, Error> {
        self.check_password(password)?;

        let table = self.game.table();
        self.players.retain(|slot| table.contains(slot.identity));

        let named = self
            .players
            .iter()
            .position(|slot| slot.display_name == display_name);

        if let Some(own) = self.players.iter().position(|slot| slot.identity == identity) {
            if named.is_some_and(|index| index != own) {
                return Err(Error::AlreadySeated);
            }
            let previous = self.rebind(own, display_name, identity, true);
            return Ok(Placement::Reused { previous });
        }

        if let Some(index) = named {
            let previous = self.rebind(index, display_name, identity, true);
            return Ok(Placement::Reused { previous });
        }

        if let Some(index) = self.players.iter().position(|slot| slot.disconnected) {
            let previous = self.rebind(index, display_name, identity, false);
            return Ok(Placement::Recycled { previous });
        }

        if self.live_count() < constants::lobby::MAX_LIVE_PLAYERS {
            self.players.push(PlayerSlot {
                identity,
                display_name: display_name.to_owned(),
                disconnected: false,
            });
            self.game.table_mut().add_player(identity, display_name);
            return Ok(Placement::Seated);
        }

        Err(Error::LobbyFull)
    }

    fn rebind(
        &mut self,
        index: usize,
        display_name: &str,
        identity: Id,
        keep_creator: bool,
    ) -> Id {
        let slot = &mut self.players[index];
        let previous = std::mem::replace(&mut slot.identity, identity);
        display_name.clone_into(&mut slot.display_name);
        slot.disconnected = false;

        self.game
            .machine_mut()
            .migrate_identity(previous, identity, display_name);
        if keep_creator && self.creator == previous {
            self.creator = identity;
        }

        log::debug!(
            "{} lobby {:?}: seat of {previous} moved to {identity}",
            self.mode(),
            self.name
        );

        previous
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{
        broadcast::{Room, tests::Inboxes},
        config::Options,
        game::GameState,
        mode::GameMode,
    };

    fn lobby(visibility: Visibility, password: Option<&str>) -> Lobby {
        Lobby::new(
            "room1".to_owned(),
            visibility,
            password.map(str::to_owned),
            Id::new(),
            "Alice".to_owned(),
            GameMode::QuestionDare,
            &Options::default(),
        )
    }

    #[test]
    fn test_password_rules() {
        let private = lobby(Visibility::Private, Some("secret"));
        assert_eq!(private.check_password(None), Err(Error::IncorrectPassword));
        assert_eq!(
            private.check_password(Some("nope")),
            Err(Error::IncorrectPassword)
        );
        assert_eq!(private.check_password(Some("secret")), Ok(()));

        let public = lobby(Visibility::Public, None);
        assert_eq!(public.check_password(None), Ok(()));
        assert_eq!(public.check_password(Some("")), Ok(()));
        assert_eq!(
            public.check_password(Some("x")),
            Err(Error::PasswordNotAllowed)
        );
    }

    #[test]
    fn test_third_live_join_is_rejected() {
        let mut lobby = lobby(Visibility::Public, None);
        assert_eq!(lobby.resolve(None, "Alice", Id::new()), Ok(Placement::Seated));
        assert_eq!(lobby.resolve(None, "Bob", Id::new()), Ok(Placement::Seated));
        assert_eq!(
            lobby.resolve(None, "Carol", Id::new()),
            Err(Error::LobbyFull)
        );
        assert_eq!(lobby.live_count(), 2);
        assert_eq!(lobby.slots().len(), 2);
    }

    #[test]
    fn test_same_name_reuses_slot_and_turn() {
        let mut lobby = lobby(Visibility::Public, None);
        let alice = Id::new();
        lobby.resolve(None, "Alice", alice).unwrap();
        lobby.resolve(None, "Bob", Id::new()).unwrap();
        lobby.game.table_mut().set_turn(alice);
        lobby.leave(alice, &Room::default(), Inboxes::default().finder());

        let again = Id::new();
        assert_eq!(
            lobby.resolve(None, "Alice", again),
            Ok(Placement::Reused { previous: alice })
        );

        assert_eq!(lobby.slots()[0].identity, again);
        assert!(!lobby.slots()[0].disconnected);
        assert_eq!(lobby.game().table().current_turn(), Some(again));
        assert!(!lobby.game().table().contains(alice));
        assert_eq!(lobby.slots().len(), 2);
    }

    #[test]
    fn test_disconnected_slot_is_recycled() {
        let mut lobby = lobby(Visibility::Public, None);
        let alice = Id::new();
        let bob = Id::new();
        lobby.resolve(None, "Alice", alice).unwrap();
        lobby.resolve(None, "Bob", bob).unwrap();
        lobby.game.table_mut().set_turn(bob);
        lobby.leave(bob, &Room::default(), Inboxes::default().finder());

        let carol = Id::new();
        assert_eq!(
            lobby.resolve(None, "Carol", carol),
            Ok(Placement::Recycled { previous: bob })
        );
        assert_eq!(lobby.slots()[1].display_name, "Carol");
        assert_eq!(lobby.game().table().current_turn(), Some(carol));
        assert_eq!(lobby.game().table().display_name(carol), Some("Carol"));
    }

    #[test]
    fn test_orphan_slots_are_pruned() {
        let mut lobby = lobby(Visibility::Public, None);
        lobby.players.push(PlayerSlot {
            identity: Id::new(),
            display_name: "Ghost".to_owned(),
            disconnected: false,
        });
        lobby.players.push(PlayerSlot {
            identity: Id::new(),
            display_name: "Ghost2".to_owned(),
            disconnected: false,
        });

        assert_eq!(lobby.resolve(None, "Alice", Id::new()), Ok(Placement::Seated));
        assert_eq!(lobby.slots().len(), 1);
    }

    #[test]
    fn test_creator_follows_seat() {
        let creator = Id::new();
        let mut lobby = Lobby::new(
            "room1".to_owned(),
            Visibility::Public,
            None,
            creator,
            "Alice".to_owned(),
            GameMode::TwoTruths,
            &Options::default(),
        );
        lobby.resolve(None, "Alice", creator).unwrap();

        let again = Id::new();
        lobby.resolve(None, "Alice", again).unwrap();
        assert_eq!(lobby.creator(), again);
        assert!(matches!(lobby.game(), GameState::TwoTruths(_)));
    }

    #[test]
    fn test_same_session_rejoining_keeps_seat() {
        let mut lobby = lobby(Visibility::Private, Some("pw"));
        let alice = Id::new();
        lobby.resolve(Some("pw"), "Alice", alice).unwrap();
        assert_eq!(
            lobby.resolve(Some("pw"), "Alice", alice),
            Ok(Placement::Reused { previous: alice })
        );
        assert!(lobby.game().table().contains(alice));
        assert_eq!(lobby.slots().len(), 1);
    }

    #[test]
    fn test_same_session_new_name_renames_its_seat() {
        let mut lobby = lobby(Visibility::Public, None);
        let alice = Id::new();
        lobby.resolve(None, "Alice", alice).unwrap();
        assert_eq!(
            lobby.resolve(None, "Alicia", alice),
            Ok(Placement::Reused { previous: alice })
        );
        assert_eq!(lobby.slots().len(), 1);
        assert_eq!(lobby.slots()[0].display_name, "Alicia");
        assert_eq!(lobby.game().table().display_name(alice), Some("Alicia"));

        let bob = Id::new();
        assert_eq!(lobby.resolve(None, "Bob", bob), Ok(Placement::Seated));
        assert_eq!(lobby.live_count(), 2);
    }

    #[test]
    fn test_same_session_cannot_take_another_name() {
        let mut lobby = lobby(Visibility::Public, None);
        let alice = Id::new();
        let bob = Id::new();
        lobby.resolve(None, "Alice", alice).unwrap();
        lobby.resolve(None, "Bob", bob).unwrap();
        lobby.game.table_mut().set_turn(bob);

        assert_eq!(
            lobby.resolve(None, "Bob", alice),
            Err(Error::AlreadySeated)
        );
        assert_eq!(lobby.slots().len(), 2);
        assert_eq!(lobby.slots()[0].identity, alice);
        assert_eq!(lobby.slots()[1].identity, bob);
        assert_eq!(lobby.game().table().display_name(alice), Some("Alice"));
        assert_eq!(lobby.game().table().display_name(bob), Some("Bob"));
        assert_eq!(lobby.game().table().current_turn(), Some(bob));
    }

    #[test]
    fn test_seated_session_does_not_recycle_disconnected_seat() {
        let mut lobby = lobby(Visibility::Public, None);
        let alice = Id::new();
        let bob = Id::new();
        lobby.resolve(None, "Alice", alice).unwrap();
        lobby.resolve(None, "Bob", bob).unwrap();
        lobby.leave(bob, &Room::default(), Inboxes::default().finder());

        assert_eq!(
            lobby.resolve(None, "Carol", alice),
            Ok(Placement::Reused { previous: alice })
        );
        assert_eq!(lobby.slots()[0].display_name, "Carol");
        assert_eq!(lobby.slots()[1].identity, bob);
        assert!(lobby.slots()[1].disconnected);
        assert!(lobby.game().table().contains(bob));
    }

    #[test]
    fn test_recycler_does_not_become_creator() {
        let creator = Id::new();
        let mut lobby = Lobby::new(
            "room1".to_owned(),
            Visibility::Public,
            None,
            creator,
            "Alice".to_owned(),
            GameMode::WouldYouRather,
            &Options::default(),
        );
        lobby.resolve(None, "Alice", creator).unwrap();
        lobby.resolve(None, "Bob", Id::new()).unwrap();
        lobby.leave(creator, &Room::default(), Inboxes::default().finder());

        let mallory = Id::new();
        assert_eq!(
            lobby.resolve(None, "Mallory", mallory),
            Ok(Placement::Recycled { previous: creator })
        );
        assert_eq!(lobby.creator(), creator);
    }
}
