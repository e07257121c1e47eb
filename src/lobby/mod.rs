//! Lobbies and their round lifecycle
//!
//! A [`Lobby`] owns its seats, its game, and its turn timer. The methods here
//! push every change to the lobby's broadcast [`Room`] and re-arm the timer
//! as rounds start and finish.

pub mod reconnect;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
    broadcast::{Room, send_message},
    chat::{self, ChatMessage},
    config::Options,
    constants,
    game::{self, GameState, GameView, Outcome, Submission},
    mode::GameMode,
    registry::Id,
    session::Tunnel,
    timer::{Tick, Timer},
};

/// Who can find and enter a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Anyone may join without a password
    Public,
    /// Joining and deleting need the lobby password
    Private,
}

/// A seat in a lobby, kept after disconnects so it can be reclaimed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSlot {
    /// Identity currently holding the seat
    pub identity: Id,
    /// Name the seat was taken with
    pub display_name: String,
    /// Whether the holder's connection is gone
    pub disconnected: bool,
}

/// A lobby as shown in the lobby list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LobbySummary {
    /// Lobby name
    pub name: String,
    /// Lobby visibility
    pub visibility: Visibility,
    /// Number of connected seats
    pub live_count: usize,
    /// Display name of the creator
    pub creator: String,
}

/// Update messages about lobbies and their shared state
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// The lobbies of one mode
    LobbyList {
        /// Mode the lobbies belong to
        mode: GameMode,
        /// Lobbies, ordered by name
        lobbies: Vec<LobbySummary>,
    },
    /// The lobby's seats changed
    UpdatePlayers(Vec<PlayerSlot>),
    /// The turn changed hands
    TurnUpdate {
        /// Identity holding the turn
        identity: Option<Id>,
        /// Name of the turn holder
        display_name: Option<String>,
    },
    /// Seconds left on the turn timer
    UpdateTimer(u64),
    /// The turn holder left and the timer is frozen
    TurnPaused {
        /// Human-readable notice
        message: String,
    },
    /// The recipient's turn ran out
    Timeout,
    /// A chat message was posted
    Chat(ChatMessage),
    /// Someone started or stopped typing
    Typing {
        /// Name of the typist
        from: String,
        /// Whether they are typing
        typing: bool,
    },
    /// The lobby the recipient was in is gone
    LobbyDeleted {
        /// Human-readable notice
        message: String,
    },
    /// Another session took over the recipient's seat
    SeatTaken {
        /// Human-readable notice
        message: String,
    },
    /// A request from the recipient failed
    Error {
        /// Human-readable reason
        message: String,
    },
}

/// Full state sent to a session that joins a lobby
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// The recipient is now seated in the lobby
    LobbyJoined {
        /// Lobby name
        lobby_name: String,
        /// Game state without internal handles
        game_state: GameView,
        /// The lobby's seats
        players: Vec<PlayerSlot>,
    },
}

/// A named game session
#[derive(Debug)]
pub struct Lobby {
    name: String,
    visibility: Visibility,
    password: Option<String>,
    creator: Id,
    creator_name: String,
    players: Vec<PlayerSlot>,
    game: GameState,
    timer: Timer,
    turn_duration: Duration,
}

impl Lobby {
    /// Creates an empty lobby hosting a fresh game of `mode`
    pub fn new(
        name: String,
        visibility: Visibility,
        password: Option<String>,
        creator: Id,
        creator_name: String,
        mode: GameMode,
        options: &Options,
    ) -> Self {
        Self {
            name,
            visibility,
            password,
            creator,
            creator_name,
            players: Vec::new(),
            game: GameState::new(mode, options),
            timer: Timer::default(),
            turn_duration: options.turn_duration(mode),
        }
    }

    /// Lobby name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mode of the hosted game
    pub fn mode(&self) -> GameMode {
        self.game.mode()
    }

    /// Lobby visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Lobby password, set only on private lobbies
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Identity allowed to delete the lobby while it is public
    pub fn creator(&self) -> Id {
        self.creator
    }

    /// Seats in join order
    pub fn slots(&self) -> &[PlayerSlot] {
        &self.players
    }

    /// The hosted game
    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// The turn timer
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Connected identities in seat order
    pub fn live_identities(&self) -> Vec<Id> {
        self.players
            .iter()
            .filter(|slot| !slot.disconnected)
            .map(|slot| slot.identity)
            .collect()
    }

    /// Number of connected seats
    pub fn live_count(&self) -> usize {
        self.players.iter().filter(|slot| !slot.disconnected).count()
    }

    /// Entry for the lobby list
    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            name: self.name.clone(),
            visibility: self.visibility,
            live_count: self.live_count(),
            creator: self.creator_name.clone(),
        }
    }

    /// State snapshot for a joining session
    pub fn joined_message(&self) -> crate::SyncMessage {
        SyncMessage::LobbyJoined {
            lobby_name: self.name.clone(),
            game_state: self.game.view(&self.timer),
            players: self.players.clone(),
        }
        .into()
    }

    fn turn_update(&self) -> crate::UpdateMessage {
        let holder = self.game.table().turn_holder();
        UpdateMessage::TurnUpdate {
            identity: holder.map(|p| p.identity),
            display_name: holder.map(|p| p.display_name.clone()),
        }
        .into()
    }

    fn timer_update(&self) -> crate::UpdateMessage {
        UpdateMessage::UpdateTimer(self.timer.time_left()).into()
    }

    /// Starts a round for the turn holder and arms the timer
    pub fn start_round<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        room: &Room,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        let Some(announcement) = self.game.machine_mut().begin_round() else {
            log::warn!("{} lobby {:?}: no round could start", self.mode(), self.name);
            self.timer.cancel();
            return;
        };

        self.timer.start(
            self.turn_duration,
            self.mode(),
            &self.name,
            schedule_message,
        );

        log::debug!("{} lobby {:?}: round started", self.mode(), self.name);

        room.announce(&self.turn_update(), &tunnel_finder);
        room.announce(&announcement, &tunnel_finder);
        room.announce(&self.timer_update(), &tunnel_finder);
    }

    /// Applies what a submission or expiry did to the round
    ///
    /// A finished round passes the turn on and starts the next one, unless
    /// fewer than two seats are live, in which case the rotation halts.
    pub fn apply<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        outcome: Outcome,
        room: &Room,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        match outcome {
            Outcome::Ignored => {}
            Outcome::PhaseChanged(message) => {
                self.timer.start(
                    self.turn_duration,
                    self.mode(),
                    &self.name,
                    schedule_message,
                );
                room.announce(&message, &tunnel_finder);
                room.announce(&self.timer_update(), &tunnel_finder);
            }
            Outcome::Completed(messages) => {
                self.timer.cancel();
                for message in &messages {
                    room.announce(message, &tunnel_finder);
                }

                let live = self.live_identities();
                if self.game.table_mut().advance_turn(&live) {
                    self.start_round(room, schedule_message, tunnel_finder);
                } else {
                    log::debug!(
                        "{} lobby {:?}: rotation halted with {} live",
                        self.mode(),
                        self.name,
                        live.len()
                    );
                    room.announce(&self.turn_update(), &tunnel_finder);
                }
            }
        }
    }

    /// Routes a player's submission to the game
    ///
    /// # Errors
    ///
    /// Returns the game's rejection of the submission.
    pub fn submit<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        identity: Id,
        submission: Submission,
        room: &Room,
        schedule_message: S,
        tunnel_finder: F,
    ) -> Result<(), game::Error> {
        let live = self.live_identities();
        let outcome = self.game.submit(identity, submission, &live)?;
        self.apply(outcome, room, schedule_message, tunnel_finder);
        Ok(())
    }

    /// Handles one tick of the turn timer
    pub fn receive_tick<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        token: Id,
        room: &Room,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        match self.timer.tick(token) {
            Tick::Stale => {
                log::debug!("{} lobby {:?}: stale tick", self.mode(), self.name);
            }
            Tick::Paused => {
                self.timer
                    .schedule_tick(self.mode(), &self.name, &mut schedule_message);
            }
            Tick::Remaining(_) => {
                room.announce(&self.timer_update(), &tunnel_finder);
                self.timer
                    .schedule_tick(self.mode(), &self.name, &mut schedule_message);
            }
            Tick::Expired => {
                room.announce(&self.timer_update(), &tunnel_finder);
                self.expire(room, schedule_message, tunnel_finder);
            }
        }
    }

    /// Ends the round in flight because the turn ran out
    pub fn expire<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        room: &Room,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        log::debug!("{} lobby {:?}: turn timed out", self.mode(), self.name);

        if let Some(holder) = self.game.table().current_turn() {
            send_message(&UpdateMessage::Timeout.into(), holder, &tunnel_finder);
        }

        let outcome = self.game.machine_mut().expire();
        self.apply(outcome, room, schedule_message, tunnel_finder);
    }

    /// Brings the game up to date after `joiner` took a seat
    ///
    /// Once two seats are live the rotation is started, resumed, or
    /// restarted as needed. The joiner always ends up with the current turn
    /// and the round in flight.
    pub fn settle_after_join<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        joiner: Id,
        room: &Room,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        let has_turn = self.game.table_mut().repair_turn();
        let live = self.live_identities();

        let announced = if live.len() < constants::lobby::MAX_LIVE_PLAYERS {
            false
        } else if !has_turn {
            self.game.table_mut().set_turn(live[0]);
            self.start_round(room, schedule_message, &tunnel_finder);
            true
        } else if self.timer.is_paused() {
            self.timer.resume();
            log::debug!("{} lobby {:?}: timer resumed", self.mode(), self.name);
            room.announce(&self.turn_update(), &tunnel_finder);
            if let Some(content) = self.game.machine().in_flight() {
                room.announce(&content, &tunnel_finder);
            }
            room.announce(&self.timer_update(), &tunnel_finder);
            true
        } else if !self.game.machine().round_in_progress() {
            self.start_round(room, schedule_message, &tunnel_finder);
            true
        } else {
            false
        };

        if announced {
            return;
        }

        if self.game.table().current_turn().is_some() {
            send_message(&self.turn_update(), joiner, &tunnel_finder);
        }
        if let Some(content) = self.game.machine().in_flight() {
            send_message(&content, joiner, &tunnel_finder);
        }
        if self.timer.is_running() {
            send_message(&self.timer_update(), joiner, &tunnel_finder);
        }
    }

    /// Marks a seat as disconnected
    ///
    /// Pauses the timer if the seat held the turn, and stops the game when no
    /// live seat is left. Returns whether `identity` held a live seat.
    pub fn leave<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        identity: Id,
        room: &Room,
        tunnel_finder: F,
    ) -> bool {
        let Some(slot) = self
            .players
            .iter_mut()
            .find(|slot| slot.identity == identity && !slot.disconnected)
        else {
            return false;
        };
        slot.disconnected = true;
        let display_name = slot.display_name.clone();

        log::info!(
            "{} lobby {:?}: {display_name} disconnected",
            self.mode(),
            self.name
        );

        if self.game.table().current_turn() == Some(identity) && self.timer.is_running() {
            self.timer.pause();
            room.announce(
                &UpdateMessage::TurnPaused {
                    message: format!("{display_name} disconnected. Turn paused."),
                }
                .into(),
                &tunnel_finder,
            );
        }

        room.announce(
            &UpdateMessage::UpdatePlayers(self.players.clone()).into(),
            &tunnel_finder,
        );

        if self.live_count() == 0 {
            log::debug!("{} lobby {:?}: nobody left, game stopped", self.mode(), self.name);
            self.timer.cancel();
            self.game.machine_mut().clear_round();
            self.game.table_mut().clear_turn();
        }

        true
    }

    /// Posts a chat message from `display_name` to the lobby
    ///
    /// # Errors
    ///
    /// Returns why the text was rejected.
    pub fn post_chat<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        display_name: &str,
        text: &str,
        room: &Room,
        tunnel_finder: F,
    ) -> Result<(), chat::Error> {
        let message = ChatMessage::new(display_name, text)?;
        self.game.table_mut().post(message.clone());
        room.announce(&UpdateMessage::Chat(message).into(), tunnel_finder);
        Ok(())
    }
}
