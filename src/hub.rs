//! The game server core
//!
//! [`Hub`] owns every session and lobby. The host feeds it connection events,
//! client messages, and fired alarms; the hub answers through the tunnels the
//! host hands it and asks the host to schedule alarms for the turn timers.

use std::time::Duration;

use enum_map::EnumMap;
use garde::Validate;
use serde::Deserialize;

use crate::{
    AlarmMessage, Error,
    broadcast::{Room, send_message, send_state},
    config::Options,
    directory::{self, Directory},
    game::{self, Submission},
    lobby::{self, Visibility, reconnect::Placement},
    mode::GameMode,
    names,
    registry::{Binding, Id, Sessions},
    session::Tunnel,
    timer,
};

/// Messages a client can send for one game mode
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingMessage {
    /// Create a lobby and join it
    CreateLobby {
        /// Lobby name
        name: String,
        /// Password, required for private lobbies
        password: Option<String>,
        /// Lobby visibility
        visibility: Visibility,
        /// Name to join with
        display_name: String,
    },
    /// Join an existing lobby
    JoinLobby {
        /// Lobby name
        lobby_name: String,
        /// Password, required for private lobbies
        password: Option<String>,
        /// Name to join with
        display_name: String,
    },
    /// Ask for the lobby list
    GetLobbies,
    /// Delete a lobby
    DeleteLobby {
        /// Lobby name
        lobby_name: String,
        /// Password, required for private lobbies
        password: Option<String>,
    },
    /// Post to the lobby chat
    ChatSend {
        /// Message text
        text: String,
    },
    /// Tell the lobby whether the sender is typing
    ChatTyping {
        /// Whether the sender is typing
        typing: bool,
    },
    /// Answer a question or complete a dare
    SubmitAnswer {
        /// Answer text
        answer: String,
        /// Image reference, required for dares
        image_url: Option<String>,
    },
    /// Pick an option of a would-you-rather prompt
    SubmitChoice {
        /// The option picked
        choice: String,
    },
    /// Submit two truths and a lie
    SubmitSet {
        /// The three statements
        statements: Vec<String>,
        /// Index of the lie among `statements`
        lie_index: usize,
    },
    /// Guess which shown statement is the lie
    SubmitGuess {
        /// Position in the shown order
        index: usize,
    },
}

/// Sessions and lobbies of every game mode
#[derive(Debug)]
pub struct Hub {
    options: Options,
    sessions: Sessions,
    directories: EnumMap<GameMode, Directory>,
}

impl Hub {
    /// Creates an empty hub
    ///
    /// # Errors
    ///
    /// Returns the validation report if `options` are out of bounds.
    pub fn new(options: Options) -> Result<Self, garde::Report> {
        options.validate()?;

        Ok(Self {
            options,
            sessions: Sessions::default(),
            directories: EnumMap::from_fn(Directory::new),
        })
    }

    /// The options the hub runs with
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Connected sessions and their bindings
    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// The lobbies of a mode
    pub fn directory(&self, mode: GameMode) -> &Directory {
        &self.directories[mode]
    }

    /// Registers a new connection
    pub fn connect(&mut self, id: Id) {
        log::debug!("session {id} connected");
        self.sessions.connect(id);
    }

    /// Handles a message from a connected session
    ///
    /// Failures are reported to the sender alone.
    ///
    /// # Arguments
    ///
    /// * `id` - Session that sent the message
    /// * `mode` - Game mode the message is addressed to
    /// * `message` - The message
    /// * `schedule_message` - Function to schedule timer alarms
    /// * `tunnel_finder` - Function to find the tunnel of a session
    pub fn receive_message<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        id: Id,
        mode: GameMode,
        message: IncomingMessage,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        if !self.sessions.is_connected(id) {
            log::warn!("message from unknown session {id} ignored");
            return;
        }

        let result = match message {
            IncomingMessage::CreateLobby {
                name,
                password,
                visibility,
                display_name,
            } => self.create_lobby(
                id,
                mode,
                &name,
                password,
                visibility,
                &display_name,
                &mut schedule_message,
                &tunnel_finder,
            ),
            IncomingMessage::JoinLobby {
                lobby_name,
                password,
                display_name,
            } => self.join_lobby(
                id,
                mode,
                &lobby_name,
                password.as_deref(),
                &display_name,
                &mut schedule_message,
                &tunnel_finder,
            ),
            IncomingMessage::GetLobbies => {
                send_message(&self.lobby_list(mode), id, &tunnel_finder);
                Ok(())
            }
            IncomingMessage::DeleteLobby {
                lobby_name,
                password,
            } => self.delete_lobby(id, mode, &lobby_name, password.as_deref(), &tunnel_finder),
            IncomingMessage::ChatSend { text } => self.chat(id, mode, &text, &tunnel_finder),
            IncomingMessage::ChatTyping { typing } => {
                self.typing(id, mode, typing, &tunnel_finder);
                Ok(())
            }
            IncomingMessage::SubmitAnswer { answer, image_url } => self.submit(
                id,
                mode,
                Submission::Answer { answer, image_url },
                &mut schedule_message,
                &tunnel_finder,
            ),
            IncomingMessage::SubmitChoice { choice } => self.submit(
                id,
                mode,
                Submission::Choice(choice),
                &mut schedule_message,
                &tunnel_finder,
            ),
            IncomingMessage::SubmitSet {
                statements,
                lie_index,
            } => self.submit(
                id,
                mode,
                Submission::Set {
                    statements,
                    lie_index,
                },
                &mut schedule_message,
                &tunnel_finder,
            ),
            IncomingMessage::SubmitGuess { index } => self.submit(
                id,
                mode,
                Submission::Guess(index),
                &mut schedule_message,
                &tunnel_finder,
            ),
        };

        if let Err(error) = result {
            log::debug!("{mode} request from {id} failed: {error}");
            send_message(
                &lobby::UpdateMessage::Error {
                    message: error.to_string(),
                }
                .into(),
                id,
                &tunnel_finder,
            );
        }
    }

    /// Handles a fired alarm
    ///
    /// Alarms for deleted lobbies or replaced timers are ignored.
    pub fn receive_alarm<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        message: AlarmMessage,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        match message {
            AlarmMessage::Timer(timer::AlarmMessage::Tick {
                mode,
                lobby: name,
                token,
            }) => {
                let room = Room::new(self.sessions.members(mode, &name));
                let Some(lobby) = self.directories[mode].get_mut(&name) else {
                    log::debug!("{mode} tick for missing lobby {name:?} ignored");
                    return;
                };
                lobby.receive_tick(token, &room, schedule_message, &tunnel_finder);
            }
        }
    }

    /// Handles a lost connection
    ///
    /// The session's seats are kept, marked as disconnected, so the player
    /// can take them back.
    pub fn disconnect<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, id: Id, tunnel_finder: F) {
        log::debug!("session {id} disconnected");

        for (mode, binding) in self.sessions.disconnect(id) {
            self.leave_lobby(id, mode, &binding.lobby, &tunnel_finder);
            self.broadcast_lobby_list(mode, &tunnel_finder);
        }
    }

    fn lobby_list(&self, mode: GameMode) -> crate::UpdateMessage {
        lobby::UpdateMessage::LobbyList {
            mode,
            lobbies: self.directories[mode].list(),
        }
        .into()
    }

    fn broadcast_lobby_list<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        mode: GameMode,
        tunnel_finder: F,
    ) {
        Room::new(self.sessions.connected()).announce(&self.lobby_list(mode), tunnel_finder);
    }

    fn leave_lobby<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        id: Id,
        mode: GameMode,
        lobby_name: &str,
        tunnel_finder: F,
    ) {
        let room = Room::new(self.sessions.members(mode, lobby_name));
        if let Some(lobby) = self.directories[mode].get_mut(lobby_name) {
            lobby.leave(id, &room, tunnel_finder);
        }
    }

    fn create_lobby<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        id: Id,
        mode: GameMode,
        name: &str,
        password: Option<String>,
        visibility: Visibility,
        display_name: &str,
        schedule_message: S,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        let name = names::lobby_name(name)?;
        let display_name = names::display_name(display_name)?;

        let lobby = self.directories[mode].create(
            &name,
            visibility,
            password,
            id,
            &display_name,
            &self.options,
        )?;
        let password = lobby.password().map(str::to_owned);

        log::info!("{mode} lobby {name:?} created by {display_name}");

        self.join_lobby(
            id,
            mode,
            &name,
            password.as_deref(),
            &display_name,
            schedule_message,
            tunnel_finder,
        )
    }

    fn join_lobby<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        id: Id,
        mode: GameMode,
        lobby_name: &str,
        password: Option<&str>,
        display_name: &str,
        schedule_message: S,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        let display_name = names::display_name(display_name)?;

        let lobby = self.directories[mode]
            .get_mut(lobby_name)
            .ok_or(directory::Error::NotFound)?;
        let placement = lobby.resolve(password, &display_name, id)?;

        log::info!("{mode} lobby {lobby_name:?}: {display_name} joined ({placement:?})");

        if let Placement::Reused { previous } | Placement::Recycled { previous } = placement {
            let displaced = previous != id
                && self
                    .sessions
                    .binding(previous, mode)
                    .is_some_and(|b| b.lobby == lobby_name);
            if displaced {
                self.sessions.unbind(previous, mode);
                send_message(
                    &lobby::UpdateMessage::SeatTaken {
                        message: format!(
                            "{display_name} joined {lobby_name} from another session"
                        ),
                    }
                    .into(),
                    previous,
                    &tunnel_finder,
                );
            }
        }

        let previous = self.sessions.bind(
            id,
            mode,
            Binding {
                lobby: lobby_name.to_owned(),
                display_name,
            },
        );
        if let Some(previous) = previous.filter(|b| b.lobby != lobby_name) {
            log::debug!("{id} left {mode} lobby {:?} for {lobby_name:?}", previous.lobby);
            self.leave_lobby(id, mode, &previous.lobby, &tunnel_finder);
        }

        let room = Room::new(self.sessions.members(mode, lobby_name));
        let lobby = self.directories[mode]
            .get_mut(lobby_name)
            .ok_or(directory::Error::NotFound)?;

        room.announce(
            &lobby::UpdateMessage::UpdatePlayers(lobby.slots().to_vec()).into(),
            &tunnel_finder,
        );
        send_state(&lobby.joined_message(), id, &tunnel_finder);
        lobby.settle_after_join(id, &room, schedule_message, &tunnel_finder);

        self.broadcast_lobby_list(mode, &tunnel_finder);

        Ok(())
    }

    fn delete_lobby<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        id: Id,
        mode: GameMode,
        lobby_name: &str,
        password: Option<&str>,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        let deleted = self.directories[mode].delete(lobby_name, id, password)?;

        log::info!(
            "{mode} lobby {lobby_name:?} deleted with {} seats",
            deleted.slots().len()
        );

        Room::new(self.sessions.evict(mode, lobby_name)).announce(
            &lobby::UpdateMessage::LobbyDeleted {
                message: format!("{lobby_name} was deleted."),
            }
            .into(),
            &tunnel_finder,
        );

        self.broadcast_lobby_list(mode, &tunnel_finder);

        Ok(())
    }

    fn chat<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        id: Id,
        mode: GameMode,
        text: &str,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        let Some(binding) = self.sessions.binding(id, mode) else {
            log::warn!("chat from {id} outside any {mode} lobby ignored");
            return Ok(());
        };
        let room = Room::new(self.sessions.members(mode, &binding.lobby));
        let Some(lobby) = self.directories[mode].get_mut(&binding.lobby) else {
            return Ok(());
        };

        lobby.post_chat(&binding.display_name, text, &room, tunnel_finder)?;

        Ok(())
    }

    fn typing<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        id: Id,
        mode: GameMode,
        typing: bool,
        tunnel_finder: F,
    ) {
        let Some(binding) = self.sessions.binding(id, mode) else {
            return;
        };

        Room::new(self.sessions.members(mode, &binding.lobby)).announce_except(
            id,
            &lobby::UpdateMessage::Typing {
                from: binding.display_name.clone(),
                typing,
            }
            .into(),
            tunnel_finder,
        );
    }

    fn submit<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        id: Id,
        mode: GameMode,
        submission: Submission,
        schedule_message: S,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        let silent = matches!(submission, Submission::Set { .. } | Submission::Guess(_));

        let Some(binding) = self.sessions.binding(id, mode) else {
            if silent {
                return Ok(());
            }
            return Err(game::Error::InvalidSubmission.into());
        };
        let room = Room::new(self.sessions.members(mode, &binding.lobby));
        let Some(lobby) = self.directories[mode].get_mut(&binding.lobby) else {
            return Ok(());
        };

        lobby.submit(id, submission, &room, schedule_message, tunnel_finder)?;

        Ok(())
    }
}
