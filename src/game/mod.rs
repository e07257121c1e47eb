//! Turn-based game state
//!
//! Every mode shares a [`Table`]: the seated players, whose turn it is, and
//! the lobby chat. The mode-specific state machines live in the submodules
//! and are driven through the [`Machine`] trait, so the lobby can start,
//! expire, and re-announce rounds without knowing which game it hosts.

pub mod question_dare;
pub mod two_truths;
pub mod would_you_rather;

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::{
    bounded::Bounded, chat::ChatMessage, config::Options, mode::GameMode, registry::Id,
    timer::Timer,
};

/// Errors that can occur when submitting to a round
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A dare was completed without an image reference
    #[error("an image is required to complete a dare")]
    ImageRequired,
    /// The submission is malformed or not expected from this player now
    #[error("submission is not valid right now")]
    InvalidSubmission,
}

/// A seated player as the game sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Current connection identity of the player
    pub identity: Id,
    /// Name the player joined with
    pub display_name: String,
}

/// State shared by every mode
#[derive(Debug, Clone)]
pub struct Table {
    players: HashMap<Id, Player>,
    current_turn: Option<Id>,
    chat: Bounded<ChatMessage>,
}

/// Externally visible part of a [`Table`], together with the timer reading
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    /// Seated players, ordered by name
    pub players: Vec<Player>,
    /// Identity holding the turn
    pub current_turn: Option<Id>,
    /// Seconds left on the turn timer
    pub time_left: u64,
    /// Whether the turn timer is paused
    pub timer_paused: bool,
    /// Chat log, oldest first
    pub chat: Vec<ChatMessage>,
}

impl Table {
    /// Creates an empty table with a bounded chat log
    pub fn new(chat_limit: usize) -> Self {
        Self {
            players: HashMap::new(),
            current_turn: None,
            chat: Bounded::new(chat_limit),
        }
    }

    /// Seats a player
    pub fn add_player(&mut self, identity: Id, display_name: &str) {
        self.players.insert(
            identity,
            Player {
                identity,
                display_name: display_name.to_owned(),
            },
        );
    }

    /// Whether the identity has a seat
    pub fn contains(&self, identity: Id) -> bool {
        self.players.contains_key(&identity)
    }

    /// Gets a seated player
    pub fn player(&self, identity: Id) -> Option<&Player> {
        self.players.get(&identity)
    }

    /// Display name of a seated player
    pub fn display_name(&self, identity: Id) -> Option<&str> {
        self.player(identity).map(|p| p.display_name.as_str())
    }

    /// Moves a seat from one identity to another
    ///
    /// The turn pointer follows the seat. Returns `false`, changing nothing,
    /// if `old` has no seat or `new` already holds a different one.
    pub fn migrate_identity(&mut self, old: Id, new: Id, display_name: &str) -> bool {
        if new != old && self.players.contains_key(&new) {
            return false;
        }

        let Some(mut player) = self.players.remove(&old) else {
            return false;
        };

        player.identity = new;
        display_name.clone_into(&mut player.display_name);
        self.players.insert(new, player);

        if self.current_turn == Some(old) {
            self.current_turn = Some(new);
        }

        true
    }

    /// Identity holding the turn
    pub fn current_turn(&self) -> Option<Id> {
        self.current_turn
    }

    /// The player holding the turn
    pub fn turn_holder(&self) -> Option<&Player> {
        self.current_turn.and_then(|id| self.player(id))
    }

    /// Gives the turn to a seated player
    ///
    /// Returns `false`, changing nothing, if the identity has no seat.
    pub fn set_turn(&mut self, identity: Id) -> bool {
        if !self.contains(identity) {
            return false;
        }
        self.current_turn = Some(identity);
        true
    }

    /// Clears the turn pointer
    pub fn clear_turn(&mut self) {
        self.current_turn = None;
    }

    /// Drops a turn pointer that no longer names a seat
    ///
    /// Returns whether a valid turn remains.
    pub fn repair_turn(&mut self) -> bool {
        if self.current_turn.is_some_and(|id| !self.contains(id)) {
            log::warn!("dropping turn pointer to a missing seat");
            self.current_turn = None;
        }
        self.current_turn.is_some()
    }

    /// Passes the turn round-robin over the live identities
    ///
    /// With fewer than two live seats, the turn goes to the sole live seat
    /// (or nobody) and `false` is returned: the rotation halts.
    pub fn advance_turn(&mut self, live: &[Id]) -> bool {
        let live = live
            .iter()
            .copied()
            .filter(|id| self.contains(*id))
            .collect_vec();

        if live.len() < 2 {
            self.current_turn = live.first().copied();
            return false;
        }

        let next = match self
            .current_turn
            .and_then(|turn| live.iter().position(|id| *id == turn))
        {
            Some(index) => live[(index + 1) % live.len()],
            None => live[0],
        };
        self.current_turn = Some(next);

        true
    }

    /// Appends to the chat log
    pub fn post(&mut self, message: ChatMessage) {
        self.chat.push_back(message);
    }

    /// Chat log, oldest first
    pub fn chat(&self) -> &Bounded<ChatMessage> {
        &self.chat
    }

    /// Externally visible state, with the timer reduced to its reading
    pub fn view(&self, timer: &Timer) -> TableView {
        TableView {
            players: self
                .players
                .values()
                .sorted_by(|a, b| a.display_name.cmp(&b.display_name))
                .cloned()
                .collect_vec(),
            current_turn: self.current_turn,
            time_left: timer.time_left(),
            timer_paused: timer.is_paused(),
            chat: self.chat.to_vec(),
        }
    }
}

/// What a submission or expiry did to the round
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Nothing changed
    Ignored,
    /// The round moved to its next phase and the timer restarts
    PhaseChanged(crate::UpdateMessage),
    /// The round finished and the turn passes on
    Completed(Vec<crate::UpdateMessage>),
}

/// A player's move in the current round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Answer to a question or completion of a dare
    Answer {
        /// Answer text
        answer: String,
        /// Optional image reference, required for dares
        image_url: Option<String>,
    },
    /// Pick in a would-you-rather prompt
    Choice(String),
    /// Two truths and a lie
    Set {
        /// The statements in original order
        statements: Vec<String>,
        /// Index of the lie among `statements`
        lie_index: usize,
    },
    /// Position of the suspected lie in the shown order
    Guess(usize),
}

impl GameState {
    /// Routes a submission to the hosted game
    ///
    /// `live` are the identities currently connected to the lobby.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidSubmission` - An answer or choice the hosted game does
    ///   not accept now
    /// * `Error::ImageRequired` - A dare completion without an image reference
    pub fn submit(
        &mut self,
        identity: Id,
        submission: Submission,
        live: &[Id],
    ) -> Result<Outcome, Error> {
        match (self, submission) {
            (Self::QuestionDare(s), Submission::Answer { answer, image_url }) => {
                s.submit_answer(identity, &answer, image_url.as_deref())
            }
            (Self::WouldYouRather(s), Submission::Choice(choice)) => {
                s.submit_choice(identity, &choice)
            }
            (
                Self::TwoTruths(s),
                Submission::Set {
                    statements,
                    lie_index,
                },
            ) => Ok(s.submit_set(identity, statements, lie_index, live)),
            (Self::TwoTruths(s), Submission::Guess(position)) => {
                Ok(s.submit_guess(identity, position))
            }
            (_, Submission::Set { .. } | Submission::Guess(_)) => Ok(Outcome::Ignored),
            (_, Submission::Answer { .. } | Submission::Choice(_)) => {
                Err(Error::InvalidSubmission)
            }
        }
    }
}

/// A mode's round state machine
pub trait Machine {
    /// Shared table state
    fn table(&self) -> &Table;

    /// Shared table state, mutably
    fn table_mut(&mut self) -> &mut Table;

    /// Starts a round for the turn holder and returns its announcement
    ///
    /// Returns `None` when no round can start.
    fn begin_round(&mut self) -> Option<crate::UpdateMessage>;

    /// Announcement of the round in flight, for re-delivery
    fn in_flight(&self) -> Option<crate::UpdateMessage>;

    /// Whether a round is waiting on a submission
    fn round_in_progress(&self) -> bool;

    /// Drops the round in flight without recording it
    fn clear_round(&mut self);

    /// Records the round in flight as timed out and finishes it
    fn expire(&mut self) -> Outcome;

    /// Moves a seat and everything attributed to it to a new identity
    fn migrate_identity(&mut self, old: Id, new: Id, display_name: &str) -> bool;
}

/// The game a lobby hosts
#[derive(Debug, Clone, derive_more::From)]
pub enum GameState {
    /// Question/dare game
    QuestionDare(question_dare::State),
    /// Would-you-rather game
    WouldYouRather(would_you_rather::State),
    /// Two truths one lie game
    TwoTruths(two_truths::State),
}

/// Externally visible game state
#[derive(Debug, Clone, Serialize, derive_more::From)]
pub enum GameView {
    /// Question/dare view
    QuestionDare(question_dare::View),
    /// Would-you-rather view
    WouldYouRather(would_you_rather::View),
    /// Two truths one lie view
    TwoTruths(two_truths::View),
}

impl GameState {
    /// Creates an empty game for a mode
    pub fn new(mode: GameMode, options: &Options) -> Self {
        let (chat, history) = (options.chat_history_limit(), options.history_limit());
        match mode {
            GameMode::QuestionDare => question_dare::State::new(chat, history).into(),
            GameMode::WouldYouRather => would_you_rather::State::new(chat, history).into(),
            GameMode::TwoTruths => two_truths::State::new(chat, history).into(),
        }
    }

    /// Mode of the hosted game
    pub fn mode(&self) -> GameMode {
        match self {
            Self::QuestionDare(_) => GameMode::QuestionDare,
            Self::WouldYouRather(_) => GameMode::WouldYouRather,
            Self::TwoTruths(_) => GameMode::TwoTruths,
        }
    }

    /// The mode's state machine
    pub fn machine(&self) -> &dyn Machine {
        match self {
            Self::QuestionDare(s) => s,
            Self::WouldYouRather(s) => s,
            Self::TwoTruths(s) => s,
        }
    }

    /// The mode's state machine, mutably
    pub fn machine_mut(&mut self) -> &mut dyn Machine {
        match self {
            Self::QuestionDare(s) => s,
            Self::WouldYouRather(s) => s,
            Self::TwoTruths(s) => s,
        }
    }

    /// Shared table state
    pub fn table(&self) -> &Table {
        self.machine().table()
    }

    /// Shared table state, mutably
    pub fn table_mut(&mut self) -> &mut Table {
        self.machine_mut().table_mut()
    }

    /// Externally visible state
    pub fn view(&self, timer: &Timer) -> GameView {
        match self {
            Self::QuestionDare(s) => s.view(timer).into(),
            Self::WouldYouRather(s) => s.view(timer).into(),
            Self::TwoTruths(s) => s.view(timer).into(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn table_with(ids: &[Id]) -> Table {
        let mut table = Table::new(10);
        for (i, id) in ids.iter().enumerate() {
            table.add_player(*id, &format!("p{i}"));
        }
        table
    }

    #[test]
    fn test_advance_turn_round_robin() {
        let (a, b) = (Id::new(), Id::new());
        let mut table = table_with(&[a, b]);
        table.set_turn(a);

        assert!(table.advance_turn(&[a, b]));
        assert_eq!(table.current_turn(), Some(b));
        assert!(table.advance_turn(&[a, b]));
        assert_eq!(table.current_turn(), Some(a));
    }

    #[test]
    fn test_advance_turn_from_missing_pointer_starts_at_first() {
        let (a, b) = (Id::new(), Id::new());
        let mut table = table_with(&[a, b]);

        assert!(table.advance_turn(&[b, a]));
        assert_eq!(table.current_turn(), Some(b));
    }

    #[test]
    fn test_advance_turn_halts_below_two_live() {
        let (a, b) = (Id::new(), Id::new());
        let mut table = table_with(&[a, b]);
        table.set_turn(a);

        assert!(!table.advance_turn(&[b]));
        assert_eq!(table.current_turn(), Some(b));

        assert!(!table.advance_turn(&[]));
        assert_eq!(table.current_turn(), None);
    }

    #[test]
    fn test_advance_turn_ignores_unseated_identities() {
        let (a, b) = (Id::new(), Id::new());
        let mut table = table_with(&[a]);

        assert!(!table.advance_turn(&[a, b]));
        assert_eq!(table.current_turn(), Some(a));
    }

    #[test]
    fn test_migrate_identity_moves_turn() {
        let (a, b) = (Id::new(), Id::new());
        let mut table = table_with(&[a]);
        table.set_turn(a);

        assert!(table.migrate_identity(a, b, "Alicia"));
        assert!(!table.contains(a));
        assert_eq!(table.current_turn(), Some(b));
        assert_eq!(table.display_name(b), Some("Alicia"));
        assert!(!table.migrate_identity(a, b, "Alicia"));
    }

    #[test]
    fn test_migrate_identity_refuses_taken_identity() {
        let (a, b) = (Id::new(), Id::new());
        let mut table = table_with(&[a, b]);
        table.set_turn(b);

        assert!(!table.migrate_identity(a, b, "Bobby"));
        assert!(table.contains(a));
        assert_eq!(table.display_name(a), Some("p0"));
        assert_eq!(table.display_name(b), Some("p1"));
        assert_eq!(table.current_turn(), Some(b));

        assert!(table.migrate_identity(a, a, "Alicia"));
        assert_eq!(table.display_name(a), Some("Alicia"));
    }

    #[test]
    fn test_set_turn_requires_seat() {
        let mut table = Table::new(10);
        assert!(!table.set_turn(Id::new()));
        assert_eq!(table.current_turn(), None);
        assert!(!table.repair_turn());
    }

    #[test]
    fn test_view_reads_timer() {
        let a = Id::new();
        let table = table_with(&[a]);
        let view = table.view(&Timer::default());
        assert_eq!(view.players.len(), 1);
        assert_eq!(view.time_left, 0);
        assert!(!view.timer_paused);
    }

    #[test]
    fn test_submission_routing_by_mode() {
        let a = Id::new();
        let mut game = GameState::new(GameMode::WouldYouRather, &Options::default());

        assert_eq!(
            game.submit(
                a,
                Submission::Answer {
                    answer: "yes".to_owned(),
                    image_url: None,
                },
                &[a],
            )
            .unwrap_err(),
            Error::InvalidSubmission
        );
        assert!(matches!(
            game.submit(a, Submission::Guess(0), &[a]),
            Ok(Outcome::Ignored)
        ));
        assert_eq!(
            game.submit(a, Submission::Choice("A".to_owned()), &[a])
                .unwrap_err(),
            Error::InvalidSubmission
        );
    }

    #[test]
    fn test_new_game_matches_mode() {
        for mode in GameMode::ALL {
            let game = GameState::new(mode, &Options::default());
            assert_eq!(game.mode(), mode);
            assert!(!game.machine().round_in_progress());
            assert!(game.table().current_turn().is_none());
        }
    }
}
