//! Two truths one lie game
//!
//! The turn holder writes three statements and marks which one is the lie.
//! The partner sees them in shuffled order and has to point at the lie.

use serde::Serialize;
use serde_with::skip_serializing_none;
use web_time::SystemTime;

use super::{Machine, Outcome, Table, TableView};
use crate::{
    bounded::Bounded,
    chat::escape_html,
    constants::submission::{MAX_TEXT_LENGTH, STATEMENT_COUNT},
    registry::Id,
    timer::Timer,
};

/// A submitted set of statements, as shown to the guesser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set {
    owner: Id,
    guesser: Id,
    statements: [String; STATEMENT_COUNT],
    lie_index: usize,
    shuffled: [String; STATEMENT_COUNT],
    shuffle_map: [usize; STATEMENT_COUNT],
}

impl Set {
    /// Creates a set shown in a random order
    pub fn new(
        owner: Id,
        guesser: Id,
        statements: [String; STATEMENT_COUNT],
        lie_index: usize,
    ) -> Self {
        let mut shuffle_map = [0, 1, 2];
        fastrand::shuffle(&mut shuffle_map);
        Self::with_permutation(owner, guesser, statements, lie_index, shuffle_map)
    }

    /// Creates a set shown in a given order
    ///
    /// `shuffle_map[position]` is the original index of the statement shown
    /// at `position`.
    pub fn with_permutation(
        owner: Id,
        guesser: Id,
        statements: [String; STATEMENT_COUNT],
        lie_index: usize,
        shuffle_map: [usize; STATEMENT_COUNT],
    ) -> Self {
        let shuffled = shuffle_map.map(|original| statements[original].clone());
        Self {
            owner,
            guesser,
            statements,
            lie_index,
            shuffled,
            shuffle_map,
        }
    }

    /// Whether the statement shown at `position` is the lie
    pub fn score_guess(&self, position: usize) -> Option<bool> {
        self.shuffle_map
            .get(position)
            .map(|original| *original == self.lie_index)
    }

    /// Statements in the order they are shown
    pub fn shuffled(&self) -> &[String] {
        &self.shuffled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingSet,
    AwaitingGuess(Set),
}

/// A finished round
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Identity of the player who wrote the set
    pub owner: Id,
    /// Name of the player who wrote the set
    pub owner_name: String,
    /// The statements in their original order, empty if none were submitted
    pub statements: Vec<String>,
    /// Original index of the lie
    pub lie_index: Option<usize>,
    /// Identity of the designated guesser
    pub guesser: Option<Id>,
    /// Name of the designated guesser
    pub guesser_name: Option<String>,
    /// Original index of the guessed statement
    pub guess_index: Option<usize>,
    /// Whether the guess found the lie
    pub correct: bool,
    /// Whether the phase ran out without a submission
    pub timed_out: bool,
    /// When the round finished
    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

/// Update messages for the two truths one lie game
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// The turn holder has to write a set
    AwaitingSet {
        /// Identity that has to write
        current_turn: Id,
    },
    /// A set was submitted and awaits a guess
    NewSet {
        /// Identity that wrote it
        owner: Id,
        /// Statements in shown order, the lie is not revealed
        statements: Vec<String>,
        /// Identity that has to guess
        guesser: Id,
    },
    /// The round finished
    RoundCompleted(Record),
}

/// The set in flight, without its answer
#[derive(Debug, Clone, Serialize)]
pub struct SetView {
    /// Identity that wrote it
    pub owner: Id,
    /// Statements in shown order
    pub statements: Vec<String>,
    /// Identity that has to guess
    pub guesser: Id,
}

/// Phase names as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseView {
    /// No round in flight
    Idle,
    /// Waiting for the turn holder's set
    AwaitingSet,
    /// Waiting for the guesser
    AwaitingGuess,
}

/// Externally visible two truths one lie state
#[derive(Debug, Clone, Serialize)]
pub struct View {
    /// Shared state
    #[serde(flatten)]
    pub table: TableView,
    /// Current phase
    pub phase: PhaseView,
    /// Set in flight
    pub current_set: Option<SetView>,
    /// Finished rounds, newest first
    pub history: Vec<Record>,
}

/// Two truths one lie game state
#[derive(Debug, Clone)]
pub struct State {
    table: Table,
    phase: Phase,
    history: Bounded<Record>,
}

impl State {
    /// Creates an idle game
    pub fn new(chat_limit: usize, history_limit: usize) -> Self {
        Self {
            table: Table::new(chat_limit),
            phase: Phase::Idle,
            history: Bounded::new(history_limit),
        }
    }

    /// Finished rounds, newest first
    pub fn history(&self) -> &Bounded<Record> {
        &self.history
    }

    /// Picks who guesses a set written by `owner`
    ///
    /// The first live seat other than the owner, falling back to any other
    /// seat.
    fn guesser(&self, owner: Id, live: &[Id]) -> Option<Id> {
        live.iter()
            .copied()
            .find(|id| *id != owner && self.table.contains(*id))
            .or_else(|| {
                let mut seated = self
                    .table
                    .players
                    .keys()
                    .copied()
                    .filter(|id| *id != owner)
                    .collect::<Vec<_>>();
                seated.sort();
                seated.first().copied()
            })
    }

    /// Handles the turn holder's set
    ///
    /// Submissions out of phase, out of turn, with the wrong number of
    /// statements, an empty or overlong statement, or a lie index out of range
    /// are ignored.
    pub fn submit_set(
        &mut self,
        identity: Id,
        statements: Vec<String>,
        lie_index: usize,
        live: &[Id],
    ) -> Outcome {
        if self.phase != Phase::AwaitingSet || self.table.current_turn() != Some(identity) {
            return Outcome::Ignored;
        }
        let Ok(statements) = <[String; STATEMENT_COUNT]>::try_from(statements) else {
            return Outcome::Ignored;
        };
        if lie_index >= STATEMENT_COUNT
            || statements
                .iter()
                .any(|s| s.trim().is_empty() || s.len() > MAX_TEXT_LENGTH)
        {
            return Outcome::Ignored;
        }
        let Some(guesser) = self.guesser(identity, live) else {
            return Outcome::Ignored;
        };

        let set = Set::new(
            identity,
            guesser,
            statements.map(|s| escape_html(s.trim())),
            lie_index,
        );
        let message = UpdateMessage::NewSet {
            owner: identity,
            statements: set.shuffled().to_vec(),
            guesser,
        };
        self.phase = Phase::AwaitingGuess(set);

        log::debug!("set submitted by {identity}, {guesser} is guessing");

        Outcome::PhaseChanged(message.into())
    }

    /// Handles the guesser's pick
    ///
    /// Guesses out of phase, from anyone but the designated guesser, or at a
    /// position out of range are ignored.
    pub fn submit_guess(&mut self, identity: Id, position: usize) -> Outcome {
        let Phase::AwaitingGuess(set) = &self.phase else {
            return Outcome::Ignored;
        };
        if set.guesser != identity || position >= STATEMENT_COUNT {
            return Outcome::Ignored;
        }

        let Phase::AwaitingGuess(set) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return Outcome::Ignored;
        };
        let record = self.record_guess(set, Some(position), false);

        Outcome::Completed(vec![UpdateMessage::RoundCompleted(record).into()])
    }

    fn record_guess(&mut self, set: Set, position: Option<usize>, timed_out: bool) -> Record {
        let correct = position
            .and_then(|p| set.score_guess(p))
            .unwrap_or(false);
        let record = Record {
            owner: set.owner,
            owner_name: self.name_of(set.owner),
            lie_index: Some(set.lie_index),
            guesser: Some(set.guesser),
            guesser_name: Some(self.name_of(set.guesser)),
            guess_index: position.and_then(|p| set.shuffle_map.get(p).copied()),
            correct,
            timed_out,
            timestamp: SystemTime::now(),
            statements: set.statements.into(),
        };
        self.history.push_front(record.clone());
        record
    }

    fn name_of(&self, identity: Id) -> String {
        self.table
            .display_name(identity)
            .unwrap_or_default()
            .to_owned()
    }

    /// Externally visible state
    pub fn view(&self, timer: &Timer) -> View {
        let (phase, current_set) = match &self.phase {
            Phase::Idle => (PhaseView::Idle, None),
            Phase::AwaitingSet => (PhaseView::AwaitingSet, None),
            Phase::AwaitingGuess(set) => (
                PhaseView::AwaitingGuess,
                Some(SetView {
                    owner: set.owner,
                    statements: set.shuffled().to_vec(),
                    guesser: set.guesser,
                }),
            ),
        };
        View {
            table: self.table.view(timer),
            phase,
            current_set,
            history: self.history.to_vec(),
        }
    }
}

impl Machine for State {
    fn table(&self) -> &Table {
        &self.table
    }

    fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    fn begin_round(&mut self) -> Option<crate::UpdateMessage> {
        self.table.current_turn()?;
        self.phase = Phase::AwaitingSet;
        self.in_flight()
    }

    fn in_flight(&self) -> Option<crate::UpdateMessage> {
        match &self.phase {
            Phase::Idle => None,
            Phase::AwaitingSet => Some(
                UpdateMessage::AwaitingSet {
                    current_turn: self.table.current_turn()?,
                }
                .into(),
            ),
            Phase::AwaitingGuess(set) => Some(
                UpdateMessage::NewSet {
                    owner: set.owner,
                    statements: set.shuffled().to_vec(),
                    guesser: set.guesser,
                }
                .into(),
            ),
        }
    }

    fn round_in_progress(&self) -> bool {
        self.phase != Phase::Idle
    }

    fn clear_round(&mut self) {
        self.phase = Phase::Idle;
    }

    fn expire(&mut self) -> Outcome {
        let record = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => return Outcome::Ignored,
            Phase::AwaitingSet => {
                let Some(owner) = self.table.current_turn() else {
                    return Outcome::Ignored;
                };
                let record = Record {
                    owner,
                    owner_name: self.name_of(owner),
                    statements: Vec::new(),
                    lie_index: None,
                    guesser: None,
                    guesser_name: None,
                    guess_index: None,
                    correct: false,
                    timed_out: true,
                    timestamp: SystemTime::now(),
                };
                self.history.push_front(record.clone());
                record
            }
            Phase::AwaitingGuess(set) => self.record_guess(set, None, true),
        };

        Outcome::Completed(vec![UpdateMessage::RoundCompleted(record).into()])
    }

    fn migrate_identity(&mut self, old: Id, new: Id, display_name: &str) -> bool {
        if !self.table.migrate_identity(old, new, display_name) {
            return false;
        }

        if let Phase::AwaitingGuess(set) = &mut self.phase {
            for id in [&mut set.owner, &mut set.guesser] {
                if *id == old {
                    *id = new;
                }
            }
        }
        for record in self.history.iter_mut() {
            if record.owner == old {
                record.owner = new;
            }
            if record.guesser == Some(old) {
                record.guesser = Some(new);
            }
        }

        true
    }
}
