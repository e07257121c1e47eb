//! Question/dare game
//!
//! Each round hands the turn holder either a question to answer or a photo
//! dare to complete. The very first round of a lobby is always a question;
//! after that the kind is a coin flip. Content is drawn per player without
//! repeats until that player has seen the whole pool.

use std::collections::{HashMap, HashSet};

use enum_map::{Enum, EnumMap};
use serde::Serialize;
use serde_with::skip_serializing_none;
use web_time::SystemTime;

use super::{Error, Machine, Outcome, Table, TableView};
use crate::{
    bounded::Bounded,
    chat::escape_html,
    constants::submission,
    content::{self, Pool},
    registry::Id,
    timer::Timer,
};

/// The two kinds of round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize)]
pub enum Kind {
    /// Answer a question in text
    Question,
    /// Complete a dare and attach a photo
    Dare,
}

impl Kind {
    fn pool(self) -> &'static Pool {
        match self {
            Self::Question => content::questions(),
            Self::Dare => content::dares(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Round {
    Idle,
    Question(String),
    Dare(String),
}

/// A finished round
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Identity of the player who held the turn
    pub identity: Id,
    /// Name of the player who held the turn
    pub display_name: String,
    /// Whether it was a question or a dare
    pub kind: Kind,
    /// The question or dare text
    pub content: String,
    /// The submitted answer, escaped
    pub answer: Option<String>,
    /// Image reference attached to the submission
    pub image_url: Option<String>,
    /// Whether the turn ran out without a submission
    pub timed_out: bool,
    /// When the round finished
    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

/// Update messages for the question/dare game
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A question round started
    NewQuestion {
        /// The question to answer
        question: String,
        /// Identity that has to answer
        current_turn: Id,
    },
    /// A dare round started
    NewDare {
        /// The dare to complete
        dare: String,
        /// Identity that has to complete it
        current_turn: Id,
    },
    /// The turn holder submitted
    AnswerSubmitted {
        /// Identity of the submitter
        identity: Id,
        /// Name of the submitter
        display_name: String,
        /// The escaped answer text
        answer: Option<String>,
        /// Attached image reference
        image_url: Option<String>,
    },
    /// The round finished
    RoundCompleted(Record),
}

/// Externally visible question/dare state
#[derive(Debug, Clone, Serialize)]
pub struct View {
    /// Shared state
    #[serde(flatten)]
    pub table: TableView,
    /// Question in flight
    pub current_question: Option<String>,
    /// Dare in flight
    pub current_dare: Option<String>,
    /// Finished rounds, newest first
    pub history: Vec<Record>,
}

/// Question/dare game state
#[derive(Debug, Clone)]
pub struct State {
    table: Table,
    round: Round,
    started: bool,
    used: EnumMap<Kind, HashMap<Id, HashSet<String>>>,
    history: Bounded<Record>,
}

impl State {
    /// Creates an idle game
    pub fn new(chat_limit: usize, history_limit: usize) -> Self {
        Self {
            table: Table::new(chat_limit),
            round: Round::Idle,
            started: false,
            used: EnumMap::default(),
            history: Bounded::new(history_limit),
        }
    }

    /// Finished rounds, newest first
    pub fn history(&self) -> &Bounded<Record> {
        &self.history
    }

    /// Content a player has already been given
    pub fn used(&self, kind: Kind, identity: Id) -> Option<&HashSet<String>> {
        self.used[kind].get(&identity)
    }

    /// Draws unused content of `kind` for a player and marks it used
    ///
    /// A player who has seen the whole pool starts over with a fresh set.
    fn draw(&mut self, kind: Kind, identity: Id) -> Option<String> {
        let pool = kind.pool();
        let used = self.used[kind].entry(identity).or_default();

        let choice = match pool.random_unused(used) {
            Some(choice) => choice,
            None if pool.is_empty() => return None,
            None => {
                log::debug!("{identity} has seen every {kind:?}, starting over");
                used.clear();
                pool.random_unused(used)?
            }
        };

        used.insert(choice.to_owned());
        Some(choice.to_owned())
    }

    fn announcement(&self, identity: Id) -> Option<crate::UpdateMessage> {
        match &self.round {
            Round::Idle => None,
            Round::Question(question) => Some(
                UpdateMessage::NewQuestion {
                    question: question.clone(),
                    current_turn: identity,
                }
                .into(),
            ),
            Round::Dare(dare) => Some(
                UpdateMessage::NewDare {
                    dare: dare.clone(),
                    current_turn: identity,
                }
                .into(),
            ),
        }
    }

    fn record(&mut self, answer: Option<String>, image_url: Option<String>) -> Option<Record> {
        let (kind, content) = match std::mem::replace(&mut self.round, Round::Idle) {
            Round::Idle => return None,
            Round::Question(content) => (Kind::Question, content),
            Round::Dare(content) => (Kind::Dare, content),
        };
        let player = self.table.turn_holder()?;

        let record = Record {
            identity: player.identity,
            display_name: player.display_name.clone(),
            kind,
            content,
            timed_out: answer.is_none() && image_url.is_none(),
            answer,
            image_url,
            timestamp: SystemTime::now(),
        };
        self.history.push_front(record.clone());

        Some(record)
    }

    /// Handles the turn holder's answer or dare completion
    ///
    /// # Errors
    ///
    /// * `Error::InvalidSubmission` - Not the turn holder, no round in flight,
    ///   an empty answer to a question, or input over the length limits
    /// * `Error::ImageRequired` - A dare completion without an image reference
    pub fn submit_answer(
        &mut self,
        identity: Id,
        answer: &str,
        image_url: Option<&str>,
    ) -> Result<Outcome, Error> {
        if self.table.current_turn() != Some(identity) {
            return Err(Error::InvalidSubmission);
        }
        let kind = match self.round {
            Round::Idle => return Err(Error::InvalidSubmission),
            Round::Question(_) => Kind::Question,
            Round::Dare(_) => Kind::Dare,
        };

        if answer.len() > submission::MAX_TEXT_LENGTH {
            return Err(Error::InvalidSubmission);
        }
        let answer = Some(answer.trim())
            .filter(|a| !a.is_empty())
            .map(escape_html);
        let image_url = image_url.map(str::trim).filter(|url| !url.is_empty());
        if image_url.is_some_and(|url| url.len() > submission::MAX_IMAGE_REFERENCE_LENGTH) {
            return Err(Error::InvalidSubmission);
        }

        match kind {
            Kind::Question if answer.is_none() => return Err(Error::InvalidSubmission),
            Kind::Dare if image_url.is_none() => return Err(Error::ImageRequired),
            _ => {}
        }

        let Some(record) = self.record(answer, image_url.map(str::to_owned)) else {
            return Err(Error::InvalidSubmission);
        };

        log::debug!("{} completed a {:?}", record.display_name, record.kind);

        Ok(Outcome::Completed(vec![
            UpdateMessage::AnswerSubmitted {
                identity: record.identity,
                display_name: record.display_name.clone(),
                answer: record.answer.clone(),
                image_url: record.image_url.clone(),
            }
            .into(),
            UpdateMessage::RoundCompleted(record).into(),
        ]))
    }

    /// Externally visible state
    pub fn view(&self, timer: &Timer) -> View {
        let (current_question, current_dare) = match &self.round {
            Round::Idle => (None, None),
            Round::Question(q) => (Some(q.clone()), None),
            Round::Dare(d) => (None, Some(d.clone())),
        };
        View {
            table: self.table.view(timer),
            current_question,
            current_dare,
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
        let identity = self.table.current_turn()?;

        let kind = if self.started && fastrand::bool() {
            Kind::Dare
        } else {
            Kind::Question
        };
        let content = self.draw(kind, identity)?;

        self.started = true;
        self.round = match kind {
            Kind::Question => Round::Question(content),
            Kind::Dare => Round::Dare(content),
        };

        self.announcement(identity)
    }

    fn in_flight(&self) -> Option<crate::UpdateMessage> {
        self.announcement(self.table.current_turn()?)
    }

    fn round_in_progress(&self) -> bool {
        self.round != Round::Idle
    }

    fn clear_round(&mut self) {
        self.round = Round::Idle;
    }

    fn expire(&mut self) -> Outcome {
        match self.record(None, None) {
            Some(record) => Outcome::Completed(vec![UpdateMessage::RoundCompleted(record).into()]),
            None => Outcome::Ignored,
        }
    }

    fn migrate_identity(&mut self, old: Id, new: Id, display_name: &str) -> bool {
        if !self.table.migrate_identity(old, new, display_name) {
            return false;
        }

        for used in self.used.values_mut() {
            if let Some(set) = used.remove(&old) {
                used.insert(new, set);
            }
        }
        for record in self.history.iter_mut().filter(|r| r.identity == old) {
            record.identity = new;
        }

        true
    }
}
