//! Would-you-rather game
//!
//! The turn holder is shown a prompt with two options and picks one.

use serde::Serialize;
use serde_with::skip_serializing_none;
use web_time::SystemTime;

use super::{Error, Machine, Outcome, Table, TableView};
use crate::{
    bounded::Bounded,
    chat::escape_html,
    constants::submission,
    content::{self, Prompt},
    registry::Id,
    timer::Timer,
};

/// A finished round
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Identity of the player who held the turn
    pub identity: Id,
    /// Name of the player who held the turn
    pub display_name: String,
    /// The prompt that was shown
    pub prompt: Prompt,
    /// The option picked, escaped
    pub choice: Option<String>,
    /// Whether the turn ran out without a choice
    pub timed_out: bool,
    /// When the round finished
    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

/// Update messages for the would-you-rather game
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A prompt round started
    NewPrompt {
        /// The prompt to choose from
        prompt: Prompt,
        /// Identity that has to choose
        current_turn: Id,
    },
    /// The round finished
    RoundCompleted(Record),
}

/// Externally visible would-you-rather state
#[derive(Debug, Clone, Serialize)]
pub struct View {
    /// Shared state
    #[serde(flatten)]
    pub table: TableView,
    /// Prompt in flight
    pub current_prompt: Option<Prompt>,
    /// Finished rounds, newest first
    pub history: Vec<Record>,
}

/// Would-you-rather game state
#[derive(Debug, Clone)]
pub struct State {
    table: Table,
    current_prompt: Option<Prompt>,
    history: Bounded<Record>,
}

impl State {
    /// Creates an idle game
    pub fn new(chat_limit: usize, history_limit: usize) -> Self {
        Self {
            table: Table::new(chat_limit),
            current_prompt: None,
            history: Bounded::new(history_limit),
        }
    }

    /// Finished rounds, newest first
    pub fn history(&self) -> &Bounded<Record> {
        &self.history
    }

    fn record(&mut self, choice: Option<String>) -> Option<Record> {
        let prompt = self.current_prompt.take()?;
        let player = self.table.turn_holder()?;

        let record = Record {
            identity: player.identity,
            display_name: player.display_name.clone(),
            prompt,
            timed_out: choice.is_none(),
            choice,
            timestamp: SystemTime::now(),
        };
        self.history.push_front(record.clone());

        Some(record)
    }

    /// Handles the turn holder's pick
    ///
    /// # Errors
    ///
    /// * `Error::InvalidSubmission` - Not the turn holder, no prompt in
    ///   flight, or an empty or overlong choice
    pub fn submit_choice(&mut self, identity: Id, choice: &str) -> Result<Outcome, Error> {
        if self.table.current_turn() != Some(identity) || self.current_prompt.is_none() {
            return Err(Error::InvalidSubmission);
        }
        let choice = choice.trim();
        if choice.is_empty() || choice.len() > submission::MAX_TEXT_LENGTH {
            return Err(Error::InvalidSubmission);
        }

        let Some(record) = self.record(Some(escape_html(choice))) else {
            return Err(Error::InvalidSubmission);
        };

        log::debug!("{} picked {:?}", record.display_name, record.choice);

        Ok(Outcome::Completed(vec![
            UpdateMessage::RoundCompleted(record).into(),
        ]))
    }

    /// Externally visible state
    pub fn view(&self, timer: &Timer) -> View {
        View {
            table: self.table.view(timer),
            current_prompt: self.current_prompt.clone(),
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
        self.current_prompt = Some(fastrand::choice(content::prompts())?.clone());
        self.in_flight()
    }

    fn in_flight(&self) -> Option<crate::UpdateMessage> {
        Some(
            UpdateMessage::NewPrompt {
                prompt: self.current_prompt.clone()?,
                current_turn: self.table.current_turn()?,
            }
            .into(),
        )
    }

    fn round_in_progress(&self) -> bool {
        self.current_prompt.is_some()
    }

    fn clear_round(&mut self) {
        self.current_prompt = None;
    }

    fn expire(&mut self) -> Outcome {
        match self.record(None) {
            Some(record) => Outcome::Completed(vec![UpdateMessage::RoundCompleted(record).into()]),
            None => Outcome::Ignored,
        }
    }

    fn migrate_identity(&mut self, old: Id, new: Id, display_name: &str) -> bool {
        if !self.table.migrate_identity(old, new, display_name) {
            return false;
        }

        for record in self.history.iter_mut().filter(|r| r.identity == old) {
            record.identity = new;
        }

        true
    }
}
