//! Runtime options for the game server
//!
//! Options are plain serde data so a host can load them from any format,
//! and they are validated with `garde` before a [`crate::hub::Hub`] is built.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{constants, mode::GameMode};

type ValidationResult = garde::Result;

/// Validates that a turn duration falls within the configurable bounds
fn validate_turn_duration(val: &Duration) -> ValidationResult {
    let (min, max) = (
        constants::timer::MIN_TURN_SECONDS,
        constants::timer::MAX_TURN_SECONDS,
    );
    if (min..=max).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "turn duration is outside of the bounds [{min},{max}]",
        )))
    }
}

/// Server-wide options
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Options {
    /// Turn length in the question/dare game
    #[garde(custom(|v, _| validate_turn_duration(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    question_dare_turn: Duration,
    /// Turn length in the would-you-rather game
    #[garde(custom(|v, _| validate_turn_duration(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    would_you_rather_turn: Duration,
    /// Turn length in the two truths one lie game, per phase
    #[garde(custom(|v, _| validate_turn_duration(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    two_truths_turn: Duration,
    /// Chat messages kept per lobby
    #[garde(range(min = 1, max = constants::chat::MAX_HISTORY_LIMIT))]
    chat_history_limit: usize,
    /// Round records kept per lobby
    #[garde(range(min = 1, max = constants::history::MAX_LIMIT))]
    history_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        let turn = Duration::from_secs(constants::timer::DEFAULT_TURN_SECONDS);
        Self {
            question_dare_turn: turn,
            would_you_rather_turn: turn,
            two_truths_turn: turn,
            chat_history_limit: constants::chat::HISTORY_LIMIT,
            history_limit: constants::history::LIMIT,
        }
    }
}

impl Options {
    /// Sets the turn length for one mode
    #[must_use]
    pub fn with_turn_duration(mut self, mode: GameMode, duration: Duration) -> Self {
        match mode {
            GameMode::QuestionDare => self.question_dare_turn = duration,
            GameMode::WouldYouRather => self.would_you_rather_turn = duration,
            GameMode::TwoTruths => self.two_truths_turn = duration,
        }
        self
    }

    /// Sets how many chat messages each lobby keeps
    #[must_use]
    pub fn with_chat_history_limit(mut self, limit: usize) -> Self {
        self.chat_history_limit = limit;
        self
    }

    /// Sets how many round records each lobby keeps
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Turn length for a mode
    pub fn turn_duration(&self, mode: GameMode) -> Duration {
        match mode {
            GameMode::QuestionDare => self.question_dare_turn,
            GameMode::WouldYouRather => self.would_you_rather_turn,
            GameMode::TwoTruths => self.two_truths_turn,
        }
    }

    /// Chat messages kept per lobby
    pub fn chat_history_limit(&self) -> usize {
        self.chat_history_limit
    }

    /// Round records kept per lobby
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.validate().is_ok());
        for mode in GameMode::ALL {
            assert_eq!(options.turn_duration(mode), Duration::from_secs(3600));
        }
        assert_eq!(options.chat_history_limit(), 500);
        assert_eq!(options.history_limit(), 500);
    }

    #[test]
    fn test_turn_duration_bounds() {
        let too_short = Options::default().with_turn_duration(
            GameMode::TwoTruths,
            Duration::from_secs(constants::timer::MIN_TURN_SECONDS - 1),
        );
        assert!(too_short.validate().is_err());

        let too_long = Options::default().with_turn_duration(
            GameMode::QuestionDare,
            Duration::from_secs(constants::timer::MAX_TURN_SECONDS + 1),
        );
        assert!(too_long.validate().is_err());

        let ok = Options::default()
            .with_turn_duration(GameMode::WouldYouRather, Duration::from_secs(90));
        assert!(ok.validate().is_ok());
        assert_eq!(
            ok.turn_duration(GameMode::WouldYouRather),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn test_history_limits_validated() {
        assert!(
            Options::default()
                .with_chat_history_limit(0)
                .validate()
                .is_err()
        );
        assert!(
            Options::default()
                .with_history_limit(constants::history::MAX_LIMIT + 1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let options: Options = serde_json::from_str(r#"{"two_truths_turn": 120}"#).unwrap();
        assert_eq!(
            options.turn_duration(GameMode::TwoTruths),
            Duration::from_secs(120)
        );
        assert_eq!(
            options.turn_duration(GameMode::QuestionDare),
            Duration::from_secs(3600)
        );
    }
}
