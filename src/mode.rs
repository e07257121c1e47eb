//! Game modes offered by the server

use std::fmt::Display;

use enum_map::Enum;
use serde::{Deserialize, Serialize};

/// The three party games a lobby can host
///
/// Every mode has its own lobby directory, so the same lobby name can exist
/// once per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, Serialize, Deserialize)]
pub enum GameMode {
    /// Alternating questions and photo dares
    QuestionDare,
    /// Pick one of two options
    WouldYouRather,
    /// Two truths and one lie, the partner guesses the lie
    TwoTruths,
}

impl GameMode {
    /// All modes, in declaration order
    pub const ALL: [GameMode; 3] = [
        GameMode::QuestionDare,
        GameMode::WouldYouRather,
        GameMode::TwoTruths,
    ];
}

impl Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::QuestionDare => "question-dare",
            Self::WouldYouRather => "would-you-rather",
            Self::TwoTruths => "two-truths",
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            GameMode::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names.len(), GameMode::ALL.len());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&GameMode::TwoTruths).unwrap(),
            "\"TwoTruths\""
        );
    }
}
