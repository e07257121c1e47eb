//! Static game content
//!
//! Questions, dares, and would-you-rather prompts are compiled into the
//! binary from the text files under `content/`, one entry per line.

use std::{collections::HashSet, sync::LazyLock};

use itertools::Itertools;
use serde::Serialize;

/// A fixed list of content entries
#[derive(Debug)]
pub struct Pool {
    entries: Vec<&'static str>,
}

impl Pool {
    /// Builds a pool from newline-separated text, skipping blank lines
    pub fn new(data: &'static str) -> Self {
        Self {
            entries: data
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect_vec(),
        }
    }

    /// Number of entries in the pool
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks uniformly at random among entries not in `used`
    pub fn random_unused(&self, used: &HashSet<String>) -> Option<&'static str> {
        let unused = self
            .entries
            .iter()
            .filter(|entry| !used.contains(**entry))
            .collect_vec();
        fastrand::choice(unused).copied()
    }
}

/// A would-you-rather prompt with its two options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    /// Option "A"
    pub a: String,
    /// Option "B"
    pub b: String,
}

static QUESTIONS: LazyLock<Pool> =
    LazyLock::new(|| Pool::new(include_str!("../content/questions.txt")));

static DARES: LazyLock<Pool> = LazyLock::new(|| Pool::new(include_str!("../content/dares.txt")));

static PROMPTS: LazyLock<Vec<Prompt>> = LazyLock::new(|| {
    Pool::new(include_str!("../content/prompts.txt"))
        .entries
        .into_iter()
        .filter_map(|line| line.split_once('|'))
        .map(|(a, b)| Prompt {
            a: a.trim().to_owned(),
            b: b.trim().to_owned(),
        })
        .collect_vec()
});

/// Questions for the question/dare game
pub fn questions() -> &'static Pool {
    &QUESTIONS
}

/// Photo dares for the question/dare game
pub fn dares() -> &'static Pool {
    &DARES
}

/// Prompts for the would-you-rather game
pub fn prompts() -> &'static [Prompt] {
    &PROMPTS
}
