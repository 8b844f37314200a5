//! Seams to the collaborators that live outside the session core.
//!
//! Letter generation and dictionary lookup are owned by the game engine.
//! The coordinator only needs a fresh six-letter deal and a verdict per
//! guessed word, so each is a small trait with a default implementation the
//! binary can run on.

use crate::types::{PlayerId, RACK_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Source of the shared letters dealt to every rack at session start.
pub trait LetterPool: Send {
    fn deal(&mut self) -> [char; RACK_SIZE];
}

/// Letter frequencies used by [`RandomLetterPool`], one entry per tile in
/// the bag.
const LETTER_BAG: &str = "AAAAAAAAABBCCDDDDEEEEEEEEEEEEFFGGGHHIIIIIIIIIJKLLLLMMNNNNNNOOOOOOOOPPQRRRRRRSSSSTTTTTTUUUUVVWWXYYZ";

/// Draws letters from an English frequency bag, guaranteeing at least two
/// vowels per deal.
#[derive(Debug)]
pub struct RandomLetterPool {
    rng: StdRng,
}

impl RandomLetterPool {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic pool for reproducible sessions.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn draw(&mut self) -> char {
        let bag = LETTER_BAG.as_bytes();
        bag[self.rng.gen_range(0..bag.len())] as char
    }
}

impl Default for RandomLetterPool {
    fn default() -> Self {
        Self::new()
    }
}

impl LetterPool for RandomLetterPool {
    fn deal(&mut self) -> [char; RACK_SIZE] {
        loop {
            let letters: [char; RACK_SIZE] = std::array::from_fn(|_| self.draw());
            if letters.iter().filter(|c| "AEIOU".contains(**c)).count() >= 2 {
                debug!("🎲 Dealt {:?}", letters);
                return letters;
            }
        }
    }
}

/// Always deals the same letters.
#[derive(Debug, Clone)]
pub struct FixedLetterPool {
    letters: [char; RACK_SIZE],
}

impl FixedLetterPool {
    pub fn new(letters: [char; RACK_SIZE]) -> Self {
        Self { letters }
    }
}

impl LetterPool for FixedLetterPool {
    fn deal(&mut self) -> [char; RACK_SIZE] {
        self.letters
    }
}

/// Verdict on a guessed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgement {
    /// A valid word this player has not played yet
    Good,
    /// A valid word this player already played
    Old,
    /// Not a word
    Bad,
}

/// Dictionary lookup for guessed words.
pub trait GuessJudge: Send {
    /// Judges `word` for `player`. A `Good` verdict records the word as
    /// played for that player.
    fn judge(&mut self, player: PlayerId, word: &str) -> Judgement;

    /// Forgets every played word (new session).
    fn reset(&mut self);
}

/// [`GuessJudge`] over an in-memory word list.
#[derive(Debug, Default, Clone)]
pub struct WordListJudge {
    words: HashSet<String>,
    played: HashMap<PlayerId, HashSet<String>>,
}

impl WordListJudge {
    /// Builds a judge from any list of words; case is ignored.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_uppercase())
                .filter(|w| !w.is_empty())
                .collect(),
            played: HashMap::new(),
        }
    }

    /// Reads a newline-separated word list.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let judge = Self::from_words(text.lines());
        info!(
            "📚 Loaded {} words from {}",
            judge.len(),
            path.as_ref().display()
        );
        Ok(judge)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl GuessJudge for WordListJudge {
    fn judge(&mut self, player: PlayerId, word: &str) -> Judgement {
        let word = word.to_uppercase();
        if !self.words.contains(&word) {
            return Judgement::Bad;
        }
        if self.played.entry(player).or_default().insert(word) {
            Judgement::Good
        } else {
            Judgement::Old
        }
    }

    fn reset(&mut self) {
        self.played.clear();
    }
}
