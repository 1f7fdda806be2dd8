//! Display names for newly admitted sessions
//!
//! Names are cosmetic. Collisions are tolerated and nothing keys on them.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Source of display names handed out at admission
pub trait NameSource: Send {
    fn next_name(&mut self) -> String;
}

impl<F> NameSource for F
where
    F: FnMut() -> String + Send,
{
    fn next_name(&mut self) -> String {
        self()
    }
}

const ONSETS: &[&str] = &[
    "b", "ch", "d", "f", "g", "h", "j", "k", "l", "m", "n", "p", "r", "s", "sh", "t", "th", "v",
    "w", "wh", "z",
];
const VOWELS: &[&str] = &["a", "e", "i", "o", "u", "ee", "oo", "ai", "ou"];
const CODAS: &[&str] = &["", "", "n", "r", "s", "x", "ck", "ll", "sk", "rs", "m"];

/// Pronounceable random names built from consonant/vowel syllables
pub struct RandomNames {
    rng: StdRng,
}

impl RandomNames {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence, for tests and reproducible demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, parts: &[&'static str]) -> &'static str {
        parts.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

impl Default for RandomNames {
    fn default() -> Self {
        Self::new()
    }
}

impl NameSource for RandomNames {
    fn next_name(&mut self) -> String {
        let syllables = self.rng.random_range(2..=3);
        let mut name = String::new();
        for _ in 0..syllables {
            name.push_str(self.pick(ONSETS));
            name.push_str(self.pick(VOWELS));
        }
        name.push_str(self.pick(CODAS));
        capitalize(&name)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_names_are_capitalized_words() {
        let mut names = RandomNames::seeded(7);
        for _ in 0..50 {
            let name = names.next_name();
            assert!(name.len() >= 4, "too short: {name}");
            assert!(name.chars().next().unwrap().is_ascii_uppercase());
            assert!(name.chars().skip(1).all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = RandomNames::seeded(42);
        let mut b = RandomNames::seeded(42);
        let first: Vec<String> = (0..5).map(|_| a.next_name()).collect();
        let second: Vec<String> = (0..5).map(|_| b.next_name()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_closure_source() {
        let mut fixed = || "Whiskers".to_string();
        assert_eq!(fixed.next_name(), "Whiskers");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("tom"), "Tom");
        assert_eq!(capitalize(""), "");
    }
}
