//! Compiled readings and per-string encodings.
//!
//! A [`Pinyin`] is a reading compiled under one configuration: its initial,
//! final and tone each become a [`Phoneme`], a set of alternative keystroke
//! spellings produced by the normalization rules and the keyboard scheme.
//! Matching a `Pinyin` against a query offset yields every length the
//! syllable can consume there.

use std::sync::Arc;

use pinin_core::{IndexSet, PhoneticUnit};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::config::PinInConfig;
use crate::fuzzy::FuzzyRules;
use crate::keyboard::Keyboard;
use crate::syllable::Reading;

/// Alternative keystroke spellings of one part of a syllable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phoneme {
    keys: Vec<String>,
}

impl Phoneme {
    fn new(mut keys: Vec<String>) -> Self {
        keys.retain(|k| !k.is_empty());
        keys.sort_unstable();
        keys.dedup();
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Advance every length in `active` over one spelling of this phoneme.
    /// An empty phoneme consumes nothing and passes `active` through.
    fn advance(&self, query: &[char], active: IndexSet, start: usize, partial: bool) -> IndexSet {
        if self.is_empty() {
            return active;
        }
        let mut next = IndexSet::NONE;
        for done in active.iter() {
            let at = start + done;
            let rest = query.get(at..).unwrap_or(&[]);
            for key in &self.keys {
                let mut key_len = 0;
                let mut common = 0;
                for (i, k) in key.chars().enumerate() {
                    key_len = i + 1;
                    if common == i && rest.get(i) == Some(&k) {
                        common += 1;
                    }
                }
                if common == key_len || (partial && at + common == query.len()) {
                    next.set(done + common);
                }
            }
        }
        next
    }
}

/// A reading compiled under a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pinyin {
    reading: Reading,
    initial: Phoneme,
    finale: Phoneme,
    tone: Phoneme,
    first_char: bool,
}

impl Pinyin {
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn initial(&self) -> &Phoneme {
        &self.initial
    }

    pub fn finale(&self) -> &Phoneme {
        &self.finale
    }

    pub fn has_initial(&self) -> bool {
        !self.initial.is_empty()
    }

    fn leading(&self) -> &Phoneme {
        if self.has_initial() {
            &self.initial
        } else {
            &self.finale
        }
    }

    /// Lengths of query spans starting at `start` this syllable matches:
    /// its initial alone (unless first-keystroke abbreviation is on), the
    /// full syllable, the full syllable with its tone key, and with
    /// `first_char` the first keystroke alone.
    pub fn match_at(&self, query: &[char], start: usize, partial: bool) -> IndexSet {
        let mut matched = IndexSet::NONE;
        let mut active = IndexSet::ZERO;

        if self.has_initial() {
            active = self.initial.advance(query, active, start, partial);
            if !self.first_char {
                matched.merge(active);
            }
        }
        if !active.is_empty() {
            active = self.finale.advance(query, active, start, partial);
            matched.merge(active);
        }
        if !active.is_empty() {
            matched.merge(self.tone.advance(query, active, start, partial));
        }

        if self.first_char {
            if let Some(&c) = query.get(start) {
                if self.leading().keys().iter().any(|k| k.starts_with(c)) {
                    matched.set(1);
                }
            }
        }
        matched
    }
}

/// Compiles readings under one configuration.
#[derive(Debug, Clone)]
pub(crate) struct Compiler {
    rules: FuzzyRules,
    keyboard: Keyboard,
    first_char: bool,
}

impl Compiler {
    pub(crate) fn new(config: &PinInConfig) -> Self {
        Self {
            rules: FuzzyRules::from_config(config),
            keyboard: config.keyboard,
            first_char: config.first_char,
        }
    }

    pub(crate) fn compile(&self, reading: &Reading) -> Pinyin {
        let (initial, finale) = reading.split();
        let mut initial_keys = Vec::new();
        let mut final_keys = Vec::new();
        for i in self.rules.initials(initial) {
            for f in self.rules.finals(finale) {
                if let Some((ik, fk)) = self.keyboard.keys(&i, &f) {
                    initial_keys.push(ik);
                    final_keys.push(fk);
                }
            }
        }
        if initial_keys.is_empty() && final_keys.is_empty() {
            // the scheme cannot type this syllable; fall back to its spelling
            tracing::trace!(reading = %reading, keyboard = %self.keyboard, "untypable reading");
            initial_keys.push(initial.to_string());
            final_keys.push(finale.to_string());
        }
        Pinyin {
            reading: reading.clone(),
            initial: Phoneme::new(initial_keys),
            finale: Phoneme::new(final_keys),
            tone: Phoneme::new(vec![self.keyboard.tone_key(reading.tone()).to_string()]),
            first_char: self.first_char,
        }
    }
}

/// One position of an encoded string: the character and its candidate
/// readings. Characters without readings match only literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    ch: char,
    pinyins: Arc<[Arc<Pinyin>]>,
}

impl Unit {
    pub(crate) fn new(ch: char, pinyins: Arc<[Arc<Pinyin>]>) -> Self {
        Self {
            ch: ch.to_ascii_lowercase(),
            pinyins,
        }
    }

    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn pinyins(&self) -> &[Arc<Pinyin>] {
        &self.pinyins
    }
}

impl PhoneticUnit for Unit {
    fn match_at(&self, query: &[char], start: usize, partial: bool) -> IndexSet {
        let mut matched = IndexSet::NONE;
        if query.get(start) == Some(&self.ch) {
            matched.set(1);
        }
        for pinyin in self.pinyins.iter() {
            matched.merge(pinyin.match_at(query, start, partial));
        }
        matched
    }
}

/// Candidate readings for every position of a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoding {
    units: Vec<Unit>,
}

impl Encoding {
    pub(crate) fn new(units: Vec<Unit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Every way of picking one reading per position, produced lazily.
    pub fn combinations(&self) -> Combinations<'_> {
        Combinations {
            units: &self.units,
            cursor: vec![0; self.units.len()],
            done: false,
        }
    }

    /// Number of items [`combinations`](Self::combinations) yields, saturating.
    pub fn combination_count(&self) -> usize {
        self.units
            .iter()
            .fold(1usize, |n, u| n.saturating_mul(u.pinyins.len().max(1)))
    }
}

/// One position of a combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(char),
    Reading(&'a Reading),
}

pub struct Combinations<'a> {
    units: &'a [Unit],
    cursor: Vec<usize>,
    done: bool,
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Vec<Segment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = self
            .units
            .iter()
            .zip(&self.cursor)
            .map(|(unit, &pick)| match unit.pinyins.get(pick) {
                Some(pinyin) => Segment::Reading(pinyin.reading()),
                None => Segment::Literal(unit.ch),
            })
            .collect();

        self.done = true;
        for (pos, unit) in self.units.iter().enumerate().rev() {
            if self.cursor[pos] + 1 < unit.pinyins.len() {
                self.cursor[pos] += 1;
                self.done = false;
                break;
            }
            self.cursor[pos] = 0;
        }
        Some(current)
    }
}

/// Normalize a query or entry for matching: NFC, ASCII lower-case.
pub fn prepare(text: &str) -> Vec<char> {
    text.nfc().map(|c| c.to_ascii_lowercase()).collect()
}
