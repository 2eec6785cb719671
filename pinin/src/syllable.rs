//! Pinyin readings: parsing, initial/final decomposition and display formats.
//!
//! A reading is stored as its toneless ASCII spelling (with `v` standing for
//! `ü`) plus a tone number, `0` being the neutral tone. Source tables may
//! write tones either as diacritics (`zhōng`) or as a trailing digit
//! (`zhong1`, `de5`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::zhuyin;

/// Initials spelled with two letters; checked before the single-letter ones.
const DOUBLE_INITIALS: [&str; 3] = ["zh", "ch", "sh"];

const SINGLE_INITIALS: &str = "bpmfdtnlgkhjqxrzcsyw";

/// Syllables made of a nasal alone; they have no initial.
const SYLLABIC_NASALS: [&str; 3] = ["m", "n", "ng"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reading {
    syllable: String,
    tone: u8,
}

impl Reading {
    /// Build a reading from a toneless spelling. Returns `None` unless the
    /// spelling is lowercase ASCII letters and the tone is in `0..=4`.
    pub fn new(syllable: &str, tone: u8) -> Option<Self> {
        let reading = Reading {
            syllable: syllable.to_string(),
            tone,
        };
        reading.is_well_formed().then_some(reading)
    }

    /// Parse a reading written with tone marks or a trailing tone digit.
    ///
    /// ```
    /// use pinin::Reading;
    ///
    /// let r = Reading::parse("lǜ").unwrap();
    /// assert_eq!((r.syllable(), r.tone()), ("lv", 4));
    /// assert_eq!(Reading::parse("zhong1"), Reading::parse("zhōng"));
    /// assert!(Reading::parse("zh0ng").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let mut syllable = String::with_capacity(text.len());
        let mut tone: Option<u8> = None;
        let mut digit_seen = false;

        for ch in text.trim().nfd() {
            if digit_seen {
                return None;
            }
            let mark = match ch {
                '\u{0304}' => Some(1),
                '\u{0301}' => Some(2),
                '\u{030C}' => Some(3),
                '\u{0300}' => Some(4),
                _ => None,
            };
            if let Some(mark) = mark {
                if tone.replace(mark).is_some() {
                    return None;
                }
                continue;
            }
            match ch {
                // diaeresis: ü
                '\u{0308}' => {
                    if !syllable.ends_with('u') {
                        return None;
                    }
                    syllable.pop();
                    syllable.push('v');
                }
                // circumflex: ê
                '\u{0302}' => {}
                '0'..='5' => {
                    if tone.is_some() {
                        return None;
                    }
                    let digit = ch as u8 - b'0';
                    tone = Some(if digit == 5 { 0 } else { digit });
                    digit_seen = true;
                }
                c if c.is_ascii_alphabetic() => syllable.push(c.to_ascii_lowercase()),
                _ => return None,
            }
        }

        Reading::new(&syllable, tone.unwrap_or(0))
    }

    pub fn syllable(&self) -> &str {
        &self.syllable
    }

    pub fn tone(&self) -> u8 {
        self.tone
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.syllable.is_empty()
            && self.syllable.bytes().all(|b| b.is_ascii_lowercase())
            && self.tone <= 4
    }

    /// Initial and final of the syllable.
    pub fn split(&self) -> (&str, &str) {
        split_syllable(&self.syllable)
    }

    pub fn format(&self, format: Format) -> String {
        match format {
            Format::Raw => self.syllable.clone(),
            Format::Number => format!("{}{}", self.syllable, if self.tone == 0 { 5 } else { self.tone }),
            Format::Unicode => self.with_tone_mark(),
            Format::Phonetic => {
                let (initial, finale) = self.split();
                match zhuyin::to_zhuyin(initial, finale) {
                    Some((i, f)) => match self.tone {
                        0 => format!("˙{i}{f}"),
                        tone => format!("{i}{f}{}", zhuyin::tone_mark(tone)),
                    },
                    None => self.format(Format::Number),
                }
            }
        }
    }

    fn with_tone_mark(&self) -> String {
        let mark = match self.tone {
            1 => '\u{0304}',
            2 => '\u{0301}',
            3 => '\u{030C}',
            4 => '\u{0300}',
            _ => return self.syllable.replace('v', "ü"),
        };
        let target = tone_mark_position(&self.syllable);
        let mut out = String::with_capacity(self.syllable.len() + 4);
        for (i, c) in self.syllable.char_indices() {
            out.push(if c == 'v' { 'ü' } else { c });
            if Some(i) == target {
                out.push(mark);
            }
        }
        out.nfc().collect()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(Format::Unicode))
    }
}

/// Byte index of the letter that carries the tone mark.
fn tone_mark_position(syllable: &str) -> Option<usize> {
    syllable
        .find('a')
        .or_else(|| syllable.find('e'))
        .or_else(|| syllable.find("ou"))
        .or_else(|| syllable.rfind(['i', 'o', 'u', 'v']))
        .or(if syllable.is_empty() { None } else { Some(0) })
}

/// Split a toneless syllable into initial and final. Zero-initial syllables
/// (`an`, `er`, syllabic nasals) return an empty initial.
pub fn split_syllable(syllable: &str) -> (&str, &str) {
    if SYLLABIC_NASALS.contains(&syllable) {
        return ("", syllable);
    }
    if let Some(initial) = DOUBLE_INITIALS.iter().find(|i| syllable.starts_with(**i)) {
        return syllable.split_at(initial.len());
    }
    match syllable.chars().next() {
        Some(c) if SINGLE_INITIALS.contains(c) && syllable.len() > 1 => syllable.split_at(1),
        _ => ("", syllable),
    }
}

/// How a reading is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// `zhong`
    Raw,
    /// `zhong1`
    Number,
    /// `zhōng`
    #[default]
    Unicode,
    /// `ㄓㄨㄥ`
    Phonetic,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Format::Raw),
            "number" => Ok(Format::Number),
            "unicode" => Ok(Format::Unicode),
            "phonetic" | "zhuyin" => Ok(Format::Phonetic),
            other => Err(format!(
                "unknown format '{other}' (raw, number, unicode, phonetic)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(text: &str) -> Reading {
        Reading::parse(text).unwrap()
    }

    #[test]
    fn parses_tone_marks() {
        assert_eq!(r("zhōng"), Reading::new("zhong", 1).unwrap());
        assert_eq!(r("xián"), Reading::new("xian", 2).unwrap());
        assert_eq!(r("hǎo"), Reading::new("hao", 3).unwrap());
        assert_eq!(r("èr"), Reading::new("er", 4).unwrap());
        assert_eq!(r("de"), Reading::new("de", 0).unwrap());
        assert_eq!(r("nǚ"), Reading::new("nv", 3).unwrap());
        assert_eq!(r("Ān"), Reading::new("an", 1).unwrap());
    }

    #[test]
    fn parses_tone_digits() {
        assert_eq!(r("di4"), Reading::new("di", 4).unwrap());
        assert_eq!(r("ma5"), Reading::new("ma", 0).unwrap());
        assert_eq!(r("lv3"), Reading::new("lv", 3).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "zh0ng", "ā1", "x-y", "中", "ǎǎ", "1a"] {
            assert!(Reading::parse(bad).is_none(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn splits_initials() {
        assert_eq!(split_syllable("zhong"), ("zh", "ong"));
        assert_eq!(split_syllable("xian"), ("x", "ian"));
        assert_eq!(split_syllable("an"), ("", "an"));
        assert_eq!(split_syllable("er"), ("", "er"));
        assert_eq!(split_syllable("yu"), ("y", "u"));
        assert_eq!(split_syllable("ng"), ("", "ng"));
        assert_eq!(split_syllable("hm"), ("h", "m"));
    }

    #[test]
    fn formats() {
        let zhong = r("zhōng");
        assert_eq!(zhong.format(Format::Raw), "zhong");
        assert_eq!(zhong.format(Format::Number), "zhong1");
        assert_eq!(zhong.format(Format::Unicode), "zhōng");
        assert_eq!(zhong.format(Format::Phonetic), "ㄓㄨㄥ");

        assert_eq!(r("lǜ").format(Format::Unicode), "lǜ");
        assert_eq!(r("guó").format(Format::Unicode), "guó");
        assert_eq!(r("liù").format(Format::Unicode), "liù");
        assert_eq!(r("dōu").format(Format::Unicode), "dōu");
        assert_eq!(r("de").format(Format::Number), "de5");
        assert_eq!(r("de").format(Format::Phonetic), "˙ㄉㄜ");
        assert_eq!(r("xué").format(Format::Phonetic), "ㄒㄩㄝˊ");
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("Phonetic".parse::<Format>(), Ok(Format::Phonetic));
        assert!("pinyin".parse::<Format>().is_err());
    }
}
