//! Character → reading table.
//!
//! The table is built once from a text source and is immutable afterwards.
//! Readings are interned into a flat vector; characters are indexed by an
//! FST map from their UTF-8 bytes to a slot holding the character's reading
//! ids, in source order. This mirrors how the workspace stores lexicons:
//! FST for keys, bincode for payloads.
//!
//! Source format, one character per line:
//!
//! ```text
//! # comment
//! U+4E2D: zhōng,zhòng  # 中
//! 的: de,di2,di4
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use ahash::AHashMap;
use fst::{Map, MapBuilder, Streamer};
use once_cell::sync::Lazy;
use pinin_core::{DeserializeError, InitError};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::syllable::Reading;

pub type ReadingId = u32;

static LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[Uu]\+([0-9A-Fa-f]{4,6})|(\S))\s*:\s*(.*)$").expect("static regex is valid")
});

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+").expect("static regex is valid"));

pub struct PhoneticTable {
    index: Map<Vec<u8>>,
    slots: Vec<Vec<ReadingId>>,
    readings: Vec<Reading>,
}

/// Serialized form of a [`PhoneticTable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TableImage {
    fst: Vec<u8>,
    slots: Vec<Vec<ReadingId>>,
    readings: Vec<Reading>,
}

impl PhoneticTable {
    /// Parse a table source. `origin` names the source in errors.
    pub fn parse(text: &str, origin: &str) -> Result<Self, InitError> {
        let mut entries: Vec<(char, Vec<Reading>)> = Vec::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let at = |reason: String| InitError::new(origin, format!("line {}: {reason}", number + 1));

            let caps = LINE
                .captures(line)
                .ok_or_else(|| at(format!("expected '<char>: <readings>', got {line:?}")))?;
            let ch = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| at(format!("invalid code point U+{}", hex.as_str())))?,
                (None, Some(literal)) => literal
                    .as_str()
                    .chars()
                    .next()
                    .ok_or_else(|| at("missing character".to_string()))?,
                (None, None) => return Err(at("missing character".to_string())),
            };

            let readings = SEPARATOR
                .split(caps.get(3).map_or("", |m| m.as_str()))
                .filter(|s| !s.is_empty())
                .map(|s| Reading::parse(s).ok_or_else(|| at(format!("invalid reading {s:?}"))))
                .collect::<Result<Vec<_>, _>>()?;
            if readings.is_empty() {
                return Err(at(format!("no readings for {ch:?}")));
            }
            entries.push((ch, readings));
        }
        Self::from_entries(entries).map_err(|reason| InitError::new(origin, reason))
    }

    pub fn from_reader<R: Read>(mut reader: R, origin: &str) -> Result<Self, InitError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| InitError::new(origin, e.to_string()))?;
        Self::parse(&text, origin)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InitError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| InitError::new(&origin, e.to_string()))?;
        Self::parse(&text, &origin)
    }

    /// Build from characters and their readings. Repeated characters merge
    /// their readings, keeping first occurrences.
    pub fn from_entries<I>(entries: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (char, Vec<Reading>)>,
    {
        let mut readings: Vec<Reading> = Vec::new();
        let mut interned: AHashMap<Reading, ReadingId> = AHashMap::new();
        // fst keys must be inserted in byte order; BTreeMap<String> gives it
        let mut by_char: BTreeMap<String, Vec<ReadingId>> = BTreeMap::new();

        for (ch, list) in entries {
            let ids = by_char.entry(ch.to_string()).or_default();
            for reading in list {
                let id = *interned.entry(reading.clone()).or_insert_with(|| {
                    readings.push(reading);
                    (readings.len() - 1) as ReadingId
                });
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        let mut builder = MapBuilder::memory();
        let mut slots = Vec::with_capacity(by_char.len());
        for (key, ids) in by_char {
            builder
                .insert(key.as_bytes(), slots.len() as u64)
                .map_err(|e| format!("building character index: {e}"))?;
            slots.push(ids);
        }
        let bytes = builder
            .into_inner()
            .map_err(|e| format!("building character index: {e}"))?;
        let index = Map::new(bytes).map_err(|e| format!("building character index: {e}"))?;

        tracing::debug!(
            chars = slots.len(),
            readings = readings.len(),
            "built phonetic table"
        );
        Ok(Self {
            index,
            slots,
            readings,
        })
    }

    /// Reading ids of `ch`, empty for characters without a reading.
    pub fn reading_ids(&self, ch: char) -> &[ReadingId] {
        let mut buf = [0u8; 4];
        self.index
            .get(ch.encode_utf8(&mut buf).as_bytes())
            .and_then(|slot| self.slots.get(slot as usize))
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn readings_of(&self, ch: char) -> impl Iterator<Item = &Reading> + '_ {
        self.reading_ids(ch)
            .iter()
            .filter_map(move |&id| self.readings.get(id as usize))
    }

    pub fn contains(&self, ch: char) -> bool {
        !self.reading_ids(ch).is_empty()
    }

    pub fn reading(&self, id: ReadingId) -> Option<&Reading> {
        self.readings.get(id as usize)
    }

    /// All distinct readings, indexed by `ReadingId`.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Number of characters in the table.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Characters in the table, in UTF-8 byte order.
    pub fn chars(&self) -> Vec<char> {
        let mut stream = self.index.keys();
        let mut out = Vec::with_capacity(self.len());
        while let Some(key) = stream.next() {
            if let Some(ch) = std::str::from_utf8(key).ok().and_then(|s| s.chars().next()) {
                out.push(ch);
            }
        }
        out
    }

    pub(crate) fn to_image(&self) -> TableImage {
        TableImage {
            fst: self.index.as_fst().as_bytes().to_vec(),
            slots: self.slots.clone(),
            readings: self.readings.clone(),
        }
    }

    pub(crate) fn from_image(image: TableImage) -> Result<Self, DeserializeError> {
        let TableImage {
            fst,
            slots,
            readings,
        } = image;
        if let Some(bad) = readings.iter().find(|r| !r.is_well_formed()) {
            return Err(DeserializeError::out_of_range(format!("malformed reading {bad:?}")));
        }
        if slots.iter().flatten().any(|&id| id as usize >= readings.len()) {
            return Err(DeserializeError::out_of_range("reading id out of range"));
        }
        let index = Map::new(fst).map_err(|e| DeserializeError::out_of_range(format!("character index: {e}")))?;
        // node bytes are only trusted once the checksum matches
        index
            .as_fst()
            .verify()
            .map_err(|e| DeserializeError::out_of_range(format!("character index: {e}")))?;
        if index.len() != slots.len() {
            return Err(DeserializeError::out_of_range("character index and slots disagree"));
        }
        let mut stream = index.stream();
        while let Some((_, slot)) = stream.next() {
            if slot as usize >= slots.len() {
                return Err(DeserializeError::out_of_range(format!("slot {slot} out of range")));
            }
        }
        drop(stream);
        Ok(Self {
            index,
            slots,
            readings,
        })
    }
}

impl std::fmt::Debug for PhoneticTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneticTable")
            .field("chars", &self.slots.len())
            .field("readings", &self.readings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
# sample
U+4E2D: zhōng,zhòng  # 中
U+91CD: zhòng, chóng
的: de di2 di4

U+4E2D: zhong1
";

    #[test]
    fn parses_both_key_forms_and_merges_duplicates() {
        let table = PhoneticTable::parse(SOURCE, "inline").unwrap();
        assert_eq!(table.len(), 3);

        let zhong: Vec<String> = table.readings_of('中').map(|r| r.to_string()).collect();
        assert_eq!(zhong, vec!["zhōng", "zhòng"]);
        let de: Vec<String> = table.readings_of('的').map(|r| r.to_string()).collect();
        assert_eq!(de, vec!["de", "dí", "dì"]);

        // zhòng is shared between 中 and 重
        assert_eq!(table.reading_ids('中')[1], table.reading_ids('重')[0]);
        assert_eq!(table.readings().len(), 6);
    }

    #[test]
    fn unknown_chars_have_no_readings() {
        let table = PhoneticTable::parse(SOURCE, "inline").unwrap();
        assert!(table.reading_ids('x').is_empty());
        assert!(!table.contains('国'));
        assert!(table.contains('的'));
    }

    #[test]
    fn malformed_lines_name_their_position() {
        let err = PhoneticTable::parse("U+4E2D: zhōng\nU+56FD guó\n", "bad.txt").unwrap_err();
        assert_eq!(err.origin, "bad.txt");
        assert!(err.reason.starts_with("line 2"), "{}", err.reason);

        let err = PhoneticTable::parse("U+4E2D: zh0ng\n", "bad.txt").unwrap_err();
        assert!(err.reason.contains("invalid reading"));

        assert!(PhoneticTable::parse("U+4E2D:\n", "bad.txt").is_err());
        assert!(PhoneticTable::parse("U+D800: a\n", "bad.txt").is_err());
    }

    #[test]
    fn empty_source_is_an_empty_table() {
        let table = PhoneticTable::parse("# nothing here\n\n", "empty").unwrap();
        assert!(table.is_empty());
        assert!(table.chars().is_empty());
    }

    #[test]
    fn image_round_trip_and_validation() {
        let table = PhoneticTable::parse(SOURCE, "inline").unwrap();
        let back = PhoneticTable::from_image(table.to_image()).unwrap();
        assert_eq!(back.chars(), table.chars());
        assert_eq!(back.reading_ids('重'), table.reading_ids('重'));

        let mut broken = table.to_image();
        broken.slots[0].push(99);
        assert!(matches!(
            PhoneticTable::from_image(broken),
            Err(DeserializeError::OutOfRange(_))
        ));

        let mut broken = table.to_image();
        broken.fst.truncate(3);
        assert!(PhoneticTable::from_image(broken).is_err());
    }

    #[test]
    fn flipped_index_bytes_are_rejected() {
        let table = PhoneticTable::parse(SOURCE, "inline").unwrap();
        let len = table.to_image().fst.len();
        for at in 0..len {
            for mask in [0x01u8, 0x80, 0xff] {
                let mut broken = table.to_image();
                broken.fst[at] ^= mask;
                assert!(
                    matches!(PhoneticTable::from_image(broken), Err(DeserializeError::OutOfRange(_))),
                    "byte {at} ^ {mask:#04x}"
                );
            }
        }
    }

    #[test]
    fn missing_file_is_an_init_error() {
        let err = PhoneticTable::load("/nonexistent/pinyin.txt").unwrap_err();
        assert!(err.origin.contains("nonexistent"));
    }
}
