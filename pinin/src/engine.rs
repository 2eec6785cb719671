//! Phonetic engine
//!
//! `PinIn` owns the phonetic table and the active configuration, and turns
//! strings into [`Encoding`]s: per-position candidate readings compiled
//! under that configuration. It is shared between searchers as
//! `Arc<PinIn>`.
//!
//! The configuration lives in a published snapshot that also holds every
//! reading compiled under it. `commit` builds a new snapshot under a fresh
//! generation and swaps it in; readers keep whatever snapshot they loaded.
//! Both caches are tagged with the generation they were filled under, so an
//! entry computed from an old snapshot is never served for a newer one.

use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use ahash::AHashMap;
use lru::LruCache;
use pinin_core::{codec, match_units, DeserializeError, InitError, Logic};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::config::PinInConfig;
use crate::keyboard::Keyboard;
use crate::pinyin::{prepare, Compiler, Encoding, Pinyin, Unit};
use crate::syllable::{Format, Reading};
use crate::table::{PhoneticTable, TableImage};

/// Leading tag of engine images.
pub const ENGINE_IMAGE_VERSION: u32 = 0x5049_4e01;

/// Encodings kept by the string cache.
pub const STRING_CACHE_CAPACITY: usize = 4096;

type Candidates = Arc<[Arc<Pinyin>]>;

struct Snapshot {
    config: PinInConfig,
    generation: u64,
    /// Indexed by `ReadingId`.
    compiled: Vec<Arc<Pinyin>>,
}

impl Snapshot {
    fn build(table: &PhoneticTable, config: PinInConfig, generation: u64) -> Self {
        let compiler = Compiler::new(&config);
        let compiled = table
            .readings()
            .iter()
            .map(|reading| Arc::new(compiler.compile(reading)))
            .collect();
        Self {
            config,
            generation,
            compiled,
        }
    }
}

#[derive(Default)]
struct CharCache {
    generation: u64,
    entries: AHashMap<char, Candidates>,
}

impl CharCache {
    fn get(&self, generation: u64, ch: char) -> Option<Candidates> {
        if self.generation != generation {
            return None;
        }
        self.entries.get(&ch).cloned()
    }

    fn insert(&mut self, generation: u64, ch: char, candidates: Candidates) {
        if generation < self.generation {
            return;
        }
        if generation > self.generation {
            self.reset(generation);
        }
        self.entries.insert(ch, candidates);
    }

    fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.entries.clear();
    }
}

struct StringCache {
    generation: u64,
    entries: LruCache<String, Arc<Encoding>>,
}

impl StringCache {
    fn new() -> Self {
        let capacity = NonZeroUsize::new(STRING_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            generation: 0,
            entries: LruCache::new(capacity),
        }
    }

    fn get(&mut self, generation: u64, text: &str) -> Option<Arc<Encoding>> {
        if self.generation != generation {
            return None;
        }
        self.entries.get(text).cloned()
    }

    fn insert(&mut self, generation: u64, text: &str, encoding: Arc<Encoding>) {
        if generation < self.generation {
            return;
        }
        if generation > self.generation {
            self.reset(generation);
        }
        self.entries.put(text.to_string(), encoding);
    }

    fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.entries.clear();
    }
}

#[derive(Serialize)]
struct EngineImageRef<'a> {
    config: &'a PinInConfig,
    table: TableImage,
    char_cache_enabled: bool,
    warm_chars: Vec<char>,
}

#[derive(Deserialize)]
struct EngineImage {
    config: PinInConfig,
    table: TableImage,
    char_cache_enabled: bool,
    warm_chars: Vec<char>,
}

pub struct PinIn {
    table: PhoneticTable,
    state: RwLock<Arc<Snapshot>>,
    char_cache_enabled: AtomicBool,
    char_cache: RwLock<CharCache>,
    string_cache: Mutex<StringCache>,
}

impl PinIn {
    /// Build an engine from a phonetic-table file with the default config.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, InitError> {
        Ok(Self::from_table(PhoneticTable::load(path)?))
    }

    /// Build an engine from a phonetic-table source read from `reader`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, InitError> {
        Ok(Self::from_table(PhoneticTable::from_reader(reader, "reader")?))
    }

    pub fn from_table(table: PhoneticTable) -> Self {
        Self::with_config(table, PinInConfig::default())
    }

    fn with_config(table: PhoneticTable, mut config: PinInConfig) -> Self {
        if config.keyboard == Keyboard::Null {
            config.keyboard = Keyboard::Quanpin;
        }
        let snapshot = Snapshot::build(&table, config, 0);
        Self {
            table,
            state: RwLock::new(Arc::new(snapshot)),
            char_cache_enabled: AtomicBool::new(true),
            char_cache: RwLock::new(CharCache::default()),
            string_cache: Mutex::new(StringCache::new()),
        }
    }

    pub fn table(&self) -> &PhoneticTable {
        &self.table
    }

    /// True if no phonetic table entries are loaded.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get_config(&self) -> PinInConfig {
        self.snapshot().config
    }

    /// Bumped by every commit that changed the configuration.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Publish `config`. A `Null` keyboard keeps the current one. Committing
    /// an unchanged config is a no-op; anything else recompiles every
    /// reading and invalidates both caches. Existing searcher entries keep
    /// their old readings until the searcher is refreshed.
    pub fn commit(&self, mut config: PinInConfig) {
        let generation = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if config.keyboard == Keyboard::Null {
                config.keyboard = state.config.keyboard;
            }
            if config == state.config {
                tracing::debug!("config unchanged, commit skipped");
                return;
            }
            let generation = state.generation + 1;
            *state = Arc::new(Snapshot::build(&self.table, config, generation));
            generation
        };
        self.char_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset(generation);
        self.string_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset(generation);
        tracing::debug!(generation, keyboard = %config.keyboard, "committed config");
    }

    pub fn is_char_cache_enabled(&self) -> bool {
        self.char_cache_enabled.load(Ordering::Acquire)
    }

    /// Toggle per-character memoization. Disabling drops cached entries.
    pub fn set_char_cache(&self, enabled: bool) {
        self.char_cache_enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.pre_null_pinyin_id_cache();
        }
    }

    /// Drop every cached character entry.
    pub fn pre_null_pinyin_id_cache(&self) {
        let mut cache = self.char_cache.write().unwrap_or_else(PoisonError::into_inner);
        let generation = cache.generation;
        cache.reset(generation);
    }

    /// Encode `text` ahead of time so later encodings of it are cache hits.
    pub fn pre_cache_string(&self, text: &str) {
        let snapshot = self.snapshot();
        let encoding = Arc::new(self.encode_with(&snapshot, text));
        self.string_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.generation, text, encoding);
    }

    /// Characters currently held by the character cache.
    pub fn cached_chars(&self) -> Vec<char> {
        let cache = self.char_cache.read().unwrap_or_else(PoisonError::into_inner);
        let mut chars: Vec<char> = cache.entries.keys().copied().collect();
        chars.sort_unstable();
        chars
    }

    fn candidates(&self, snapshot: &Snapshot, ch: char) -> Candidates {
        let cache_enabled = self.is_char_cache_enabled();
        if cache_enabled {
            let cache = self.char_cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(snapshot.generation, ch) {
                return hit;
            }
        }
        let computed: Candidates = self
            .table
            .reading_ids(ch)
            .iter()
            .filter_map(|&id| snapshot.compiled.get(id as usize).cloned())
            .collect();
        if cache_enabled {
            self.char_cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(snapshot.generation, ch, Arc::clone(&computed));
        }
        computed
    }

    fn encode_with(&self, snapshot: &Snapshot, text: &str) -> Encoding {
        Encoding::new(
            text.nfc()
                .map(|ch| Unit::new(ch, self.candidates(snapshot, ch)))
                .collect(),
        )
    }

    /// Candidate readings for every character of `text` under the active
    /// config. Pre-cached strings are served from the string cache.
    pub fn encode(&self, text: &str) -> Arc<Encoding> {
        let snapshot = self.snapshot();
        let cached = self
            .string_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(snapshot.generation, text);
        cached.unwrap_or_else(|| Arc::new(self.encode_with(&snapshot, text)))
    }

    pub fn has_pinyin(&self, ch: char) -> bool {
        self.table.contains(ch)
    }

    pub fn readings(&self, ch: char) -> Vec<Reading> {
        self.table.readings_of(ch).cloned().collect()
    }

    pub fn format(&self, ch: char, format: Format) -> Vec<String> {
        self.table.readings_of(ch).map(|r| r.format(format)).collect()
    }

    /// `query` matches a contiguous run of `text`.
    pub fn contains(&self, text: &str, query: &str) -> bool {
        self.matches_with(text, query, Logic::Contain)
    }

    /// `query` matches a prefix of `text`.
    pub fn begins(&self, text: &str, query: &str) -> bool {
        self.matches_with(text, query, Logic::Begin)
    }

    /// `query` matches all of `text`.
    pub fn matches(&self, text: &str, query: &str) -> bool {
        self.matches_with(text, query, Logic::Equal)
    }

    fn matches_with(&self, text: &str, query: &str, logic: Logic) -> bool {
        match_units(self.encode(text).units(), &prepare(query), logic)
    }

    /// Write the engine image to `writer`.
    pub fn write_to<W: Write>(&self, writer: W) -> bincode::Result<()> {
        let snapshot = self.snapshot();
        codec::write_image(writer, ENGINE_IMAGE_VERSION, &self.image(&snapshot))
    }

    fn image<'a>(&self, snapshot: &'a Snapshot) -> EngineImageRef<'a> {
        EngineImageRef {
            config: &snapshot.config,
            table: self.table.to_image(),
            char_cache_enabled: self.is_char_cache_enabled(),
            warm_chars: self.cached_chars(),
        }
    }

    /// Write the engine image to `path`. Failures are logged and reported
    /// as `false`.
    pub fn serialize<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        match codec::save_image(path, ENGINE_IMAGE_VERSION, &self.image(&snapshot)) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to serialize engine");
                false
            }
        }
    }

    /// Restore an engine image from `path`. A keyboard other than `Null`
    /// replaces the stored one.
    pub fn deserialize<P: AsRef<Path>>(path: P, keyboard: Keyboard) -> Result<Self, DeserializeError> {
        Self::from_image(codec::load_image(path, ENGINE_IMAGE_VERSION)?, keyboard)
    }

    pub fn deserialize_from<R: Read>(reader: R, keyboard: Keyboard) -> Result<Self, DeserializeError> {
        Self::from_image(codec::read_image(reader, ENGINE_IMAGE_VERSION)?, keyboard)
    }

    fn from_image(image: EngineImage, keyboard: Keyboard) -> Result<Self, DeserializeError> {
        let table = PhoneticTable::from_image(image.table)?;
        let mut config = image.config;
        if keyboard != Keyboard::Null {
            config.keyboard = keyboard;
        }
        let engine = Self::with_config(table, config);
        engine.set_char_cache(image.char_cache_enabled);
        if image.char_cache_enabled {
            let snapshot = engine.snapshot();
            for ch in image.warm_chars {
                engine.candidates(&snapshot, ch);
            }
        }
        tracing::debug!(
            chars = engine.table.len(),
            keyboard = %engine.get_config().keyboard,
            "restored engine"
        );
        Ok(engine)
    }
}

impl std::fmt::Debug for PinIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinIn")
            .field("table", &self.table)
            .field("config", &self.get_config())
            .field("generation", &self.generation())
            .finish()
    }
}
