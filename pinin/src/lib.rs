//! pinin crate root
//!
//! Pinyin fuzzy matching for Chinese text: a phonetic table, an engine that
//! compiles readings under a keyboard scheme and normalization flags, and a
//! tree searcher indexing strings for prefix, substring or exact queries.
//!
//! Public API exported here:
//! - `PinIn` from `engine`
//! - `TreeSearcher` from `searcher`
//! - `PinInConfig` from `config`, `Keyboard` from `keyboard`
//! - `PhoneticTable` from `table`
//! - `Reading`, `Format` from `syllable`
//! - `Encoding`, `Unit`, `Segment`, `Pinyin` from `pinyin`
//! - `Logic` and the error types re-exported from `pinin-core`
//!
//! ```rust
//! use std::sync::Arc;
//! use pinin::{Logic, PinIn, TreeSearcher};
//!
//! let pinin = Arc::new(PinIn::from_reader("U+897F: xī\nU+5B89: ān\n".as_bytes()).unwrap());
//! let mut searcher = TreeSearcher::from_engine(Logic::Begin, pinin);
//! let id = searcher.put_string("西安");
//! assert_eq!(searcher.execute_search("xian"), vec![id]);
//! ```

pub mod config;
pub mod engine;
pub mod fuzzy;
pub mod keyboard;
pub mod pinyin;
pub mod searcher;
pub mod syllable;
pub mod table;
pub mod zhuyin;

pub use pinin_core::{DeserializeError, InitError, Logic, LookupError};

pub use config::PinInConfig;
pub use engine::PinIn;
pub use keyboard::Keyboard;
pub use pinyin::{prepare, Combinations, Encoding, Phoneme, Pinyin, Segment, Unit};
pub use searcher::TreeSearcher;
pub use syllable::{Format, Reading};
pub use table::PhoneticTable;
