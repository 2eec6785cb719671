//! pinin-core
//!
//! Language-agnostic building blocks for phonetic fuzzy search, shared by the
//! `pinin` crate.
//!
//! Public API:
//! - `PhoneticIndex` - Search tree over interned phonetic units, walked under a `Logic`
//! - `PhoneticUnit` - What an indexed position must answer during a walk
//! - `IndexSet` - Set of query lengths a unit can consume
//! - `StringPool` - Append-only id ↔ string storage
//! - `codec` - Version-tagged bincode images
//! - `InitError`, `DeserializeError`, `LookupError` - Error taxonomy

pub mod error;
pub use error::{DeserializeError, InitError, LookupError};

pub mod index_set;
pub use index_set::IndexSet;

pub mod trie;
pub use trie::{SearchTree, Symbol};

pub mod index;
pub use index::{match_units, Logic, PhoneticIndex, PhoneticUnit, SymbolTable};

pub mod pool;
pub use pool::StringPool;

pub mod codec;
