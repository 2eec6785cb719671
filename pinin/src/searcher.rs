//! Fuzzy pinyin search over a growing set of strings.
//!
//! A `TreeSearcher` pools every inserted string under a monotonic id and
//! indexes the string's per-character units in a search tree walked under
//! one [`Logic`]. Units carry the readings compiled when the string was
//! inserted; after a config commit on the shared engine, [`refresh`]
//! re-encodes everything.
//!
//! [`refresh`]: TreeSearcher::refresh

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use pinin_core::{
    codec, DeserializeError, InitError, Logic, LookupError, PhoneticIndex, SearchTree,
    StringPool, SymbolTable,
};
use serde::{Deserialize, Serialize};

use crate::engine::PinIn;
use crate::pinyin::{prepare, Pinyin, Unit};

/// Leading tag of searcher images.
pub const SEARCHER_IMAGE_VERSION: u32 = 0x5453_0001;

#[derive(Serialize)]
struct SearcherImageRef<'a> {
    logic: Logic,
    table_len: u64,
    strings: Vec<&'a str>,
    pinyins: Vec<&'a Pinyin>,
    units: Vec<(char, Vec<u32>)>,
    tree: &'a SearchTree,
}

#[derive(Deserialize)]
struct SearcherImage {
    logic: Logic,
    table_len: u64,
    strings: Vec<String>,
    pinyins: Vec<Pinyin>,
    units: Vec<(char, Vec<u32>)>,
    tree: SearchTree,
}

pub struct TreeSearcher {
    pinin: Arc<PinIn>,
    pool: StringPool,
    index: PhoneticIndex<Unit>,
}

impl TreeSearcher {
    /// Empty searcher sharing an existing engine.
    pub fn from_engine(logic: Logic, pinin: Arc<PinIn>) -> Self {
        Self {
            pinin,
            pool: StringPool::new(),
            index: PhoneticIndex::new(logic),
        }
    }

    /// Empty searcher with its own engine built from a phonetic-table file.
    pub fn from_source<P: AsRef<Path>>(logic: Logic, path: P) -> Result<Self, InitError> {
        Ok(Self::from_engine(logic, Arc::new(PinIn::new(path)?)))
    }

    pub fn get_pinin(&self) -> Arc<PinIn> {
        Arc::clone(&self.pinin)
    }

    pub fn logic(&self) -> Logic {
        self.index.logic()
    }

    /// Number of pooled strings; also the next id.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Pool `item` and index it under a fresh id.
    pub fn put_string(&mut self, item: &str) -> usize {
        let id = self.pool.push(item);
        let encoding = self.pinin.encode(item);
        self.index.insert(encoding.units().iter().cloned(), id);
        id
    }

    /// Ids of entries matching `query`, ascending.
    pub fn execute_search(&self, query: &str) -> Vec<usize> {
        self.index.search(&prepare(query))
    }

    /// Like [`execute_search`](Self::execute_search) but resolved to strings.
    pub fn execute_search_strings(&self, query: &str) -> Vec<&str> {
        self.execute_search(query)
            .into_iter()
            .filter_map(|id| self.pool.get(id))
            .collect()
    }

    /// Byte length of the string stored under `id`.
    pub fn get_str_size_by_id(&self, id: usize) -> Result<usize, LookupError> {
        self.pool.lookup(id).map(str::len)
    }

    pub fn get_str_by_id(&self, id: usize) -> Result<&str, LookupError> {
        self.pool.lookup(id)
    }

    /// Resolve every id, failing on the first unknown one.
    pub fn get_str_list_by_ids(&self, ids: &[usize]) -> Result<Vec<&str>, LookupError> {
        ids.iter().map(|&id| self.pool.lookup(id)).collect()
    }

    /// Reserve pool storage for `capacity` bytes of string data in total.
    pub fn str_pool_reserve(&mut self, capacity: usize) {
        self.pool.reserve(capacity);
    }

    /// Re-encode every entry under the engine's current config, keeping ids.
    pub fn refresh(&mut self) {
        self.index.clear();
        for (id, item) in self.pool.iter() {
            let encoding = self.pinin.encode(item);
            self.index.insert(encoding.units().iter().cloned(), id);
        }
        tracing::debug!(
            entries = self.pool.len(),
            nodes = self.index.tree().node_count(),
            symbols = self.index.symbols().len(),
            "rebuilt search tree"
        );
    }

    pub fn shrink_to_fit(&mut self) {
        self.pool.shrink_to_fit();
        self.index.shrink_to_fit();
    }

    fn image(&self) -> SearcherImageRef<'_> {
        let mut pinyins: Vec<&Pinyin> = Vec::new();
        let mut positions: AHashMap<&Pinyin, u32> = AHashMap::new();
        let units: Vec<(char, Vec<u32>)> = self
            .index
            .symbols()
            .units()
            .iter()
            .map(|unit| {
                let ids: Vec<u32> = unit
                    .pinyins()
                    .iter()
                    .map(|pinyin| {
                        let pinyin: &Pinyin = pinyin;
                        *positions.entry(pinyin).or_insert_with(|| {
                            pinyins.push(pinyin);
                            (pinyins.len() - 1) as u32
                        })
                    })
                    .collect();
                (unit.ch(), ids)
            })
            .collect();
        SearcherImageRef {
            logic: self.logic(),
            table_len: self.pinin.table().len() as u64,
            strings: self.pool.iter().map(|(_, s)| s).collect(),
            pinyins,
            units,
            tree: self.index.tree(),
        }
    }

    pub fn write_to<W: Write>(&self, writer: W) -> bincode::Result<()> {
        codec::write_image(writer, SEARCHER_IMAGE_VERSION, &self.image())
    }

    /// Write the searcher image to `path`. Failures are logged and
    /// reported as `false`.
    pub fn serialize<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        match codec::save_image(path, SEARCHER_IMAGE_VERSION, &self.image()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to serialize searcher");
                false
            }
        }
    }

    /// Restore a searcher image from `path`, bound to `pinin`.
    pub fn deserialize<P: AsRef<Path>>(path: P, pinin: Arc<PinIn>) -> Result<Self, DeserializeError> {
        Self::from_image(codec::load_image(path, SEARCHER_IMAGE_VERSION)?, pinin)
    }

    pub fn deserialize_from<R: Read>(reader: R, pinin: Arc<PinIn>) -> Result<Self, DeserializeError> {
        Self::from_image(codec::read_image(reader, SEARCHER_IMAGE_VERSION)?, pinin)
    }

    fn from_image(image: SearcherImage, pinin: Arc<PinIn>) -> Result<Self, DeserializeError> {
        let SearcherImage {
            logic,
            table_len,
            strings,
            pinyins,
            units,
            tree,
        } = image;

        if table_len != pinin.table().len() as u64 {
            tracing::warn!(
                stored = table_len,
                bound = pinin.table().len(),
                "searcher image was built against a different phonetic table"
            );
        }

        if let Some(bad) = pinyins.iter().find(|p| !p.reading().is_well_formed()) {
            return Err(DeserializeError::out_of_range(format!(
                "malformed reading {}",
                bad.reading()
            )));
        }
        let pinyins: Vec<Arc<Pinyin>> = pinyins.into_iter().map(Arc::new).collect();
        let mut decoded = Vec::with_capacity(units.len());
        for (ch, ids) in units {
            let candidates = ids
                .iter()
                .map(|&id| {
                    pinyins.get(id as usize).cloned().ok_or_else(|| {
                        DeserializeError::out_of_range(format!("reading {id} out of range"))
                    })
                })
                .collect::<Result<Arc<[Arc<Pinyin>]>, _>>()?;
            decoded.push(Unit::new(ch, candidates));
        }
        if decoded.iter().collect::<AHashSet<_>>().len() != decoded.len() {
            return Err(DeserializeError::out_of_range("duplicate phonetic units"));
        }

        tree.validate(decoded.len(), strings.len())
            .map_err(DeserializeError::out_of_range)?;
        if !tree.covers_all_ids(strings.len()) {
            return Err(DeserializeError::out_of_range("pooled string missing from search tree"));
        }

        let mut pool = StringPool::new();
        pool.try_reserve(strings.iter().map(String::len).sum())
            .map_err(|_| DeserializeError::BadAlloc)?;
        for item in &strings {
            pool.push(item);
        }

        let index = PhoneticIndex::from_parts(logic, SymbolTable::from_units(decoded), tree);
        tracing::debug!(
            entries = pool.len(),
            symbols = index.symbols().len(),
            nodes = index.tree().node_count(),
            logic = %logic,
            "restored searcher"
        );
        Ok(Self { pinin, pool, index })
    }
}

impl std::fmt::Debug for TreeSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSearcher")
            .field("logic", &self.logic())
            .field("entries", &self.pool.len())
            .field("symbols", &self.index.symbols().len())
            .field("nodes", &self.index.tree().node_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinInConfig;

    const TABLE: &str = include_str!("../tests/data/pinyin.txt");

    fn searcher(logic: Logic) -> TreeSearcher {
        let pinin = Arc::new(PinIn::from_reader(TABLE.as_bytes()).unwrap());
        TreeSearcher::from_engine(logic, pinin)
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut s = searcher(Logic::Begin);
        assert!(s.is_empty());
        assert_eq!(s.put_string("北京"), 0);
        assert_eq!(s.put_string("上海"), 1);
        assert_eq!(s.put_string("北京"), 2);
        assert_eq!(s.len(), 3);
        assert_eq!(s.execute_search("beijing"), vec![0, 2]);
    }

    #[test]
    fn lookups() {
        let mut s = searcher(Logic::Contain);
        s.put_string("中国");
        s.put_string("hello");
        assert_eq!(s.get_str_by_id(0), Ok("中国"));
        assert_eq!(s.get_str_size_by_id(0), Ok(6));
        assert_eq!(s.get_str_size_by_id(1), Ok(5));
        assert_eq!(s.get_str_list_by_ids(&[1, 0]), Ok(vec!["hello", "中国"]));
        assert_eq!(
            s.get_str_list_by_ids(&[0, 7]),
            Err(LookupError::UnknownId { id: 7, len: 2 })
        );
        assert_eq!(s.execute_search_strings("guo"), vec!["中国"]);
        assert_eq!(s.execute_search_strings("LL"), vec!["hello"]);
    }

    #[test]
    fn commit_then_refresh_reclassifies() {
        let mut s = searcher(Logic::Equal);
        s.put_string("中国");
        assert!(s.execute_search("zongguo").is_empty());

        let pinin = s.get_pinin();
        pinin.commit(pinin.get_config().with_zh2z(true));
        // existing entries keep their readings until refreshed
        assert!(s.execute_search("zongguo").is_empty());
        s.refresh();
        assert_eq!(s.execute_search("zongguo"), vec![0]);
        assert_eq!(s.execute_search("zhongguo"), vec![0]);
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut s = searcher(Logic::Contain);
        for item in ["北京银行", "上海", "你好", "绿色"] {
            s.put_string(item);
        }
        let queries = ["yin", "hai", "hao", "lv", "bj"];
        let before: Vec<Vec<usize>> = queries.iter().map(|q| s.execute_search(q)).collect();
        s.refresh();
        s.refresh();
        let after: Vec<Vec<usize>> = queries.iter().map(|q| s.execute_search(q)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn image_round_trip_preserves_results() {
        let mut s = searcher(Logic::Begin);
        for item in ["西安", "先", "中国", "abc"] {
            s.put_string(item);
        }
        s.str_pool_reserve(256);
        s.shrink_to_fit();

        let mut buf = Vec::new();
        s.write_to(&mut buf).unwrap();
        let back = TreeSearcher::deserialize_from(buf.as_slice(), s.get_pinin()).unwrap();
        assert_eq!(back.logic(), Logic::Begin);
        assert_eq!(back.len(), 4);
        for query in ["xian", "xi", "zg", "ab", ""] {
            assert_eq!(back.execute_search(query), s.execute_search(query), "{query}");
        }
    }

    #[test]
    fn corrupt_images_are_rejected() {
        let mut s = searcher(Logic::Equal);
        s.put_string("你好");
        let mut buf = Vec::new();
        s.write_to(&mut buf).unwrap();

        let pinin = s.get_pinin();
        let truncated = &buf[..buf.len() - 3];
        assert!(matches!(
            TreeSearcher::deserialize_from(truncated, Arc::clone(&pinin)),
            Err(DeserializeError::OutOfRange(_))
        ));

        let mut engine_image = Vec::new();
        pinin.write_to(&mut engine_image).unwrap();
        assert!(matches!(
            TreeSearcher::deserialize_from(engine_image.as_slice(), pinin),
            Err(DeserializeError::BinaryVersionInvalid { .. })
        ));
    }

    #[test]
    fn config_default_is_used_by_fresh_engines() {
        let s = searcher(Logic::Begin);
        assert_eq!(s.get_pinin().get_config(), PinInConfig::default());
    }
}
