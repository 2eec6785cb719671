//! Phonetic index: interned units, a search tree over unit sequences and the
//! match walk that runs a query against either the tree or a plain unit
//! slice.
//!
//! The index is generic over [`PhoneticUnit`] so the tree walk stays agnostic
//! of how a unit decides which query spans it can consume.

use std::hash::Hash;
use std::str::FromStr;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::index_set::IndexSet;
use crate::trie::{Cursor, SearchTree, Symbol};

/// Match rule, fixed per searcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    /// Query consumed by a prefix of the entry.
    #[default]
    Begin,
    /// Query consumed by a contiguous run starting anywhere in the entry.
    Contain,
    /// Query and entry consumed completely.
    Equal,
}

impl Logic {
    /// Whether a query may stop in the middle of a syllable.
    pub fn allows_partial(self) -> bool {
        self != Logic::Equal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Logic::Begin => "begin",
            Logic::Contain => "contain",
            Logic::Equal => "equal",
        }
    }
}

impl FromStr for Logic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "begin" => Ok(Logic::Begin),
            "contain" => Ok(Logic::Contain),
            "equal" => Ok(Logic::Equal),
            other => Err(format!("unknown match logic '{other}' (begin, contain, equal)")),
        }
    }
}

impl std::fmt::Display for Logic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed position: knows which query lengths it can consume.
pub trait PhoneticUnit: Clone + Eq + Hash {
    /// Lengths of query spans starting at `start` this unit matches. With
    /// `partial`, a span that runs into the end of the query may stop inside
    /// the unit's spelling.
    fn match_at(&self, query: &[char], start: usize, partial: bool) -> IndexSet;
}

/// Interner assigning dense symbols to units.
#[derive(Debug, Clone)]
pub struct SymbolTable<U> {
    units: Vec<U>,
    lookup: AHashMap<U, Symbol>,
}

impl<U> Default for SymbolTable<U> {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            lookup: AHashMap::new(),
        }
    }
}

impl<U: PhoneticUnit> SymbolTable<U> {
    pub fn from_units(units: Vec<U>) -> Self {
        let lookup = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.clone(), i as Symbol))
            .collect();
        Self { units, lookup }
    }

    pub fn intern(&mut self, unit: U) -> Symbol {
        if let Some(&symbol) = self.lookup.get(&unit) {
            return symbol;
        }
        let symbol = self.units.len() as Symbol;
        self.units.push(unit.clone());
        self.lookup.insert(unit, symbol);
        symbol
    }

    pub fn get(&self, symbol: Symbol) -> Option<&U> {
        self.units.get(symbol as usize)
    }

    pub fn units(&self) -> &[U] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Search tree plus the symbols it is keyed by.
#[derive(Debug, Clone)]
pub struct PhoneticIndex<U> {
    logic: Logic,
    symbols: SymbolTable<U>,
    tree: SearchTree,
}

impl<U: PhoneticUnit> PhoneticIndex<U> {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            symbols: SymbolTable::default(),
            tree: SearchTree::new(),
        }
    }

    /// Reassemble a decoded index. Callers validate the tree first.
    pub fn from_parts(logic: Logic, symbols: SymbolTable<U>, tree: SearchTree) -> Self {
        Self {
            logic,
            symbols,
            tree,
        }
    }

    pub fn logic(&self) -> Logic {
        self.logic
    }

    pub fn symbols(&self) -> &SymbolTable<U> {
        &self.symbols
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// Index `units` under `id`. Contain indexes every suffix.
    pub fn insert<I>(&mut self, units: I, id: usize)
    where
        I: IntoIterator<Item = U>,
    {
        let key: Vec<Symbol> = units.into_iter().map(|u| self.symbols.intern(u)).collect();
        match self.logic {
            Logic::Contain if !key.is_empty() => self.tree.insert_suffixes(&key, id),
            _ => self.tree.insert(&key, id),
        }
    }

    /// Drop all symbols and tree nodes.
    pub fn clear(&mut self) {
        self.symbols = SymbolTable::default();
        self.tree.clear();
    }

    pub fn shrink_to_fit(&mut self) {
        self.symbols.units.shrink_to_fit();
        self.symbols.lookup.shrink_to_fit();
        self.tree.shrink_to_fit();
    }

    /// Ids matching `query`, ascending and deduplicated.
    pub fn search(&self, query: &[char]) -> Vec<usize> {
        let partial = self.logic.allows_partial();
        let mut found = Vec::new();
        let mut visited: AHashSet<(Cursor, usize)> = AHashSet::new();
        let root = Cursor {
            node: SearchTree::ROOT,
            depth: 0,
        };
        let mut stack = vec![(root, 0usize)];

        while let Some((cursor, offset)) = stack.pop() {
            if !visited.insert((cursor, offset)) {
                continue;
            }
            if offset == query.len() {
                match self.logic {
                    Logic::Equal if self.tree.at_node(cursor) => {
                        found.extend_from_slice(self.tree.node(cursor.node).ends())
                    }
                    Logic::Equal => {}
                    Logic::Begin | Logic::Contain => self.tree.collect(cursor.node, &mut found),
                }
                continue;
            }
            let mut step = |symbol: Symbol, next: Cursor| {
                let Some(unit) = self.symbols.get(symbol) else {
                    return;
                };
                for len in unit.match_at(query, offset, partial).iter() {
                    if len > 0 && offset + len <= query.len() {
                        stack.push((next, offset + len));
                    }
                }
            };
            match self.tree.next_in_label(cursor) {
                Some(symbol) => step(
                    symbol,
                    Cursor {
                        depth: cursor.depth + 1,
                        ..cursor
                    },
                ),
                None => {
                    for &(symbol, child) in self.tree.node(cursor.node).children() {
                        step(symbol, Cursor { node: child, depth: 1 });
                    }
                }
            }
        }

        found.sort_unstable();
        found.dedup();
        found
    }
}

/// Run `query` against a unit sequence under `logic` without any tree.
pub fn match_units<U: PhoneticUnit>(units: &[U], query: &[char], logic: Logic) -> bool {
    let partial = logic.allows_partial();
    let starts: Vec<usize> = match logic {
        Logic::Contain => (0..units.len().max(1)).collect(),
        Logic::Begin | Logic::Equal => vec![0],
    };
    let mut visited: AHashSet<(usize, usize)> = AHashSet::new();
    let mut stack: Vec<(usize, usize)> = starts.into_iter().map(|s| (s, 0)).collect();

    while let Some((position, offset)) = stack.pop() {
        if !visited.insert((position, offset)) {
            continue;
        }
        if offset == query.len() {
            if logic != Logic::Equal || position == units.len() {
                return true;
            }
            continue;
        }
        let Some(unit) = units.get(position) else {
            continue;
        };
        for len in unit.match_at(query, offset, partial).iter() {
            if len > 0 && offset + len <= query.len() {
                stack.push((position + 1, offset + len));
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit spelled by a fixed string; matches its full spelling, its first
    /// letter, or (when partial) any prefix that reaches the query end.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Spelled(&'static str);

    impl PhoneticUnit for Spelled {
        fn match_at(&self, query: &[char], start: usize, partial: bool) -> IndexSet {
            let spelling: Vec<char> = self.0.chars().collect();
            let common = query[start..]
                .iter()
                .zip(&spelling)
                .take_while(|(a, b)| a == b)
                .count();
            let mut set = IndexSet::NONE;
            if common == spelling.len() {
                set.set(common);
            } else if partial && start + common == query.len() {
                set.set(common);
            }
            if common >= 1 {
                set.set(1);
            }
            set
        }
    }

    fn q(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn index(logic: Logic) -> PhoneticIndex<Spelled> {
        let mut index = PhoneticIndex::new(logic);
        index.insert([Spelled("xi"), Spelled("an")], 0);
        index.insert([Spelled("xian")], 1);
        index.insert([Spelled("bei"), Spelled("jing")], 2);
        index
    }

    #[test]
    fn equal_requires_everything_consumed() {
        let index = index(Logic::Equal);
        assert_eq!(index.search(&q("xian")), vec![0, 1]);
        // "a" abbreviates "an"; "xian" cannot stop after "xia"
        assert_eq!(index.search(&q("xia")), vec![0]);
        assert_eq!(index.search(&q("xianx")), Vec::<usize>::new());
        assert_eq!(index.search(&q("bj")), vec![2]);
        assert_eq!(index.search(&q("b")), Vec::<usize>::new());
    }

    #[test]
    fn begin_accepts_prefixes() {
        let index = index(Logic::Begin);
        assert_eq!(index.search(&q("xi")), vec![0, 1]);
        assert_eq!(index.search(&q("bei")), vec![2]);
        assert_eq!(index.search(&q("jing")), Vec::<usize>::new());
    }

    #[test]
    fn contain_finds_interior_runs() {
        let index = index(Logic::Contain);
        assert_eq!(index.search(&q("jin")), vec![2]);
        assert_eq!(index.search(&q("an")), vec![0]);
    }

    #[test]
    fn empty_query() {
        assert_eq!(index(Logic::Begin).search(&[]), vec![0, 1, 2]);
        assert_eq!(index(Logic::Contain).search(&[]), vec![0, 1, 2]);
        assert!(index(Logic::Equal).search(&[]).is_empty());

        let mut with_empty = index(Logic::Equal);
        with_empty.insert(Vec::<Spelled>::new(), 3);
        assert_eq!(with_empty.search(&[]), vec![3]);
    }

    #[test]
    fn symbols_are_shared_between_entries() {
        let index = index(Logic::Contain);
        // xi, an, xian, bei, jing
        assert_eq!(index.symbols().len(), 5);
    }

    #[test]
    fn linear_match_agrees_with_tree() {
        let units = [Spelled("bei"), Spelled("jing")];
        assert!(match_units(&units, &q("bj"), Logic::Equal));
        assert!(match_units(&units, &q("beij"), Logic::Begin));
        assert!(!match_units(&units, &q("jing"), Logic::Begin));
        assert!(match_units(&units, &q("jing"), Logic::Contain));
        assert!(!match_units(&units, &q("beijingx"), Logic::Contain));
    }

    #[test]
    fn logic_parses_case_insensitively() {
        assert_eq!("Contain".parse::<Logic>(), Ok(Logic::Contain));
        assert!("fuzzy".parse::<Logic>().is_err());
        assert_eq!(Logic::Equal.to_string(), "equal");
    }
}
