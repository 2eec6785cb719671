// core/tests/index_walk.rs
//
// Integration tests for the generic phonetic index.
//
// Tests cover:
// - Tree search agrees with the tree-less matcher for every logic
// - Abbreviated units (first letter only)
// - Search tree and pool survive an image round trip

use pinin_core::codec::{decode_image, write_image};
use pinin_core::{match_units, IndexSet, Logic, PhoneticIndex, PhoneticUnit, SearchTree, StringPool};
use serde::{Deserialize, Serialize};

/// A word that matches its full spelling or its first letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Word(&'static str);

impl PhoneticUnit for Word {
    fn match_at(&self, query: &[char], start: usize, partial: bool) -> IndexSet {
        let mut out = IndexSet::NONE;
        let rest = query.get(start..).unwrap_or(&[]);
        let mut common = 0;
        for (i, c) in self.0.chars().enumerate() {
            if rest.get(i) != Some(&c) {
                break;
            }
            common = i + 1;
        }
        if common >= 1 {
            out.set(1);
        }
        if common == self.0.chars().count() || (partial && start + common == query.len()) {
            out.set(common);
        }
        out
    }
}

fn phrases() -> Vec<Vec<Word>> {
    vec![
        vec![Word("red"), Word("apple")],
        vec![Word("green"), Word("apple"), Word("pie")],
        vec![Word("apple")],
        vec![],
    ]
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

#[test]
fn tree_and_linear_matcher_agree() {
    let queries = ["", "a", "ap", "apple", "rapple", "ra", "gap", "gappie", "pie", "redapple", "x"];
    for logic in [Logic::Begin, Logic::Contain, Logic::Equal] {
        let mut index = PhoneticIndex::new(logic);
        for (id, phrase) in phrases().into_iter().enumerate() {
            index.insert(phrase, id);
        }
        for query in queries {
            let q = chars(query);
            let expected: Vec<usize> = phrases()
                .iter()
                .enumerate()
                .filter(|(_, units)| match_units(units, &q, logic))
                .map(|(id, _)| id)
                .collect();
            assert_eq!(index.search(&q), expected, "{logic} {query:?}");
        }
    }
}

#[test]
fn abbreviations_and_partial_words() {
    let mut begin = PhoneticIndex::new(Logic::Begin);
    let mut equal = PhoneticIndex::new(Logic::Equal);
    for (id, phrase) in phrases().into_iter().enumerate() {
        begin.insert(phrase.clone(), id);
        equal.insert(phrase, id);
    }
    assert_eq!(begin.search(&chars("gap")), vec![1]);
    assert_eq!(begin.search(&chars("app")), vec![2]);
    assert_eq!(equal.search(&chars("app")), Vec::<usize>::new());
    assert_eq!(equal.search(&chars("ra")), vec![0]);
    assert_eq!(equal.search(&chars("")), vec![3]);
}

#[derive(Serialize, Deserialize)]
struct Image {
    strings: Vec<String>,
    tree: SearchTree,
}

#[test]
fn tree_and_pool_round_trip() {
    let pool = StringPool::from_strings(["red apple", "green apple pie", "apple", ""]);
    let mut index = PhoneticIndex::new(Logic::Contain);
    for (id, phrase) in phrases().into_iter().enumerate() {
        index.insert(phrase, id);
    }

    let image = Image {
        strings: pool.iter().map(|(_, s)| s.to_string()).collect(),
        tree: index.tree().clone(),
    };
    let mut buf = Vec::new();
    write_image(&mut buf, 7, &image).unwrap();
    let back: Image = decode_image(&buf, 7).unwrap();

    assert!(back.tree.validate(index.symbols().len(), back.strings.len()).is_ok());
    assert!(back.tree.covers_all_ids(back.strings.len()));
    let rebuilt = PhoneticIndex::from_parts(Logic::Contain, index.symbols().clone(), back.tree);
    let pool = StringPool::from_strings(&back.strings);
    let hits: Vec<&str> = rebuilt
        .search(&chars("apple"))
        .into_iter()
        .filter_map(|id| pool.get(id))
        .collect();
    assert_eq!(hits, vec!["red apple", "green apple pie", "apple"]);
}
