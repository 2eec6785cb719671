/// Path-compressed arena trie over symbol sequences, used as the search tree.
use serde::{Deserialize, Serialize};

/// Interned phonetic unit.
pub type Symbol = u32;
pub type NodeId = u32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Edge label from the parent: `len` symbols at `start` in the shared
    /// label buffer. Empty only for the root.
    start: u32,
    len: u32,
    /// Children sorted by the first symbol of their label.
    children: Vec<(Symbol, NodeId)>,
    /// Ids whose key ends at this node.
    ends: Vec<usize>,
}

impl Node {
    fn leaf(start: usize, len: usize) -> Self {
        Self {
            start: start as u32,
            len: len as u32,
            ..Self::default()
        }
    }

    pub fn children(&self) -> &[(Symbol, NodeId)] {
        &self.children
    }

    pub fn ends(&self) -> &[usize] {
        &self.ends
    }

    /// Number of symbols on the edge into this node.
    pub fn label_len(&self) -> usize {
        self.len as usize
    }
}

/// A position inside the tree: `depth` symbols into the label of `node`.
/// `depth == label_len` means the position is at `node` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub node: NodeId,
    pub depth: u32,
}

/// A prefix tree stored as a flat node arena; node 0 is the root.
///
/// Chains without branches collapse into one node whose label points into a
/// shared symbol buffer, so a key stored together with all of its suffixes
/// costs a number of nodes linear in its length.
///
/// # Example
/// ```
/// use pinin_core::trie::SearchTree;
///
/// let mut tree = SearchTree::new();
/// tree.insert(&[1, 2], 0);
/// tree.insert(&[1, 3], 1);
///
/// let cursor = tree.walk(&[1]).unwrap();
/// let mut ids = Vec::new();
/// tree.collect(cursor.node, &mut ids);
/// assert_eq!(ids, vec![0, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTree {
    nodes: Vec<Node>,
    labels: Vec<Symbol>,
}

impl Default for SearchTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            labels: Vec::new(),
        }
    }

    /// Record `id` at the end of the path spelled by `key`, creating nodes as
    /// needed. An empty key records at the root.
    pub fn insert(&mut self, key: &[Symbol], id: usize) {
        let base = self.labels.len();
        self.labels.extend_from_slice(key);
        if !self.insert_span(base, base + key.len(), id) {
            self.labels.truncate(base);
        }
    }

    /// Record `id` under `key` and under every non-empty suffix of it. The
    /// suffixes share one copy of `key` in the label buffer.
    pub fn insert_suffixes(&mut self, key: &[Symbol], id: usize) {
        let base = self.labels.len();
        self.labels.extend_from_slice(key);
        let mut referenced = false;
        for start in base..base + key.len() {
            referenced |= self.insert_span(start, base + key.len(), id);
        }
        if !referenced {
            self.labels.truncate(base);
        }
    }

    /// Insert the key stored at `labels[from..to]`. Returns whether a new
    /// leaf now points into that span.
    fn insert_span(&mut self, mut from: usize, to: usize, id: usize) -> bool {
        let mut node = Self::ROOT;
        let mut created = false;
        while from < to {
            let symbol = self.labels[from];
            let Some(child) = self.child(node, symbol) else {
                let leaf = self.push_node(Node::leaf(from, to - from));
                self.attach(node, symbol, leaf);
                node = leaf;
                created = true;
                break;
            };
            let (start, len) = {
                let n = &self.nodes[child as usize];
                (n.start as usize, n.len as usize)
            };
            let common = self.labels[start..start + len]
                .iter()
                .zip(&self.labels[from..to])
                .take_while(|(a, b)| a == b)
                .count();
            if common < len {
                self.split(child, common);
            }
            node = child;
            from += common;
        }
        let ends = &mut self.nodes[node as usize].ends;
        if ends.last() != Some(&id) {
            ends.push(id);
        }
        created
    }

    /// Cut the label of `node` after `at` symbols. The node keeps its id and
    /// the first part of the label; its children and ends move to a new node
    /// below it.
    fn split(&mut self, node: NodeId, at: usize) {
        let n = &mut self.nodes[node as usize];
        let tail = Node {
            start: n.start + at as u32,
            len: n.len - at as u32,
            children: std::mem::take(&mut n.children),
            ends: std::mem::take(&mut n.ends),
        };
        n.len = at as u32;
        let symbol = self.labels[tail.start as usize];
        let tail = self.push_node(tail);
        self.nodes[node as usize].children.push((symbol, tail));
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        (self.nodes.len() - 1) as NodeId
    }

    fn attach(&mut self, parent: NodeId, symbol: Symbol, child: NodeId) {
        let children = &mut self.nodes[parent as usize].children;
        if let Err(pos) = children.binary_search_by_key(&symbol, |&(s, _)| s) {
            children.insert(pos, (symbol, child));
        }
    }

    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node as usize]
    }

    /// Child of `node` whose label starts with `symbol`.
    pub fn child(&self, node: NodeId, symbol: Symbol) -> Option<NodeId> {
        let children = &self.nodes.get(node as usize)?.children;
        children
            .binary_search_by_key(&symbol, |&(s, _)| s)
            .ok()
            .map(|pos| children[pos].1)
    }

    /// Symbol that follows `cursor` along its current label, if the cursor
    /// sits inside one.
    pub fn next_in_label(&self, cursor: Cursor) -> Option<Symbol> {
        let n = self.nodes.get(cursor.node as usize)?;
        if cursor.depth < n.len {
            self.labels.get((n.start + cursor.depth) as usize).copied()
        } else {
            None
        }
    }

    /// Whether `cursor` sits on a node rather than inside a label.
    pub fn at_node(&self, cursor: Cursor) -> bool {
        self.nodes
            .get(cursor.node as usize)
            .is_some_and(|n| cursor.depth >= n.len)
    }

    /// Follow `key` from the root exactly. The result may stop inside a label.
    pub fn walk(&self, key: &[Symbol]) -> Option<Cursor> {
        let mut cursor = Cursor {
            node: Self::ROOT,
            depth: 0,
        };
        for &symbol in key {
            cursor = match self.next_in_label(cursor) {
                Some(next) if next == symbol => Cursor {
                    depth: cursor.depth + 1,
                    ..cursor
                },
                Some(_) => return None,
                None => Cursor {
                    node: self.child(cursor.node, symbol)?,
                    depth: 1,
                },
            };
        }
        Some(cursor)
    }

    /// Append every id recorded in the subtree rooted at `node`.
    pub fn collect(&self, node: NodeId, out: &mut Vec<usize>) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let n = &self.nodes[current as usize];
            out.extend_from_slice(&n.ends);
            stack.extend(n.children.iter().map(|&(_, child)| child));
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Symbols held in the shared label buffer.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::default());
        self.labels.clear();
    }

    pub fn shrink_to_fit(&mut self) {
        for node in &mut self.nodes {
            node.children.shrink_to_fit();
            node.ends.shrink_to_fit();
        }
        self.nodes.shrink_to_fit();
        self.labels.shrink_to_fit();
    }

    /// Check structural soundness of a decoded tree: the root has an empty
    /// label, every other node is reached through exactly one child link,
    /// labels lie inside the buffer and agree with their child keys, symbols
    /// are below `symbol_count` and ids below `id_count`. Returns the first
    /// problem.
    pub fn validate(&self, symbol_count: usize, id_count: usize) -> Result<(), String> {
        let Some(root) = self.nodes.first() else {
            return Err("search tree has no root".into());
        };
        if root.len != 0 {
            return Err("root carries a label".into());
        }
        if let Some(symbol) = self.labels.iter().find(|&&s| s as usize >= symbol_count) {
            return Err(format!("symbol {symbol} out of range"));
        }

        let mut parents = vec![0u32; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if index != 0 {
                let end = node.start as usize + node.len as usize;
                if node.len == 0 || end > self.labels.len() {
                    return Err(format!("node {index}: label out of range"));
                }
            }
            let mut previous = None;
            for &(symbol, child) in &node.children {
                let Some(target) = self.nodes.get(child as usize).filter(|_| child != Self::ROOT) else {
                    return Err(format!("node {index}: child link {child} out of range"));
                };
                if self.labels.get(target.start as usize) != Some(&symbol) {
                    return Err(format!("node {index}: child {child} label does not start with {symbol}"));
                }
                if previous.is_some_and(|p| p >= symbol) {
                    return Err(format!("node {index}: children not sorted"));
                }
                previous = Some(symbol);
                parents[child as usize] += 1;
            }
            if let Some(&id) = node.ends.iter().find(|&&id| id >= id_count) {
                return Err(format!("node {index}: id {id} out of range"));
            }
        }
        if let Some(index) = parents.iter().skip(1).position(|&p| p != 1) {
            return Err(format!("node {} has {} parents", index + 1, parents[index + 1]));
        }

        // one parent each and a parentless root still allows detached cycles
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![Self::ROOT];
        while let Some(current) = stack.pop() {
            seen[current as usize] = true;
            stack.extend(self.nodes[current as usize].children.iter().map(|&(_, c)| c));
        }
        if let Some(index) = seen.iter().position(|s| !s) {
            return Err(format!("node {index} is unreachable"));
        }
        Ok(())
    }

    /// Every id in `0..id_count` is recorded somewhere in the tree.
    pub fn covers_all_ids(&self, id_count: usize) -> bool {
        let mut seen = vec![false; id_count];
        for node in &self.nodes {
            for &id in &node.ends {
                if let Some(slot) = seen.get_mut(id) {
                    *slot = true;
                }
            }
        }
        seen.into_iter().all(|s| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_at(tree: &SearchTree, key: &[Symbol]) -> Vec<usize> {
        let cursor = tree.walk(key).unwrap();
        assert!(tree.at_node(cursor), "{key:?} ends inside a label");
        tree.node(cursor.node).ends().to_vec()
    }

    #[test]
    fn shared_prefixes_share_nodes() {
        let mut tree = SearchTree::new();
        tree.insert(&[5, 1], 0);
        tree.insert(&[5, 2], 1);
        tree.insert(&[5], 2);
        // root, 5, 5-1, 5-2
        assert_eq!(tree.node_count(), 4);

        assert_eq!(ids_at(&tree, &[5]), vec![2]);
        let five = tree.walk(&[5]).unwrap().node;
        assert_eq!(
            tree.node(five).children().iter().map(|c| c.0).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(ids_at(&tree, &[5, 2]), vec![1]);
    }

    #[test]
    fn chains_collapse_and_split_on_divergence() {
        let mut tree = SearchTree::new();
        tree.insert(&[1, 2, 3, 4], 0);
        assert_eq!(tree.node_count(), 2);

        let inside = tree.walk(&[1, 2]).unwrap();
        assert!(!tree.at_node(inside));
        assert_eq!(tree.next_in_label(inside), Some(3));

        tree.insert(&[1, 2, 9], 1);
        // root, 1-2, 3-4, 9
        assert_eq!(tree.node_count(), 4);
        assert!(tree.at_node(tree.walk(&[1, 2]).unwrap()));
        assert_eq!(ids_at(&tree, &[1, 2, 3, 4]), vec![0]);
        assert_eq!(ids_at(&tree, &[1, 2, 9]), vec![1]);

        tree.insert(&[1], 2);
        assert_eq!(ids_at(&tree, &[1]), vec![2]);
        assert_eq!(ids_at(&tree, &[1, 2, 3, 4]), vec![0]);
        assert!(tree.walk(&[1, 3]).is_none());
        assert!(tree.validate(10, 3).is_ok());
    }

    #[test]
    fn suffixes_stay_linear() {
        let key: Vec<Symbol> = (0..2000).collect();
        let mut tree = SearchTree::new();
        tree.insert_suffixes(&key, 0);
        assert_eq!(tree.node_count(), key.len() + 1);
        assert_eq!(tree.label_count(), key.len());
        assert_eq!(ids_at(&tree, &key[1500..]), vec![0]);

        let repeated = vec![7; 2000];
        let mut tree = SearchTree::new();
        tree.insert_suffixes(&repeated, 0);
        assert!(tree.node_count() <= 2 * repeated.len() + 1);
        assert_eq!(ids_at(&tree, &repeated[..3]), vec![0]);
    }

    #[test]
    fn known_keys_add_no_labels() {
        let mut tree = SearchTree::new();
        tree.insert(&[1, 2, 3], 0);
        tree.insert(&[1, 2], 1);
        tree.insert(&[1, 2, 3], 2);
        assert_eq!(tree.label_count(), 3);
        assert_eq!(ids_at(&tree, &[1, 2, 3]), vec![0, 2]);
    }

    #[test]
    fn collect_gathers_whole_subtree() {
        let mut tree = SearchTree::new();
        tree.insert(&[1, 2, 3], 0);
        tree.insert(&[1, 4], 1);
        tree.insert(&[], 2);

        let mut ids = Vec::new();
        tree.collect(SearchTree::ROOT, &mut ids);
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);

        assert!(tree.walk(&[2]).is_none());
    }

    #[test]
    fn repeated_insert_of_same_id_is_recorded_once() {
        let mut tree = SearchTree::new();
        tree.insert(&[7], 3);
        tree.insert(&[7], 3);
        assert_eq!(ids_at(&tree, &[7]), vec![3]);
    }

    #[test]
    fn validate_rejects_dangling_references() {
        let mut tree = SearchTree::new();
        tree.insert(&[0, 1], 0);
        assert!(tree.validate(2, 1).is_ok());
        assert!(tree.validate(1, 1).is_err());
        assert!(tree.validate(2, 0).is_err());
        assert!(tree.covers_all_ids(1));
        assert!(!tree.covers_all_ids(2));

        let mut bad = tree.clone();
        bad.nodes[1].len = 5;
        assert!(bad.validate(2, 1).is_err());

        let mut cyclic = tree.clone();
        cyclic.nodes[1].children.push((0, 1));
        assert!(cyclic.validate(2, 1).is_err());
    }

    #[test]
    fn clear_resets_to_a_bare_root() {
        let mut tree = SearchTree::new();
        tree.insert(&[3, 3, 3], 0);
        tree.clear();
        assert_eq!(tree, SearchTree::new());
    }
}
