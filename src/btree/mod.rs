//! B+ Tree implementation for ordered key indexing
//!
//! This module provides an in-memory B+ tree keyed by `i64`. It supports:
//! - Insertion with upward split propagation
//! - Exact-key membership search
//! - Ascending traversal and range scans via linked leaf nodes
//!
//! Nodes live in an arena (`Vec<BPlusNode>`) and reference each other by
//! `NodeId`. Nodes are never removed, so ids stay valid for the lifetime of
//! the tree. There is no key deletion; duplicate keys are stored again rather
//! than rejected.

mod check;
mod error;
mod node;
mod snapshot;

pub use error::{BPlusTreeError, BPlusTreeResult};
pub use node::{BPlusNode, InternalNode, LeafNode, NodeId};
pub use snapshot::{NodeSnapshot, TreeSnapshot};

use tracing::{debug, info, trace};

/// Key type for B+ tree
pub type BPlusKey = i64;

/// Default minimum degree `t`
pub const DEFAULT_ORDER: usize = 2;

/// B+ Tree data structure
///
/// Order `t` (minimum degree) means:
/// - A node that reaches `2t` keys is split before `insert` returns
/// - A split leaf keeps `t` keys and hands `t` keys to its new sibling
/// - A split internal node keeps `t` keys, promotes one and hands `t - 1`
///   keys to its new sibling
/// - The root has no minimum key count
#[derive(Debug, Clone)]
pub struct BPlusTree {
    /// Root node ID (always present, an empty leaf for a new tree)
    root: NodeId,

    /// Minimum degree `t`
    order: usize,

    /// Node storage
    nodes: Vec<BPlusNode>,

    /// Leftmost leaf node (start of the leaf chain)
    first_leaf: NodeId,

    /// Total number of keys in the tree, duplicates included
    entry_count: usize,
}

/// Root-to-leaf descent path: (internal node, index of the child taken)
type Path = Vec<(NodeId, usize)>;

impl BPlusTree {
    /// Create a new empty B+ tree with the given order
    ///
    /// # Arguments
    /// * `order` - The minimum degree `t` (must be >= 1, and `2t` must fit in a usize)
    ///
    /// # Returns
    /// * `Ok(BPlusTree)` - A tree whose root is a single empty leaf
    /// * `Err(BPlusTreeError)` - If order is invalid
    pub fn new(order: usize) -> BPlusTreeResult<Self> {
        if order < 1 || order.checked_mul(2).is_none() {
            return Err(BPlusTreeError::InvalidOrder(order));
        }

        Ok(Self::empty(order))
    }

    /// Create a new B+ tree with the default order (t = 2)
    pub fn default_order() -> Self {
        Self::empty(DEFAULT_ORDER)
    }

    fn empty(order: usize) -> Self {
        Self {
            root: 0,
            order,
            nodes: vec![BPlusNode::Leaf(LeafNode::new())],
            first_leaf: 0,
            entry_count: 0,
        }
    }

    /// Get the tree order (minimum degree `t`)
    pub fn order(&self) -> usize {
        self.order
    }

    /// Key count at which a node is split (`2t`)
    pub fn capacity(&self) -> usize {
        2 * self.order
    }

    /// Check if tree holds no keys
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Get number of keys in the tree
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// Get tree height (1 for a single leaf root)
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;

        while let Some(BPlusNode::Internal(node)) = self.get_node(current) {
            match node.children.first() {
                Some(&child_id) => {
                    current = child_id;
                    height += 1;
                }
                None => break,
            }
        }

        height
    }

    // ========== Node Management ==========

    /// Allocate a new node, returning its ID
    fn allocate_node(&mut self, node: BPlusNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Get a reference to a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&BPlusNode> {
        self.nodes.get(id)
    }

    fn get_node_mut(&mut self, id: NodeId) -> Option<&mut BPlusNode> {
        self.nodes.get_mut(id)
    }

    fn leaf(&self, id: NodeId) -> BPlusTreeResult<&LeafNode> {
        self.get_node(id)
            .ok_or(BPlusTreeError::NodeNotFound(id))?
            .as_leaf()
            .ok_or_else(|| BPlusTreeError::InvalidState(format!("node {} is not a leaf", id)))
    }

    fn leaf_mut(&mut self, id: NodeId) -> BPlusTreeResult<&mut LeafNode> {
        self.get_node_mut(id)
            .ok_or(BPlusTreeError::NodeNotFound(id))?
            .as_leaf_mut()
            .ok_or_else(|| BPlusTreeError::InvalidState(format!("node {} is not a leaf", id)))
    }

    fn internal_mut(&mut self, id: NodeId) -> BPlusTreeResult<&mut InternalNode> {
        self.get_node_mut(id)
            .ok_or(BPlusTreeError::NodeNotFound(id))?
            .as_internal_mut()
            .ok_or_else(|| {
                BPlusTreeError::InvalidState(format!("node {} is not an internal node", id))
            })
    }

    /// Get the root node ID
    pub fn root_node_id(&self) -> NodeId {
        self.root
    }

    /// Get the first leaf node ID
    pub fn first_leaf_id(&self) -> NodeId {
        self.first_leaf
    }

    /// Get the total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ========== Search Operations ==========

    /// Check whether `key` is stored in the tree
    pub fn search(&self, key: BPlusKey) -> bool {
        self.find_leaf(key)
            .and_then(|leaf_id| self.leaf(leaf_id))
            .is_ok_and(|leaf| leaf.contains(key))
    }

    /// Range search: return all keys where lower <= key <= upper, ascending
    pub fn range_search(&self, lower: BPlusKey, upper: BPlusKey) -> BPlusTreeResult<Vec<BPlusKey>> {
        let mut results = Vec::new();

        if lower > upper {
            return Ok(results);
        }

        // Duplicates of `lower` may sit left of an equal separator
        let mut current_id = Some(self.descend(lower, InternalNode::lower_bound_child_index)?);

        while let Some(id) = current_id {
            let leaf = self.leaf(id)?;

            for &k in &leaf.keys {
                if k > upper {
                    return Ok(results);
                }
                if k >= lower {
                    results.push(k);
                }
            }

            current_id = leaf.next;
        }

        Ok(results)
    }

    /// Find the leaf node that should contain the given key
    fn find_leaf(&self, key: BPlusKey) -> BPlusTreeResult<NodeId> {
        self.descend(key, InternalNode::find_child_index)
    }

    /// Walk from the root to a leaf, picking children with `route`
    fn descend(
        &self,
        key: BPlusKey,
        route: impl Fn(&InternalNode, BPlusKey) -> usize,
    ) -> BPlusTreeResult<NodeId> {
        let mut current = self.root;

        loop {
            match self
                .get_node(current)
                .ok_or(BPlusTreeError::NodeNotFound(current))?
            {
                BPlusNode::Leaf(_) => return Ok(current),
                BPlusNode::Internal(node) => {
                    current = Self::child_at(current, node, route(node, key))?;
                }
            }
        }
    }

    /// Find the leaf node and the path from root to it
    fn find_leaf_with_path(&self, key: BPlusKey) -> BPlusTreeResult<(NodeId, Path)> {
        let mut current = self.root;
        let mut path = Vec::new();

        loop {
            match self
                .get_node(current)
                .ok_or(BPlusTreeError::NodeNotFound(current))?
            {
                BPlusNode::Leaf(_) => return Ok((current, path)),
                BPlusNode::Internal(node) => {
                    let child_idx = node.find_child_index(key);
                    path.push((current, child_idx));
                    current = Self::child_at(current, node, child_idx)?;
                }
            }
        }
    }

    fn child_at(node_id: NodeId, node: &InternalNode, idx: usize) -> BPlusTreeResult<NodeId> {
        node.children.get(idx).copied().ok_or_else(|| {
            BPlusTreeError::InvalidState(format!(
                "internal node {} has no child at index {}",
                node_id, idx
            ))
        })
    }

    // ========== Insert Operations ==========

    /// Insert a key into the tree
    ///
    /// Duplicate keys are stored again. An error is only returned if the
    /// tree's internal structure is corrupt.
    pub fn insert(&mut self, key: BPlusKey) -> BPlusTreeResult<()> {
        let (leaf_id, path) = self.find_leaf_with_path(key)?;
        trace!(key, leaf_id, depth = path.len(), "insert: descended to leaf");

        let capacity = self.capacity();
        let leaf = self.leaf_mut(leaf_id)?;
        leaf.insert(key);
        let leaf_len = leaf.len();

        self.entry_count += 1;

        if leaf_len >= capacity {
            self.split_leaf(leaf_id, path)?;
        }

        Ok(())
    }

    /// Split a full leaf node and promote its sibling's first key
    fn split_leaf(&mut self, leaf_id: NodeId, path: Path) -> BPlusTreeResult<()> {
        let order = self.order;
        let right = self.leaf_mut(leaf_id)?.split(order);

        let separator = right.min_key().ok_or_else(|| {
            BPlusTreeError::InvalidState(format!("split of leaf {} produced an empty sibling", leaf_id))
        })?;

        // Splice the new leaf into the chain right after the old one
        let right_id = self.allocate_node(BPlusNode::Leaf(right));
        self.leaf_mut(leaf_id)?.next = Some(right_id);

        debug!(leaf_id, right_id, separator, "split leaf");

        self.insert_into_parent(path, leaf_id, separator, right_id)
    }

    /// Insert a separator and new right sibling into the parent of `left_id`
    ///
    /// Walks back up the descent path, splitting each parent that fills up,
    /// and grows a new root once the path is exhausted.
    fn insert_into_parent(
        &mut self,
        mut path: Path,
        mut left_id: NodeId,
        mut separator: BPlusKey,
        mut right_id: NodeId,
    ) -> BPlusTreeResult<()> {
        let capacity = self.capacity();
        let order = self.order;

        loop {
            let Some((parent_id, child_idx)) = path.pop() else {
                if left_id != self.root {
                    return Err(BPlusTreeError::InvalidState(format!(
                        "node {} has no parent but is not the root",
                        left_id
                    )));
                }

                // Split the root - create new root
                let new_root = InternalNode::new(vec![separator], vec![left_id, right_id]);
                let new_root_id = self.allocate_node(BPlusNode::Internal(new_root));
                self.root = new_root_id;

                info!(new_root_id, separator, height = self.height(), "tree grew a level");
                return Ok(());
            };

            let parent = self.internal_mut(parent_id)?;
            if parent.children.get(child_idx) != Some(&left_id) {
                return Err(BPlusTreeError::InvalidState(format!(
                    "node {} is not child {} of node {}",
                    left_id, child_idx, parent_id
                )));
            }

            parent.insert_separator(child_idx, separator, right_id);
            debug!(parent_id, separator, right_id, "promoted separator");

            if parent.len() < capacity {
                return Ok(());
            }

            let (promoted, sibling) = parent.split(order).ok_or_else(|| {
                BPlusTreeError::InvalidState(format!("cannot split internal node {}", parent_id))
            })?;

            let sibling_id = self.allocate_node(BPlusNode::Internal(sibling));
            debug!(parent_id, sibling_id, promoted, "split internal node");

            left_id = parent_id;
            separator = promoted;
            right_id = sibling_id;
        }
    }

    // ========== Iterators ==========

    /// Iterate over all keys in ascending order by walking the leaf chain
    pub fn iter(&self) -> BPlusTreeIter<'_> {
        BPlusTreeIter::new(self)
    }

    /// Iterate over the leaf nodes in chain order, starting at the leftmost leaf
    pub fn leaves(&self) -> LeafIter<'_> {
        self.leaves_from(self.first_leaf)
    }

    fn leaves_from(&self, leaf_id: NodeId) -> LeafIter<'_> {
        LeafIter {
            tree: self,
            current_leaf: Some(leaf_id),
        }
    }
}

impl Default for BPlusTree {
    fn default() -> Self {
        Self::default_order()
    }
}

impl<'a> IntoIterator for &'a BPlusTree {
    type Item = BPlusKey;
    type IntoIter = BPlusTreeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over leaf nodes following `next` links
pub struct LeafIter<'a> {
    tree: &'a BPlusTree,
    current_leaf: Option<NodeId>,
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = &'a LeafNode;

    fn next(&mut self) -> Option<Self::Item> {
        let leaf = self.tree.get_node(self.current_leaf?)?.as_leaf()?;
        self.current_leaf = leaf.next;
        Some(leaf)
    }
}

/// Iterator over B+ tree keys
pub struct BPlusTreeIter<'a> {
    leaves: LeafIter<'a>,
    current: std::slice::Iter<'a, BPlusKey>,
}

impl<'a> BPlusTreeIter<'a> {
    fn new(tree: &'a BPlusTree) -> Self {
        Self {
            leaves: tree.leaves(),
            current: Default::default(),
        }
    }
}

impl Iterator for BPlusTreeIter<'_> {
    type Item = BPlusKey;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&key) = self.current.next() {
                return Some(key);
            }

            // Move to next leaf
            self.current = self.leaves.next()?.keys.iter();
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_new_tree() {
        let tree = BPlusTree::new(4).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.order(), 4);
        assert_eq!(tree.capacity(), 8);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root_node_id(), tree.first_leaf_id());
    }

    #[test]
    fn test_invalid_order() {
        assert_eq!(
            BPlusTree::new(0).unwrap_err(),
            BPlusTreeError::InvalidOrder(0)
        );
        assert!(BPlusTree::new(1).is_ok());
    }

    #[test]
    fn test_order_too_large_for_capacity() {
        // 2t would overflow usize
        assert_eq!(
            BPlusTree::new(usize::MAX).unwrap_err(),
            BPlusTreeError::InvalidOrder(usize::MAX)
        );
        assert!(matches!(
            BPlusTree::new(usize::MAX / 2 + 1),
            Err(BPlusTreeError::InvalidOrder(_))
        ));

        let mut tree = BPlusTree::new(usize::MAX / 2).unwrap();
        assert_eq!(tree.capacity(), usize::MAX - 1);
        tree.insert(1).unwrap();
        assert!(tree.search(1));
    }

    #[test]
    fn test_default_order() {
        let tree = BPlusTree::default();
        assert_eq!(tree.order(), DEFAULT_ORDER);
        assert_eq!(tree.capacity(), 4);
    }

    #[test]
    fn test_empty_tree_search() {
        let tree = BPlusTree::new(2).unwrap();
        assert!(!tree.search(0));
        assert!(!tree.search(i64::MIN));
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn test_single_insert_and_search() {
        let mut tree = BPlusTree::new(2).unwrap();

        tree.insert(42).unwrap();

        assert!(!tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.height(), 1);
        assert!(tree.search(42));
        assert!(!tree.search(41));
    }

    #[test]
    fn test_multiple_inserts_no_split() {
        let mut tree = BPlusTree::new(2).unwrap();

        // Order 2 splits at 4 keys
        tree.insert(10).unwrap();
        tree.insert(20).unwrap();
        tree.insert(30).unwrap();

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.search(10));
        assert!(tree.search(20));
        assert!(tree.search(30));
    }

    #[test]
    fn test_leaf_split() {
        let mut tree = BPlusTree::new(2).unwrap();

        for key in [10, 20, 30, 40] {
            tree.insert(key).unwrap();
        }

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.height(), 2);

        let root = tree.get_node(tree.root_node_id()).unwrap();
        assert_eq!(root.keys(), &[30]);

        let leaves: Vec<_> = tree.leaves().map(|l| l.keys.clone()).collect();
        assert_eq!(leaves, vec![vec![10, 20], vec![30, 40]]);

        for key in [10, 20, 30, 40] {
            assert!(tree.search(key));
        }
    }

    #[test]
    fn test_multiple_splits() {
        let mut tree = BPlusTree::new(2).unwrap();

        for i in 0..20 {
            tree.insert(i * 10).unwrap();
        }

        assert_eq!(tree.len(), 20);
        assert!(tree.height() >= 3);
        tree.check_invariants().unwrap();

        for i in 0..20 {
            assert!(tree.search(i * 10));
            assert!(!tree.search(i * 10 + 5));
        }
    }

    #[test]
    fn test_range_search() {
        let mut tree = BPlusTree::new(2).unwrap();

        for i in 0..10 {
            tree.insert(i * 10).unwrap();
        }

        assert_eq!(tree.range_search(25, 55).unwrap(), vec![30, 40, 50]);
        assert_eq!(tree.range_search(30, 30).unwrap(), vec![30]);
        assert_eq!(tree.range_search(-100, 5).unwrap(), vec![0]);
    }

    #[test]
    fn test_range_search_empty() {
        let mut tree = BPlusTree::new(2).unwrap();

        for i in 0..10 {
            tree.insert(i * 10).unwrap();
        }

        // Range with no entries
        assert!(tree.range_search(100, 200).unwrap().is_empty());

        // Reversed range
        assert!(tree.range_search(50, 20).unwrap().is_empty());
    }

    #[test]
    fn test_range_search_reports_broken_structure() {
        let mut tree = BPlusTree::new(2).unwrap();
        for key in [10, 20, 30, 40] {
            tree.insert(key).unwrap();
        }

        // Dangling leaf link surfaces as an error instead of a short result
        let first = tree.first_leaf_id();
        tree.leaf_mut(first).unwrap().next = Some(999);
        assert_eq!(
            tree.range_search(10, 40).unwrap_err(),
            BPlusTreeError::NodeNotFound(999)
        );

        // Dangling child during descent
        let root = tree.root_node_id();
        tree.internal_mut(root).unwrap().children[0] = 777;
        assert_eq!(
            tree.range_search(0, 5).unwrap_err(),
            BPlusTreeError::NodeNotFound(777)
        );
    }

    #[test]
    fn test_iterator() {
        let mut tree = BPlusTree::new(2).unwrap();

        // Insert in random order
        for i in [5, 2, 8, 1, 9, 3, 7, 4, 6, 0] {
            tree.insert(i).unwrap();
        }

        let keys: Vec<_> = tree.iter().collect();
        assert_eq!(keys, (0..10).collect::<Vec<_>>());

        let via_into_iter: Vec<_> = (&tree).into_iter().collect();
        assert_eq!(via_into_iter, keys);
    }

    #[test]
    fn test_negative_keys() {
        let mut tree = BPlusTree::new(2).unwrap();

        for key in [-10, 0, 10, i64::MIN, i64::MAX] {
            tree.insert(key).unwrap();
        }

        assert!(tree.search(-10));
        assert!(tree.search(i64::MIN));
        assert!(tree.search(i64::MAX));
        assert_eq!(tree.range_search(-15, 5).unwrap(), vec![-10, 0]);
    }

    #[test]
    fn test_first_leaf_tracking() {
        let mut tree = BPlusTree::new(2).unwrap();

        for i in [50, 30, 70, 20, 40, 60, 80, 10] {
            tree.insert(i).unwrap();
        }

        // The leftmost leaf is never replaced, only split to the right
        assert_eq!(tree.first_leaf_id(), 0);
        assert_eq!(tree.iter().next(), Some(10));
    }
}
