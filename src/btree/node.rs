use super::BPlusKey;

/// Node identifier (index into node storage)
pub type NodeId = usize;

/// Internal node: stores separator keys and child pointers
///
/// In this B+ tree variant:
/// - keys.len() + 1 == children.len()
/// - children[i] holds keys < keys[i] (and >= keys[i - 1] when i > 0)
/// - the last child holds keys >= the last separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    /// Separator keys (sorted)
    pub keys: Vec<BPlusKey>,
    /// Child node IDs
    pub children: Vec<NodeId>,
}

impl InternalNode {
    /// Create a new internal node with given keys and children
    pub fn new(keys: Vec<BPlusKey>, children: Vec<NodeId>) -> Self {
        debug_assert_eq!(keys.len() + 1, children.len());
        Self { keys, children }
    }

    /// Number of separator keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if node has no separators (a single child)
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the child index for a given key
    /// Returns the number of separators <= key, so a separator equal to the
    /// search key routes to its right child
    pub fn find_child_index(&self, key: BPlusKey) -> usize {
        self.keys.iter().take_while(|&&k| k <= key).count()
    }

    /// Find the leftmost child that may hold keys >= `key`
    /// Equal separators route left here, which is what a range scan needs
    /// when the lower bound is duplicated across a split
    pub fn lower_bound_child_index(&self, key: BPlusKey) -> usize {
        self.keys.iter().take_while(|&&k| k < key).count()
    }

    /// Insert a promoted separator after a child split
    ///
    /// `child_idx` is the position of the split (left) child; the separator
    /// lands at the same key position and `right` directly after the left child
    pub fn insert_separator(&mut self, child_idx: usize, key: BPlusKey, right: NodeId) {
        self.keys.insert(child_idx, key);
        self.children.insert(child_idx + 1, right);
    }

    /// Split this node around `keys[at]`, returning the promoted key and the
    /// new right sibling
    ///
    /// This node keeps keys [0, at) and children [0, at + 1); the promoted key
    /// is removed from both halves. Returns None if `at` is not a valid key index.
    pub fn split(&mut self, at: usize) -> Option<(BPlusKey, InternalNode)> {
        if at >= self.keys.len() {
            return None;
        }

        let mut right_keys = self.keys.split_off(at);
        let promoted = right_keys.remove(0);
        let right_children = self.children.split_off(at + 1);

        Some((promoted, InternalNode::new(right_keys, right_children)))
    }
}

/// Leaf node: stores sorted keys, linked to next leaf
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafNode {
    /// Keys (sorted)
    pub keys: Vec<BPlusKey>,
    /// Link to next leaf for range scans (not an owner)
    pub next: Option<NodeId>,
}

impl LeafNode {
    /// Create a new empty leaf node
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            next: None,
        }
    }

    /// Create an unlinked leaf node with given keys
    pub fn with_keys(keys: Vec<BPlusKey>) -> Self {
        debug_assert!(keys.is_sorted());
        Self { keys, next: None }
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if leaf is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a key in sorted order
    /// Allows duplicate keys; a duplicate lands after the existing equal keys
    pub fn insert(&mut self, key: BPlusKey) {
        let pos = self
            .keys
            .iter()
            .position(|&k| k > key)
            .unwrap_or(self.keys.len());
        self.keys.insert(pos, key);
    }

    /// Linear membership test
    pub fn contains(&self, key: BPlusKey) -> bool {
        for &k in &self.keys {
            if k == key {
                return true;
            }
            if k > key {
                break;
            }
        }
        false
    }

    /// Get the maximum key in this leaf
    pub fn max_key(&self) -> Option<BPlusKey> {
        self.keys.last().copied()
    }

    /// Get the minimum key in this leaf
    pub fn min_key(&self) -> Option<BPlusKey> {
        self.keys.first().copied()
    }

    /// Split this leaf node at `at`, returning the new right sibling
    ///
    /// This node keeps keys [0, at), the sibling takes [at, len) and inherits
    /// this node's `next` link. The caller stores the sibling and points
    /// `next` at it to finish splicing the chain.
    pub fn split(&mut self, at: usize) -> LeafNode {
        let right_keys = self.keys.split_off(at.min(self.keys.len()));

        let mut right = LeafNode::with_keys(right_keys);
        right.next = self.next.take();

        right
    }
}

/// B+ tree node (either internal or leaf)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BPlusNode {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl BPlusNode {
    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        matches!(self, BPlusNode::Leaf(_))
    }

    /// Check if this is an internal node
    pub fn is_internal(&self) -> bool {
        matches!(self, BPlusNode::Internal(_))
    }

    /// Keys stored in this node (separators for internal nodes)
    pub fn keys(&self) -> &[BPlusKey] {
        match self {
            BPlusNode::Internal(node) => &node.keys,
            BPlusNode::Leaf(node) => &node.keys,
        }
    }

    /// Number of keys stored in this node
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Get as internal node reference
    pub fn as_internal(&self) -> Option<&InternalNode> {
        match self {
            BPlusNode::Internal(node) => Some(node),
            BPlusNode::Leaf(_) => None,
        }
    }

    /// Get as internal node mutable reference
    pub fn as_internal_mut(&mut self) -> Option<&mut InternalNode> {
        match self {
            BPlusNode::Internal(node) => Some(node),
            BPlusNode::Leaf(_) => None,
        }
    }

    /// Get as leaf node reference
    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            BPlusNode::Internal(_) => None,
            BPlusNode::Leaf(node) => Some(node),
        }
    }

    /// Get as leaf node mutable reference
    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode> {
        match self {
            BPlusNode::Internal(_) => None,
            BPlusNode::Leaf(node) => Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_node_insert() {
        let mut leaf = LeafNode::new();

        leaf.insert(5);
        leaf.insert(3);
        leaf.insert(7);
        leaf.insert(3); // Duplicate key

        assert_eq!(leaf.len(), 4);
        assert_eq!(leaf.keys, vec![3, 3, 5, 7]);
    }

    #[test]
    fn test_leaf_node_contains() {
        let mut leaf = LeafNode::new();

        leaf.insert(3);
        leaf.insert(5);
        leaf.insert(7);

        assert!(leaf.contains(5));
        assert!(!leaf.contains(4));
        assert!(!leaf.contains(10));
        assert!(!LeafNode::new().contains(0));
    }

    #[test]
    fn test_leaf_node_split() {
        let mut leaf = LeafNode::new();
        leaf.next = Some(9);

        for i in 0..4 {
            leaf.insert(i);
        }

        let right = leaf.split(2);

        assert_eq!(leaf.keys, vec![0, 1]);
        assert_eq!(right.keys, vec![2, 3]);
        assert_eq!(leaf.max_key(), Some(1));
        assert_eq!(right.min_key(), Some(2));

        // The sibling takes over the old forward link
        assert_eq!(right.next, Some(9));
        assert_eq!(leaf.next, None);
    }

    #[test]
    fn test_internal_node_find_child() {
        let node = InternalNode::new(vec![3, 7, 12], vec![0, 1, 2, 3]);

        assert_eq!(node.find_child_index(1), 0); // < 3
        assert_eq!(node.find_child_index(3), 1); // == 3 routes right
        assert_eq!(node.find_child_index(5), 1);
        assert_eq!(node.find_child_index(7), 2);
        assert_eq!(node.find_child_index(10), 2);
        assert_eq!(node.find_child_index(12), 3);
        assert_eq!(node.find_child_index(15), 3); // > all, last child
    }

    #[test]
    fn test_internal_node_lower_bound_child() {
        let node = InternalNode::new(vec![3, 7, 12], vec![0, 1, 2, 3]);

        assert_eq!(node.lower_bound_child_index(3), 0); // == 3 routes left
        assert_eq!(node.lower_bound_child_index(4), 1);
        assert_eq!(node.lower_bound_child_index(13), 3);
    }

    #[test]
    fn test_internal_node_with_no_keys_routes_to_only_child() {
        let node = InternalNode::new(vec![], vec![4]);

        assert!(node.is_empty());
        assert_eq!(node.find_child_index(i64::MIN), 0);
        assert_eq!(node.find_child_index(i64::MAX), 0);
    }

    #[test]
    fn test_internal_node_insert_separator() {
        let mut node = InternalNode::new(vec![3, 12], vec![0, 1, 2]);

        // Child 1 split into 1 and 5 around 7
        node.insert_separator(1, 7, 5);

        assert_eq!(node.keys, vec![3, 7, 12]);
        assert_eq!(node.children, vec![0, 1, 5, 2]);
    }

    #[test]
    fn test_internal_node_split() {
        let mut node = InternalNode::new(vec![10, 20, 30, 40], vec![0, 1, 2, 3, 4]);

        let (promoted, right) = node.split(2).unwrap();

        assert_eq!(promoted, 30);
        assert_eq!(node.keys, vec![10, 20]);
        assert_eq!(node.children, vec![0, 1, 2]);
        assert_eq!(right.keys, vec![40]);
        assert_eq!(right.children, vec![3, 4]);
    }

    #[test]
    fn test_internal_node_split_out_of_range() {
        let mut node = InternalNode::new(vec![10], vec![0, 1]);

        assert!(node.split(1).is_none());
        assert_eq!(node.keys, vec![10]);
    }

    #[test]
    fn test_node_accessors() {
        let leaf = BPlusNode::Leaf(LeafNode::with_keys(vec![1, 2]));
        let internal = BPlusNode::Internal(InternalNode::new(vec![2], vec![0, 1]));

        assert!(leaf.is_leaf());
        assert!(internal.is_internal());
        assert_eq!(leaf.keys(), &[1, 2]);
        assert_eq!(internal.len(), 1);
        assert!(leaf.as_internal().is_none());
        assert!(internal.as_leaf().is_none());
    }
}
