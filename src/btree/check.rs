//! Structural validation for tests and the `check` shell command

use super::{BPlusKey, BPlusNode, BPlusTree, BPlusTreeError, BPlusTreeResult, NodeId};

/// State collected while walking the tree top-down
#[derive(Default)]
struct Walk {
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
    visited: usize,
}

fn invalid(msg: String) -> BPlusTreeError {
    BPlusTreeError::InvalidState(msg)
}

impl BPlusTree {
    /// Validate every structural invariant of the tree
    ///
    /// Checks that:
    /// - keys are sorted in every node and no node holds `2t` or more keys
    /// - non-root leaves hold at least `t` keys, non-root internal nodes at least `t - 1`
    /// - internal nodes have exactly one more child than keys
    /// - every key lies within the bounds set by the separators above it
    /// - all leaves sit at the same depth
    /// - the leaf chain visits exactly the leaves in left-to-right order
    /// - the leaf chain holds `len()` keys and every node is reachable
    pub fn check_invariants(&self) -> BPlusTreeResult<()> {
        let mut walk = Walk::default();
        self.check_node(self.root, None, None, 1, &mut walk)?;

        if walk.visited != self.node_count() {
            return Err(invalid(format!(
                "{} of {} nodes reachable from the root",
                walk.visited,
                self.node_count()
            )));
        }

        match walk.leaves.first() {
            Some(&leftmost) if leftmost == self.first_leaf => {}
            _ => {
                return Err(invalid(format!(
                    "first leaf {} is not the leftmost leaf",
                    self.first_leaf
                )));
            }
        }

        let mut chain = Vec::with_capacity(walk.leaves.len());
        let mut total = 0;
        let mut current = Some(self.first_leaf);
        while let Some(id) = current {
            if chain.len() >= walk.leaves.len() {
                return Err(invalid("leaf chain is longer than the leaf level".to_string()));
            }
            let leaf = self.leaf(id)?;
            chain.push(id);
            total += leaf.len();
            current = leaf.next;
        }

        if chain != walk.leaves {
            return Err(invalid(format!(
                "leaf chain {:?} does not match leaf order {:?}",
                chain, walk.leaves
            )));
        }

        if total != self.len() {
            return Err(invalid(format!(
                "leaf chain holds {} keys, expected {}",
                total,
                self.len()
            )));
        }

        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        lower: Option<BPlusKey>,
        upper: Option<BPlusKey>,
        depth: usize,
        walk: &mut Walk,
    ) -> BPlusTreeResult<()> {
        let node = self.get_node(id).ok_or(BPlusTreeError::NodeNotFound(id))?;
        walk.visited += 1;

        let keys = node.keys();
        if !keys.is_sorted() {
            return Err(invalid(format!("node {} keys are not sorted: {:?}", id, keys)));
        }
        if keys.len() >= self.capacity() {
            return Err(invalid(format!(
                "node {} holds {} keys, capacity is {}",
                id,
                keys.len(),
                self.capacity()
            )));
        }

        // Upper bounds are inclusive: a run of duplicates can straddle a split
        let in_bounds = |k: BPlusKey| lower.is_none_or(|lo| k >= lo) && upper.is_none_or(|hi| k <= hi);
        if let Some(&k) = keys.iter().find(|&&k| !in_bounds(k)) {
            return Err(invalid(format!(
                "node {} key {} outside bounds [{:?}, {:?}]",
                id, k, lower, upper
            )));
        }

        let is_root = id == self.root;

        match node {
            BPlusNode::Leaf(leaf) => {
                if !is_root && leaf.len() < self.order() {
                    return Err(invalid(format!(
                        "leaf {} underfull with {} keys",
                        id,
                        leaf.len()
                    )));
                }

                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(invalid(format!(
                            "leaf {} at depth {}, expected {}",
                            id, depth, expected
                        )));
                    }
                    Some(_) => {}
                }

                walk.leaves.push(id);
            }
            BPlusNode::Internal(internal) => {
                if internal.children.len() != internal.keys.len() + 1 {
                    return Err(invalid(format!(
                        "internal node {} has {} keys and {} children",
                        id,
                        internal.keys.len(),
                        internal.children.len()
                    )));
                }
                if !is_root && internal.len() + 1 < self.order() {
                    return Err(invalid(format!(
                        "internal node {} underfull with {} keys",
                        id,
                        internal.len()
                    )));
                }

                for (i, &child) in internal.children.iter().enumerate() {
                    let child_lower = if i == 0 { lower } else { Some(internal.keys[i - 1]) };
                    let child_upper = internal.keys.get(i).copied().or(upper);
                    self.check_node(child, child_lower, child_upper, depth + 1, walk)?;
                }
            }
        }

        Ok(())
    }
}
