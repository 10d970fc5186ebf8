//! Serializable point-in-time view of the tree layout

use serde::{Deserialize, Serialize};

use super::{BPlusKey, BPlusNode, BPlusTree, BPlusTreeError, BPlusTreeResult, NodeId};

/// One node as it appears in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub leaf: bool,
    pub keys: Vec<BPlusKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NodeId>,
}

/// Level-by-level view of the tree, root level first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub order: usize,
    pub len: usize,
    pub height: usize,
    pub levels: Vec<Vec<NodeSnapshot>>,
    /// All keys in leaf-chain order
    pub leaf_chain: Vec<BPlusKey>,
}

impl TreeSnapshot {
    /// Total number of nodes across all levels
    pub fn node_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

impl BPlusTree {
    /// Capture the current layout of the tree
    pub fn snapshot(&self) -> BPlusTreeResult<TreeSnapshot> {
        let mut levels = Vec::new();
        let mut frontier = vec![self.root];

        while !frontier.is_empty() {
            let mut level = Vec::with_capacity(frontier.len());
            let mut next_frontier = Vec::new();

            for id in frontier {
                let node = self.get_node(id).ok_or(BPlusTreeError::NodeNotFound(id))?;
                let snapshot = match node {
                    BPlusNode::Leaf(leaf) => NodeSnapshot {
                        id,
                        leaf: true,
                        keys: leaf.keys.clone(),
                        children: Vec::new(),
                        next: leaf.next,
                    },
                    BPlusNode::Internal(internal) => {
                        next_frontier.extend_from_slice(&internal.children);
                        NodeSnapshot {
                            id,
                            leaf: false,
                            keys: internal.keys.clone(),
                            children: internal.children.clone(),
                            next: None,
                        }
                    }
                };
                level.push(snapshot);
            }

            levels.push(level);
            frontier = next_frontier;
        }

        Ok(TreeSnapshot {
            order: self.order(),
            len: self.len(),
            height: levels.len(),
            levels,
            leaf_chain: self.iter().collect(),
        })
    }
}
