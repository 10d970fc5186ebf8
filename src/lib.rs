pub mod btree;
pub mod config;
pub mod shell;

pub use btree::{
    BPlusKey, BPlusNode, BPlusTree, BPlusTreeError, BPlusTreeIter, BPlusTreeResult, InternalNode,
    LeafIter, LeafNode, NodeId, TreeSnapshot,
};
pub use config::{ConfigError, ConfigResult, TreeConfig};
pub use shell::{Command, Response, Shell, ShellError, ShellResult};
