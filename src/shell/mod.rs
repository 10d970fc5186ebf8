//! Command shell over a single in-memory tree

mod parser;

pub use parser::{Command, parser};

use chumsky::Parser;
use prettytable::{Table, row};
use thiserror::Error;
use tracing::debug;

use crate::btree::{BPlusKey, BPlusTree, BPlusTreeError};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Tree error: {0}")]
    TreeError(#[from] BPlusTreeError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type ShellResult<T> = Result<T, ShellError>;

const HELP: &str = "\
insert <key>...     insert one or more keys
search <key>        test whether a key is present
range <lo> <hi>     list keys with lo <= key <= hi
scan                list every key by walking the leaf chain
leaves              show the leaf chain
levels              show node keys level by level
stats               show tree statistics
check               validate tree invariants
dump                print the tree layout as JSON
help                show this message
exit | quit         leave the shell";

/// Result of running one line
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Output(String),
    Exit,
}

/// Parse a line into a command
pub fn parse_command(line: &str) -> ShellResult<Command> {
    parser().parse(line).into_result().map_err(|errors| {
        ShellError::ParseError(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}

fn format_keys(keys: &[BPlusKey]) -> String {
    if keys.is_empty() {
        return "(empty)".to_string();
    }
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct Shell {
    tree: BPlusTree,
}

impl Shell {
    pub fn new(tree: BPlusTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &BPlusTree {
        &self.tree
    }

    /// Parse and run one line of input
    pub fn execute_line(&mut self, line: &str) -> ShellResult<Response> {
        self.execute(parse_command(line)?)
    }

    /// Run a command, returning its rendered output or a request to exit
    pub fn execute(&mut self, command: Command) -> ShellResult<Response> {
        debug!(?command, "executing");

        let output = match command {
            Command::Exit => return Ok(Response::Exit),
            Command::Insert(keys) => {
                for &key in &keys {
                    self.tree.insert(key)?;
                }
                format!(
                    "inserted {} key(s); len = {}, height = {}",
                    keys.len(),
                    self.tree.len(),
                    self.tree.height()
                )
            }
            Command::Search(key) => {
                if self.tree.search(key) {
                    format!("{}: found", key)
                } else {
                    format!("{}: not found", key)
                }
            }
            Command::Range(lower, upper) => format_keys(&self.tree.range_search(lower, upper)?),
            Command::Scan => format_keys(&self.tree.iter().collect::<Vec<_>>()),
            Command::Leaves => self.leaves_table()?.to_string(),
            Command::Levels => self.levels_table()?.to_string(),
            Command::Stats => self.stats_table().to_string(),
            Command::Check => {
                self.tree.check_invariants()?;
                "ok".to_string()
            }
            Command::Dump => serde_json::to_string_pretty(&self.tree.snapshot()?)?,
            Command::Help => HELP.to_string(),
        };

        Ok(Response::Output(output))
    }

    fn leaves_table(&self) -> ShellResult<Table> {
        let snapshot = self.tree.snapshot()?;

        let mut table = Table::new();
        table.set_titles(row!["Leaf", "Keys", "Next"]);

        if let Some(leaf_level) = snapshot.levels.last() {
            for node in leaf_level {
                let next = node.next.map_or("-".to_string(), |id| id.to_string());
                table.add_row(row![node.id, format_keys(&node.keys), next]);
            }
        }

        Ok(table)
    }

    fn levels_table(&self) -> ShellResult<Table> {
        let snapshot = self.tree.snapshot()?;

        let mut table = Table::new();
        table.set_titles(row!["Level", "Nodes", "Keys"]);

        for (depth, level) in snapshot.levels.iter().enumerate() {
            let keys = level
                .iter()
                .map(|node| format!("[{}]", format_keys(&node.keys)))
                .collect::<Vec<_>>()
                .join(" ");
            table.add_row(row![depth, level.len(), keys]);
        }

        Ok(table)
    }

    fn stats_table(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(row!["Property", "Value"]);
        table.add_row(row!["order", self.tree.order()]);
        table.add_row(row!["capacity", self.tree.capacity()]);
        table.add_row(row!["keys", self.tree.len()]);
        table.add_row(row!["height", self.tree.height()]);
        table.add_row(row!["nodes", self.tree.node_count()]);
        table.add_row(row!["leaves", self.tree.leaves().count()]);
        table
    }
}
