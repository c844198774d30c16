//! The directory tree held by a mounted engine.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use flashfs::{EntryInfo, EntryType, Error};
use serde::{Deserialize, Serialize};

use crate::path;

/// One stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A directory; its children are the entries whose path lies below it.
    Dir,
    /// A regular file and its committed contents.
    File(Vec<u8>),
}

/// Every entry except the root, keyed by normalised path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    nodes: BTreeMap<String, Node>,
}

impl Tree {
    /// Look up an entry. The root is always a directory.
    pub fn get(&self, path: &str) -> Option<&Node> {
        const ROOT: Node = Node::Dir;
        if path.is_empty() {
            return Some(&ROOT);
        }
        self.nodes.get(path)
    }

    /// Whether `path` names a directory.
    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.get(path), Some(Node::Dir))
    }

    /// Check that the parent of `path` exists and is a directory.
    pub fn check_parent(&self, path: &str) -> Result<(), i32> {
        match self.get(path::parent(path)) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(Error::NOTDIR),
            None => Err(Error::NOENT),
        }
    }

    /// Whether the directory at `path` has any children.
    pub fn has_children(&self, path: &str) -> bool {
        self.nodes.keys().any(|key| path::is_below(key, path))
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, path: String, node: Node) -> Option<Node> {
        self.nodes.insert(path, node)
    }

    /// Remove an entry (not its children).
    pub fn remove(&mut self, path: &str) -> Option<Node> {
        self.nodes.remove(path)
    }

    /// Move `from` and everything below it to `to`.
    pub fn move_subtree(&mut self, from: &str, to: &str) {
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| key.as_str() == from || path::is_below(key, from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = self.nodes.remove(&key) {
                let mut target = String::from(to);
                target.push_str(&key[from.len()..]);
                self.nodes.insert(target, node);
            }
        }
    }

    /// Direct children of the directory at `dir`, in name order.
    pub fn children(&self, dir: &str) -> Vec<EntryInfo> {
        self.nodes
            .iter()
            .filter(|(key, _)| path::is_below(key, dir) && path::parent(key) == dir)
            .map(|(key, node)| entry_info(path::name(key), node))
            .collect()
    }

    /// Number of entries, the root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Describe `node` as a directory entry called `name`.
pub fn entry_info(name: &str, node: &Node) -> EntryInfo {
    match node {
        Node::Dir => EntryInfo {
            kind: EntryType::Dir as u8,
            size: 0,
            name: String::from(name),
        },
        Node::File(data) => EntryInfo {
            kind: EntryType::File as u8,
            size: data.len() as u32,
            name: String::from(name),
        },
    }
}
