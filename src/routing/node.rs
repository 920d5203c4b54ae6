//! Trie vertices.
//!
//! Nodes live in an arena owned by the trie and refer to each other through
//! [`NodeId`] handles, so parent links never form ownership cycles.

use std::collections::HashMap;

use crate::routing::key::Key;

/// Handle to a node inside a trie's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root of every trie.
    pub const ROOT: NodeId = NodeId(0);

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One segment position shared by every template with the same leading keys.
///
/// Handler and middleware tables are only populated on terminator nodes.
#[derive(Debug)]
pub struct Node<H, M> {
    pub key: Key,
    pub parent: Option<NodeId>,
    /// Distance from the root (root = 0).
    pub depth: usize,
    /// Plain static children keyed by their literal text.
    pub static_children: HashMap<String, NodeId>,
    /// Static prefix children keyed by their literal text. Kept apart from
    /// `static_children` so `/a` as a prefix and `/a/b` as an endpoint do not
    /// collapse onto the same node.
    pub static_prefixes: HashMap<String, NodeId>,
    /// Parameter children in insertion order.
    pub wildcard_children: Vec<NodeId>,
    pub terminator: Option<NodeId>,
    pub handlers: HashMap<String, H>,
    pub method_middleware: HashMap<String, Vec<M>>,
    pub endpoint_middleware: Vec<M>,
}

impl<H, M> Node<H, M> {
    pub(crate) fn new(key: Key, parent: Option<NodeId>, depth: usize) -> Self {
        Self {
            key,
            parent,
            depth,
            static_children: HashMap::new(),
            static_prefixes: HashMap::new(),
            wildcard_children: Vec::new(),
            terminator: None,
            handlers: HashMap::new(),
            method_middleware: HashMap::new(),
            endpoint_middleware: Vec::new(),
        }
    }

    /// Look up a static child (plain or prefix) for a concrete segment.
    pub fn static_matches(&self, segment: &str) -> impl Iterator<Item = NodeId> + '_ {
        self.static_children
            .get(segment)
            .into_iter()
            .chain(self.static_prefixes.get(segment))
            .copied()
    }

    /// True when the handler table accepts `method`, directly or via the
    /// catch-all entry.
    pub fn supports(&self, method: &str) -> bool {
        self.handlers.contains_key(method) || self.handlers.contains_key(super::CATCH_ALL_METHOD)
    }

    /// Explicitly bound methods, sorted, without the catch-all entry.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self
            .handlers
            .keys()
            .filter(|m| m.as_str() != super::CATCH_ALL_METHOD)
            .cloned()
            .collect();
        methods.sort();
        methods
    }
}
