//! Template storage.
//!
//! # Responsibilities
//! - Own every node of the routing tree in one arena
//! - Insert key sequences, sharing common leading segments
//! - Bind handlers and middleware to terminator nodes
//! - Resolve a segment list and method into a [`RouteOutcome`]
//!
//! # Design Decisions
//! - Registration takes the write lock, matching takes the read lock
//! - Re-registering a template reuses its nodes and extends the method table
//! - Nodes are never removed, so [`NodeId`] handles stay valid for the
//!   lifetime of the trie

use std::fmt::Write as _;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::routing::key::Key;
use crate::routing::matcher;
use crate::routing::node::{Node, NodeId};
use crate::routing::params::Params;
use crate::routing::router::{Route, RouteOutcome};
use crate::routing::CATCH_ALL_METHOD;

/// Arena of nodes making up one routing tree.
#[derive(Debug)]
pub struct NodeTree<H, M> {
    nodes: Vec<Node<H, M>>,
}

impl<H, M> NodeTree<H, M> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(Key::default(), None, 0)],
        }
    }

    pub fn node(&self, id: NodeId) -> &Node<H, M> {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<H, M> {
        &mut self.nodes[id.0]
    }

    /// Number of nodes, root and terminators included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push_child(&mut self, parent: NodeId, key: Key) -> NodeId {
        let depth = self.node(parent).depth + 1;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(key, Some(parent), depth));
        id
    }

    /// Insert `keys` and return the terminator node for the template.
    pub fn insert(&mut self, keys: &[Key]) -> NodeId {
        let mut current = NodeId::ROOT;
        for key in keys {
            current = self.child_for(current, key);
        }

        if let Some(existing) = self.node(current).terminator {
            return existing;
        }
        let terminator = self.push_child(current, Key::terminator());
        self.node_mut(current).terminator = Some(terminator);
        terminator
    }

    fn child_for(&mut self, parent: NodeId, key: &Key) -> NodeId {
        if key.dynamic {
            let node = self.node(parent);
            if let Some(existing) = node
                .wildcard_children
                .iter()
                .copied()
                .find(|&child| self.node(child).key == *key)
            {
                return existing;
            }
            let child = self.push_child(parent, key.clone());
            self.node_mut(parent).wildcard_children.push(child);
            return child;
        }

        let existing = if key.prefix {
            self.node(parent).static_prefixes.get(&key.value)
        } else {
            self.node(parent).static_children.get(&key.value)
        };
        if let Some(&child) = existing {
            return child;
        }

        let child = self.push_child(parent, key.clone());
        let parent = self.node_mut(parent);
        let map = if key.prefix {
            &mut parent.static_prefixes
        } else {
            &mut parent.static_children
        };
        map.insert(key.value.clone(), child);
        child
    }

    /// Walk up from `id` to the first node that is not a terminator.
    fn segment_node(&self, id: NodeId) -> NodeId {
        match (self.node(id).key.terminator, self.node(id).parent) {
            (true, Some(parent)) => parent,
            _ => id,
        }
    }

    /// Ancestor chain of `id`, leaf first, excluding the root and terminators.
    fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.segment_node(id);
        while let Some(parent) = self.node(current).parent {
            chain.push(current);
            current = parent;
        }
        chain
    }

    /// Canonical template string for the template ending at `id`.
    pub fn pattern(&self, id: NodeId) -> String {
        let segments: Vec<String> = self
            .lineage(id)
            .into_iter()
            .rev()
            .map(|node| self.node(node).key.to_string())
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// Parameter bindings implied by matching `segments` against the template
    /// ending at `id`.
    pub fn vars(&self, id: NodeId, segments: &[String]) -> Params {
        let mut params = Params::new();
        for node in self.lineage(id) {
            let node = self.node(node);
            if !node.key.dynamic {
                continue;
            }
            if let Some(value) = segments.get(node.depth - 1) {
                params.prepend(&node.key.value, value);
            }
        }
        params
    }

    /// Indented dump of the tree, one line per segment with its bound methods.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_node(NodeId::ROOT, 0, &mut out);
        out
    }

    fn describe_node(&self, id: NodeId, indent: usize, out: &mut String) {
        let node = self.node(id);
        let pad = "\t".repeat(indent);
        if id != NodeId::ROOT {
            let marker = if node.key.prefix { " (prefix)" } else { "" };
            let _ = writeln!(out, "{}/{}{}", pad, node.key, marker);
        }
        if let Some(terminator) = node.terminator {
            let mut methods: Vec<&String> = self.node(terminator).handlers.keys().collect();
            methods.sort();
            for method in methods {
                let _ = writeln!(out, "{}\t- {}", pad, method);
            }
        }

        let mut statics: Vec<(&String, &NodeId)> = node
            .static_children
            .iter()
            .chain(node.static_prefixes.iter())
            .collect();
        statics.sort();
        let next = if id == NodeId::ROOT { indent } else { indent + 1 };
        for (_, &child) in statics {
            self.describe_node(child, next, out);
        }
        for &child in &node.wildcard_children {
            self.describe_node(child, next, out);
        }
    }
}

impl<H, M> Default for NodeTree<H, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// A routing tree behind a reader/writer lock.
///
/// Templates are registered before the router starts serving. Any number
/// of lookups may run at once; each holds the read lock for its whole search
/// and sees one consistent tree.
#[derive(Debug)]
pub struct Trie<H, M = ()> {
    inner: RwLock<NodeTree<H, M>>,
}

impl<H, M> Trie<H, M> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(NodeTree::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeTree<H, M>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeTree<H, M>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a template and return its terminator node.
    pub fn insert(&self, keys: &[Key]) -> NodeId {
        let terminator = self.write().insert(keys);
        tracing::trace!(terminator = terminator.index(), "Template inserted");
        terminator
    }

    /// Bind `handler` to `method` on a terminator node.
    pub fn set_handler(&self, terminator: NodeId, method: &str, handler: H) {
        self.write()
            .node_mut(terminator)
            .handlers
            .insert(method.to_string(), handler);
    }

    /// Append middleware that only wraps the handler bound to `method`.
    pub fn add_method_middleware(&self, terminator: NodeId, method: &str, middleware: M) {
        self.write()
            .node_mut(terminator)
            .method_middleware
            .entry(method.to_string())
            .or_default()
            .push(middleware);
    }

    /// Append middleware that wraps every handler of a template.
    pub fn add_endpoint_middleware(&self, terminator: NodeId, middleware: M) {
        self.write()
            .node_mut(terminator)
            .endpoint_middleware
            .push(middleware);
    }

    pub fn pattern(&self, id: NodeId) -> String {
        self.read().pattern(id)
    }

    pub fn describe(&self) -> String {
        self.read().describe()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<H: Clone, M: Clone> Trie<H, M> {
    /// Find the best template for `segments` and resolve it for `method`.
    pub fn route(&self, segments: &[String], method: &str) -> RouteOutcome<H, M> {
        let tree = self.read();
        let candidates = matcher::find_nodes(&tree, NodeId::ROOT, segments);
        let Some(terminator) = matcher::pick_node(&tree, &candidates, segments.len(), method)
        else {
            return RouteOutcome::NotFound;
        };

        let node = tree.node(terminator);
        if node.handlers.is_empty() {
            return RouteOutcome::NotFound;
        }

        let pattern = tree.pattern(terminator);
        let params = tree.vars(terminator, segments);
        let methods = node.methods();

        let handler = node
            .handlers
            .get(method)
            .or_else(|| node.handlers.get(CATCH_ALL_METHOD));
        let Some(handler) = handler else {
            return RouteOutcome::MethodNotAllowed {
                pattern,
                params,
                methods,
            };
        };

        let method_middleware = node
            .method_middleware
            .get(method)
            .or_else(|| node.method_middleware.get(CATCH_ALL_METHOD))
            .cloned()
            .unwrap_or_default();

        RouteOutcome::Matched(Route {
            handler: handler.clone(),
            pattern,
            params,
            methods,
            method_middleware,
            endpoint_middleware: node.endpoint_middleware.clone(),
        })
    }
}

impl<H, M> Default for Trie<H, M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::key::{parse_template, split_path};

    fn register(trie: &Trie<&'static str>, template: &str, methods: &[&str], handler: &'static str) -> NodeId {
        let terminator = trie.insert(&parse_template(template, false).unwrap());
        for method in methods {
            trie.set_handler(terminator, method, handler);
        }
        terminator
    }

    fn handler_for(trie: &Trie<&'static str>, method: &str, path: &str) -> Option<&'static str> {
        match trie.route(&split_path(path), method) {
            RouteOutcome::Matched(route) => Some(route.handler),
            _ => None,
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let trie: Trie<&'static str> = Trie::new();
        let first = register(&trie, "/posts/{id}", &["GET"], "get");
        let nodes = trie.len();
        let second = register(&trie, "/posts/{id}/", &["POST"], "post");

        assert_eq!(first, second);
        assert_eq!(trie.len(), nodes);
        assert_eq!(handler_for(&trie, "GET", "/posts/1"), Some("get"));
        assert_eq!(handler_for(&trie, "POST", "/posts/1"), Some("post"));
    }

    #[test]
    fn test_shared_prefix_reuses_nodes() {
        let trie: Trie<&'static str> = Trie::new();
        register(&trie, "/ancestor/one", &["GET"], "one");
        // root, ancestor, one, terminator
        assert_eq!(trie.len(), 4);
        register(&trie, "/ancestor/two", &["GET"], "two");
        assert_eq!(trie.len(), 6);
    }

    #[test]
    fn test_distinct_parameter_names_are_distinct_nodes() {
        let trie: Trie<&'static str> = Trie::new();
        let a = register(&trie, "/{a}", &["GET"], "a");
        let b = register(&trie, "/{b}", &["GET"], "b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_and_endpoint_do_not_share_nodes() {
        let trie: Trie<&'static str> = Trie::new();
        let prefix = trie.insert(&parse_template("/static", true).unwrap());
        trie.set_handler(prefix, "GET", "prefix");
        register(&trie, "/static/child", &["GET"], "child");
        register(&trie, "/static", &["GET"], "endpoint");

        assert_eq!(handler_for(&trie, "GET", "/static/child"), Some("child"));
        assert_eq!(handler_for(&trie, "GET", "/static/other"), Some("prefix"));
        assert_eq!(handler_for(&trie, "GET", "/static"), Some("endpoint"));
    }

    #[test]
    fn test_pattern_and_vars() {
        let trie: Trie<&'static str> = Trie::new();
        let terminator = register(&trie, "/posts/{id}/comments/{id}", &["GET"], "comments");
        assert_eq!(trie.pattern(terminator), "/posts/{id}/comments/{id}");

        let tree = trie.read();
        let params = tree.vars(terminator, &split_path("/posts/hello-world/comments/1"));
        assert_eq!(params.get_all("id"), ["hello-world", "1"]);
    }

    #[test]
    fn test_root_template_pattern() {
        let trie: Trie<&'static str> = Trie::new();
        let terminator = register(&trie, "/", &["GET"], "root");
        assert_eq!(trie.pattern(terminator), "/");
        assert_eq!(handler_for(&trie, "GET", "/"), Some("root"));
    }

    #[test]
    fn test_empty_method_table_is_not_found() {
        let trie: Trie<&'static str> = Trie::new();
        trie.insert(&parse_template("/unbound", false).unwrap());
        assert!(matches!(
            trie.route(&split_path("/unbound"), "GET"),
            RouteOutcome::NotFound
        ));
    }

    #[test]
    fn test_method_middleware_falls_back_to_catch_all() {
        let trie: Trie<&'static str, &'static str> = Trie::new();
        let terminator = trie.insert(&parse_template("/items", false).unwrap());
        trie.set_handler(terminator, "GET", "get");
        trie.set_handler(terminator, CATCH_ALL_METHOD, "any");
        trie.add_method_middleware(terminator, "GET", "get-mw");
        trie.add_method_middleware(terminator, CATCH_ALL_METHOD, "any-mw");
        trie.add_endpoint_middleware(terminator, "endpoint-mw");

        let RouteOutcome::Matched(route) = trie.route(&split_path("/items"), "GET") else {
            panic!("expected a match");
        };
        assert_eq!(route.handler, "get");
        assert_eq!(route.method_middleware, ["get-mw"]);
        assert_eq!(route.endpoint_middleware, ["endpoint-mw"]);

        let RouteOutcome::Matched(route) = trie.route(&split_path("/items"), "DELETE") else {
            panic!("expected a match");
        };
        assert_eq!(route.handler, "any");
        assert_eq!(route.method_middleware, ["any-mw"]);
        assert_eq!(route.methods, ["GET"]);
    }

    #[test]
    fn test_describe_lists_methods() {
        let trie: Trie<&'static str> = Trie::new();
        register(&trie, "/v1", &["GET"], "v1");
        register(&trie, "/{id}", &["POST", "GET"], "id");
        let prefix = trie.insert(&parse_template("/files", true).unwrap());
        trie.set_handler(prefix, CATCH_ALL_METHOD, "files");

        let dump = trie.describe();
        assert_eq!(
            dump,
            "/files (prefix)\n\t- *\n/v1\n\t- GET\n/{id}\n\t- GET\n\t- POST\n"
        );
    }

    #[test]
    fn test_concurrent_lookups_match_sequential() {
        let trie: Trie<&'static str> = Trie::new();
        register(&trie, "/v1", &["GET"], "static");
        register(&trie, "/{id}", &["GET", "POST"], "dynamic");
        register(&trie, "/posts/{id}/comments/{id}", &["GET"], "comments");

        let requests = [
            ("GET", "/v1"),
            ("POST", "/v1"),
            ("GET", "/other"),
            ("GET", "/posts/1/comments/2"),
            ("PUT", "/nowhere/at/all"),
        ];
        let expected: Vec<_> = requests
            .iter()
            .map(|(method, path)| handler_for(&trie, method, path))
            .collect();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let found: Vec<_> = requests
                            .iter()
                            .map(|(method, path)| handler_for(&trie, method, path))
                            .collect();
                        assert_eq!(found, expected);
                    }
                });
            }
        });
    }
}
