//! Candidate search and selection.
//!
//! # Responsibilities
//! - Find every template consistent with a request path
//! - Score candidates by specificity
//! - Prefer candidates that accept the request method
//!
//! # Design Decisions
//! - Search explores static and parameter branches alike; more than one
//!   template may fit the same path
//! - Earlier segments outweigh later ones, static outweighs parameter/prefix
//! - A candidate without the request method is demoted, never dropped, so
//!   callers can tell "no route" from "method not allowed"
//! - Equal scores keep the first candidate found (static before parameter,
//!   parameters in registration order)

use std::cmp::Ordering;

use crate::routing::node::NodeId;
use crate::routing::trie::NodeTree;

/// Every node below `from` that completes a template for `path`.
///
/// Returned nodes own a terminator, or are prefix nodes that absorb the rest
/// of the path.
pub fn find_nodes<H, M>(tree: &NodeTree<H, M>, from: NodeId, path: &[String]) -> Vec<NodeId> {
    let mut found = Vec::new();
    collect(tree, from, path, &mut found);
    found
}

fn collect<H, M>(tree: &NodeTree<H, M>, id: NodeId, path: &[String], found: &mut Vec<NodeId>) {
    let node = tree.node(id);
    if node.key.prefix {
        found.push(id);
        return;
    }
    let Some((segment, rest)) = path.split_first() else {
        return;
    };

    let children = node
        .static_matches(segment)
        .chain(node.wildcard_children.iter().copied());
    for child in children {
        if rest.is_empty() {
            if tree.node(child).terminator.is_some() {
                found.push(child);
            }
        } else {
            collect(tree, child, rest, found);
        }
    }
}

/// Specificity of one candidate for one request.
///
/// Numerically the score is `Σ weight(n) * 10^p` over the candidate's
/// ancestors, `p` counting up from 0 at the candidate, with weight 2 for
/// static segments and 1 for parameter or prefix segments. Candidates that do
/// not accept the request method lose `10^(segments + 1)`.
///
/// The digits are kept individually so paths of any depth compare exactly.
#[derive(Debug, Clone)]
pub struct Score {
    supports_method: bool,
    /// Per-segment weights, most significant (shallowest) first.
    digits: Vec<u8>,
    segment_count: usize,
}

impl Score {
    pub fn supports_method(&self) -> bool {
        self.supports_method
    }

    /// The score as a number. Loses precision for very deep paths; use the
    /// `Ord` implementation for ranking.
    pub fn value(&self) -> f64 {
        let specificity = self
            .digits
            .iter()
            .fold(0.0, |acc, &digit| acc * 10.0 + f64::from(digit));
        if self.supports_method {
            specificity
        } else {
            specificity - 10f64.powi(self.segment_count as i32 + 1)
        }
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        // Leading digits are never zero, so a longer digit string is a
        // larger number.
        self.supports_method
            .cmp(&other.supports_method)
            .then_with(|| self.digits.len().cmp(&other.digits.len()))
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

/// Score the template completed at `id` for a request of `segment_count`
/// segments using `method`.
pub fn score_node<H, M>(
    tree: &NodeTree<H, M>,
    id: NodeId,
    segment_count: usize,
    method: &str,
) -> Score {
    let node = tree.node(id);
    let supports_method = match node.terminator {
        Some(terminator) => tree.node(terminator).supports(method),
        None => node.supports(method),
    };

    let mut digits = Vec::with_capacity(node.depth);
    let mut current = id;
    while let Some(parent) = tree.node(current).parent {
        let key = &tree.node(current).key;
        let weight = if key.terminator {
            0
        } else if key.dynamic || key.prefix {
            1
        } else {
            2
        };
        digits.push(weight);
        current = parent;
    }
    digits.reverse();

    Score {
        supports_method,
        digits,
        segment_count,
    }
}

/// Pick the best candidate and return its terminator node.
///
/// Returns `None` only when no candidate completes a template.
pub fn pick_node<H, M>(
    tree: &NodeTree<H, M>,
    candidates: &[NodeId],
    segment_count: usize,
    method: &str,
) -> Option<NodeId> {
    let mut best: Option<(Score, NodeId)> = None;
    for &candidate in candidates {
        let Some(terminator) = tree.node(candidate).terminator else {
            continue;
        };
        let score = score_node(tree, candidate, segment_count, method);
        tracing::trace!(
            candidate = %tree.pattern(terminator),
            score = score.value(),
            "Scored route candidate"
        );
        let better = match &best {
            Some((top, _)) => score > *top,
            None => true,
        };
        if better {
            best = Some((score, terminator));
        }
    }
    best.map(|(_, terminator)| terminator)
}
