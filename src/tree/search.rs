//! The value produced by [`CommandTree::dispatch`](super::CommandTree::dispatch).

use std::cell::OnceCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::node::{Node, NodeId, UsageId};
use super::CommandTree;
use crate::grammar::{Parameter, Usage};

/// Outcome of matching an input against a command tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The input resolved to exactly one usage.
    Complete,
    /// No usage matches the input.
    Unknown,
    /// The input was malformed (unknown flag, missing or invalid flag value).
    Failure,
    /// A matching node exists but the source lacks its permission.
    Pause,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Complete => "complete",
            Status::Unknown => "unknown",
            Status::Failure => "failure",
            Status::Pause => "pause",
        }
    }
}

/// A node matched against input, with the raw text it consumed.
///
/// Greedy parameters receive every remaining token joined by single spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub node: NodeId,
    pub parameter: Arc<Parameter>,
    pub value: String,
}

/// A flag found in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundFlag {
    pub name: String,
    pub value: Option<String>,
}

/// Result of one dispatch: status, the usage it resolved to, what was bound,
/// and a lazily computed "closest usage" for error messages.
pub struct PathSearch<'t, S> {
    tree: &'t CommandTree<S>,
    status: Status,
    last_node: Option<NodeId>,
    usage: Option<UsageId>,
    bindings: Vec<Binding>,
    flags: Vec<BoundFlag>,
    closest: OnceCell<Option<UsageId>>,
}

impl<'t, S> PathSearch<'t, S> {
    pub(crate) fn new(tree: &'t CommandTree<S>, status: Status, last_node: Option<NodeId>) -> Self {
        Self {
            tree,
            status,
            last_node,
            usage: None,
            bindings: Vec::new(),
            flags: Vec::new(),
            closest: OnceCell::new(),
        }
    }

    pub(crate) fn with_usage(mut self, usage: UsageId) -> Self {
        self.usage = Some(usage);
        self
    }

    pub(crate) fn with_closest(self, closest: Option<UsageId>) -> Self {
        let _ = self.closest.set(closest);
        self
    }

    pub(crate) fn with_trail(mut self, bindings: Vec<Binding>, flags: Vec<BoundFlag>) -> Self {
        self.bindings = bindings;
        self.flags = flags;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    /// Deepest node the search reached.
    pub fn last_node(&self) -> Option<&'t Node> {
        self.last_node.and_then(|id| self.tree.arena().get(id))
    }

    pub fn last_node_id(&self) -> Option<NodeId> {
        self.last_node
    }

    /// The usage the input resolved to. Always set when complete.
    pub fn usage(&self) -> Option<&'t Arc<Usage>> {
        self.usage.map(|id| self.tree.usage(id))
    }

    /// Every matched node with the text it consumed, literals included.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Matched non-literal parameters as (name, raw value).
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .filter(|b| !b.parameter.is_literal())
            .map(|b| (b.parameter.name(), b.value.as_str()))
    }

    /// Flags in the order they were typed.
    pub fn flags(&self) -> &[BoundFlag] {
        &self.flags
    }

    /// Flags keyed by name, independent of typing order.
    pub fn bound_flags(&self) -> BTreeMap<&str, Option<&str>> {
        self.flags
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_deref()))
            .collect()
    }

    /// The usage to show the user when the input did not resolve.
    ///
    /// Computed on first access: the direct usage if the search ended on a
    /// leaf, else the nearest executable argument below the last node, else
    /// the nearest literal's own or default usage, else the command default.
    pub fn closest_usage(&self) -> Option<&'t Arc<Usage>> {
        let id = *self.closest.get_or_init(|| self.lookup_closest());
        id.map(|u| self.tree.usage(u))
    }

    fn lookup_closest(&self) -> Option<UsageId> {
        let arena = self.tree.arena();
        let Some(last) = self.last_node else {
            return arena.root().terminal().or(arena.root().fallback());
        };
        if let Some(direct) = self.usage
            && arena[last].is_leaf()
        {
            return Some(direct);
        }

        let mut queue = VecDeque::from([last]);
        while let Some(id) = queue.pop_front() {
            let node = &arena[id];
            if !node.is_literal()
                && let Some(usage) = node.terminal()
            {
                return Some(usage);
            }
            queue.extend(node.children().iter().copied());
        }

        arena
            .lineage(last)
            .map(|id| &arena[id])
            .filter(|n| n.is_literal())
            .find_map(|n| n.terminal().or(n.fallback()))
    }
}

impl<S> std::fmt::Debug for PathSearch<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathSearch")
            .field("status", &self.status)
            .field("last_node", &self.last_node)
            .field("usage", &self.usage)
            .field("bindings", &self.bindings)
            .field("flags", &self.flags)
            .finish()
    }
}
