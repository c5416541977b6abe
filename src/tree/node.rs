//! Index-addressed node storage for command trees.
//!
//! Nodes live in a flat arena and refer to their parent and children by
//! [`NodeId`], so the parent back-reference never owns anything.

use std::ops::Index;
use std::sync::Arc;

use crate::grammar::{Parameter, Priority};

/// Position of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Every tree's root (the command literal) sits at index 0.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Position of a usage inside its tree's usage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageId(pub(crate) usize);

/// The three node shapes. Each wraps the descriptor it was created for.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Command or subcommand name.
    Literal(Arc<Parameter>),
    /// Positional value.
    Argument(Arc<Parameter>),
    /// Flag placed in the tree by flag-order expansion.
    Flag(Arc<Parameter>),
}

impl NodeKind {
    fn of(param: Arc<Parameter>) -> Self {
        if param.is_literal() {
            NodeKind::Literal(param)
        } else if param.is_flag() {
            NodeKind::Flag(param)
        } else {
            NodeKind::Argument(param)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: i32,
    pub(crate) priority: Priority,
    pub(crate) terminal: Option<UsageId>,
    pub(crate) fallback: Option<UsageId>,
    pub(crate) permission: Option<String>,
}

impl Node {
    fn new(param: Arc<Parameter>, parent: Option<NodeId>, depth: i32) -> Self {
        let priority = ordering_priority(&param);
        let permission = param.permission().map(String::from);
        Self {
            kind: NodeKind::of(param),
            parent,
            children: Vec::new(),
            depth,
            priority,
            terminal: None,
            fallback: None,
            permission,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn param(&self) -> &Arc<Parameter> {
        match &self.kind {
            NodeKind::Literal(p) | NodeKind::Argument(p) | NodeKind::Flag(p) => p,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Root is -1, its children 0, and so on.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The usage this node completes, if any.
    pub fn terminal(&self) -> Option<UsageId> {
        self.terminal
    }

    /// Default usage of a literal that is not itself executable.
    pub fn fallback(&self) -> Option<UsageId> {
        self.fallback
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn is_executable(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, NodeKind::Flag(_))
    }

    pub fn is_optional(&self) -> bool {
        self.param().is_optional()
    }

    pub fn is_required(&self) -> bool {
        self.param().is_required()
    }

    pub fn is_greedy(&self) -> bool {
        self.param().is_greedy()
    }

    pub fn name(&self) -> &str {
        self.param().name()
    }

    pub fn format(&self) -> String {
        self.param().format()
    }
}

/// Priority used to order siblings: literals first, then by declared
/// priority, with required arguments ahead of flags ahead of optionals.
fn ordering_priority(param: &Parameter) -> Priority {
    if param.is_literal() {
        return Priority::MAXIMUM;
    }
    let bonus = if param.is_flag() {
        4
    } else if param.is_optional() {
        3
    } else {
        5
    };
    param.priority().plus(bonus)
}

/// Flat node storage. Index 0 is always the root.
#[derive(Debug, Clone)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new(root: Arc<Parameter>) -> Self {
        Self {
            nodes: vec![Node::new(root, None, -1)],
        }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Child of `parent` occupying the same slot as `param`.
    pub fn find_child(&self, parent: NodeId, param: &Parameter) -> Option<NodeId> {
        self[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self[c].param().same_slot(param))
    }

    /// Reuse the child matching `param` or create it in priority order.
    /// Returns the child and whether it was created.
    pub(crate) fn child_for(&mut self, parent: NodeId, param: &Arc<Parameter>) -> (NodeId, bool) {
        if let Some(existing) = self.find_child(parent, param) {
            return (existing, false);
        }
        let id = NodeId(self.nodes.len());
        let depth = self[parent].depth + 1;
        let node = Node::new(Arc::clone(param), Some(parent), depth);
        let priority = node.priority;
        self.nodes.push(node);

        // Descending priority; equal priorities keep insertion order.
        let siblings = &self.nodes[parent.0].children;
        let at = siblings
            .iter()
            .position(|&s| self.nodes[s.0].priority < priority)
            .unwrap_or(siblings.len());
        self.nodes[parent.0].children.insert(at, id);
        (id, true)
    }

    /// `id` followed by its ancestors up to the root.
    pub fn lineage(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&n| self[n].parent)
    }

    /// Truncate back to `len` nodes, unlinking any child pointing past it.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(len);
        for node in &mut self.nodes {
            node.children.retain(|c| c.0 < len);
        }
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}
