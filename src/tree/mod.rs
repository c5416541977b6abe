//! Command trees: construction, validation, dispatch and completion.
//!
//! A tree starts as a [`TreeBuilder`] that accepts usages. Validation seals
//! it into a [`CommandTree`], which is read-only apart from its suggestion
//! cache and can be shared between threads.

mod ambiguity;
mod build;
mod complete;
mod dispatch;
pub mod node;
pub mod search;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub use build::TreeBuilder;
pub use node::{Arena, Node, NodeId, NodeKind, UsageId};
pub use search::{Binding, BoundFlag, PathSearch, Status};

use crate::cache::{SUGGESTION_TTL, SuggestionCache};
use crate::capability::Capabilities;
use crate::grammar::{FlagRegistry, Usage};
use complete::Reach;

/// Behaviour switches applied when a tree is sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSettings {
    /// Type-check required arguments too, not only optional ones.
    pub strict: bool,
    /// Also suggest what becomes typeable once an optional is skipped.
    pub overlapping_suggestions: bool,
    /// Derive hierarchical permissions for nodes that declare none.
    pub auto_permissions: bool,
    pub permission_delimiter: String,
    pub suggestion_ttl: Duration,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            strict: false,
            overlapping_suggestions: false,
            auto_permissions: false,
            permission_delimiter: ".".to_string(),
            suggestion_ttl: SUGGESTION_TTL,
        }
    }
}

/// A validated, dispatchable command tree.
pub struct CommandTree<S> {
    arena: Arena,
    usages: Vec<Arc<Usage>>,
    flags: FlagRegistry,
    caps: Capabilities<S>,
    settings: TreeSettings,
    /// Created on first completion, which is the only place keys are hashed.
    cache: OnceLock<SuggestionCache<S, Reach>>,
}

impl<S> CommandTree<S> {
    fn sealed(
        arena: Arena,
        usages: Vec<Arc<Usage>>,
        flags: FlagRegistry,
        caps: Capabilities<S>,
        settings: TreeSettings,
    ) -> Self {
        Self {
            arena,
            usages,
            flags,
            caps,
            settings,
            cache: OnceLock::new(),
        }
    }

    /// The command name.
    pub fn name(&self) -> &str {
        self.arena.root().name()
    }

    pub fn root(&self) -> &Node {
        self.arena.root()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn usage(&self, id: UsageId) -> &Arc<Usage> {
        &self.usages[id.0]
    }

    pub fn usages(&self) -> &[Arc<Usage>] {
        &self.usages
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    pub fn capabilities(&self) -> &Capabilities<S> {
        &self.caps
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    /// Node count, root excluded.
    pub fn size(&self) -> usize {
        self.arena.len() - 1
    }

    /// Indented dump of the tree, one node per line.
    pub fn render(&self) -> String {
        render(&self.arena)
    }
}

impl<S> std::fmt::Debug for CommandTree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTree")
            .field("name", &self.name())
            .field("size", &self.size())
            .field("usages", &self.usages.len())
            .field("settings", &self.settings)
            .finish()
    }
}

pub(crate) fn render(arena: &Arena) -> String {
    let mut out = String::new();
    let mut stack = vec![NodeId::ROOT];
    while let Some(id) = stack.pop() {
        let node = &arena[id];
        let indent = "  ".repeat((node.depth() + 1) as usize);
        let executable = if node.is_executable() { " [executable]" } else { "" };
        out.push_str(&format!(
            "{indent}{}{executable} P={}\n",
            node.format(),
            node.priority().level()
        ));
        stack.extend(node.children().iter().rev().copied());
    }
    out
}
