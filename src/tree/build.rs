//! Usage insertion and the finalization pass that seals a tree.

use std::sync::Arc;

use log::debug;

use super::ambiguity;
use super::node::{Arena, NodeId, UsageId};
use super::{CommandTree, TreeSettings, render};
use crate::capability::Capabilities;
use crate::error::{GrammarError, Result};
use crate::grammar::{FlagRegistry, Parameter, Usage, permute};

/// Previous value of a binding slot, restored when an insertion fails.
enum Undo {
    Terminal(NodeId, Option<UsageId>),
    Fallback(NodeId, Option<UsageId>),
}

/// Mutable phase of a command tree.
///
/// Usages are inserted here. [`TreeBuilder::validate`] runs the ambiguity
/// check and the permission pass and turns the builder into a read-only
/// [`CommandTree`]; there is no way to dispatch against an unvalidated tree.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    arena: Arena,
    usages: Vec<Arc<Usage>>,
}

impl TreeBuilder {
    /// Start a tree for the command literal `command`.
    pub fn new(command: Parameter) -> Self {
        Self {
            arena: Arena::new(Arc::new(command)),
            usages: Vec::new(),
        }
    }

    pub fn command(&self) -> &str {
        self.arena.root().name()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn usages(&self) -> &[Arc<Usage>] {
        &self.usages
    }

    /// Node count, root excluded.
    pub fn size(&self) -> usize {
        self.arena.len() - 1
    }

    /// Insert a usage, creating nodes on demand.
    ///
    /// Inserting a usage structurally equal to one already present returns the
    /// existing id and leaves the tree untouched. On error the tree is exactly
    /// as it was before the call.
    pub fn insert_usage(&mut self, usage: Usage) -> Result<UsageId> {
        self.precheck(&usage)?;
        if let Some(existing) = self.usages.iter().position(|u| **u == usage) {
            debug!("{}: usage '{}' already present", self.command(), usage);
            return Ok(UsageId(existing));
        }

        let id = UsageId(self.usages.len());
        let usage = Arc::new(usage);
        self.usages.push(Arc::clone(&usage));
        let mark = self.arena.len();
        let mut journal = Vec::new();

        let inserted = if usage.is_default() {
            self.bind_default(usage.parameters(), id, &mut journal);
            Ok(())
        } else {
            self.insert_from(NodeId::ROOT, usage.parameters(), 0, id, &mut journal)
        };

        if let Err(e) = inserted {
            self.rollback(mark, journal);
            return Err(e);
        }
        debug!(
            "{}: inserted usage '{}' ({} nodes)",
            self.command(),
            usage,
            self.size()
        );
        Ok(id)
    }

    /// Checks that need no tree access run before anything is mutated.
    fn precheck(&self, usage: &Usage) -> Result<()> {
        let params = usage.parameters();
        if let Some(greedy) = params.iter().rev().skip(1).find(|p| p.is_greedy()) {
            return Err(GrammarError::GreedyNotLast {
                command: self.command().to_string(),
                parameter: greedy.name().to_string(),
            });
        }
        let mut run = 0;
        for param in params {
            run = if param.is_flag() && param.is_optional() { run + 1 } else { 0 };
            if run > permute::MAX_FLAG_RUN {
                return Err(GrammarError::InvalidDeclaration {
                    command: self.command().to_string(),
                    reason: format!(
                        "more than {} consecutive optional flags (at '{}')",
                        permute::MAX_FLAG_RUN,
                        param.name()
                    ),
                });
            }
        }
        if usage.is_default()
            && let Some(bad) = params.iter().find(|p| !p.is_literal())
        {
            return Err(GrammarError::InvalidDefaultUsage {
                command: self.command().to_string(),
                parameter: bad.name().to_string(),
            });
        }
        Ok(())
    }

    fn insert_from(
        &mut self,
        node: NodeId,
        params: &[Arc<Parameter>],
        index: usize,
        usage: UsageId,
        journal: &mut Vec<Undo>,
    ) -> Result<()> {
        if self.arena[node].is_greedy() && index < params.len() {
            return Err(GrammarError::GreedyNotLast {
                command: self.command().to_string(),
                parameter: self.arena[node].name().to_string(),
            });
        }
        let Some(param) = params.get(index) else {
            self.bind(node, usage, journal);
            return Ok(());
        };

        if param.is_flag() && param.is_optional() {
            let run = params[index..]
                .iter()
                .take_while(|p| p.is_flag() && p.is_optional())
                .count();
            let end = index + run;
            for sequence in permute::flag_sequences(&params[index..end]) {
                let mut at = node;
                for flag in &sequence {
                    at = self.arena.child_for(at, flag).0;
                }
                self.insert_from(at, params, end, usage, journal)?;
            }
            return Ok(());
        }

        let (child, created) = self.arena.child_for(node, param);
        if !created && self.arena[child].is_greedy() != param.is_greedy() {
            return Err(GrammarError::InvalidDeclaration {
                command: self.command().to_string(),
                reason: format!(
                    "parameter '{}' is greedy in one usage but not in another",
                    param.name()
                ),
            });
        }
        if param.is_greedy() {
            self.bind(child, usage, journal);
        } else {
            self.insert_from(child, params, index + 1, usage, journal)?;
        }
        if param.is_optional() {
            self.insert_from(node, params, index + 1, usage, journal)?;
        }
        Ok(())
    }

    /// Mark `node` as completing `usage`. A node already bound keeps the
    /// usage with fewer parameters; on a tie the newer usage wins.
    fn bind(&mut self, node: NodeId, usage: UsageId, journal: &mut Vec<Undo>) {
        let current = self.arena[node].terminal;
        if let Some(existing) = current {
            let held = self.usages[existing.0].parameters().len();
            let offered = self.usages[usage.0].parameters().len();
            if existing == usage || held < offered {
                return;
            }
        }
        journal.push(Undo::Terminal(node, current));
        self.arena.get_mut(node).terminal = Some(usage);
    }

    /// A default usage only names literals: walk (or create) that literal
    /// path and make the usage its fallback.
    fn bind_default(&mut self, params: &[Arc<Parameter>], usage: UsageId, journal: &mut Vec<Undo>) {
        let mut at = NodeId::ROOT;
        for param in params {
            at = self.arena.child_for(at, param).0;
        }
        let node = self.arena.get_mut(at);
        journal.push(Undo::Fallback(at, node.fallback));
        node.fallback = Some(usage);
    }

    fn rollback(&mut self, mark: usize, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Terminal(id, prev) if id.index() < mark => self.arena.get_mut(id).terminal = prev,
                Undo::Fallback(id, prev) if id.index() < mark => self.arena.get_mut(id).fallback = prev,
                _ => {}
            }
        }
        self.arena.truncate(mark);
        self.usages.pop();
    }

    /// Give every node without an explicit permission a hierarchical one:
    /// the root permission, then one component per required node on the path.
    /// Optional nodes get their own component but do not extend the prefix
    /// seen by their descendants. Running it twice changes nothing.
    pub fn assign_permissions(&mut self, delimiter: &str) {
        let command = self.command().to_lowercase();
        let base = self
            .arena
            .get_mut(NodeId::ROOT)
            .permission
            .get_or_insert(command)
            .clone();

        let mut stack = vec![(NodeId::ROOT, base)];
        while let Some((id, base)) = stack.pop() {
            let children = self.arena[id].children().to_vec();
            for child in children {
                let node = self.arena.get_mut(child);
                let own = format!("{base}{delimiter}{}", node.name().to_lowercase());
                if node.permission.is_none() {
                    node.permission = Some(own.clone());
                }
                let next = if node.is_required() { own } else { base.clone() };
                stack.push((child, next));
            }
        }
    }

    /// Seal the tree: reject ambiguous grammars, assign permissions when
    /// configured, and build the per-command flag registry.
    pub fn validate<S>(mut self, caps: Capabilities<S>, settings: TreeSettings) -> Result<CommandTree<S>> {
        if let Err(e) = ambiguity::check(&self.arena) {
            log::warn!("{}: rejected: {e}", self.command());
            return Err(e);
        }
        if settings.auto_permissions {
            self.assign_permissions(&settings.permission_delimiter);
        }
        let flags = FlagRegistry::from_usages(self.usages.iter().map(Arc::as_ref));
        debug!("{}: sealed tree\n{}", self.command(), render(&self.arena));
        Ok(CommandTree::sealed(self.arena, self.usages, flags, caps, settings))
    }
}
