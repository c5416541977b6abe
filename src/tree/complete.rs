//! Tab completion over a sealed tree.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use log::trace;

use super::CommandTree;
use super::node::{Node, NodeId};
use crate::cache::{InputKey, SuggestionCache};
use crate::capability::SuggestionContext;
use crate::grammar::flags::flag_span;
use crate::grammar::Parameter;

/// A tree position that offers candidates for the token being completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reach {
    /// Every child of this node is a candidate.
    Children(NodeId),
    /// A greedy node is still consuming tokens.
    Greedy(NodeId),
    /// The target is the value of this flag.
    FlagValue(Arc<Parameter>),
}

impl<S> CommandTree<S>
where
    S: Clone + Eq + Hash,
{
    /// Candidates for `tokens[target]`, filtered by `prefix` (case-insensitive)
    /// and free of duplicates. `tokens` are the arguments after the command
    /// name; only those before `target` steer the walk.
    ///
    /// The positions reached for a given (source, typed tokens) pair are
    /// cached for the tree's suggestion TTL.
    pub fn complete(&self, source: &S, tokens: &[String], target: usize, prefix: &str) -> Vec<String> {
        if !self.capabilities().permits(source, self.arena().root().permission()) {
            return Vec::new();
        }
        // Nothing is typeable past the first missing token.
        if target > tokens.len() {
            return Vec::new();
        }
        let typed = &tokens[..target];
        let key = InputKey {
            source: source.clone(),
            input: typed.to_vec(),
        };
        let reached = self.suggestion_cache().get_or_insert_with(key, || {
            trace!("{}: walking tree for {:?}", self.name(), typed);
            self.reach(source, tokens, target).into()
        });

        let ctx = SuggestionContext {
            source,
            tokens,
            target,
        };
        let needle = prefix.to_lowercase();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for position in reached.iter() {
            for candidate in self.candidates(&ctx, position) {
                if candidate.to_lowercase().starts_with(&needle) && seen.insert(candidate.clone()) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    fn suggestion_cache(&self) -> &SuggestionCache<S, Reach> {
        self.cache
            .get_or_init(|| SuggestionCache::new(self.settings().suggestion_ttl))
    }

    /// Inputs whose completion positions are currently cached.
    pub fn cached_inputs(&self) -> usize {
        self.cache.get().map_or(0, |cache| cache.len())
    }

    /// Walk the typed tokens with an explicit stack and collect every
    /// position that ends at `target`.
    fn reach(&self, source: &S, tokens: &[String], target: usize) -> Vec<Reach> {
        let arena = self.arena();
        let mut found = Vec::new();
        let mut stack = vec![(NodeId::ROOT, 0usize)];

        while let Some((id, cursor)) = stack.pop() {
            if cursor == target {
                found.push(Reach::Children(id));
                continue;
            }
            let Some(token) = tokens.get(cursor) else {
                continue;
            };

            let mut next: Vec<(NodeId, usize)> = Vec::new();
            for &child in arena[id].children() {
                let node = &arena[child];
                if !self.accepts(node, token) || !self.capabilities().permits(source, node.permission()) {
                    continue;
                }
                if node.is_greedy() {
                    found.push(Reach::Greedy(child));
                    continue;
                }
                let span = if node.is_flag() { flag_span(node.param()) } else { 1 };
                if span == 2 && cursor + 1 == target {
                    found.push(Reach::FlagValue(Arc::clone(node.param())));
                    continue;
                }
                if node.is_literal() {
                    // A matching subcommand hides its siblings.
                    next.clear();
                    next.push((child, cursor + 1));
                    break;
                }
                next.push((child, cursor + span));
            }

            // Flags the tree does not place here are still consumed.
            if next.is_empty()
                && let Some(flag) = self.flags().lookup(token)
            {
                match flag_span(flag) {
                    2 if cursor + 1 == target => found.push(Reach::FlagValue(Arc::clone(flag))),
                    span => next.push((id, cursor + span)),
                }
            }
            stack.extend(next.into_iter().rev());
        }
        found
    }

    fn candidates(&self, ctx: &SuggestionContext<'_, S>, position: &Reach) -> Vec<String> {
        let arena = self.arena();
        match position {
            Reach::Children(id) => {
                let mut out = Vec::new();
                for &child in arena[*id].children() {
                    let node = &arena[child];
                    if !self.visible(ctx.source, node) {
                        continue;
                    }
                    out.extend(self.capabilities().suggestions.suggest(ctx, node.param()));
                    if self.settings().overlapping_suggestions && node.is_optional() && !node.is_flag() {
                        self.overlap(ctx, child, &mut out);
                    }
                }
                out
            }
            Reach::Greedy(id) => self.capabilities().suggestions.suggest(ctx, arena[*id].param()),
            Reach::FlagValue(flag) => {
                let input = flag
                    .flag()
                    .and_then(|spec| spec.input.clone())
                    .unwrap_or_else(|| flag.value_type().clone());
                let value = Parameter::required(flag.name(), input).with_suggestions(flag.suggestions().iter().cloned());
                self.capabilities().suggestions.suggest(ctx, &value)
            }
        }
    }

    /// Candidates that become typeable when optional `start` is skipped.
    /// Descendants sharing an optional's value type are left out since the
    /// user could not tell them apart; required descendants end the chain.
    fn overlap(&self, ctx: &SuggestionContext<'_, S>, start: NodeId, out: &mut Vec<String>) {
        let arena = self.arena();
        let mut stack = vec![start];
        while let Some(at) = stack.pop() {
            let value_type = arena[at].param().value_type();
            for &child in arena[at].children() {
                let node = &arena[child];
                if node.is_flag() || node.param().value_type() == value_type || !self.visible(ctx.source, node) {
                    continue;
                }
                out.extend(self.capabilities().suggestions.suggest(ctx, node.param()));
                if node.is_optional() {
                    stack.push(child);
                }
            }
        }
    }

    fn visible(&self, source: &S, node: &Node) -> bool {
        node.param().ignores_completion_permission() || self.capabilities().permits(source, node.permission())
    }
}
