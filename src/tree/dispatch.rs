//! Exact-match dispatch: resolve a token sequence to one usage.

use std::collections::VecDeque;
use std::sync::Arc;

use log::trace;

use super::CommandTree;
use super::node::{Node, NodeId, UsageId};
use super::search::{Binding, BoundFlag, PathSearch, Status};
use crate::grammar::{ParamKind, Parameter};
use crate::parse;

/// A path that stopped the search: complete, or denied by permission.
struct Hit {
    status: Status,
    last: NodeId,
    usage: Option<UsageId>,
    closest: Option<UsageId>,
    bindings: Vec<Binding>,
    flags: Vec<BoundFlag>,
}

enum Attempt {
    Hit(Hit),
    /// No usage along this path. `last` is the deepest matched node and
    /// `failed` marks malformed flag input.
    Miss { last: NodeId, failed: bool },
}

/// Malformed flag input: unknown flag, or a value flag without a valid value.
struct BadFlag;

/// Per-call scratch state. The tree itself is only read.
struct Walk<'a, S> {
    tree: &'a CommandTree<S>,
    source: &'a S,
    tokens: &'a [String],
    bindings: Vec<Binding>,
    flags: Vec<BoundFlag>,
}

impl<S> CommandTree<S> {
    /// Match `tokens` (the arguments after the command name) against the tree.
    pub fn dispatch<'t>(&'t self, source: &S, tokens: &[String]) -> PathSearch<'t, S> {
        let root = self.arena().root();
        if !self.capabilities().permits(source, root.permission()) {
            trace!("{}: source lacks '{}'", self.name(), root.permission().unwrap_or_default());
            return PathSearch::new(self, Status::Pause, Some(NodeId::ROOT))
                .with_closest(root.terminal().or(root.fallback()));
        }

        if let Some(first) = tokens.first()
            && !parse::is_flag_token(first)
            && root.children().iter().all(|&c| {
                let child = &self.arena()[c];
                !child.is_optional() && !self.accepts(child, first)
            })
        {
            trace!("{}: no root child accepts '{first}'", self.name());
            return PathSearch::new(self, Status::Unknown, Some(NodeId::ROOT));
        }

        let mut walk = Walk {
            tree: self,
            source,
            tokens,
            bindings: Vec::new(),
            flags: Vec::new(),
        };
        let search = match walk.descend(NodeId::ROOT, 0) {
            Attempt::Hit(hit) => {
                let mut search = PathSearch::new(self, hit.status, Some(hit.last)).with_trail(hit.bindings, hit.flags);
                if let Some(usage) = hit.usage {
                    search = search.with_usage(usage);
                }
                if hit.status == Status::Pause {
                    search = search.with_closest(hit.closest);
                }
                search
            }
            Attempt::Miss { last, failed } => {
                let status = if failed { Status::Failure } else { Status::Unknown };
                PathSearch::new(self, status, Some(last))
            }
        };
        trace!("{}: {:?} -> {}", self.name(), tokens, search.status().as_str());
        search
    }

    /// Whether `node` can consume `token` as its own value.
    ///
    /// Literals and flags match by name. Optional arguments always check the
    /// value type, otherwise skipping them would never happen; required
    /// arguments accept anything unless the tree is strict.
    pub(crate) fn accepts(&self, node: &Node, token: &str) -> bool {
        let param = node.param();
        match param.kind() {
            ParamKind::Literal { .. } => param.answers_to(token),
            ParamKind::Flag(_) => parse::flag_alias(token).is_some_and(|alias| param.answers_to(alias)),
            ParamKind::Argument if param.is_optional() || self.settings().strict => {
                self.capabilities().types.matches(token, param)
            }
            ParamKind::Argument => true,
        }
    }

    /// Closest executable usage to `id`: its own, the first one below it,
    /// else the nearest one above it.
    pub(crate) fn nearest_usage(&self, id: NodeId) -> Option<UsageId> {
        let arena = self.arena();
        let mut queue = VecDeque::from([id]);
        while let Some(n) = queue.pop_front() {
            if let Some(usage) = arena[n].terminal() {
                return Some(usage);
            }
            queue.extend(arena[n].children().iter().copied());
        }
        arena
            .lineage(id)
            .find_map(|n| arena[n].terminal().or(arena[n].fallback()))
    }
}

impl<S> Walk<'_, S> {
    fn mark(&self) -> (usize, usize) {
        (self.bindings.len(), self.flags.len())
    }

    fn reset(&mut self, (bindings, flags): (usize, usize)) {
        self.bindings.truncate(bindings);
        self.flags.truncate(flags);
    }

    fn permits(&self, node: &Node) -> bool {
        self.tree.capabilities().permits(self.source, node.permission())
    }

    fn hit(&self, status: Status, last: NodeId, usage: Option<UsageId>, closest: Option<UsageId>) -> Attempt {
        Attempt::Hit(Hit {
            status,
            last,
            usage,
            closest,
            bindings: self.bindings.clone(),
            flags: self.flags.clone(),
        })
    }

    fn pause(&self, id: NodeId) -> Attempt {
        let closest = self.tree.nearest_usage(id);
        self.hit(Status::Pause, id, None, closest)
    }

    /// Resolve a path ending at `id`: its terminal usage, or for a literal
    /// its default usage. `None` when neither exists.
    fn finish(&self, id: NodeId) -> Option<Attempt> {
        let node = &self.tree.arena()[id];
        let usage = match node.terminal() {
            Some(u) => u,
            None if node.is_literal() => node.fallback()?,
            None => return None,
        };
        let permission = self.tree.usage(usage).permission();
        if !self.tree.capabilities().permits(self.source, permission) {
            return Some(self.hit(Status::Pause, id, None, Some(usage)));
        }
        Some(self.hit(Status::Complete, id, Some(usage), None))
    }

    /// Bind the known flag at `cursor`, returning the cursor after it.
    fn take_flag(&mut self, flag: &Arc<Parameter>, cursor: usize) -> Result<usize, BadFlag> {
        let Some(spec) = flag.flag() else {
            return Err(BadFlag);
        };
        if spec.switch {
            self.flags.push(BoundFlag {
                name: flag.name().to_string(),
                value: None,
            });
            return Ok(cursor + 1);
        }
        let tokens = self.tokens;
        let value = tokens.get(cursor + 1).ok_or(BadFlag)?;
        if !self.tree.capabilities().types.matches(value, flag) {
            return Err(BadFlag);
        }
        self.flags.push(BoundFlag {
            name: flag.name().to_string(),
            value: Some(value.clone()),
        });
        Ok(cursor + 2)
    }

    /// Consume consecutive flag tokens through the command's flag registry.
    ///
    /// An unregistered flag token is an error, unless `stop_at_unknown` is set:
    /// then it ends the run and is left for the caller (a greedy value may
    /// start with a dash).
    fn take_flags(&mut self, mut cursor: usize, stop_at_unknown: bool) -> Result<usize, BadFlag> {
        let tokens = self.tokens;
        while let Some(token) = tokens.get(cursor)
            && parse::is_flag_token(token)
        {
            let Some(flag) = self.tree.flags().lookup(token) else {
                return if stop_at_unknown { Ok(cursor) } else { Err(BadFlag) };
            };
            let flag = Arc::clone(flag);
            cursor = self.take_flag(&flag, cursor)?;
        }
        Ok(cursor)
    }

    /// Try to match `id` at `cursor` and continue below it.
    fn visit(&mut self, id: NodeId, cursor: usize) -> Attempt {
        let tree = self.tree;
        let node = &tree.arena()[id];
        let before = node.parent().unwrap_or(id);
        let mark = self.mark();

        let cursor = if node.is_flag() {
            cursor
        } else {
            match self.take_flags(cursor, node.is_greedy()) {
                Ok(c) => c,
                Err(BadFlag) => {
                    self.reset(mark);
                    return Attempt::Miss { last: before, failed: true };
                }
            }
        };
        let tokens = self.tokens;
        let Some(token) = tokens.get(cursor) else {
            self.reset(mark);
            return Attempt::Miss { last: before, failed: false };
        };

        if !tree.accepts(node, token) {
            self.reset(mark);
            return if node.is_optional() && !node.is_flag() {
                self.skip(id, cursor)
            } else {
                Attempt::Miss { last: before, failed: false }
            };
        }
        if !self.permits(node) {
            self.reset(mark);
            return self.pause(id);
        }

        let next = if node.is_flag() {
            match self.take_flag(node.param(), cursor) {
                Ok(next) => next,
                Err(BadFlag) => {
                    self.reset(mark);
                    return Attempt::Miss { last: before, failed: true };
                }
            }
        } else {
            // Greedy nodes take everything left, flag-looking tokens included.
            let end = if node.is_greedy() { self.tokens.len() } else { cursor + 1 };
            self.bindings.push(Binding {
                node: id,
                parameter: Arc::clone(node.param()),
                value: self.tokens[cursor..end].join(" "),
            });
            end
        };

        if next >= self.tokens.len() {
            if let Some(done) = self.finish(id) {
                return done;
            }
            self.reset(mark);
            if node.is_optional() && !node.is_flag() {
                return self.skip(id, cursor);
            }
            return Attempt::Miss { last: id, failed: false };
        }

        let below = self.descend(id, next);
        if let Attempt::Hit(_) = below {
            return below;
        }
        self.reset(mark);
        if node.is_optional() && !node.is_flag()
            && let hit @ Attempt::Hit(_) = self.skip(id, cursor)
        {
            return hit;
        }
        below
    }

    /// Try the children of `id` at `cursor`, in priority order, returning the
    /// first stoppable result. Falls back to completing at `id` when only
    /// flags remain, then to the shallowest miss.
    fn descend(&mut self, id: NodeId, cursor: usize) -> Attempt {
        let tree = self.tree;
        let arena = tree.arena();
        let mut shallowest: Option<(NodeId, bool)> = None;
        for &child in arena[id].children() {
            match self.visit(child, cursor) {
                hit @ Attempt::Hit(_) => return hit,
                Attempt::Miss { last, failed } => match shallowest {
                    Some((s, f)) if arena[last].depth() == arena[s].depth() => {
                        shallowest = Some((s, f || failed));
                    }
                    Some((s, _)) if arena[last].depth() > arena[s].depth() => {}
                    _ => shallowest = Some((last, failed)),
                },
            }
        }

        let (last, mut failed) = shallowest.unwrap_or((id, false));
        let mark = self.mark();
        match self.take_flags(cursor, false) {
            Ok(end) if end >= self.tokens.len() => {
                if let Some(done) = self.finish(id) {
                    return done;
                }
            }
            Ok(_) => {}
            Err(BadFlag) => failed = true,
        }
        self.reset(mark);
        Attempt::Miss { last, failed }
    }

    /// Pass over optional node `id` without consuming a token.
    fn skip(&mut self, id: NodeId, cursor: usize) -> Attempt {
        let arena = self.tree.arena();
        let before = arena[id].parent().unwrap_or(id);
        for &child in arena[id].children() {
            if let hit @ Attempt::Hit(_) = self.visit(child, cursor) {
                return hit;
            }
        }
        Attempt::Miss { last: before, failed: false }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::capability::{Capabilities, FnPermissions};
    use crate::grammar::{Usage, ValueType};
    use crate::tree::{TreeBuilder, TreeSettings};

    fn toks(line: &str) -> Vec<String> {
        parse::tokenize(line)
    }

    fn seal(builder: TreeBuilder) -> CommandTree<()> {
        builder.validate(Capabilities::builtin(), TreeSettings::default()).unwrap()
    }

    fn ban_tree() -> CommandTree<()> {
        let mut b = TreeBuilder::new(Parameter::literal("ban"));
        b.insert_usage(
            Usage::new("ban")
                .param(Parameter::required("target", ValueType::STRING))
                .param(Parameter::switch("silent").with_aliases(["s"]))
                .param(Parameter::switch("ip"))
                .param(Parameter::value_flag("time", ValueType::INT).with_aliases(["t"]))
                .param(Parameter::optional("reason", ValueType::STRING).greedy()),
        )
        .unwrap();
        seal(b)
    }

    #[test]
    fn skips_middle_optionals() {
        let mut b = TreeBuilder::new(Parameter::literal("cmd"));
        b.insert_usage(Usage::new("h").params([
            Parameter::required("a", ValueType::STRING),
            Parameter::optional("b", ValueType::INT),
            Parameter::optional("c", ValueType::STRING),
            Parameter::required("d", ValueType::STRING),
        ]))
        .unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &toks("a 5"));
        assert_eq!(search.status(), Status::Complete);
        let args: Vec<(&str, &str)> = search.arguments().collect();
        assert_eq!(args, vec![("a", "a"), ("d", "5")]);
        assert_eq!(search.last_node().map(|n| n.name()), Some("d"));
    }

    #[test]
    fn completing_siblings_never_tie() {
        use std::collections::HashSet;

        use crate::config::Config;
        use crate::grammar::Priority;
        use crate::registry::CommandRegistry;

        let registry = CommandRegistry::<()>::from_config(&Config::default_config(), Capabilities::builtin()).unwrap();
        let lines = [
            "ban steve",
            "ban steve -s spam",
            "ban -t 60 steve",
            "kit list",
            "kit give pvp alex",
            "msg steve hi there",
            "tp steve",
            "tp 1 2 3",
            "tp 1 2",
        ];
        for line in lines {
            let tokens = toks(line);
            let tree = registry.get(&tokens[0]).unwrap().tree();
            let args = &tokens[1..];
            // Each root child tried on its own, as dispatch would in priority order.
            let completing: Vec<(Priority, UsageId)> = tree
                .root()
                .children()
                .iter()
                .filter_map(|&child| {
                    let mut walk = Walk {
                        tree,
                        source: &(),
                        tokens: args,
                        bindings: Vec::new(),
                        flags: Vec::new(),
                    };
                    match walk.visit(child, 0) {
                        Attempt::Hit(hit) if hit.status == Status::Complete => Some((tree.arena()[child].priority(), hit.usage?)),
                        _ => None,
                    }
                })
                .collect();
            let priorities: HashSet<Priority> = completing.iter().map(|(p, _)| *p).collect();
            assert_eq!(priorities.len(), completing.len(), "tied siblings for '{line}'");
            let search = tree.dispatch(&(), args);
            assert_eq!(
                search.usage().map(|u| u.handler()),
                completing.first().map(|&(_, u)| tree.usage(u).handler()),
                "line: {line}"
            );
        }
    }

    #[test]
    fn binds_all_when_all_given() {
        let mut b = TreeBuilder::new(Parameter::literal("a"));
        b.insert_usage(Usage::new("h").params([
            Parameter::optional("b", ValueType::INT),
            Parameter::optional("c", ValueType::STRING),
            Parameter::required("d", ValueType::STRING),
        ]))
        .unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &toks("5 x y"));
        assert!(search.is_complete());
        let args: Vec<(&str, &str)> = search.arguments().collect();
        assert_eq!(args, vec![("b", "5"), ("c", "x"), ("d", "y")]);
    }

    #[test]
    fn flag_order_does_not_matter() {
        let tree = ban_tree();
        let a = tree.dispatch(&(), &toks("p -s -ip"));
        let b = tree.dispatch(&(), &toks("p -ip -s"));
        assert!(a.is_complete());
        assert!(b.is_complete());
        assert!(Arc::ptr_eq(a.usage().unwrap(), b.usage().unwrap()));
        assert_eq!(a.bound_flags(), b.bound_flags());
        let expected: BTreeMap<&str, Option<&str>> = [("ip", None), ("silent", None)].into_iter().collect();
        assert_eq!(a.bound_flags(), expected);
    }

    #[test]
    fn value_flag_and_greedy_reason() {
        let tree = ban_tree();
        let search = tree.dispatch(&(), &toks("steve -t 10 -s griefing the spawn"));
        assert!(search.is_complete());
        assert_eq!(search.bound_flags().get("time"), Some(&Some("10")));
        let args: Vec<(&str, &str)> = search.arguments().collect();
        assert_eq!(args, vec![("target", "steve"), ("reason", "griefing the spawn")]);
    }

    #[test]
    fn flag_before_argument() {
        let tree = ban_tree();
        let search = tree.dispatch(&(), &toks("-s steve"));
        assert!(search.is_complete());
        assert_eq!(search.bound_flags().len(), 1);
    }

    #[test]
    fn unknown_flag_fails() {
        let tree = ban_tree();
        assert_eq!(tree.dispatch(&(), &toks("-x steve")).status(), Status::Failure);
    }

    #[test]
    fn greedy_value_may_start_with_a_dash() {
        let tree = ban_tree();
        let search = tree.dispatch(&(), &toks("steve -s -x marks the spot"));
        assert!(search.is_complete());
        assert_eq!(search.bound_flags().len(), 1);
        let args: Vec<(&str, &str)> = search.arguments().collect();
        assert_eq!(args, vec![("target", "steve"), ("reason", "-x marks the spot")]);

        let mut b = TreeBuilder::new(Parameter::literal("msg"));
        b.insert_usage(Usage::new("msg").params([
            Parameter::required("player", ValueType::STRING),
            Parameter::required("message", ValueType::STRING).greedy(),
        ]))
        .unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &toks("steve -hello world"));
        assert!(search.is_complete());
        let args: Vec<(&str, &str)> = search.arguments().collect();
        assert_eq!(args, vec![("player", "steve"), ("message", "-hello world")]);
    }

    #[test]
    fn known_flag_before_greedy_still_needs_its_value() {
        let tree = ban_tree();
        assert_eq!(tree.dispatch(&(), &toks("steve -t soon and forever")).status(), Status::Failure);
    }

    #[test]
    fn value_flag_needs_typed_value() {
        let tree = ban_tree();
        assert_eq!(tree.dispatch(&(), &toks("steve -t")).status(), Status::Failure);
        assert_eq!(tree.dispatch(&(), &toks("steve -t soon")).status(), Status::Failure);
    }

    #[test]
    fn unknown_literal_short_circuits() {
        let mut b = TreeBuilder::new(Parameter::literal("kit"));
        b.insert_usage(Usage::new("list").param(Parameter::literal("list"))).unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &toks("nope"));
        assert_eq!(search.status(), Status::Unknown);
        assert_eq!(search.last_node_id(), Some(NodeId::ROOT));
    }

    #[test]
    fn too_many_tokens_is_unknown() {
        let mut b = TreeBuilder::new(Parameter::literal("kit"));
        b.insert_usage(Usage::new("list").param(Parameter::literal("list"))).unwrap();
        let tree = seal(b);
        assert_eq!(tree.dispatch(&(), &toks("list extra")).status(), Status::Unknown);
    }

    #[test]
    fn empty_input_uses_root_default() {
        let mut b = TreeBuilder::new(Parameter::literal("kit"));
        b.insert_usage(Usage::default_usage("kit_help")).unwrap();
        b.insert_usage(Usage::new("list").param(Parameter::literal("list"))).unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &[]);
        assert!(search.is_complete());
        assert_eq!(search.usage().map(|u| u.handler()), Some("kit_help"));
    }

    #[test]
    fn literal_falls_back_to_its_default() {
        let mut b = TreeBuilder::new(Parameter::literal("kit"));
        b.insert_usage(Usage::default_usage("give_help").param(Parameter::literal("give")))
            .unwrap();
        b.insert_usage(Usage::new("give").params([
            Parameter::literal("give"),
            Parameter::required("name", ValueType::STRING),
        ]))
        .unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &toks("give"));
        assert!(search.is_complete());
        assert_eq!(search.usage().map(|u| u.handler()), Some("give_help"));
        let search = tree.dispatch(&(), &toks("give starter"));
        assert_eq!(search.usage().map(|u| u.handler()), Some("give"));
    }

    #[test]
    fn permission_denial_pauses_before_deeper_nodes() {
        let mut b = TreeBuilder::new(Parameter::literal("kit"));
        b.insert_usage(Usage::new("reload").params([
            Parameter::literal("admin").with_permission("kit.admin"),
            Parameter::literal("reload"),
        ]))
        .unwrap();
        let caps = Capabilities::builtin().with_permissions(FnPermissions(|_: &(), p: &str| p != "kit.admin"));
        let tree = b.validate(caps, TreeSettings::default()).unwrap();
        let search = tree.dispatch(&(), &toks("admin reload"));
        assert_eq!(search.status(), Status::Pause);
        assert!(search.usage().is_none());
        assert_eq!(search.last_node().map(|n| n.name()), Some("admin"));
        assert_eq!(search.closest_usage().map(|u| u.handler()), Some("reload"));
    }

    #[test]
    fn usage_permission_is_checked_on_completion() {
        let mut b = TreeBuilder::new(Parameter::literal("kit"));
        b.insert_usage(
            Usage::new("reset")
                .param(Parameter::literal("reset"))
                .with_permission("kit.reset"),
        )
        .unwrap();
        let caps = Capabilities::builtin().with_permissions(FnPermissions(|_: &(), _: &str| false));
        let tree = b.validate(caps, TreeSettings::default()).unwrap();
        let search = tree.dispatch(&(), &toks("reset"));
        assert_eq!(search.status(), Status::Pause);
        assert_eq!(search.closest_usage().map(|u| u.handler()), Some("reset"));
    }

    #[test]
    fn strict_mode_type_checks_required_arguments() {
        let build = || {
            let mut b = TreeBuilder::new(Parameter::literal("tp"));
            b.insert_usage(Usage::new("tp").param(Parameter::required("x", ValueType::INT)))
                .unwrap();
            b
        };
        let lenient = seal(build());
        assert!(lenient.dispatch(&(), &toks("abc")).is_complete());
        let strict = build()
            .validate(
                Capabilities::builtin(),
                TreeSettings {
                    strict: true,
                    ..TreeSettings::default()
                },
            )
            .unwrap();
        assert_eq!(strict.dispatch(&(), &toks("abc")).status(), Status::Unknown);
        assert!(strict.dispatch(&(), &toks("12")).is_complete());
    }

    #[test]
    fn negative_numbers_are_values() {
        let mut b = TreeBuilder::new(Parameter::literal("tp"));
        b.insert_usage(Usage::new("tp").param(Parameter::required("y", ValueType::INT)))
            .unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &toks("-5"));
        assert!(search.is_complete());
        assert_eq!(search.arguments().next(), Some(("y", "-5")));
    }

    #[test]
    fn closest_usage_for_unknown_input() {
        let mut b = TreeBuilder::new(Parameter::literal("kit"));
        b.insert_usage(Usage::new("give").params([
            Parameter::literal("give"),
            Parameter::required("name", ValueType::STRING),
            Parameter::required("amount", ValueType::INT),
        ]))
        .unwrap();
        let tree = seal(b);
        let search = tree.dispatch(&(), &toks("give starter 1 2"));
        assert_eq!(search.status(), Status::Unknown);
        assert_eq!(search.closest_usage().map(|u| u.handler()), Some("give"));
    }
}
