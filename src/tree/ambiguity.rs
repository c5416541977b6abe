//! Registration-time rejection of grammars that cannot be matched
//! deterministically.

use std::collections::HashSet;

use super::node::{Arena, NodeId};
use crate::error::{GrammarError, Result};

/// Visit every node and reject the first one that has a greedy node with
/// children or indistinguishable argument children.
///
/// Literal and flag children are never considered: both are matched by name.
/// The remaining children are ambiguous only when they all share one nature
/// (all required or all optional), there are at least two of them, and two
/// of them share a value type or a priority.
pub fn check(arena: &Arena) -> Result<()> {
    let command = arena.root().name();
    let mut stack = vec![NodeId::ROOT];
    while let Some(id) = stack.pop() {
        let node = &arena[id];
        if node.is_greedy() && !node.is_leaf() {
            return Err(GrammarError::GreedyNotLast {
                command: command.to_string(),
                parameter: node.name().to_string(),
            });
        }
        stack.extend(node.children().iter().copied());

        let arguments: Vec<NodeId> = node
            .children()
            .iter()
            .copied()
            .filter(|&c| !arena[c].is_flag() && !arena[c].is_literal())
            .collect();
        if arguments.len() < 2 {
            continue;
        }
        let optional = arena[arguments[0]].is_optional();
        if arguments.iter().any(|&c| arena[c].is_optional() != optional) {
            continue;
        }

        let types: HashSet<_> = arguments.iter().map(|&c| arena[c].param().value_type()).collect();
        let priorities: HashSet<_> = arguments.iter().map(|&c| arena[c].param().priority()).collect();
        if types.len() < arguments.len() || priorities.len() < arguments.len() {
            return Err(GrammarError::Ambiguous {
                command: command.to_string(),
                parameter: node.format(),
                siblings: arguments.iter().map(|&c| arena[c].format()).collect(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Parameter, Priority, Usage, ValueType};
    use crate::tree::TreeBuilder;

    fn tree(usages: Vec<Usage>) -> TreeBuilder {
        let mut b = TreeBuilder::new(Parameter::literal("cmd"));
        for u in usages {
            b.insert_usage(u).unwrap();
        }
        b
    }

    #[test]
    fn same_type_required_siblings_are_ambiguous() {
        let b = tree(vec![
            Usage::new("a").param(Parameter::required("x", ValueType::STRING)),
            Usage::new("b").param(Parameter::required("y", ValueType::STRING)),
        ]);
        let err = check(b.arena()).unwrap_err();
        match err {
            GrammarError::Ambiguous { command, parameter, siblings } => {
                assert_eq!(command, "cmd");
                assert_eq!(parameter, "cmd");
                assert_eq!(siblings, vec!["<x>", "<y>"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn same_priority_different_types_is_ambiguous() {
        let b = tree(vec![
            Usage::new("a").param(Parameter::required("x", ValueType::INT)),
            Usage::new("b").param(Parameter::required("y", ValueType::BOOLEAN)),
        ]);
        assert!(matches!(check(b.arena()), Err(GrammarError::Ambiguous { .. })));
    }

    #[test]
    fn distinct_optionals_pass() {
        let b = tree(vec![
            Usage::new("a").param(Parameter::optional("n", ValueType::INT)),
            Usage::new("b").param(Parameter::optional("s", ValueType::STRING)),
        ]);
        assert!(check(b.arena()).is_ok());

        let tree = b
            .validate::<()>(crate::capability::Capabilities::builtin(), crate::tree::TreeSettings::default())
            .unwrap();
        let handler = |line: &str| {
            let tokens = crate::parse::tokenize(line);
            tree.dispatch(&(), &tokens).usage().map(|u| u.handler().to_string())
        };
        assert_eq!(handler("5").as_deref(), Some("a"));
        assert_eq!(handler("x").as_deref(), Some("b"));
    }

    #[test]
    fn mixed_nature_is_never_ambiguous() {
        let b = tree(vec![Usage::new("a").params([
            Parameter::optional("b", ValueType::INT),
            Parameter::optional("c", ValueType::STRING),
            Parameter::required("d", ValueType::STRING),
        ])]);
        assert!(check(b.arena()).is_ok());
    }

    #[test]
    fn explicit_priority_breaks_the_tie() {
        let b = tree(vec![
            Usage::new("a").param(Parameter::required("x", ValueType::STRING)),
            Usage::new("b").param(Parameter::required("y", ValueType::custom("player")).with_priority(Priority::HIGH)),
        ]);
        assert!(check(b.arena()).is_ok());
    }

    #[test]
    fn literals_and_flags_are_ignored() {
        let b = tree(vec![
            Usage::new("a").param(Parameter::literal("list")),
            Usage::new("b").param(Parameter::literal("reload")),
            Usage::new("c").params([Parameter::required("p", ValueType::STRING), Parameter::switch("silent")]),
        ]);
        assert!(check(b.arena()).is_ok());
    }
}
