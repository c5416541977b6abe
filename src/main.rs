//! cmdgrammar: dispatch or complete one command line from JSON on stdin.
//!
//! Input:
//!   {"mode": "dispatch" | "complete", "line": "/kit give pvp",
//!    "source": {"name": "steve", "permissions": ["kit.*"]},
//!    "grammar": "/optional/path/to/grammar.toml"}
//!
//! Output is a single JSON object on stdout. Errors go to stderr with exit 1.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Value, json};

use cmdgrammar::capability::{Capabilities, PermissionChecker};
use cmdgrammar::config::Config;
use cmdgrammar::{CommandRegistry, Dispatch, logging};

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Mode {
    #[default]
    Dispatch,
    Complete,
}

/// The caller a line is dispatched for.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq, Hash)]
struct CliSource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    permissions: BTreeSet<String>,
}

#[derive(Deserialize)]
struct Request {
    #[serde(default)]
    mode: Mode,
    line: String,
    #[serde(default)]
    source: CliSource,
    grammar: Option<PathBuf>,
}

/// Grants by exact name, `*`, or a `prefix.*` wildcard.
struct GrantList;

impl PermissionChecker<CliSource> for GrantList {
    fn has_permission(&self, source: &CliSource, permission: &str) -> bool {
        source.permissions.iter().any(|grant| {
            grant == "*"
                || grant.eq_ignore_ascii_case(permission)
                || grant.strip_suffix(".*").is_some_and(|prefix| {
                    permission
                        .get(..prefix.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
                        && permission[prefix.len()..].starts_with('.')
                })
        })
    }
}

fn dispatch_output(outcome: &Dispatch<'_, CliSource>) -> Value {
    let Some(search) = outcome.search() else {
        return json!({ "status": outcome.status().as_str() });
    };
    let command = outcome.command().map(|c| c.name());
    let usage = search.usage();
    let closest = search.closest_usage();
    let bindings: serde_json::Map<String, Value> = search
        .arguments()
        .map(|(name, value)| (name.to_string(), Value::from(value)))
        .collect();
    json!({
        "status": search.status().as_str(),
        "command": command,
        "handler": usage.map(|u| u.handler()),
        "usage": usage.zip(command).map(|(u, c)| u.format(c)),
        "closest": closest.zip(command).map(|(u, c)| u.format(c)),
        "bindings": bindings,
        "flags": search.bound_flags(),
    })
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("cmdgrammar: {message}");
    std::process::exit(1);
}

fn main() {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        fail("failed to read stdin");
    }

    let request: Request = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => fail(format!("JSON parse error: {e}")),
    };

    let config = match &request.grammar {
        Some(path) => Config::load_from(path).unwrap_or_else(|e| fail(e)),
        None => Config::load(),
    };
    logging::init(&config.settings);

    let caps = Capabilities::builtin().with_permissions(GrantList);
    let registry = CommandRegistry::from_config(&config, caps).unwrap_or_else(|e| fail(e));

    let output = match request.mode {
        Mode::Dispatch => {
            let outcome = registry.dispatch(&request.source, &request.line);
            logging::log_outcome(&request.line, &outcome);
            dispatch_output(&outcome)
        }
        Mode::Complete => json!({
            "suggestions": registry.complete(&request.source, &request.line),
        }),
    };

    match serde_json::to_string(&output) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(grants: &[&str]) -> CliSource {
        CliSource {
            name: "steve".into(),
            permissions: grants.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn grants_exact_and_wildcards() {
        let s = source(&["kit.*", "server.ban"]);
        assert!(GrantList.has_permission(&s, "kit.admin"));
        assert!(GrantList.has_permission(&s, "kit.admin.reload"));
        assert!(GrantList.has_permission(&s, "SERVER.BAN"));
        assert!(!GrantList.has_permission(&s, "kit"));
        assert!(!GrantList.has_permission(&s, "kits.admin"));
        assert!(GrantList.has_permission(&source(&["*"]), "anything"));
    }

    #[test]
    fn request_defaults_to_dispatch() {
        let req: Request = serde_json::from_str(r#"{"line": "/kit list"}"#).unwrap();
        assert_eq!(req.mode, Mode::Dispatch);
        assert!(req.source.permissions.is_empty());
        assert!(req.grammar.is_none());
    }

    #[test]
    fn dispatch_output_shape() {
        let registry = CommandRegistry::from_config(
            &Config::default_config(),
            Capabilities::builtin().with_permissions(GrantList),
        )
        .unwrap();
        let s = source(&["*"]);
        let outcome = registry.dispatch(&s, "/kit give pvp alex");
        let out = dispatch_output(&outcome);
        assert_eq!(out["status"], "complete");
        assert_eq!(out["command"], "kit");
        assert_eq!(out["handler"], "kit_give");
        assert_eq!(out["bindings"]["kit"], "pvp");
        assert_eq!(out["bindings"]["player"], "alex");

        let unknown = registry.dispatch(&s, "/fly");
        assert_eq!(dispatch_output(&unknown), json!({ "status": "unknown" }));
    }
}
