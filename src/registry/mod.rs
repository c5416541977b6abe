//! Line-level entry points across every registered command.

pub mod command;

pub use command::Command;

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use log::debug;

use crate::capability::Capabilities;
use crate::config::{CommandDecl, Config};
use crate::error::{GrammarError, Result};
use crate::parse;
use crate::tree::{PathSearch, Status, TreeSettings};

/// Result of dispatching a full input line.
#[derive(Debug)]
pub enum Dispatch<'r, S> {
    /// The line was empty.
    Empty,
    /// The first word names no registered command.
    UnknownCommand { name: String },
    /// The command was found and its tree searched.
    Matched {
        command: &'r Command<S>,
        search: PathSearch<'r, S>,
    },
}

impl<'r, S> Dispatch<'r, S> {
    pub fn status(&self) -> Status {
        match self {
            Dispatch::Empty | Dispatch::UnknownCommand { .. } => Status::Unknown,
            Dispatch::Matched { search, .. } => search.status(),
        }
    }

    pub fn command(&self) -> Option<&'r Command<S>> {
        match self {
            Dispatch::Matched { command, .. } => Some(*command),
            _ => None,
        }
    }

    pub fn search(&self) -> Option<&PathSearch<'r, S>> {
        match self {
            Dispatch::Matched { search, .. } => Some(search),
            _ => None,
        }
    }
}

/// Registry of all commands, keyed by lowercase name and alias.
pub struct CommandRegistry<S> {
    commands: Vec<Arc<Command<S>>>,
    by_name: HashMap<String, usize>,
    caps: Capabilities<S>,
    settings: TreeSettings,
}

impl<S> CommandRegistry<S> {
    pub fn new(caps: Capabilities<S>, settings: TreeSettings) -> Self {
        Self {
            commands: Vec::new(),
            by_name: HashMap::new(),
            caps,
            settings,
        }
    }

    /// Build the registry from configuration. The first command that fails
    /// to build aborts the whole load.
    pub fn from_config(config: &Config, caps: Capabilities<S>) -> Result<Self> {
        let mut registry = Self::new(caps, config.settings.tree_settings());
        for decl in &config.commands {
            registry.declare(decl)?;
        }
        debug!("registry: {} commands loaded", registry.commands.len());
        Ok(registry)
    }

    /// Build a declared command with this registry's capabilities and settings.
    pub fn declare(&mut self, decl: &CommandDecl) -> Result<Arc<Command<S>>> {
        let command = Command::from_decl(decl, self.caps.clone(), self.settings.clone())?;
        self.register(command)
    }

    /// Add a built command. Fails if its name or an alias is taken.
    pub fn register(&mut self, command: Command<S>) -> Result<Arc<Command<S>>> {
        let keys: Vec<String> = command.names().map(str::to_lowercase).collect();
        if let Some(taken) = keys.iter().find(|k| self.by_name.contains_key(*k)) {
            return Err(GrammarError::DuplicateCommand { name: taken.clone() });
        }
        let index = self.commands.len();
        for key in keys {
            self.by_name.insert(key, index);
        }
        let command = Arc::new(command);
        debug!(
            "registry: registered '{}' ({} nodes)",
            command.name(),
            command.tree().size()
        );
        self.commands.push(Arc::clone(&command));
        Ok(command)
    }

    /// Look up a command by name or alias (case-insensitive, leading `/` ignored).
    pub fn get(&self, name: &str) -> Option<&Arc<Command<S>>> {
        let name = name.strip_prefix('/').unwrap_or(name);
        self.by_name
            .get(&name.to_lowercase())
            .map(|&i| &self.commands[i])
    }

    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command<S>>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Tokenize `line`, resolve its first word to a command and dispatch the rest.
    pub fn dispatch(&self, source: &S, line: &str) -> Dispatch<'_, S> {
        let tokens = parse::tokenize(line);
        let Some(first) = tokens.first() else {
            return Dispatch::Empty;
        };
        let Some(command) = self.get(first) else {
            return Dispatch::UnknownCommand {
                name: parse::command_name(line),
            };
        };
        let search = command.tree().dispatch(source, &tokens[1..]);
        Dispatch::Matched { command, search }
    }
}

impl<S> CommandRegistry<S>
where
    S: Clone + Eq + Hash,
{
    /// Completion candidates for the last token of `line`.
    ///
    /// The first word completes to command names and aliases the source may
    /// use; later words are completed by the command's tree.
    pub fn complete(&self, source: &S, line: &str) -> Vec<String> {
        let input = parse::split_for_completion(line);
        let prefix = input.prefix();
        if input.target == 0 {
            let needle = prefix.strip_prefix('/').unwrap_or(prefix).to_lowercase();
            let mut seen = HashSet::new();
            return self
                .commands
                .iter()
                .filter(|c| c.permits(source))
                .flat_map(|c| c.names())
                .filter(|n| n.to_lowercase().starts_with(&needle))
                .filter(|n| seen.insert(n.to_lowercase()))
                .map(String::from)
                .collect();
        }
        let Some(command) = self.get(&input.tokens[0]) else {
            return Vec::new();
        };
        command
            .tree()
            .complete(source, &input.tokens[1..], input.target - 1, prefix)
    }
}

impl<S> std::fmt::Debug for CommandRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::FnPermissions;

    fn registry() -> CommandRegistry<()> {
        CommandRegistry::from_config(&Config::default_config(), Capabilities::builtin()).unwrap()
    }

    #[test]
    fn default_config_registers_every_command() {
        let r = registry();
        assert_eq!(r.len(), Config::default_config().commands.len());
        assert!(r.get("kit").is_some());
        assert!(r.get("/KITS").is_some());
        assert!(r.get("nope").is_none());
    }

    #[test]
    fn duplicate_alias_is_rejected() {
        let mut r = registry();
        let decl = CommandDecl {
            name: "whisper".into(),
            aliases: vec![],
            permission: None,
            description: None,
            usages: vec![],
        };
        let err = r.declare(&decl).unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateCommand { name } if name == "whisper"));
    }

    #[test]
    fn dispatch_resolves_aliases() {
        let r = registry();
        let outcome = r.dispatch(&(), "/tell steve hello there");
        assert_eq!(outcome.status(), Status::Complete);
        assert_eq!(outcome.command().map(|c| c.name()), Some("msg"));
    }

    #[test]
    fn dispatch_unknown_and_empty() {
        let r = registry();
        assert!(matches!(r.dispatch(&(), ""), Dispatch::Empty));
        match r.dispatch(&(), "/fly high") {
            Dispatch::UnknownCommand { name } => assert_eq!(name, "fly"),
            other => panic!("unexpected outcome: {:?}", other.status()),
        }
    }

    #[test]
    fn complete_command_names() {
        let r = registry();
        assert_eq!(r.complete(&(), "k"), vec!["kit", "kits"]);
        assert_eq!(r.complete(&(), "/t"), vec!["tell", "tp", "teleport"]);
    }

    #[test]
    fn complete_hides_forbidden_commands() {
        let caps = Capabilities::builtin().with_permissions(FnPermissions(|_: &(), p: &str| p != "server.ban"));
        let r = CommandRegistry::from_config(&Config::default_config(), caps).unwrap();
        assert!(r.complete(&(), "b").is_empty());
        assert_eq!(r.dispatch(&(), "ban steve").status(), Status::Pause);
    }

    #[test]
    fn complete_delegates_to_tree() {
        let r = registry();
        assert_eq!(r.complete(&(), "kit g"), vec!["give", "g"]);
        assert_eq!(r.complete(&(), "kit give p"), vec!["pvp"]);
    }
}
