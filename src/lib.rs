//! cmdgrammar: a command grammar engine for chat-style and console commands.
//!
//! Commands are declared as a set of usages (ordered lists of literals,
//! arguments and flags). Each command's usages are merged into a prefix tree,
//! checked for ambiguity, and sealed into a [`tree::CommandTree`] that can
//! dispatch an input line to a usage or produce tab-completion candidates.
//! Typing, permissions and suggestions are supplied by the host through
//! [`capability::Capabilities`].
//!
//! # Architecture
//!
//! - **[`grammar`]**: Parameters, usages, flag specs and flag permutations.
//! - **[`tree`]**: Tree construction, ambiguity validation, dispatch and completion.
//! - **[`registry`]**: Named commands and line-level dispatch across all of them.
//! - **[`capability`]**: Host seams for type matching, permissions and suggestions.
//! - **[`cache`]**: TTL cache behind completion.
//! - **[`parse`]**: Tokenizer and completion-input splitting.
//! - **[`config`]**: Declarative grammars: embedded defaults + user overlay merge.
//! - **[`logging`]**: Stderr logging and the dispatch log file.

/// TTL cache for per-input completion state.
pub mod cache;
/// Type, permission and suggestion capabilities supplied by the host.
pub mod capability;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Registration-time errors.
pub mod error;
/// Grammar building blocks: parameters, usages and flags.
pub mod grammar;
/// Logger setup and dispatch outcome logging.
pub mod logging;
/// Input tokenizing.
pub mod parse;
/// Command registry and line-level dispatch.
pub mod registry;
/// Command trees: construction, validation, dispatch and completion.
pub mod tree;

pub use capability::Capabilities;
pub use error::{GrammarError, Result};
pub use grammar::{Parameter, Usage, ValueType};
pub use registry::{Command, CommandRegistry, Dispatch};
pub use tree::{CommandTree, PathSearch, Status, TreeBuilder, TreeSettings};

/// Build a registry from the default config with built-in capabilities.
///
/// This is the main entry point for tests and simple usage. Hosts with their
/// own permission model build the registry directly.
pub fn registry<S>() -> Result<CommandRegistry<S>> {
    let config = config::Config::default_config();
    CommandRegistry::from_config(&config, Capabilities::builtin())
}
