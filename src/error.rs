//! Error types for grammar construction and configuration loading.
//!
//! Only registration-time failures are errors. Dispatch and completion
//! outcomes are ordinary values carried by [`crate::tree::PathSearch`].

use thiserror::Error;

/// Errors raised while building, validating or loading command grammars.
///
/// Every variant is fatal for the command being registered: a command whose
/// grammar fails to build never becomes dispatchable.
#[derive(Error, Debug)]
pub enum GrammarError {
    /// Two or more sibling parameters cannot be told apart when matching a token.
    #[error(
        "ambiguous grammar in command '{command}': parameter '{parameter}' has indistinguishable children [{}]",
        siblings.join(", ")
    )]
    Ambiguous {
        command: String,
        parameter: String,
        siblings: Vec<String>,
    },

    /// A greedy parameter appears somewhere other than the last position.
    #[error("greedy parameter '{parameter}' in command '{command}' must be the last parameter")]
    GreedyNotLast { command: String, parameter: String },

    /// A default usage declared a non-literal parameter.
    #[error("default usage of command '{command}' may only contain literals, found '{parameter}'")]
    InvalidDefaultUsage { command: String, parameter: String },

    /// A command name or alias is already taken in the registry.
    #[error("command '{name}' is already registered")]
    DuplicateCommand { name: String },

    /// A grammar declaration referenced something the engine cannot build.
    #[error("invalid declaration in command '{command}': {reason}")]
    InvalidDeclaration { command: String, reason: String },

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GrammarError {
    /// The command this error belongs to, when it is tied to one.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Ambiguous { command, .. }
            | Self::GreedyNotLast { command, .. }
            | Self::InvalidDefaultUsage { command, .. }
            | Self::InvalidDeclaration { command, .. } => Some(command),
            Self::DuplicateCommand { name } => Some(name),
            Self::Config(_) | Self::Io(_) => None,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GrammarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_message_lists_siblings() {
        let err = GrammarError::Ambiguous {
            command: "give".into(),
            parameter: "target".into(),
            siblings: vec!["<item>".into(), "<kit>".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("give"), "{msg}");
        assert!(msg.contains("<item>, <kit>"), "{msg}");
        assert_eq!(err.command(), Some("give"));
    }

    #[test]
    fn greedy_message_names_parameter() {
        let err = GrammarError::GreedyNotLast {
            command: "msg".into(),
            parameter: "text".into(),
        };
        assert!(err.to_string().contains("'text'"));
    }
}
