//! Usages: an ordered parameter list bound to a handler.

use std::fmt;
use std::sync::Arc;

use super::parameter::Parameter;

/// One way of invoking a command.
///
/// Two usages are equal when their parameter lists are structurally equal and
/// they agree on being a default usage; the handler name does not take part.
#[derive(Debug, Clone)]
pub struct Usage {
    params: Vec<Arc<Parameter>>,
    handler: String,
    permission: Option<String>,
    description: Option<String>,
    default: bool,
}

impl Usage {
    /// A usage dispatched to `handler`.
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            params: Vec::new(),
            handler: handler.into(),
            permission: None,
            description: None,
            default: false,
        }
    }

    /// The fallback usage of a command (no parameters) or of a subcommand
    /// (its literal path only).
    pub fn default_usage(handler: impl Into<String>) -> Self {
        Self {
            default: true,
            ..Self::new(handler)
        }
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(Arc::new(param));
        self
    }

    pub fn params<I: IntoIterator<Item = Parameter>>(mut self, params: I) -> Self {
        self.params.extend(params.into_iter().map(Arc::new));
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.params
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Number of parameters that are not flags.
    pub fn positional_len(&self) -> usize {
        self.params.iter().filter(|p| !p.is_flag()).count()
    }

    /// Iterate the flags this usage declares.
    pub fn flags(&self) -> impl Iterator<Item = &Arc<Parameter>> {
        self.params.iter().filter(|p| p.is_flag())
    }

    /// Render as `command a <b> [c]`.
    pub fn format(&self, command: &str) -> String {
        let mut out = String::from(command);
        for p in &self.params {
            out.push(' ');
            out.push_str(&p.format());
        }
        out
    }
}

impl PartialEq for Usage {
    fn eq(&self, other: &Self) -> bool {
        self.default == other.default
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.as_ref() == b.as_ref())
    }
}

impl Eq for Usage {}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.params.iter().map(|p| p.format()).collect();
        f.write_str(&rendered.join(" "))
    }
}
