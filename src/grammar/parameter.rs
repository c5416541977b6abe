//! Parameter descriptors: one grammar slot of a usage.

use std::borrow::Cow;
use std::fmt;

/// Relative precedence of a parameter when several siblings could match a token.
///
/// Higher levels win. The built-in value types carry default priorities so
/// that, for example, an optional `int` and an optional `string` sitting next
/// to each other stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    pub const MINIMUM: Priority = Priority(i32::MIN);
    pub const LOW: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(20);
    pub const HIGH: Priority = Priority(100);
    pub const MAXIMUM: Priority = Priority(i32::MAX);

    pub const fn of(level: i32) -> Self {
        Priority(level)
    }

    pub const fn level(self) -> i32 {
        self.0
    }

    /// A priority `n` levels above this one (saturating).
    pub const fn plus(self, n: i32) -> Self {
        Priority(self.0.saturating_add(n))
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

/// Opaque, comparable identity of the value a parameter accepts.
///
/// The engine never converts values itself; it only compares these tokens and
/// hands them to the injected [`TypeMatcher`](crate::capability::TypeMatcher).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueType(Cow<'static, str>);

impl ValueType {
    pub const STRING: ValueType = ValueType(Cow::Borrowed("string"));
    pub const INT: ValueType = ValueType(Cow::Borrowed("int"));
    pub const LONG: ValueType = ValueType(Cow::Borrowed("long"));
    pub const FLOAT: ValueType = ValueType(Cow::Borrowed("float"));
    pub const DOUBLE: ValueType = ValueType(Cow::Borrowed("double"));
    pub const BOOLEAN: ValueType = ValueType(Cow::Borrowed("boolean"));
    /// Identity shared by all literal (command / subcommand) parameters.
    pub const LITERAL: ValueType = ValueType(Cow::Borrowed("literal"));

    /// A user-defined type, e.g. `player` or `world`.
    pub fn custom(name: impl Into<String>) -> Self {
        ValueType(Cow::Owned(name.into()))
    }

    /// Resolve a type name as written in configuration.
    /// Unknown names become custom types.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Self::STRING,
            "int" | "integer" => Self::INT,
            "long" => Self::LONG,
            "float" => Self::FLOAT,
            "double" | "number" => Self::DOUBLE,
            "bool" | "boolean" => Self::BOOLEAN,
            "literal" => Self::LITERAL,
            _ => Self::custom(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Default priority of parameters declared with this type.
    pub fn default_priority(&self) -> Priority {
        match self.name() {
            "string" => Priority::LOW,
            "int" | "boolean" => Priority::NORMAL,
            "long" => Priority::NORMAL.plus(1),
            "float" => Priority::HIGH,
            "double" => Priority::HIGH.plus(1),
            "literal" => Priority::MAXIMUM,
            _ => Priority::NORMAL,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flag-specific data: accepted aliases and whether a value follows the flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub aliases: Vec<String>,
    /// Switches take no value; value flags consume the following token.
    pub switch: bool,
    /// Declared input type of a value flag.
    pub input: Option<ValueType>,
}

/// What kind of slot a parameter is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// A command or subcommand name matched verbatim (case-insensitive).
    Literal {
        aliases: Vec<String>,
        /// List this literal in completions even without permission.
        ignore_completion_permission: bool,
    },
    /// A positional value.
    Argument,
    /// A `-name` switch or `-name <value>` flag.
    Flag(FlagSpec),
}

/// Immutable description of one grammar slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    optional: bool,
    greedy: bool,
    value_type: ValueType,
    priority: Priority,
    permission: Option<String>,
    description: Option<String>,
    suggestions: Vec<String>,
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParamKind, optional: bool, value_type: ValueType) -> Self {
        let priority = value_type.default_priority();
        Self {
            name: name.into(),
            kind,
            optional,
            greedy: false,
            value_type,
            priority,
            permission: None,
            description: None,
            suggestions: Vec::new(),
        }
    }

    /// A subcommand name.
    pub fn literal(name: impl Into<String>) -> Self {
        Self::new(
            name,
            ParamKind::Literal {
                aliases: Vec::new(),
                ignore_completion_permission: false,
            },
            false,
            ValueType::LITERAL,
        )
    }

    /// A required positional value.
    pub fn required(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, ParamKind::Argument, false, value_type)
    }

    /// An optional positional value.
    pub fn optional(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, ParamKind::Argument, true, value_type)
    }

    /// A boolean `-name` switch.
    pub fn switch(name: impl Into<String>) -> Self {
        Self::new(
            name,
            ParamKind::Flag(FlagSpec {
                aliases: Vec::new(),
                switch: true,
                input: None,
            }),
            true,
            ValueType::BOOLEAN,
        )
    }

    /// A `-name <value>` flag.
    pub fn value_flag(name: impl Into<String>, input: ValueType) -> Self {
        Self::new(
            name,
            ParamKind::Flag(FlagSpec {
                aliases: Vec::new(),
                switch: false,
                input: Some(input.clone()),
            }),
            true,
            input,
        )
    }

    /// Mark this parameter as consuming every remaining token.
    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
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

    /// Static completion candidates offered for this parameter.
    pub fn with_suggestions<I, T>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    /// Extra names for literals and flags. Ignored for plain arguments.
    pub fn with_aliases<I, T>(mut self, new_aliases: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        match &mut self.kind {
            ParamKind::Literal { aliases, .. } => aliases.extend(new_aliases.into_iter().map(Into::into)),
            ParamKind::Flag(spec) => spec.aliases.extend(new_aliases.into_iter().map(Into::into)),
            ParamKind::Argument => {}
        }
        self
    }

    /// Let completion list this literal regardless of the source's permission.
    pub fn ignore_completion_permission(mut self) -> Self {
        if let ParamKind::Literal {
            ignore_completion_permission,
            ..
        } = &mut self.kind
        {
            *ignore_completion_permission = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ParamKind::Literal { .. })
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, ParamKind::Flag(_))
    }

    pub fn flag(&self) -> Option<&FlagSpec> {
        match &self.kind {
            ParamKind::Flag(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }

    pub fn is_greedy(&self) -> bool {
        self.greedy
    }

    pub fn ignores_completion_permission(&self) -> bool {
        matches!(
            self.kind,
            ParamKind::Literal {
                ignore_completion_permission: true,
                ..
            }
        )
    }

    /// Every name a literal or flag answers to, primary name first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let aliases: &[String] = match &self.kind {
            ParamKind::Literal { aliases, .. } => aliases,
            ParamKind::Flag(spec) => &spec.aliases,
            ParamKind::Argument => &[],
        };
        std::iter::once(self.name.as_str()).chain(aliases.iter().map(String::as_str))
    }

    /// Whether `word` names this literal or flag (case-insensitive).
    pub fn answers_to(&self, word: &str) -> bool {
        self.names().any(|n| n.eq_ignore_ascii_case(word))
    }

    /// Structural identity used to share tree nodes between usages.
    pub fn same_slot(&self, other: &Parameter) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.value_type == other.value_type
            && self.is_literal() == other.is_literal()
            && self.is_flag() == other.is_flag()
    }

    /// Usage-string rendering: `name`, `<name>`, `[name]`, `[-name]`, `<name...>`.
    pub fn format(&self) -> String {
        match &self.kind {
            ParamKind::Literal { .. } => self.name.clone(),
            ParamKind::Flag(spec) if spec.switch => format!("[-{}]", self.name),
            ParamKind::Flag(spec) => {
                let input = spec.input.as_ref().unwrap_or(&self.value_type);
                format!("[-{} <{}>]", self.name, input)
            }
            ParamKind::Argument => {
                let dots = if self.greedy { "..." } else { "" };
                if self.optional {
                    format!("[{}{dots}]", self.name)
                } else {
                    format!("<{}{dots}>", self.name)
                }
            }
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_priorities_are_distinct_for_common_pairs() {
        assert!(ValueType::INT.default_priority() > ValueType::STRING.default_priority());
        assert!(ValueType::DOUBLE.default_priority() > ValueType::FLOAT.default_priority());
        assert_eq!(ValueType::custom("player").default_priority(), Priority::NORMAL);
    }

    #[test]
    fn from_name_maps_aliases() {
        assert_eq!(ValueType::from_name("Integer"), ValueType::INT);
        assert_eq!(ValueType::from_name("str"), ValueType::STRING);
        assert_eq!(ValueType::from_name("player").name(), "player");
    }

    #[test]
    fn format_shapes() {
        assert_eq!(Parameter::literal("ban").format(), "ban");
        assert_eq!(Parameter::required("target", ValueType::STRING).format(), "<target>");
        assert_eq!(Parameter::optional("reason", ValueType::STRING).format(), "[reason]");
        assert_eq!(Parameter::switch("silent").format(), "[-silent]");
        assert_eq!(
            Parameter::value_flag("time", ValueType::INT).format(),
            "[-time <int>]"
        );
        assert_eq!(
            Parameter::required("text", ValueType::STRING).greedy().format(),
            "<text...>"
        );
    }

    #[test]
    fn answers_to_aliases_case_insensitive() {
        let flag = Parameter::switch("silent").with_aliases(["s"]);
        assert!(flag.answers_to("S"));
        assert!(flag.answers_to("silent"));
        assert!(!flag.answers_to("ip"));
    }

    #[test]
    fn same_slot_ignores_case_but_not_type() {
        let a = Parameter::required("Count", ValueType::INT);
        let b = Parameter::optional("count", ValueType::INT);
        let c = Parameter::required("count", ValueType::STRING);
        assert!(a.same_slot(&b));
        assert!(!a.same_slot(&c));
    }

    #[test]
    fn priority_plus_saturates() {
        assert_eq!(Priority::MAXIMUM.plus(5), Priority::MAXIMUM);
        assert_eq!(Priority::NORMAL.plus(1).level(), 21);
    }
}
