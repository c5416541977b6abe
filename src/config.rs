use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GrammarError, Result};
use crate::grammar::{Parameter, Priority, Usage, ValueType};
use crate::tree::TreeSettings;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub commands: Vec<CommandDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub overlapping_suggestions: bool,
    #[serde(default)]
    pub auto_permissions: bool,
    #[serde(default = "default_delimiter")]
    pub permission_delimiter: String,
    #[serde(default = "default_ttl_secs")]
    pub suggestion_ttl_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Dispatch log path. `~` and `$VARS` are expanded; empty disables it.
    #[serde(default)]
    pub log_file: String,
}

fn default_delimiter() -> String {
    ".".into()
}

fn default_ttl_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict: false,
            overlapping_suggestions: false,
            auto_permissions: false,
            permission_delimiter: default_delimiter(),
            suggestion_ttl_secs: default_ttl_secs(),
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl Settings {
    /// The subset of settings a command tree is sealed with.
    pub fn tree_settings(&self) -> TreeSettings {
        TreeSettings {
            strict: self.strict,
            overlapping_suggestions: self.overlapping_suggestions,
            auto_permissions: self.auto_permissions,
            permission_delimiter: self.permission_delimiter.clone(),
            suggestion_ttl: Duration::from_secs(self.suggestion_ttl_secs),
        }
    }
}

/// One command as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandDecl {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub permission: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub usages: Vec<UsageDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UsageDecl {
    pub handler: String,
    pub permission: Option<String>,
    pub description: Option<String>,
    /// Fallback usage: literals only.
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKindDecl {
    Literal,
    Required,
    Optional,
    /// Flag followed by a value of `type`.
    Flag,
    /// Flag without a value.
    Switch,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ParamKindDecl,
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub greedy: bool,
    pub priority: Option<i32>,
    pub permission: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub ignore_completion_permission: bool,
}

impl ParamDecl {
    /// Build the parameter descriptor. `command` names the owning command in errors.
    pub fn to_parameter(&self, command: &str) -> Result<Parameter> {
        let invalid = |reason: String| GrammarError::InvalidDeclaration {
            command: command.to_string(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("parameter with an empty name".into()));
        }
        let value_type = || {
            self.value_type
                .as_deref()
                .map(ValueType::from_name)
                .unwrap_or(ValueType::STRING)
        };
        let structural = matches!(
            self.kind,
            ParamKindDecl::Literal | ParamKindDecl::Switch | ParamKindDecl::Flag
        );
        if self.greedy && structural {
            return Err(invalid(format!("'{}' cannot be greedy", self.name)));
        }
        if self.value_type.is_some() && matches!(self.kind, ParamKindDecl::Literal | ParamKindDecl::Switch) {
            return Err(invalid(format!("'{}' cannot declare a type", self.name)));
        }

        let mut param = match self.kind {
            ParamKindDecl::Literal => Parameter::literal(&self.name),
            ParamKindDecl::Required => Parameter::required(&self.name, value_type()),
            ParamKindDecl::Optional => Parameter::optional(&self.name, value_type()),
            ParamKindDecl::Flag => Parameter::value_flag(&self.name, value_type()),
            ParamKindDecl::Switch => Parameter::switch(&self.name),
        };
        param = param
            .with_aliases(self.aliases.iter().cloned())
            .with_suggestions(self.suggestions.iter().cloned());
        if self.greedy {
            param = param.greedy();
        }
        if let Some(level) = self.priority {
            param = param.with_priority(Priority::of(level));
        }
        if let Some(p) = &self.permission {
            param = param.with_permission(p);
        }
        if let Some(d) = &self.description {
            param = param.with_description(d);
        }
        if self.ignore_completion_permission {
            param = param.ignore_completion_permission();
        }
        Ok(param)
    }
}

impl UsageDecl {
    pub fn to_usage(&self, command: &str) -> Result<Usage> {
        let mut usage = if self.default {
            Usage::default_usage(&self.handler)
        } else {
            Usage::new(&self.handler)
        };
        for p in &self.params {
            usage = usage.param(p.to_parameter(command)?);
        }
        if let Some(p) = &self.permission {
            usage = usage.with_permission(p);
        }
        if let Some(d) = &self.description {
            usage = usage.with_description(d);
        }
        Ok(usage)
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    /// Drop every default command before adding the overlay's.
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    remove_commands: Vec<String>,
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    commands: Vec<CommandDecl>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    strict: Option<bool>,
    overlapping_suggestions: Option<bool>,
    auto_permissions: Option<bool>,
    permission_delimiter: Option<String>,
    suggestion_ttl_secs: Option<u64>,
    log_level: Option<String>,
    log_file: Option<String>,
}

// ── Merge logic ──

/// Merge user commands into the default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove by name first, then a same-named command is replaced
/// in place and new ones are appended.
fn merge_commands(base: &mut Vec<CommandDecl>, add: Vec<CommandDecl>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
        return;
    }
    base.retain(|c| !remove.iter().any(|r| r.eq_ignore_ascii_case(&c.name)));
    for decl in add {
        match base.iter_mut().find(|c| c.name.eq_ignore_ascii_case(&decl.name)) {
            Some(existing) => *existing = decl,
            None => base.push(decl),
        }
    }
}

/// Parse a user overlay. Runs before logging is set up, so a malformed file
/// is reported straight to stderr.
fn parse_overlay(content: &str) -> Option<ConfigOverlay> {
    match toml::from_str(content) {
        Ok(overlay) => Some(overlay),
        Err(e) => {
            eprintln!("cmdgrammar: config parse error: {e}");
            None
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/cmdgrammar/config.toml (if exists)
    ///
    /// A malformed user file is reported and skipped.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Defaults merged with the overlay at `path`. Unlike [`Config::load`],
    /// a missing or malformed file is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let overlay: ConfigOverlay = toml::from_str(&content)?;
        let mut config = Self::default_config();
        config.apply_overlay(overlay);
        Ok(config)
    }

    /// Try to load user overlay from ~/.config/cmdgrammar/config.toml.
    fn load_overlay() -> Option<ConfigOverlay> {
        let home = std::env::var_os("HOME")?;
        let path = Path::new(&home).join(".config/cmdgrammar/config.toml");
        let content = std::fs::read_to_string(path).ok()?;
        parse_overlay(&content)
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Settings: scalar overrides
        let s = overlay.settings;
        if let Some(v) = s.strict {
            self.settings.strict = v;
        }
        if let Some(v) = s.overlapping_suggestions {
            self.settings.overlapping_suggestions = v;
        }
        if let Some(v) = s.auto_permissions {
            self.settings.auto_permissions = v;
        }
        if let Some(v) = s.permission_delimiter {
            self.settings.permission_delimiter = v;
        }
        if let Some(v) = s.suggestion_ttl_secs {
            self.settings.suggestion_ttl_secs = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = s.log_file {
            self.settings.log_file = v;
        }

        merge_commands(
            &mut self.commands,
            overlay.commands,
            &overlay.remove_commands,
            overlay.replace,
        );
    }

    /// Look up a declared command by name (case-insensitive).
    pub fn command(&self, name: &str) -> Option<&CommandDecl> {
        self.commands.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
