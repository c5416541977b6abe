//! Per-command flag lookup: alias → flag descriptor.

use std::collections::HashMap;
use std::sync::Arc;

use super::parameter::Parameter;
use super::usage::Usage;
use crate::parse;

/// Alias cache built once per command from its declared usages.
///
/// Keys are lowercase aliases without the leading dashes, so `-S`, `-s` and
/// `--s` all resolve to the same flag.
#[derive(Debug, Default, Clone)]
pub struct FlagRegistry {
    by_alias: HashMap<String, Arc<Parameter>>,
    flags: Vec<Arc<Parameter>>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every flag declared by `usages`.
    pub fn from_usages<'a, I>(usages: I) -> Self
    where
        I: IntoIterator<Item = &'a Usage>,
    {
        let mut registry = Self::new();
        for usage in usages {
            for flag in usage.flags() {
                registry.register(flag);
            }
        }
        registry
    }

    /// Register a flag under its name and aliases. The first flag to claim an
    /// alias keeps it.
    pub fn register(&mut self, flag: &Arc<Parameter>) {
        if !flag.is_flag() {
            return;
        }
        if !self.flags.iter().any(|f| f.same_slot(flag)) {
            self.flags.push(Arc::clone(flag));
        }
        for name in flag.names() {
            let key = name.to_ascii_lowercase();
            match self.by_alias.get(&key) {
                Some(existing) if !existing.same_slot(flag) => {
                    log::warn!(
                        "flag alias '{key}' of '{}' already belongs to '{}'",
                        flag.name(),
                        existing.name()
                    );
                }
                Some(_) => {}
                None => {
                    self.by_alias.insert(key, Arc::clone(flag));
                }
            }
        }
    }

    /// Resolve a raw input token such as `-s` or `--silent`.
    pub fn lookup(&self, token: &str) -> Option<&Arc<Parameter>> {
        let alias = parse::flag_alias(token)?;
        self.by_alias.get(&alias.to_ascii_lowercase())
    }

    /// Distinct flags in registration order.
    pub fn flags(&self) -> &[Arc<Parameter>] {
        &self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Tokens consumed by a flag parameter.
pub fn flag_span(flag: &Parameter) -> usize {
    match flag.flag() {
        Some(spec) if !spec.switch => 2,
        _ => 1,
    }
}
