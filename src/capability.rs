//! Capabilities the engine consumes from its host.
//!
//! Value conversion, permission policy and suggestion sources live outside the
//! engine. It only asks three narrow questions, each behind a trait:
//!
//! - [`TypeMatcher`]: does this token fit this parameter?
//! - [`PermissionChecker`]: may this source use this permission?
//! - [`SuggestionProvider`]: what could be typed for this parameter?
//!
//! Built-in implementations cover the common cases and the tests.

use std::sync::Arc;

use crate::grammar::{ParamKind, Parameter, ValueType};

/// Decides whether a raw token can be read as a parameter's value.
pub trait TypeMatcher: Send + Sync {
    fn matches(&self, token: &str, param: &Parameter) -> bool;
}

/// Decides whether a source holds a permission.
///
/// The engine never calls this for nodes without a permission: a missing
/// permission always passes.
pub trait PermissionChecker<S>: Send + Sync {
    fn has_permission(&self, source: &S, permission: &str) -> bool;
}

/// Produces completion candidates for a parameter.
pub trait SuggestionProvider<S>: Send + Sync {
    fn suggest(&self, ctx: &SuggestionContext<'_, S>, param: &Parameter) -> Vec<String>;
}

/// What a [`SuggestionProvider`] gets to see about the completion request.
#[derive(Debug)]
pub struct SuggestionContext<'a, S> {
    pub source: &'a S,
    /// Command arguments typed so far, including the partial token.
    pub tokens: &'a [String],
    /// Index of the token being completed.
    pub target: usize,
}

impl<S> SuggestionContext<'_, S> {
    /// Partial text of the token being completed.
    pub fn prefix(&self) -> &str {
        self.tokens.get(self.target).map(String::as_str).unwrap_or("")
    }
}

/// Matcher for the built-in value types. Custom types accept any token.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTypes;

impl TypeMatcher for BuiltinTypes {
    fn matches(&self, token: &str, param: &Parameter) -> bool {
        if let ParamKind::Literal { .. } = param.kind() {
            return param.answers_to(token);
        }
        let value_type = match param.flag() {
            Some(spec) => spec.input.as_ref().unwrap_or(param.value_type()),
            None => param.value_type(),
        };
        match value_type.name() {
            "int" => token.parse::<i32>().is_ok(),
            "long" => token.parse::<i64>().is_ok(),
            "float" => token.parse::<f32>().is_ok_and(f32::is_finite),
            "double" => token.parse::<f64>().is_ok_and(f64::is_finite),
            "boolean" => token.eq_ignore_ascii_case("true") || token.eq_ignore_ascii_case("false"),
            _ => true,
        }
    }
}

/// Grants every permission.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl<S> PermissionChecker<S> for AllowAll {
    fn has_permission(&self, _source: &S, _permission: &str) -> bool {
        true
    }
}

/// Adapts a closure into a [`PermissionChecker`].
pub struct FnPermissions<F>(pub F);

impl<S, F> PermissionChecker<S> for FnPermissions<F>
where
    F: Fn(&S, &str) -> bool + Send + Sync,
{
    fn has_permission(&self, source: &S, permission: &str) -> bool {
        (self.0)(source, permission)
    }
}

/// Suggests literal names, flag names, booleans and declared candidates.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredSuggestions;

impl<S> SuggestionProvider<S> for DeclaredSuggestions {
    fn suggest(&self, _ctx: &SuggestionContext<'_, S>, param: &Parameter) -> Vec<String> {
        match param.kind() {
            ParamKind::Literal { .. } => param.names().map(String::from).collect(),
            ParamKind::Flag(_) => param.names().map(|n| format!("-{n}")).collect(),
            ParamKind::Argument if !param.suggestions().is_empty() => param.suggestions().to_vec(),
            ParamKind::Argument if *param.value_type() == ValueType::BOOLEAN => {
                vec!["true".into(), "false".into()]
            }
            ParamKind::Argument => Vec::new(),
        }
    }
}

/// The capability bundle a command tree dispatches and completes with.
pub struct Capabilities<S> {
    pub types: Arc<dyn TypeMatcher>,
    pub permissions: Arc<dyn PermissionChecker<S>>,
    pub suggestions: Arc<dyn SuggestionProvider<S>>,
}

impl<S> Capabilities<S> {
    /// Built-in types, every permission granted, declared suggestions.
    pub fn builtin() -> Self {
        Self {
            types: Arc::new(BuiltinTypes),
            permissions: Arc::new(AllowAll),
            suggestions: Arc::new(DeclaredSuggestions),
        }
    }

    pub fn with_types(mut self, types: impl TypeMatcher + 'static) -> Self {
        self.types = Arc::new(types);
        self
    }

    pub fn with_permissions(mut self, permissions: impl PermissionChecker<S> + 'static) -> Self {
        self.permissions = Arc::new(permissions);
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl SuggestionProvider<S> + 'static) -> Self {
        self.suggestions = Arc::new(suggestions);
        self
    }

    /// Permission gate: `None` always passes.
    pub fn permits(&self, source: &S, permission: Option<&str>) -> bool {
        permission.is_none_or(|p| self.permissions.has_permission(source, p))
    }
}

impl<S> Clone for Capabilities<S> {
    fn clone(&self) -> Self {
        Self {
            types: Arc::clone(&self.types),
            permissions: Arc::clone(&self.permissions),
            suggestions: Arc::clone(&self.suggestions),
        }
    }
}

impl<S> std::fmt::Debug for Capabilities<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_types_match_numbers() {
        let t = BuiltinTypes;
        let int = Parameter::required("n", ValueType::INT);
        assert!(t.matches("42", &int));
        assert!(!t.matches("4.2", &int));
        assert!(!t.matches("abc", &int));
        let double = Parameter::required("d", ValueType::DOUBLE);
        assert!(t.matches("4.2", &double));
        assert!(!t.matches("NaN", &double));
    }

    #[test]
    fn builtin_types_match_literals_by_name() {
        let lit = Parameter::literal("give").with_aliases(["g"]);
        assert!(BuiltinTypes.matches("GIVE", &lit));
        assert!(BuiltinTypes.matches("g", &lit));
        assert!(!BuiltinTypes.matches("take", &lit));
    }

    #[test]
    fn value_flag_matches_its_input_type() {
        let flag = Parameter::value_flag("time", ValueType::INT);
        assert!(BuiltinTypes.matches("10", &flag));
        assert!(!BuiltinTypes.matches("ten", &flag));
    }

    #[test]
    fn missing_permission_always_passes() {
        let caps: Capabilities<()> =
            Capabilities::builtin().with_permissions(FnPermissions(|_: &(), _: &str| false));
        assert!(caps.permits(&(), None));
        assert!(!caps.permits(&(), Some("x")));
    }

    #[test]
    fn declared_suggestions_for_flags_and_booleans() {
        let tokens = vec![String::new()];
        let ctx = SuggestionContext {
            source: &(),
            tokens: &tokens,
            target: 0,
        };
        let flag = Parameter::switch("silent").with_aliases(["s"]);
        assert_eq!(DeclaredSuggestions.suggest(&ctx, &flag), vec!["-silent", "-s"]);
        let b = Parameter::optional("confirm", ValueType::BOOLEAN);
        assert_eq!(DeclaredSuggestions.suggest(&ctx, &b), vec!["true", "false"]);
    }
}
