//! Grammar model: parameter descriptors, usages and flag handling.
//!
//! These types are produced by a registration layer (configuration or code)
//! and consumed by the [`tree`](crate::tree) when it builds a command's
//! matching tree.

/// Alias → flag lookup shared by dispatch and completion.
pub mod flags;
/// Parameter descriptors, value-type identities and priorities.
pub mod parameter;
/// Subset-then-permute expansion of optional flag runs.
pub mod permute;
/// Ordered parameter lists bound to a handler.
pub mod usage;

pub use flags::FlagRegistry;
pub use parameter::{FlagSpec, ParamKind, Parameter, Priority, ValueType};
pub use usage::Usage;
