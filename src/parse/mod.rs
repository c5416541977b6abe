pub mod tokenize;
pub mod types;

pub use tokenize::{command_name, flag_alias, is_flag_token, split_for_completion, tokenize};
pub use types::CompletionInput;
