//! Types produced by the tokenizer and consumed by the completion layer.

/// A partial input line prepared for completion.
///
/// `tokens[target]` is the token being completed; it is empty when the user
/// has just typed a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionInput {
    pub tokens: Vec<String>,
    pub target: usize,
}

impl CompletionInput {
    /// The partial text of the token being completed.
    pub fn prefix(&self) -> &str {
        self.tokens.get(self.target).map(String::as_str).unwrap_or("")
    }
}
