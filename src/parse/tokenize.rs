use super::types::CompletionInput;

/// Marker that opens a flag token (`-s`, `--silent`).
pub const FLAG_MARKER: char = '-';

/// Extract the command name: the first word, without a leading `/`.
pub fn command_name(line: &str) -> String {
    let word = line.split_whitespace().next().unwrap_or("");
    word.strip_prefix('/').unwrap_or(word).to_string()
}

/// Tokenize an input line into words using shlex (POSIX word splitting).
pub fn tokenize(line: &str) -> Vec<String> {
    shlex::split(line).unwrap_or_else(|| {
        // Fallback: simple whitespace splitting if shlex can't parse
        line.split_whitespace().map(String::from).collect()
    })
}

/// Whether a token is written as a flag.
///
/// `-5` and `-0.5` are negative numbers, not flags: the character after the
/// dashes must be alphabetic.
pub fn is_flag_token(token: &str) -> bool {
    flag_alias(token).is_some()
}

/// The flag alias of a flag token: `--silent` → `silent`, `-s` → `s`.
pub fn flag_alias(token: &str) -> Option<&str> {
    let rest = token.strip_prefix(FLAG_MARKER)?;
    let rest = rest.strip_prefix(FLAG_MARKER).unwrap_or(rest);
    rest.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic())
        .then_some(rest)
}

/// Split a partial line for completion.
///
/// Trailing whitespace (or an empty line) means the user is starting a new
/// token, so an empty token is appended as the one being completed.
pub fn split_for_completion(line: &str) -> CompletionInput {
    let mut tokens = tokenize(line);
    let starts_new = line.is_empty() || line.ends_with(char::is_whitespace);
    if starts_new || tokens.is_empty() {
        tokens.push(String::new());
    }
    let target = tokens.len() - 1;
    CompletionInput { tokens, target }
}
