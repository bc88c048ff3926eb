//! Token estimation for diff budgeting.
//!
//! The crate deliberately ships no tokenizer. The 4-characters-per-token
//! rule is accurate enough for budgeting (code tokenizes denser than prose,
//! so this overestimates slightly and errs toward shorter prompts).

/// Characters per token for the fallback estimate.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
