//! Diff preprocessing: noise filtering and token-budget truncation.
//!
//! The raw staged diff can be arbitrarily large and full of generated
//! content (bundles, lockfiles, vendored trees) that adds no signal for a
//! commit message. The pipeline here is: split into per-file sections,
//! drop the noise, then deterministically truncate what survives to the
//! token budget.

pub mod sections;
pub mod tokens;
pub mod truncate;

pub use sections::{Classification, DiffSection, filter_noise, split_sections};
pub use tokens::estimate_tokens;
pub use truncate::{DefaultScorer, LineScorer, truncate_to_budget};

/// Preprocess a raw diff for prompt inclusion.
///
/// Filters binary/minified/vendored sections, then truncates the remainder
/// to `token_limit` tokens using the default importance scorer. The `model`
/// name is accepted for tokenizer selection but the crate deliberately ships
/// no tokenizer; the 4-chars-per-token estimate is always used.
///
/// An empty diff, or a diff whose sections are all filtered out, yields an
/// empty string rather than an error. Callers detect that and report
/// "nothing to show".
pub fn preprocess(diff: &str, token_limit: usize, model: &str) -> String {
    if diff.is_empty() {
        return String::new();
    }

    let filtered = filter_noise(diff);
    if filtered.is_empty() {
        tracing::debug!("all diff sections filtered out for model {model}");
        return String::new();
    }

    if estimate_tokens(&filtered) <= token_limit {
        return filtered;
    }

    truncate_to_budget(&filtered, token_limit, &DefaultScorer)
}
