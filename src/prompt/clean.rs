//! Output cleaning for backend responses.
//!
//! Backends routinely ignore "no code fences" instructions, echo the
//! structural tags from the prompt, or skip the required prefix. Cleaning
//! guarantees the conventional-format invariant regardless.

use regex_lite::Regex;

/// The fixed conventional-commit vocabulary.
pub const CONVENTIONAL_PREFIXES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore",
];

/// Clean a raw backend response into a committable message.
///
/// Strips one leading fence (with or without a language tag) and one
/// trailing fence, removes any echoed structural tags, then prepends
/// `chore: ` when no recognized `prefix:` is present. The result always
/// satisfies the conventional-prefix invariant.
pub fn clean_message(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    text = strip_fences(&text);
    text = strip_tags(&text);
    let text = text.trim();

    if starts_with_conventional_prefix(text) {
        text.to_string()
    } else {
        format!("chore: {text}")
    }
}

/// Remove a single leading/trailing code-fence delimiter pair.
fn strip_fences(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();

    if let Some(first) = lines.first()
        && first.trim_start().starts_with("```")
    {
        lines.remove(0);
    }
    if let Some(last) = lines.last()
        && last.trim() == "```"
    {
        lines.pop();
    }

    lines.join("\n")
}

/// Remove literal structural tags used to delimit the diff/status in the
/// prompt, in case the backend echoed them.
fn strip_tags(text: &str) -> String {
    let tags = [
        super::STATUS_OPEN,
        super::STATUS_CLOSE,
        super::DIFF_OPEN,
        super::DIFF_CLOSE,
        super::DIFF_STAT_OPEN,
        super::DIFF_STAT_CLOSE,
    ];
    let mut result = text.to_string();
    for tag in tags {
        result = result.replace(tag, "");
    }
    result
}

/// Whether the message already starts with `prefix:` (scope and `!`
/// tolerated) for one of the ten recognized prefixes.
pub fn starts_with_conventional_prefix(text: &str) -> bool {
    // Known-good pattern; compile cannot fail.
    let pattern = format!(
        r"^(?:{})(?:\([^)]*\))?!?:",
        CONVENTIONAL_PREFIXES.join("|")
    );
    Regex::new(&pattern).map(|re| re.is_match(text)).unwrap_or(false)
}
