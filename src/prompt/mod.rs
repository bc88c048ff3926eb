//! Prompt construction for commit message generation.

pub mod clean;

pub use clean::{CONVENTIONAL_PREFIXES, clean_message};

/// Tags used to delimit repository context inside the user prompt.
///
/// `clean_message` strips these if a backend echoes them back.
pub const STATUS_OPEN: &str = "<status>";
pub const STATUS_CLOSE: &str = "</status>";
pub const DIFF_OPEN: &str = "<diff>";
pub const DIFF_CLOSE: &str = "</diff>";
pub const DIFF_STAT_OPEN: &str = "<diff-stat>";
pub const DIFF_STAT_CLOSE: &str = "</diff-stat>";

/// Formatting options for the composed prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    /// Single summary line only, no bullet points.
    pub one_liner: bool,
    /// Require a conventional-commit prefix from the fixed vocabulary.
    pub conventional: bool,
    /// Free-text user context, appended verbatim when non-empty.
    pub hint: String,
}

/// Build the system and user prompts for one generation call.
pub fn build_prompts(
    status: &str,
    diff: &str,
    diff_stat: &str,
    options: &PromptOptions,
) -> (String, String) {
    (build_system_prompt(options), build_user_prompt(status, diff, diff_stat, options))
}

fn build_system_prompt(options: &PromptOptions) -> String {
    let mut rules: Vec<String> = vec![
        "You are an expert software engineer writing a git commit message for the staged changes shown by the user.".into(),
        "Output ONLY the commit message text. No preamble, no explanation, no code fences.".into(),
    ];

    if options.one_liner {
        rules.push(
            "Write a single line of 50-72 characters. No bullet points, no body. \
             A conventional-commit prefix is permitted."
                .into(),
        );
    } else {
        rules.push(
            "Write a summary line of 50-72 characters, then a blank line, then bullet points \
             ordered from most to least important change."
                .into(),
        );
    }

    if options.conventional {
        rules.push(format!(
            "The summary line MUST start with one of these prefixes followed by a colon: {}. \
             Use 'chore' if the category cannot be determined.",
            CONVENTIONAL_PREFIXES.join(", ")
        ));
    }

    rules.push("Use the imperative mood. Describe what the change does, not what you did.".into());

    if !options.hint.trim().is_empty() {
        rules.push(format!("Additional context from the user: {}", options.hint.trim()));
    }

    rules.join("\n")
}

fn build_user_prompt(status: &str, diff: &str, diff_stat: &str, _options: &PromptOptions) -> String {
    format!(
        "Here are the staged changes.\n\n\
         {STATUS_OPEN}\n{status}\n{STATUS_CLOSE}\n\n\
         {DIFF_STAT_OPEN}\n{diff_stat}\n{DIFF_STAT_CLOSE}\n\n\
         {DIFF_OPEN}\n{diff}\n{DIFF_CLOSE}\n\n\
         Write the commit message now."
    )
}
