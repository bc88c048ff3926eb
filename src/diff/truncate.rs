//! Deterministic, importance-aware truncation of a filtered diff.
//!
//! Scoring is inherently approximate, so it lives behind [`LineScorer`];
//! thresholds can be tuned without touching the surrounding pipeline.

use crate::diff::tokens::estimate_tokens;

/// Scores one diff line; higher scores survive truncation longer.
pub trait LineScorer {
    fn score(&self, line: &str) -> u32;
}

/// Default scorer: structural changes over plain ones.
///
/// Definitions > imports > config/dependency edits > control flow > other
/// change lines > context lines.
pub struct DefaultScorer;

const DEFINITION_KEYWORDS: &[&str] = &[
    "fn ", "def ", "class ", "func ", "impl ", "struct ", "trait ", "enum ", "interface ",
    "function ",
];

const IMPORT_KEYWORDS: &[&str] = &["use ", "import ", "from ", "require(", "#include"];

const CONTROL_KEYWORDS: &[&str] = &[
    "if ", "for ", "while ", "match ", "switch ", "return ", "else ", "loop ", "try ", "catch ",
];

impl LineScorer for DefaultScorer {
    fn score(&self, line: &str) -> u32 {
        let (is_change, body) = match line.as_bytes().first() {
            Some(b'+') | Some(b'-') => (true, line[1..].trim_start()),
            _ => (false, line.trim_start()),
        };

        let mut score = if is_change { 10 } else { 1 };

        if DEFINITION_KEYWORDS.iter().any(|k| body.starts_with(k))
            || body.starts_with("pub ")
            || body.starts_with("export ")
        {
            score += 40;
        } else if IMPORT_KEYWORDS.iter().any(|k| body.starts_with(k)) {
            score += 30;
        } else if is_config_edit(body) {
            score += 25;
        } else if CONTROL_KEYWORDS.iter().any(|k| body.starts_with(k)) {
            score += 20;
        }

        score
    }
}

/// Dependency/config edits: `key = "value"` or `"key": value` shapes.
fn is_config_edit(body: &str) -> bool {
    (body.contains(" = \"") || body.contains("\": ")) && body.len() < 200
}

/// Header lines that are always kept so the truncated diff stays readable.
fn is_structural(line: &str) -> bool {
    line.starts_with("diff --git ")
        || line.starts_with("index ")
        || line.starts_with("--- ")
        || line.starts_with("+++ ")
        || line.starts_with("@@")
        || line.starts_with("new file mode")
        || line.starts_with("deleted file mode")
        || line.starts_with("rename from")
        || line.starts_with("rename to")
}

/// Truncate `diff` to roughly `token_limit` tokens.
///
/// Structural header lines are always kept. Remaining lines are ranked by
/// `(score descending, original index ascending)` and taken greedily until
/// the budget is spent, then emitted in original order followed by one
/// marker naming how many lines were hidden. No randomness and no clock:
/// identical input always yields identical output.
pub fn truncate_to_budget(diff: &str, token_limit: usize, scorer: &dyn LineScorer) -> String {
    let lines: Vec<&str> = diff.lines().collect();

    let mut keep = vec![false; lines.len()];
    let mut budget = token_limit as i64;

    for (idx, line) in lines.iter().enumerate() {
        if is_structural(line) {
            keep[idx] = true;
            budget -= line_tokens(line) as i64;
        }
    }

    let mut ranked: Vec<(u32, usize)> = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| !keep[*idx])
        .map(|(idx, line)| (scorer.score(line), idx))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    for (_, idx) in ranked {
        let cost = line_tokens(lines[idx]) as i64;
        if cost <= budget {
            keep[idx] = true;
            budget -= cost;
        }
    }

    let hidden = keep.iter().filter(|k| !**k).count();
    if hidden == 0 {
        return diff.to_string();
    }

    let mut out = String::with_capacity(diff.len());
    for (idx, line) in lines.iter().enumerate() {
        if keep[idx] {
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "... {hidden} lines hidden to fit the token budget (run 'git diff --staged' to see the full diff) ...\n"
    ));

    out
}

fn line_tokens(line: &str) -> usize {
    // +1 for the newline
    estimate_tokens(line) + 1
}
