//! JSON extraction from backend responses.
//!
//! Backends asked for a structured grouping plan often wrap the JSON in
//! markdown fences or surround it with conversational text. Extraction here
//! handles nested braces and string escaping correctly rather than slicing
//! on the first `{`/last `}`.

/// Extract a JSON object from a backend response that may be wrapped in
/// markdown or prose.
///
/// Tries, in order: a ```` ```json ```` fenced block, a bare fenced block
/// whose content starts with `{`, balanced-brace extraction from the
/// surrounding text, and finally the input unchanged.
pub fn extract_json_object(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json")
        && let Some(end) = trimmed[start + 7..].find("```")
    {
        return trimmed[start + 7..start + 7 + end].trim().to_string();
    }

    if let Some(start) = trimmed.find("```")
        && let Some(end) = trimmed[start + 3..].find("```")
    {
        let inner = trimmed[start + 3..start + 3 + end].trim();
        if inner.starts_with('{') {
            return inner.to_string();
        }
    }

    if let Some(json) = first_valid_object(trimmed) {
        return json;
    }

    trimmed.to_string()
}

/// Scan every `{` in the input and return the first candidate that parses.
fn first_valid_object(text: &str) -> Option<String> {
    for (start, _) in text.match_indices('{') {
        let candidate = &text[start..];

        // serde_json tolerates trailing text only through a full parse of a
        // prefix, so try balanced extraction and validate it.
        if let Some(json) = balanced_braces(candidate)
            && serde_json::from_str::<serde_json::Value>(&json).is_ok()
        {
            return Some(json);
        }
    }

    None
}

/// Take the substring with balanced braces starting at the first `{`,
/// tracking JSON string literals so `{"msg": "a { inside"}` stays intact.
fn balanced_braces(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[..=idx].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
