//! Splitting a unified diff into per-file sections and classifying noise.

/// How a section was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Normal,
    Binary,
    Minified,
    BuildArtifact,
}

/// One file's patch block within a larger diff.
///
/// `text` holds the exact original bytes of the block, so concatenating all
/// sections of a diff reproduces the input byte-for-byte.
#[derive(Debug, Clone)]
pub struct DiffSection {
    pub path: String,
    pub text: String,
    pub classification: Classification,
}

/// File name endings that mark generated/bundled content.
const MINIFIED_EXTENSIONS: &[&str] = &[
    ".min.js",
    ".min.css",
    ".min.mjs",
    ".bundle.js",
    ".chunk.js",
    ".map",
];

/// Path fragments for vendored or build-output trees.
const BUILD_DIR_FRAGMENTS: &[&str] = &[
    "node_modules/",
    "vendor/",
    "dist/",
    "build/",
    "target/",
    ".next/",
    "__pycache__/",
    ".venv/",
];

/// Split a diff into file sections on `diff --git` boundaries.
///
/// Text before the first boundary (rare, e.g. stat headers) becomes a
/// pathless `Normal` section so that concatenation is lossless.
pub fn split_sections(diff: &str) -> Vec<DiffSection> {
    let mut boundaries: Vec<usize> = Vec::new();
    for (offset, _) in diff.match_indices("diff --git ") {
        // Only line-initial markers are file boundaries.
        if offset == 0 || diff.as_bytes()[offset - 1] == b'\n' {
            boundaries.push(offset);
        }
    }

    if boundaries.is_empty() {
        if diff.is_empty() {
            return Vec::new();
        }
        return vec![make_section(String::new(), diff.to_string())];
    }

    let mut sections = Vec::with_capacity(boundaries.len() + 1);
    if boundaries[0] > 0 {
        sections.push(make_section(String::new(), diff[..boundaries[0]].to_string()));
    }

    for (i, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).copied().unwrap_or(diff.len());
        let text = &diff[start..end];
        let path = extract_path(text);
        sections.push(make_section(path, text.to_string()));
    }

    sections
}

fn make_section(path: String, text: String) -> DiffSection {
    let classification = classify(&path, &text);
    DiffSection {
        path,
        text,
        classification,
    }
}

/// Extract the post-image path from a `diff --git a/... b/...` header line.
fn extract_path(section: &str) -> String {
    let header = section.lines().next().unwrap_or_default();
    header
        .rsplit_once(" b/")
        .map(|(_, path)| path.trim_matches('"').to_string())
        .unwrap_or_default()
}

/// Classify one section as noise or normal content.
fn classify(path: &str, text: &str) -> Classification {
    if text.contains("\nBinary files ") || text.contains("\nGIT binary patch") {
        return Classification::Binary;
    }

    if MINIFIED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Classification::Minified;
    }

    if BUILD_DIR_FRAGMENTS
        .iter()
        .any(|frag| path.starts_with(frag) || path.contains(&format!("/{frag}")))
    {
        return Classification::BuildArtifact;
    }

    if looks_minified(text) {
        return Classification::Minified;
    }

    Classification::Normal
}

/// Content heuristic for generated text that slipped past the name checks:
/// fewer than 10 lines but over 1000 characters, or more than 20% of lines
/// longer than 500 characters.
fn looks_minified(text: &str) -> bool {
    let line_count = text.lines().count();
    if line_count < 10 && text.len() > 1000 {
        return true;
    }

    if line_count == 0 {
        return false;
    }

    let long_lines = text.lines().filter(|l| l.len() > 500).count();
    long_lines * 5 > line_count
}

/// Drop noise sections and concatenate the survivors in order.
///
/// Idempotent: filtering an already-filtered diff changes nothing, since
/// surviving sections keep their exact bytes and classification.
pub fn filter_noise(diff: &str) -> String {
    split_sections(diff)
        .into_iter()
        .filter(|s| s.classification == Classification::Normal)
        .map(|s| s.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PY_SECTION: &str = "diff --git a/src/app.py b/src/app.py\n\
         index 1111111..2222222 100644\n\
         --- a/src/app.py\n\
         +++ b/src/app.py\n\
         @@ -1,2 +1,2 @@\n def main():\n-    pass\n+    run()\n";

    const MIN_JS_SECTION: &str = "diff --git a/node_modules/foo/foo.min.js b/node_modules/foo/foo.min.js\n\
         index 3333333..4444444 100644\n\
         --- a/node_modules/foo/foo.min.js\n\
         +++ b/node_modules/foo/foo.min.js\n\
         @@ -1 +1 @@\n-var a=1;\n+var a=2;\n";

    #[test]
    fn test_split_sections_concatenation_is_lossless() {
        let diff = format!("{PY_SECTION}{MIN_JS_SECTION}");
        let rejoined: String = split_sections(&diff).into_iter().map(|s| s.text).collect();
        assert_eq!(rejoined, diff);
    }

    #[test]
    fn test_split_sections_extracts_paths() {
        let diff = format!("{PY_SECTION}{MIN_JS_SECTION}");
        let sections = split_sections(&diff);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].path, "src/app.py");
        assert_eq!(sections[1].path, "node_modules/foo/foo.min.js");
    }

    #[test]
    fn test_classify_binary_marker() {
        let diff = "diff --git a/logo.png b/logo.png\n\
                    Binary files a/logo.png and b/logo.png differ\n";
        let sections = split_sections(diff);
        assert_eq!(sections[0].classification, Classification::Binary);
    }

    #[test]
    fn test_classify_vendored_path() {
        let diff = "diff --git a/vendor/lib/x.go b/vendor/lib/x.go\n\
                    --- a/vendor/lib/x.go\n+++ b/vendor/lib/x.go\n@@ -1 +1 @@\n-a\n+b\n";
        let sections = split_sections(diff);
        assert_eq!(sections[0].classification, Classification::BuildArtifact);
    }

    #[test]
    fn test_classify_minified_content_few_long_lines() {
        let long_line = "x".repeat(1500);
        let diff = format!(
            "diff --git a/gen.js b/gen.js\n--- a/gen.js\n+++ b/gen.js\n@@ -1 +1 @@\n+{long_line}\n"
        );
        let sections = split_sections(&diff);
        assert_eq!(sections[0].classification, Classification::Minified);
    }

    #[test]
    fn test_classify_minified_content_long_line_ratio() {
        // 12 lines, 3 over 500 chars → 25% > 20%
        let mut body = String::new();
        for _ in 0..3 {
            body.push('+');
            body.push_str(&"y".repeat(600));
            body.push('\n');
        }
        for i in 0..9 {
            body.push_str(&format!("+short {i}\n"));
        }
        let diff =
            format!("diff --git a/out.css b/out.css\n--- a/out.css\n+++ b/out.css\n@@ @@\n{body}");
        let sections = split_sections(&diff);
        assert_eq!(sections[0].classification, Classification::Minified);
    }

    #[test]
    fn test_filter_noise_keeps_only_normal() {
        let diff = format!("{PY_SECTION}{MIN_JS_SECTION}");
        let filtered = filter_noise(&diff);
        assert_eq!(filtered, PY_SECTION);
    }

    #[test]
    fn test_filter_noise_is_idempotent() {
        let binary = "diff --git a/b.png b/b.png\nBinary files a/b.png and b/b.png differ\n";
        let diff = format!("{PY_SECTION}{binary}{MIN_JS_SECTION}");
        let once = filter_noise(&diff);
        let twice = filter_noise(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_noise_empty_when_all_noise() {
        assert_eq!(filter_noise(MIN_JS_SECTION), "");
    }

    #[test]
    fn test_split_sections_empty_diff() {
        assert!(split_sections("").is_empty());
    }
}
