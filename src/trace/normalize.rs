//! Line-level fixups applied before block parsing.
//!
//! Two classes of profiler output would otherwise explode trace-key
//! cardinality: locations inside `eval()`'d code carry a dynamic suffix per
//! call site, and anonymous-function markers embed contextual text that
//! differs between otherwise identical closures. Both rewrites are pure
//! string transforms.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Substring marking an evaluated-code location.
const EVAL_MARKER: &str = " : eval()'d code:";

/// Substituted for the whole line when the eval marker is present but the
/// surrounding text does not have the expected shape.
const EVAL_FAILURE_SENTINEL: &str = "eval() code replacement failure";

fn eval_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d+)\) : eval\(\)'d code:.*$").expect("eval pattern"))
}

fn closure_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{closure([^}]*)\}:\d+").expect("closure pattern"))
}

/// Normalizes one raw input line: trims surrounding whitespace, collapses
/// eval-block locations, and stabilizes closure markers.
pub fn normalize_line(raw: &str) -> String {
    let line = collapse_eval(raw.trim());
    stabilize_closures(&line)
}

/// Replaces the dynamic `(<line>) : eval()'d code:...` suffix with a stable
/// `:<line>`, so all samples evaluated from the same call site fold together.
fn collapse_eval(line: &str) -> String {
    if !line.contains(EVAL_MARKER) {
        return line.to_string();
    }

    if eval_re().is_match(line) {
        eval_re().replace(line, ":$1").into_owned()
    } else {
        EVAL_FAILURE_SENTINEL.to_string()
    }
}

/// Rewrites `{closure <context>}:<line>` markers (body containing
/// whitespace, i.e. extra contextual text) into `{closure:<hex>} <closure>`
/// where the hex digest is a deterministic hash of the full marker.
/// Identical closures from different captures fold to the same key; bare
/// `{closure}` markers are left untouched.
fn stabilize_closures(line: &str) -> String {
    if !line.contains("{closure") {
        return line.to_string();
    }

    closure_re()
        .replace_all(line, |caps: &Captures<'_>| {
            let marker = &caps[0];
            let body = &caps[1];
            if body.contains(char::is_whitespace) {
                format!("{{closure:{:x}}} <closure>", hash64(marker))
            } else {
                marker.to_string()
            }
        })
        .into_owned()
}

fn hash64(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_only_trimmed() {
        assert_eq!(normalize_line("  0 usleep <internal>:-1  "), "0 usleep <internal>:-1");
    }

    #[test]
    fn test_eval_suffix_collapsed_to_line_number() {
        let line = "1 foo /app/lib/runner.php(77) : eval()'d code:3";
        assert_eq!(normalize_line(line), "1 foo /app/lib/runner.php:77");
    }

    #[test]
    fn test_eval_marker_without_expected_shape_becomes_sentinel() {
        let line = "1 foo /app/lib/runner.php : eval()'d code:3";
        assert_eq!(normalize_line(line), EVAL_FAILURE_SENTINEL);
    }

    #[test]
    fn test_closure_with_context_is_hashed() {
        let line = "2 {closure /app/src/Worker.php(10) extra}:42 /app/src/Worker.php:42";
        let normalized = normalize_line(line);
        assert!(normalized.starts_with("2 {closure:"));
        assert!(normalized.contains("} <closure>"));
        assert!(!normalized.contains("Worker.php(10)"));
    }

    #[test]
    fn test_identical_closures_hash_identically() {
        let a = normalize_line("2 {closure /app/a.php(1) ctx}:7 loc:7");
        let b = normalize_line("2 {closure /app/a.php(1) ctx}:7 loc:7");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_closures_hash_differently() {
        let a = normalize_line("2 {closure /app/a.php(1) ctx}:7 loc:7");
        let b = normalize_line("2 {closure /app/b.php(9) ctx}:7 loc:7");
        assert_ne!(a, b);
    }

    #[test]
    fn test_bare_closure_marker_untouched() {
        let line = "3 {closure}:12 /app/x.php:12";
        assert_eq!(normalize_line(line), line);
    }
}
