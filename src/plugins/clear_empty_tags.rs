use super::Plugin;
use crate::trace::{Tags, Trace};

/// Drops tags whose trimmed value is empty or the `-` placeholder emitted
/// by profilers for unset request metadata.
#[derive(Debug)]
pub struct ClearEmptyTags;

impl Plugin for ClearEmptyTags {
    fn name(&self) -> &'static str {
        "clear-empty-tags"
    }

    fn process(&self, mut tags: Tags, trace: Trace) -> (Tags, Trace) {
        tags.retain(|_, value| {
            let value = value.trim();
            !value.is_empty() && value != "-"
        });
        (tags, trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_and_placeholder_values_removed() {
        let input = tags(&[
            ("host", "server1"),
            ("request", "-"),
            ("uri", ""),
            ("role", "   "),
        ]);
        let (out, _) = ClearEmptyTags.process(input, Vec::new());
        assert_eq!(out, tags(&[("host", "server1")]));
    }

    #[test]
    fn test_populated_values_kept() {
        let input = tags(&[("host", "server1"), ("role", "cli")]);
        let (out, _) = ClearEmptyTags.process(input.clone(), Vec::new());
        assert_eq!(out, input);
    }
}
