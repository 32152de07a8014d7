//! Ordered, configurable transforms over `(tags, trace)` pairs.
//!
//! Plugins are selected by name from a static registry and applied strictly
//! in configured order. Returning an empty trace drops the sample block;
//! that is the supported "skip this sample" signal, not an error.

mod clear_empty_tags;
mod skip_blocking_traces;

pub use clear_empty_tags::ClearEmptyTags;
pub use skip_blocking_traces::SkipBlockingTraces;

use anyhow::{bail, Result};

use crate::trace::{Tags, Trace};

/// One stage of the sample transform chain.
pub trait Plugin: Send + Sync + std::fmt::Debug {
    /// Registry name, also used in diagnostics.
    fn name(&self) -> &'static str;

    /// Transforms a sample. An empty returned trace excludes the sample
    /// from aggregation.
    fn process(&self, tags: Tags, trace: Trace) -> (Tags, Trace);
}

/// Builds the plugin chain from configured names, preserving order.
pub fn build_chain(names: &[String]) -> Result<Vec<Box<dyn Plugin>>> {
    names.iter().map(|name| build(name)).collect()
}

fn build(name: &str) -> Result<Box<dyn Plugin>> {
    match name {
        "clear-empty-tags" => Ok(Box::new(ClearEmptyTags)),
        "skip-blocking-traces" => Ok(Box::new(SkipBlockingTraces::default())),
        other => bail!("unknown plugin: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_chain_preserves_order() {
        let names = vec![
            "skip-blocking-traces".to_string(),
            "clear-empty-tags".to_string(),
        ];
        let chain = build_chain(&names).expect("known plugins");
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name(), "skip-blocking-traces");
        assert_eq!(chain[1].name(), "clear-empty-tags");
    }

    #[test]
    fn test_unknown_plugin_is_rejected() {
        let names = vec!["does-not-exist".to_string()];
        let err = build_chain(&names).expect_err("unknown plugin");
        assert!(err.to_string().contains("does-not-exist"));
    }
}
