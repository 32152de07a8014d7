//! Data model for one profiler sample block: frames, traces, and tags.

pub mod key;
pub mod normalize;
pub mod parse;

use std::collections::BTreeMap;

/// Tag name carrying the sampled memory magnitude. Its line uses the
/// `# mem <value> <peak>` shape; the peak column is discarded on input.
pub const MEMORY_TAG: &str = "mem";

/// Tag name carrying the capture timestamp. Excluded at extraction time so
/// that per-capture noise never splits aggregation buckets.
pub const TIMESTAMP_TAG: &str = "ts";

/// One call-stack entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Function or method identifier.
    pub point: String,
    /// Source position, `"file:line"` or a sentinel such as `"<internal>:-1"`.
    pub location: String,
}

/// Ordered frames of one sample block. Index 0 is the innermost (leaf)
/// frame; the last entry is the call root.
pub type Trace = Vec<Frame>;

/// Tag annotations for one sample block. An ordered map, so two tag sets
/// with identical pairs compare equal regardless of the order the profiler
/// emitted them, and the map itself serves as the canonical grouping key.
pub type Tags = BTreeMap<String, String>;
