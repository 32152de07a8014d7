//! The immutable dispatch unit handed from the window controller to the
//! send workers.

use std::collections::HashMap;

use crate::trace::Tags;

/// One finalized, tagged batch of metrics for a closed window. Created only
/// at flush, never mutated afterwards; ownership passes to the dispatch
/// queue and the sample is consumed exactly once by the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Window open timestamp (unix seconds).
    pub from_ts: u64,
    /// Flush timestamp (unix seconds).
    pub to_ts: u64,
    /// Metric value per folded trace key.
    pub samples: HashMap<String, u64>,
    /// Canonical tag set identifying this bucket.
    pub tags: Tags,
}
