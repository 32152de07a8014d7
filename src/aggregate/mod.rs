//! Windowed accumulation of folded traces, keyed by canonical tag set and
//! trace key.
//!
//! Two variants share one contract behind enum dispatch: `Count` tallies
//! occurrences for CPU-time accounting; `MemoryAverage` collects memory
//! magnitudes and reduces each series to its integer mean at flush.

use std::collections::HashMap;

use crate::config::MetricKind;
use crate::trace::{Tags, MEMORY_TAG};

/// Materialized window contents: per tag set, the metric value for each
/// trace key.
pub type GroupedTraces = HashMap<Tags, HashMap<String, u64>>;

pub enum Aggregator {
    Count(CountAggregator),
    MemoryAverage(MemoryAverageAggregator),
}

impl Aggregator {
    pub fn for_metric(metric: MetricKind) -> Self {
        match metric {
            MetricKind::Cpu => Self::Count(CountAggregator::default()),
            MetricKind::Memory => Self::MemoryAverage(MemoryAverageAggregator::default()),
        }
    }

    /// Accumulates one folded trace under its canonical tag set.
    pub fn add_trace(&mut self, tags: Tags, key: &str) {
        match self {
            Self::Count(agg) => agg.add_trace(tags, key),
            Self::MemoryAverage(agg) => agg.add_trace(tags, key),
        }
    }

    /// Number of distinct `(tag set, trace key)` pairs in the open window.
    /// This is the cardinality signal for the size-based flush trigger.
    pub fn count_grouped_traces(&self) -> usize {
        match self {
            Self::Count(agg) => bucket_cardinality(&agg.buckets),
            Self::MemoryAverage(agg) => bucket_cardinality(&agg.buckets),
        }
    }

    /// Materializes final metric values for every bucket.
    pub fn grouped_traces(&self) -> GroupedTraces {
        match self {
            Self::Count(agg) => agg.buckets.clone(),
            Self::MemoryAverage(agg) => agg.grouped_traces(),
        }
    }

    /// Resets to empty. Called by the window controller at flush.
    pub fn clear(&mut self) {
        match self {
            Self::Count(agg) => agg.buckets.clear(),
            Self::MemoryAverage(agg) => agg.buckets.clear(),
        }
    }
}

fn bucket_cardinality<V>(buckets: &HashMap<Tags, HashMap<String, V>>) -> usize {
    buckets.values().map(HashMap::len).sum()
}

/// Occurrence counting. The memory tag, when present, is payload for the
/// other variant and is stripped from the grouping key here.
#[derive(Default)]
pub struct CountAggregator {
    buckets: HashMap<Tags, HashMap<String, u64>>,
}

impl CountAggregator {
    fn add_trace(&mut self, mut tags: Tags, key: &str) {
        tags.remove(MEMORY_TAG);
        *self
            .buckets
            .entry(tags)
            .or_default()
            .entry(key.to_string())
            .or_insert(0) += 1;
    }
}

/// Memory magnitude averaging. Samples without the memory tag (or with an
/// unparseable magnitude) are ignored rather than failed.
#[derive(Default)]
pub struct MemoryAverageAggregator {
    buckets: HashMap<Tags, HashMap<String, Vec<u64>>>,
}

impl MemoryAverageAggregator {
    fn add_trace(&mut self, mut tags: Tags, key: &str) {
        let Some(raw) = tags.remove(MEMORY_TAG) else {
            return;
        };
        let Ok(magnitude) = raw.parse::<u64>() else {
            return;
        };

        self.buckets
            .entry(tags)
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(magnitude);
    }

    fn grouped_traces(&self) -> GroupedTraces {
        self.buckets
            .iter()
            .map(|(tags, traces)| {
                let reduced = traces
                    .iter()
                    .map(|(key, magnitudes)| (key.clone(), integer_mean(magnitudes)))
                    .collect();
                (tags.clone(), reduced)
            })
            .collect()
    }
}

fn integer_mean(magnitudes: &[u64]) -> u64 {
    if magnitudes.is_empty() {
        return 0;
    }
    magnitudes.iter().sum::<u64>() / magnitudes.len() as u64
}
