use std::collections::HashSet;

use super::Plugin;
use crate::trace::{Tags, Trace};

/// Call points that mean the process was parked, not burning CPU.
const DEFAULT_BLOCKING_POINTS: [&str; 4] = [
    "Fiber::start",
    "Fiber::resume",
    "pcntl_wait",
    "Pheanstalk::reserveWithTimeout",
];

/// Drops traces containing a known blocking or cooperative-yield call, so
/// time spent waiting is excluded from CPU accounting.
#[derive(Debug)]
pub struct SkipBlockingTraces {
    blocking_points: HashSet<String>,
}

impl SkipBlockingTraces {
    pub fn new(blocking_points: impl IntoIterator<Item = String>) -> Self {
        Self {
            blocking_points: blocking_points.into_iter().collect(),
        }
    }
}

impl Default for SkipBlockingTraces {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKING_POINTS.iter().map(|p| p.to_string()))
    }
}

impl Plugin for SkipBlockingTraces {
    fn name(&self) -> &'static str {
        "skip-blocking-traces"
    }

    fn process(&self, tags: Tags, trace: Trace) -> (Tags, Trace) {
        let blocked = trace
            .iter()
            .any(|frame| self.blocking_points.contains(frame.point.as_str()));

        if blocked {
            (tags, Vec::new())
        } else {
            (tags, trace)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Frame;

    fn trace(points: &[&str]) -> Trace {
        points
            .iter()
            .map(|point| Frame {
                point: point.to_string(),
                location: "<internal>:-1".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_blocking_frame_empties_trace() {
        let (_, out) = SkipBlockingTraces::default().process(Tags::new(), trace(&["pcntl_wait", "<main>"]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_non_blocking_trace_passes_through() {
        let input = trace(&["usleep", "<main>"]);
        let (_, out) = SkipBlockingTraces::default().process(Tags::new(), input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn test_custom_blocking_set() {
        let plugin = SkipBlockingTraces::new(["poll_loop".to_string()]);
        let (_, out) = plugin.process(Tags::new(), trace(&["poll_loop"]));
        assert!(out.is_empty());
    }
}
