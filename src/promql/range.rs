use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ast::{Node, NodeId, PromQLTree};

/// A point in time as a fixed-scale decimal (ticks of `10^-scale` seconds).
pub type Timestamp = i64;

/// A length of time in the same fixed-scale representation as [`Timestamp`].
pub type Duration = i64;

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("Invalid evaluation step {0}: a range query needs a positive step")]
    InvalidStep(i64),
    #[error("Timestamp scale {0} is out of range (0..=9)")]
    InvalidScale(u32),
    #[error("Time value {0}ms overflows at scale {1}")]
    Overflow(i64, u32),
    #[error("Evaluation range {start_ms}ms..{end_ms}ms is too wide")]
    SpanOverflow { start_ms: i64, end_ms: i64 },
}

pub type RangeResult<T> = Result<T, RangeError>;

/// The evaluation grid of one node: `start, start + step, ..., end`, plus the
/// window length for nodes that look back over a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeEvaluationRange {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub step: Duration,
    pub window: Duration,
}

impl NodeEvaluationRange {
    pub fn instant(time: Timestamp) -> Self {
        Self {
            start_time: time,
            end_time: time,
            step: 0,
            window: 0,
        }
    }

    pub fn new(start_time: Timestamp, end_time: Timestamp, step: Duration) -> Self {
        Self {
            start_time,
            end_time,
            step,
            window: 0,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn steps(&self) -> usize {
        steps_in_range(self.start_time, self.end_time, self.step)
    }
}

/// Resolves the evaluation range of a node. `None` means the node produces
/// no rows for the requested query.
pub trait NodeRangeGetter {
    fn get(&self, node: NodeId) -> Option<NodeEvaluationRange>;
}

/// Number of grid points between `start` and `end` inclusive.
pub fn steps_in_range(start: Timestamp, end: Timestamp, step: Duration) -> usize {
    if start > end {
        return 0;
    }
    if step <= 0 {
        return 1;
    }
    let steps = end.abs_diff(start) / step.unsigned_abs();
    usize::try_from(steps).map_or(usize::MAX, |steps| steps.saturating_add(1))
}

/// Converts milliseconds to ticks of the given decimal scale.
pub fn millis_to_ticks(ms: i64, scale: u32) -> RangeResult<i64> {
    if scale > 9 {
        return Err(RangeError::InvalidScale(scale));
    }
    if scale >= 3 {
        ms.checked_mul(10_i64.pow(scale - 3))
            .ok_or(RangeError::Overflow(ms, scale))
    } else {
        Ok(ms / 10_i64.pow(3 - scale))
    }
}

/// Outer parameters of a query evaluation, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationParams {
    Instant { time_ms: i64 },
    Range { start_ms: i64, end_ms: i64, step_ms: i64 },
}

/// Evaluation ranges for every node of one tree.
#[derive(Debug, Clone, Default)]
pub struct NodeRanges {
    ranges: HashMap<NodeId, NodeEvaluationRange>,
}

impl NodeRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeId, range: NodeEvaluationRange) {
        self.ranges.insert(node, range);
    }

    /// Assigns ranges for a plain query without subqueries: every node is
    /// evaluated over the outer grid, range selectors and the functions that
    /// consume them carry the selector's window.
    pub fn resolve(tree: &PromQLTree, params: EvaluationParams, scale: u32) -> RangeResult<Self> {
        let (start, end, step) = match params {
            EvaluationParams::Instant { time_ms } => {
                let t = millis_to_ticks(time_ms, scale)?;
                (t, t, 0)
            }
            EvaluationParams::Range { start_ms, end_ms, step_ms } => {
                let start = millis_to_ticks(start_ms, scale)?;
                let end = millis_to_ticks(end_ms, scale)?;
                let step = millis_to_ticks(step_ms, scale)?;
                // Checked in ticks: a coarse scale truncates short steps to 0.
                if step <= 0 && start < end {
                    return Err(RangeError::InvalidStep(step_ms));
                }
                if start < end && end.checked_sub(start).is_none() {
                    return Err(RangeError::SpanOverflow { start_ms, end_ms });
                }
                (start, end, step.max(0))
            }
        };

        let mut ranges = Self::new();
        if start > end {
            return Ok(ranges);
        }

        let grid = NodeEvaluationRange::new(start, end, step);
        for index in 0..tree.len() {
            let id = NodeId(index);
            let Some(node) = tree.get(id) else { continue };

            let window = match node {
                Node::RangeSelector { range_ms, .. } => millis_to_ticks(*range_ms as i64, scale)?,
                Node::Function { args, .. } => {
                    let mut window = 0;
                    for arg in args {
                        if let Some(Node::RangeSelector { range_ms, .. }) = tree.get(*arg) {
                            window = millis_to_ticks(*range_ms as i64, scale)?;
                        }
                    }
                    window
                }
                _ => 0,
            };

            ranges.insert(id, grid.with_window(window));
        }

        Ok(ranges)
    }
}

impl NodeRangeGetter for NodeRanges {
    fn get(&self, node: NodeId) -> Option<NodeEvaluationRange> {
        self.ranges.get(&node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_in_range() {
        assert_eq!(steps_in_range(10, 10, 0), 1);
        assert_eq!(steps_in_range(0, 100, 10), 11);
        assert_eq!(steps_in_range(0, 105, 10), 11);
        assert_eq!(steps_in_range(100, 0, 10), 0);
        assert_eq!(steps_in_range(i64::MIN, i64::MAX, i64::MAX), 3);
    }

    #[test]
    fn test_millis_to_ticks() {
        assert_eq!(millis_to_ticks(1500, 3).unwrap(), 1500);
        assert_eq!(millis_to_ticks(1500, 0).unwrap(), 1);
        assert_eq!(millis_to_ticks(1500, 6).unwrap(), 1_500_000);
        assert!(matches!(millis_to_ticks(1, 12), Err(RangeError::InvalidScale(12))));
        assert!(matches!(millis_to_ticks(i64::MAX, 9), Err(RangeError::Overflow(_, 9))));
    }

    #[test]
    fn test_resolve_instant_query() {
        let mut tree = PromQLTree::new();
        let x = tree.selector("x", vec![]);
        let r = tree.range(x, 300_000);
        let rate = tree.function("rate", vec![r]);

        let params = EvaluationParams::Instant { time_ms: 1_000_000 };
        let ranges = NodeRanges::resolve(&tree, params, 3).unwrap();

        let rate_range = ranges.get(rate).unwrap();
        assert_eq!(rate_range.start_time, 1_000_000);
        assert_eq!(rate_range.end_time, 1_000_000);
        assert_eq!(rate_range.window, 300_000);
        assert_eq!(ranges.get(r).unwrap().window, 300_000);
        assert_eq!(ranges.get(x).unwrap().window, 0);
    }

    #[test]
    fn test_resolve_range_query() {
        let mut tree = PromQLTree::new();
        let t = tree.function("time", vec![]);

        let params = EvaluationParams::Range {
            start_ms: 0,
            end_ms: 60_000,
            step_ms: 15_000,
        };
        let ranges = NodeRanges::resolve(&tree, params, 3).unwrap();
        let range = ranges.get(t).unwrap();
        assert_eq!(range.steps(), 5);
    }

    #[test]
    fn test_resolve_empty_and_invalid() {
        let mut tree = PromQLTree::new();
        let one = tree.scalar(1.0);

        let empty = EvaluationParams::Range { start_ms: 100, end_ms: 0, step_ms: 10 };
        let ranges = NodeRanges::resolve(&tree, empty, 3).unwrap();
        assert!(ranges.get(one).is_none());

        let bad_step = EvaluationParams::Range { start_ms: 0, end_ms: 100, step_ms: 0 };
        assert!(matches!(
            NodeRanges::resolve(&tree, bad_step, 3),
            Err(RangeError::InvalidStep(0))
        ));
    }

    #[test]
    fn test_resolve_rejects_step_truncated_to_zero() {
        let mut tree = PromQLTree::new();
        tree.function("time", vec![]);

        // 500ms is 0 ticks at a scale of whole seconds
        let params = EvaluationParams::Range {
            start_ms: 0,
            end_ms: 10_000,
            step_ms: 500,
        };
        assert!(matches!(
            NodeRanges::resolve(&tree, params, 0),
            Err(RangeError::InvalidStep(500))
        ));
        assert!(NodeRanges::resolve(&tree, params, 3).is_ok());
    }

    #[test]
    fn test_resolve_rejects_unrepresentable_span() {
        let mut tree = PromQLTree::new();
        tree.function("time", vec![]);

        let params = EvaluationParams::Range {
            start_ms: -9_000_000_000_000_000_000,
            end_ms: 9_000_000_000_000_000_000,
            step_ms: 1_000_000_000_000_000_000,
        };
        assert!(matches!(
            NodeRanges::resolve(&tree, params, 3),
            Err(RangeError::SpanOverflow { .. })
        ));
    }
}
