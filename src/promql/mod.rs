//! PromQL query trees and their evaluation ranges.
//!
//! Parsing happens elsewhere; this module only holds the already-built tree
//! and the per-node time ranges the lowering reads.

pub mod ast;
pub mod range;

pub use ast::{AstError, LabelMatcher, MatchOp, Node, NodeId, PromQLTree};
pub use range::{
    millis_to_ticks, steps_in_range, Duration, EvaluationParams, NodeEvaluationRange,
    NodeRangeGetter, NodeRanges, RangeError, Timestamp,
};

/// Label holding the metric name of a series.
pub const METRIC_NAME: &str = "__name__";
