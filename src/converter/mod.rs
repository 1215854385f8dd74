//! PromQL to SQL lowering
//!
//! The [`Converter`] walks a [`PromQLTree`] bottom-up. Every node becomes a
//! [`QueryPiece`]: leaves come from literals and selectors, inner nodes from
//! unary operators and function calls applied to the pieces of their
//! children. Query-backed pieces consumed by a parent are appended to the
//! context's subquery chain, so the final statement is one flat WITH list
//! followed by a SELECT that matches the root's result type.

pub mod context;
pub mod drop_metric_name;
pub(crate) mod elementwise;
pub mod error;
pub mod finalize;
pub mod functions;
pub mod literal;
pub mod piece;
pub mod selector;
pub mod unary;

pub use context::{ConverterContext, NamedSubquery, SubqueryChain, SubqueryKind};
pub use error::{ConvertError, ConvertResult, ErrorKind};
pub use finalize::finalize;
pub use piece::{QueryPiece, ResultType, Store, StoreMethod};
pub use selector::{SelectorSource, TimeSeriesTableSource};

use std::time::Instant;

use tracing::{debug, warn};

use crate::config::ConverterConfig;
use crate::metrics;
use crate::promql::{EvaluationParams, Node, NodeId, NodeRangeGetter, NodeRanges, PromQLTree};
use crate::sql::SelectQuery;

/// Translates PromQL trees into SQL statements.
pub struct Converter {
    config: ConverterConfig,
    selectors: Box<dyn SelectorSource>,
}

impl Converter {
    /// Creates a converter reading selectors from the configured table.
    pub fn new(config: ConverterConfig) -> Self {
        let selectors = Box::new(TimeSeriesTableSource::from_config(&config));
        Self { config, selectors }
    }

    /// Replaces the source selector leaves are read from.
    pub fn with_selector_source(mut self, source: impl SelectorSource + 'static) -> Self {
        self.selectors = Box::new(source);
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Translates `tree` evaluated at an instant or over a range.
    pub fn convert(
        &self,
        tree: &PromQLTree,
        params: EvaluationParams,
    ) -> ConvertResult<SelectQuery> {
        let ranges = match self.resolve_ranges(tree, params) {
            Ok(ranges) => ranges,
            Err(e) => {
                metrics::record_translation_error(e.kind().as_str());
                return Err(e);
            }
        };
        self.convert_with_ranges(tree, &ranges)
    }

    fn resolve_ranges(
        &self,
        tree: &PromQLTree,
        params: EvaluationParams,
    ) -> ConvertResult<NodeRanges> {
        tree.validate()
            .map_err(|e| ConvertError::MalformedTree(e.to_string()))?;
        Ok(NodeRanges::resolve(tree, params, self.config.timestamp_scale)?)
    }

    /// Translates `tree` with evaluation ranges resolved by the caller.
    pub fn convert_with_ranges(
        &self,
        tree: &PromQLTree,
        ranges: &dyn NodeRangeGetter,
    ) -> ConvertResult<SelectQuery> {
        let started = Instant::now();
        debug!(root = %tree.root(), nodes = tree.len(), "Translating query");

        match self.translate(tree, ranges) {
            Ok((result_type, query)) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                metrics::record_translation(&result_type.to_string(), elapsed_ms);
                metrics::record_subqueries(query.with.len());
                debug!(
                    result_type = %result_type,
                    subqueries = query.with.len(),
                    elapsed_ms,
                    "Translated query"
                );
                Ok(query)
            }
            Err(e) => {
                metrics::record_translation_error(e.kind().as_str());
                match e.kind() {
                    ErrorKind::Internal => warn!("Translation failed: {}", e),
                    ErrorKind::Unimplemented | ErrorKind::UserQuery => {
                        debug!("Translation rejected: {}", e)
                    }
                }
                Err(e)
            }
        }
    }

    fn translate(
        &self,
        tree: &PromQLTree,
        ranges: &dyn NodeRangeGetter,
    ) -> ConvertResult<(ResultType, SelectQuery)> {
        let mut ctx = ConverterContext::new(tree, ranges, &self.config);
        let root = self.lower(tree.root(), &mut ctx)?;

        // A range query returns every series over the whole grid.
        let root = match ctx.node_range(tree.root()) {
            Some(range)
                if range.start_time < range.end_time
                    && matches!(root.result_type, ResultType::Scalar | ResultType::InstantVector) =>
            {
                let node = root.node;
                root.relabel(node, ResultType::RangeVector)
            }
            _ => root,
        };

        let result_type = root.result_type;
        let query = finalize(root, &mut ctx)?;
        Ok((result_type, query))
    }

    /// Lowers the subtree at `id`, children first, left to right.
    fn lower(&self, id: NodeId, ctx: &mut ConverterContext<'_>) -> ConvertResult<QueryPiece> {
        let tree = ctx.tree;
        let node = tree
            .node(id)
            .map_err(|e| ConvertError::MalformedTree(e.to_string()))?;

        match node {
            Node::Scalar { value } => Ok(literal::from_scalar_literal(id, *value, ctx)),
            Node::StringLiteral { value } => Ok(literal::from_string_literal(id, value, ctx)),
            Node::InstantSelector { .. } => self.selectors.instant_selector(id, ctx),
            Node::RangeSelector { selector, .. } => {
                self.selectors.range_selector(id, *selector, ctx)
            }
            Node::Function { name, args } => {
                let mut pieces = Vec::with_capacity(args.len());
                for arg in args {
                    pieces.push(self.lower(*arg, ctx)?);
                }
                functions::apply_function(id, name, pieces, ctx)
            }
            Node::UnaryOperator { operator, operand } => {
                let argument = self.lower(*operand, ctx)?;
                unary::apply_unary_operator(id, operator, argument, ctx)
            }
        }
    }
}
