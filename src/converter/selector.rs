//! Leaf lowering of metric selectors.

use super::context::ConverterContext;
use super::error::ConvertResult;
use super::piece::{QueryPiece, ResultType, Store};
use crate::config::{ConverterConfig, TableName};
use crate::promql::{millis_to_ticks, NodeId, Timestamp};
use crate::sql::columns::{GROUP, TIMESTAMP, VALUE, VALUES};
use crate::sql::{Expr, FunctionCall, SelectQueryBuilder, TimestampType};

/// Produces the pieces for selector leaves.
pub trait SelectorSource: Send + Sync {
    /// `metric{...}`, resampled to the grid of `node`.
    fn instant_selector(
        &self,
        node: NodeId,
        ctx: &mut ConverterContext<'_>,
    ) -> ConvertResult<QueryPiece>;

    /// `metric{...}[range]` as raw samples. `selector` is the wrapped
    /// instant selector.
    fn range_selector(
        &self,
        node: NodeId,
        selector: NodeId,
        ctx: &mut ConverterContext<'_>,
    ) -> ConvertResult<QueryPiece>;
}

/// Reads samples from a time series table with `timeSeriesSelector`.
#[derive(Debug, Clone)]
pub struct TimeSeriesTableSource {
    table: TableName,
    lookback_delta_ms: u64,
}

impl TimeSeriesTableSource {
    pub fn new(table: TableName, lookback_delta_ms: u64) -> Self {
        Self {
            table,
            lookback_delta_ms,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.time_series_table.clone(), config.lookback_delta_ms)
    }

    /// `timeSeriesSelector('db', 'table', 'selector', min_time, max_time)`
    fn selector_call(
        &self,
        selector: String,
        min_time: Timestamp,
        max_time: Timestamp,
        ts: &TimestampType,
    ) -> FunctionCall {
        FunctionCall::new(
            "timeSeriesSelector",
            vec![
                Expr::string(self.table.database.clone()),
                Expr::string(self.table.table.clone()),
                Expr::string(selector),
                ts.literal(min_time),
                ts.literal(max_time),
            ],
        )
    }
}

/// `timeSeriesIdToTagsGroup(id) AS group`
fn group_column() -> Expr {
    Expr::function("timeSeriesIdToTagsGroup", vec![Expr::ident("id")]).alias(GROUP)
}

impl SelectorSource for TimeSeriesTableSource {
    fn instant_selector(
        &self,
        node: NodeId,
        ctx: &mut ConverterContext<'_>,
    ) -> ConvertResult<QueryPiece> {
        let Some(range) = ctx.node_range(node) else {
            return Ok(QueryPiece::empty(node, ResultType::InstantVector));
        };

        let ts = &ctx.timestamp_type;
        let lookback = millis_to_ticks(self.lookback_delta_ms as i64, ts.scale)?;
        let source = self.selector_call(
            ctx.tree.to_promql(node),
            range.start_time.saturating_sub(lookback),
            range.end_time,
            ts,
        );

        // SELECT timeSeriesIdToTagsGroup(id) AS group,
        //        timeSeriesResampleToGridWithStaleness(<start>, <end>, <step>, <lookback>)
        //            (timestamp, value) AS values
        // FROM timeSeriesSelector(...)
        // GROUP BY group
        let resample = Expr::parametric(
            "timeSeriesResampleToGridWithStaleness",
            vec![
                ts.literal(range.start_time),
                ts.literal(range.end_time),
                ts.duration_literal(range.step),
                ts.duration_literal(lookback),
            ],
            vec![Expr::ident(TIMESTAMP), Expr::ident(VALUE)],
        );
        let query = SelectQueryBuilder::new()
            .select(group_column())
            .select_as(resample, VALUES)
            .from_table_function(source)
            .group_by(Expr::ident(GROUP))
            .build();

        Ok(QueryPiece::new(node, ResultType::InstantVector, Store::VectorGrid(query), range))
    }

    fn range_selector(
        &self,
        node: NodeId,
        selector: NodeId,
        ctx: &mut ConverterContext<'_>,
    ) -> ConvertResult<QueryPiece> {
        let Some(range) = ctx.node_range(node) else {
            return Ok(QueryPiece::empty(node, ResultType::RangeVector));
        };

        let ts = &ctx.timestamp_type;
        let window_start = range.start_time.saturating_sub(range.window);
        let source =
            self.selector_call(ctx.tree.to_promql(selector), window_start, range.end_time, ts);

        // SELECT timeSeriesIdToTagsGroup(id) AS group, timestamp, value
        // FROM timeSeriesSelector(...)
        // WHERE timestamp > <start - window>
        let query = SelectQueryBuilder::new()
            .select(group_column())
            .select(Expr::ident(TIMESTAMP))
            .select(Expr::ident(VALUE))
            .from_table_function(source)
            .filter(Expr::function(
                "greater",
                vec![Expr::ident(TIMESTAMP), ts.literal(window_start)],
            ))
            .build();

        Ok(QueryPiece::new(node, ResultType::RangeVector, Store::RawData(query), range))
    }
}
