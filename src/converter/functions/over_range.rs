use super::single_argument;
use crate::converter::context::ConverterContext;
use crate::converter::drop_metric_name::drop_metric_name;
use crate::converter::error::ConvertResult;
use crate::converter::piece::{QueryPiece, ResultType, Store};
use crate::promql::{steps_in_range, NodeId};
use crate::sql::columns::{GROUP, TIMESTAMP, TIME_SERIES, VALUE, VALUES};
use crate::sql::{Expr, SelectQueryBuilder};

/// Functions aggregating a range vector window into one value per grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeFunction {
    Rate,
    Irate,
    Delta,
    Idelta,
    LastOverTime,
}

impl RangeFunction {
    pub const ALL: [RangeFunction; 5] = [
        Self::Rate,
        Self::Irate,
        Self::Delta,
        Self::Idelta,
        Self::LastOverTime,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Irate => "irate",
            Self::Delta => "delta",
            Self::Idelta => "idelta",
            Self::LastOverTime => "last_over_time",
        }
    }

    /// Aggregate function producing the output grid
    pub fn aggregate_name(&self) -> &'static str {
        match self {
            Self::Rate => "timeSeriesRateToGrid",
            Self::Irate => "timeSeriesInstantRateToGrid",
            Self::Delta => "timeSeriesDeltaToGrid",
            Self::Idelta => "timeSeriesInstantDeltaToGrid",
            Self::LastOverTime => "timeSeriesLastToGrid",
        }
    }

    /// Whether the output series lose their metric name.
    pub fn drops_metric_name(&self) -> bool {
        !matches!(self, Self::LastOverTime)
    }
}

/// `rate(v[5m])`, `last_over_time(v[5m])`, ...
///
/// The aggregate always gets the output grid and window as parameters:
///
/// ```text
/// SELECT [group,] f(<start>, <end>, <step>, <window>)(<timestamps>, <values>) AS values
/// FROM <prev>
/// [GROUP BY group]
/// ```
///
/// Scalars are spread over the argument's grid first; vector grids are turned
/// back into `(timestamp, value)` pairs with `timeSeriesFromGrid`.
pub fn apply_function_over_range(
    node: NodeId,
    function: RangeFunction,
    args: Vec<QueryPiece>,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    let mut argument = single_argument(function.name(), args, ResultType::RangeVector, ctx)?;

    let Some(range) = ctx.node_range(node) else {
        return Ok(QueryPiece::empty(node, ResultType::InstantVector));
    };

    let ts = ctx.timestamp_type.clone();
    let scalar_type = ctx.scalar_type;
    let argument_grid = argument.range();
    let grid_steps = steps_in_range(
        argument_grid.start_time,
        argument_grid.end_time,
        argument_grid.step,
    );

    // arrayResize([], <steps>, <value>)
    let spread = |value: Expr| {
        Expr::function(
            "arrayResize",
            vec![Expr::empty_array(), Expr::uint(grid_steps as u64), value],
        )
    };

    let mut timestamps = None;
    let (values, source, grouped) = match argument.take_store() {
        Store::Empty => {
            return Ok(argument
                .with_store(Store::Empty)
                .relabel(node, ResultType::InstantVector));
        }
        Store::ConstScalar(value) => (spread(scalar_type.literal(value)), None, false),
        Store::SingleScalar(query) => (spread(Expr::ident(VALUE)), Some(query), false),
        Store::ScalarGrid(query) => (Expr::ident(VALUES), Some(query), false),
        Store::VectorGrid(query) => {
            // (timeSeriesFromGrid(<start>, <end>, <step>, values) AS time_series).1, time_series.2
            let pairs = Expr::function(
                "timeSeriesFromGrid",
                vec![
                    ts.literal(argument_grid.start_time),
                    ts.literal(argument_grid.end_time),
                    ts.duration_literal(argument_grid.step),
                    Expr::ident(VALUES),
                ],
            )
            .alias(TIME_SERIES);
            timestamps = Some(Expr::tuple_element(pairs, 1));
            (Expr::tuple_element(Expr::ident(TIME_SERIES), 2), Some(query), true)
        }
        Store::RawData(query) => {
            timestamps = Some(Expr::ident(TIMESTAMP));
            (Expr::ident(VALUE), Some(query), true)
        }
        store @ Store::ConstString(_) => {
            return Err(ctx.unexpected_store_method(&argument.with_store(store)));
        }
    };

    let timestamps = timestamps.unwrap_or_else(|| {
        Expr::function(
            "timeSeriesRange",
            vec![
                ts.literal(argument_grid.start_time),
                ts.literal(argument_grid.end_time),
                ts.duration_literal(argument_grid.step),
            ],
        )
    });

    let aggregate = Expr::parametric(
        function.aggregate_name(),
        vec![
            ts.literal(range.start_time),
            ts.literal(range.end_time),
            ts.duration_literal(range.step),
            ts.duration_literal(range.window),
        ],
        vec![timestamps, values],
    );

    let mut builder = SelectQueryBuilder::new();
    if grouped {
        builder = builder.select(Expr::ident(GROUP));
    }
    builder = builder.select_as(aggregate, VALUES);
    if grouped {
        builder = builder.group_by(Expr::ident(GROUP));
    }
    if let Some(query) = source {
        builder = builder.from_table(ctx.add_subquery(query));
    }

    let query = builder.build();
    let store = if grouped {
        Store::VectorGrid(query)
    } else {
        Store::ScalarGrid(query)
    };
    let piece = QueryPiece::new(node, ResultType::InstantVector, store, range);

    if grouped && function.drops_metric_name() {
        drop_metric_name(piece, ctx)
    } else {
        Ok(piece)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_names() {
        assert_eq!(RangeFunction::Rate.aggregate_name(), "timeSeriesRateToGrid");
        assert_eq!(RangeFunction::Idelta.aggregate_name(), "timeSeriesInstantDeltaToGrid");
        assert_eq!(RangeFunction::LastOverTime.aggregate_name(), "timeSeriesLastToGrid");
    }

    #[test]
    fn test_metric_name_flags() {
        for function in RangeFunction::ALL {
            assert_eq!(
                function.drops_metric_name(),
                function != RangeFunction::LastOverTime,
                "{}",
                function.name()
            );
        }
    }
}
