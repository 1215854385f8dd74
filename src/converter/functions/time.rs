use super::check_argument_count;
use crate::converter::context::ConverterContext;
use crate::converter::error::ConvertResult;
use crate::converter::piece::{QueryPiece, ResultType, Store};
use crate::promql::NodeId;
use crate::sql::columns::VALUES;
use crate::sql::{Expr, SelectQueryBuilder};

/// `time()`: the evaluation timestamp in seconds.
///
/// A single instant is known at translation time. Over a range the grid
/// timestamps come from `timeSeriesRange` cast to the scalar array type.
pub fn from_function_time(
    node: NodeId,
    name: &str,
    args: Vec<QueryPiece>,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    check_argument_count(name, &args, 0)?;

    let Some(range) = ctx.node_range(node) else {
        return Ok(QueryPiece::empty(node, ResultType::Scalar));
    };

    if range.start_time == range.end_time {
        let seconds = ctx.timestamp_type.to_seconds(range.start_time);
        return Ok(QueryPiece::new(node, ResultType::Scalar, Store::ConstScalar(seconds), range));
    }

    let ts = &ctx.timestamp_type;
    let grid = Expr::function(
        "timeSeriesRange",
        vec![
            ts.literal(range.start_time),
            ts.literal(range.end_time),
            ts.duration_literal(range.step),
        ],
    );
    let query = SelectQueryBuilder::new()
        .select_as(Expr::cast(grid, ctx.scalar_type.array_name()), VALUES)
        .build();

    Ok(QueryPiece::new(node, ResultType::Scalar, Store::ScalarGrid(query), range))
}
