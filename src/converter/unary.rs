use super::context::ConverterContext;
use super::elementwise::map_values;
use super::error::{ConvertError, ConvertResult};
use super::piece::{QueryPiece, ResultType, Store};
use crate::promql::NodeId;
use crate::sql::Expr;

/// Lowers unary `+` and `-` applied to a scalar or an instant vector.
pub fn apply_unary_operator(
    node: NodeId,
    operator: &str,
    argument: QueryPiece,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    if operator != "+" && operator != "-" {
        return Err(ConvertError::UnknownOperator {
            operator: operator.to_string(),
        });
    }

    if !matches!(argument.result_type, ResultType::Scalar | ResultType::InstantVector) {
        return Err(ConvertError::OperatorArgumentType {
            operator: operator.to_string(),
            expected: format!("{} or {}", ResultType::Scalar, ResultType::InstantVector),
            expression: ctx.promql_text(&argument),
            actual: argument.result_type,
        });
    }

    let result_type = argument.result_type;
    let piece = argument.relabel(node, result_type);
    if operator == "+" {
        return Ok(piece);
    }

    match piece.store {
        Store::Empty => Ok(piece),
        Store::ConstScalar(value) => Ok(piece.with_store(Store::ConstScalar(-value))),
        _ => map_values(piece, ctx, |x| Expr::function("negate", vec![x])),
    }
}
