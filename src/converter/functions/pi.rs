use std::f64::consts::PI;

use super::check_argument_count;
use crate::converter::context::ConverterContext;
use crate::converter::error::ConvertResult;
use crate::converter::piece::{QueryPiece, ResultType, Store};
use crate::promql::NodeId;

/// `pi()` behaves like a numeric literal.
pub fn from_function_pi(
    node: NodeId,
    name: &str,
    args: Vec<QueryPiece>,
    ctx: &ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    check_argument_count(name, &args, 0)?;

    Ok(match ctx.node_range(node) {
        Some(range) => QueryPiece::new(node, ResultType::Scalar, Store::ConstScalar(PI), range),
        None => QueryPiece::empty(node, ResultType::Scalar),
    })
}
