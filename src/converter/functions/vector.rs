use super::single_argument;
use crate::converter::context::ConverterContext;
use crate::converter::error::ConvertResult;
use crate::converter::piece::{QueryPiece, ResultType};
use crate::promql::NodeId;

/// `vector(s)`: every scalar form is already a valid zero-or-one series
/// instant vector, so only the result type changes.
pub fn apply_function_vector(
    node: NodeId,
    name: &str,
    args: Vec<QueryPiece>,
    ctx: &ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    let argument = single_argument(name, args, ResultType::Scalar, ctx)?;
    Ok(argument.relabel(node, ResultType::InstantVector))
}
