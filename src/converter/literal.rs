use super::context::ConverterContext;
use super::piece::{QueryPiece, ResultType, Store};
use crate::promql::NodeId;

pub fn from_scalar_literal(node: NodeId, value: f64, ctx: &ConverterContext<'_>) -> QueryPiece {
    match ctx.node_range(node) {
        Some(range) => QueryPiece::new(node, ResultType::Scalar, Store::ConstScalar(value), range),
        None => QueryPiece::empty(node, ResultType::Scalar),
    }
}

pub fn from_string_literal(node: NodeId, value: &str, ctx: &ConverterContext<'_>) -> QueryPiece {
    match ctx.node_range(node) {
        Some(range) => QueryPiece::new(
            node,
            ResultType::String,
            Store::ConstString(value.to_string()),
            range,
        ),
        None => QueryPiece::empty(node, ResultType::String),
    }
}
