use super::single_argument;
use crate::converter::context::ConverterContext;
use crate::converter::error::ConvertResult;
use crate::converter::piece::{QueryPiece, ResultType, Store};
use crate::promql::NodeId;
use crate::sql::columns::VALUES;
use crate::sql::{Expr, SelectQueryBuilder};

/// `scalar(v)`
///
/// Scalar-shaped stores are relabeled. A vector grid collapses to one value
/// per grid point: the sample if exactly one series has one there, NaN
/// otherwise.
pub fn apply_function_scalar(
    node: NodeId,
    name: &str,
    args: Vec<QueryPiece>,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    let argument = single_argument(name, args, ResultType::InstantVector, ctx)?;
    let mut piece = argument.relabel(node, ResultType::Scalar);

    match piece.take_store() {
        store @ (Store::Empty
        | Store::ConstScalar(_)
        | Store::SingleScalar(_)
        | Store::ScalarGrid(_)) => {
            Ok(piece.with_store(store))
        }
        Store::VectorGrid(query) => {
            // arrayMap((x, y) -> if(x = 1, assumeNotNull(y), nan),
            //          countForEach(values), anyForEach(values))
            // With no series at all the -ForEach aggregates return [], and an
            // instant result then reads values[1] as 0, not NaN.
            let pick = Expr::lambda(
                vec!["x", "y"],
                Expr::function(
                    "if",
                    vec![
                        Expr::function("equals", vec![Expr::ident("x"), Expr::uint(1)]),
                        Expr::function("assumeNotNull", vec![Expr::ident("y")]),
                        ctx.scalar_type.literal(f64::NAN),
                    ],
                ),
            );
            let values = Expr::function(
                "arrayMap",
                vec![
                    pick,
                    Expr::function("countForEach", vec![Expr::ident(VALUES)]),
                    Expr::function("anyForEach", vec![Expr::ident(VALUES)]),
                ],
            );

            let source = ctx.add_subquery(query);
            let query = SelectQueryBuilder::new()
                .select_as(values, VALUES)
                .from_table(source)
                .build();
            Ok(piece.with_store(Store::ScalarGrid(query)))
        }
        store @ (Store::ConstString(_) | Store::RawData(_)) => {
            Err(ctx.unexpected_store_method(&piece.with_store(store)))
        }
    }
}
