use super::context::ConverterContext;
use super::drop_metric_name::drop_metric_name;
use super::error::ConvertResult;
use super::piece::{QueryPiece, Store};
use crate::sql::columns::{GROUP, VALUE, VALUES};
use crate::sql::{Expr, SelectQueryBuilder};

/// Applies `f` to each value of a query-backed scalar or grid piece.
///
/// The piece's query becomes the next named subquery and the new query reads
/// from it:
///
/// ```text
/// SINGLE_SCALAR: SELECT f(value) AS value FROM <prev>
/// SCALAR_GRID:   SELECT arrayMap(x -> f(x), values) AS values FROM <prev>
/// VECTOR_GRID:   SELECT group, arrayMap(x -> f(x), values) AS values FROM <prev>
/// ```
///
/// Grid results lose their metric name. Constant and empty pieces must be
/// handled by the caller; string and raw pieces are rejected.
pub fn map_values(
    mut piece: QueryPiece,
    ctx: &mut ConverterContext<'_>,
    f: impl Fn(Expr) -> Expr,
) -> ConvertResult<QueryPiece> {
    let (query, grouped) = match piece.take_store() {
        Store::SingleScalar(query) => {
            let source = ctx.add_subquery(query);
            let query = SelectQueryBuilder::new()
                .select_as(f(Expr::ident(VALUE)), VALUE)
                .from_table(source)
                .build();
            return Ok(piece.with_store(Store::SingleScalar(query)));
        }
        Store::ScalarGrid(query) => (query, false),
        Store::VectorGrid(query) => (query, true),
        store @ (Store::Empty
        | Store::ConstScalar(_)
        | Store::ConstString(_)
        | Store::RawData(_)) => {
            return Err(ctx.unexpected_store_method(&piece.with_store(store)));
        }
    };

    let source = ctx.add_subquery(query);
    let mut builder = SelectQueryBuilder::new();
    if grouped {
        builder = builder.select(Expr::ident(GROUP));
    }
    let mapped = Expr::function(
        "arrayMap",
        vec![Expr::lambda(vec!["x"], f(Expr::ident("x"))), Expr::ident(VALUES)],
    );
    let query = builder.select_as(mapped, VALUES).from_table(source).build();

    let store = if grouped {
        Store::VectorGrid(query)
    } else {
        Store::ScalarGrid(query)
    };
    drop_metric_name(piece.with_store(store), ctx)
}
