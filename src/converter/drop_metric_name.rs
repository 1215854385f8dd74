use super::context::ConverterContext;
use super::error::{ConvertError, ConvertResult};
use super::piece::{QueryPiece, Store};
use crate::promql::METRIC_NAME;
use crate::sql::columns::GROUP;
use crate::sql::{Expr, SelectQuery};

/// Removes the metric name label from every series of a grouped piece.
///
/// The `group` projection is rewritten in place, so no named subquery is
/// added. Pieces without series pass through unchanged.
pub fn drop_metric_name(
    mut piece: QueryPiece,
    ctx: &ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    let rewritten = match &mut piece.store {
        Store::VectorGrid(query) | Store::RawData(query) => {
            remove_tag_from_group(query, METRIC_NAME)
        }
        Store::Empty
        | Store::ConstScalar(_)
        | Store::ConstString(_)
        | Store::SingleScalar(_)
        | Store::ScalarGrid(_) => true,
    };

    if !rewritten {
        return Err(ConvertError::MissingColumn {
            expression: ctx.promql_text(&piece),
            column: GROUP.to_string(),
        });
    }
    Ok(piece)
}

/// Wraps the `group` column in `timeSeriesRemoveTag`. GROUP BY keys naming
/// `group` are pointed at the original key so the grouping is unchanged.
/// Returns false if the query has no `group` column.
fn remove_tag_from_group(query: &mut SelectQuery, tag: &str) -> bool {
    let source = query.source_table().cloned();
    let Some(column) = query.column_mut(GROUP) else {
        return false;
    };

    let original = match column.clone().unaliased() {
        Expr::Identifier { table: None, name } => match &source {
            Some(table) => Expr::qualified(table.clone(), name),
            None => Expr::ident(name),
        },
        other => other,
    };

    *column = Expr::function(
        "timeSeriesRemoveTag",
        vec![original.clone(), Expr::string(tag)],
    )
    .alias(GROUP);

    let bare_group = Expr::ident(GROUP);
    for key in query.group_by.iter_mut() {
        if *key == bare_group {
            *key = original.clone();
        }
    }
    true
}
