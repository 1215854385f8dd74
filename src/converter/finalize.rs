//! Projection of the root piece onto the output schema of its result type:
//!
//! | result type    | columns                     |
//! |----------------|-----------------------------|
//! | scalar         | `timestamp, value`          |
//! | string         | `timestamp, value`          |
//! | instant vector | `tags, timestamp, value`    |
//! | range vector   | `tags, time_series`         |
//!
//! The named subqueries collected during lowering lead the WITH clause; the
//! root piece's own query, if any, is appended last and read from.

use super::context::ConverterContext;
use super::error::ConvertResult;
use super::piece::{QueryPiece, ResultType, Store};
use crate::promql::steps_in_range;
use crate::sql::columns::{GROUP, TAGS, TIMESTAMP, TIME_SERIES, VALUE, VALUES};
use crate::sql::{Expr, FunctionCall, SelectQuery, SelectQueryBuilder, SortDirection};

const TAGS_TYPE: &str = "Array(Tuple(String, String))";

pub fn finalize(piece: QueryPiece, ctx: &mut ConverterContext<'_>) -> ConvertResult<SelectQuery> {
    match piece.result_type {
        ResultType::Scalar => finalize_scalar(piece, ctx),
        ResultType::String => finalize_string(piece, ctx),
        ResultType::InstantVector => finalize_instant_vector(piece, ctx),
        ResultType::RangeVector => finalize_range_vector(piece, ctx),
    }
}

/// Adds the WITH clause and, if the root has a query, reads from it.
fn finish(
    builder: SelectQueryBuilder,
    root: Option<SelectQuery>,
    ctx: &mut ConverterContext<'_>,
) -> SelectQuery {
    let mut chain = std::mem::take(&mut ctx.subqueries);
    let builder = match root {
        Some(query) => builder.from_table(chain.push(query)),
        None => builder,
    };
    builder.with(chain.into_ctes()).build()
}

/// `SELECT * FROM null('<structure>')`
fn no_rows(structure: String) -> SelectQueryBuilder {
    SelectQueryBuilder::new()
        .select(Expr::Asterisk)
        .from_table_function(FunctionCall::new("null", vec![Expr::string(structure)]))
}

/// `materialize(CAST([], 'Array(Tuple(String, String))')) AS tags`
fn no_tags() -> Expr {
    Expr::function("materialize", vec![Expr::cast(Expr::empty_array(), TAGS_TYPE)]).alias(TAGS)
}

/// `timeSeriesGroupToTags(group) AS tags`
fn tags_of_group() -> Expr {
    Expr::function("timeSeriesGroupToTags", vec![Expr::ident(GROUP)]).alias(TAGS)
}

/// `values[1]`
fn first_value() -> Expr {
    Expr::array_element(Expr::ident(VALUES), 1)
}

/// Scalars and instant vectors describe a single evaluation instant.
fn ensure_single_instant(piece: &QueryPiece, ctx: &ConverterContext<'_>) -> ConvertResult<()> {
    if piece.start_time != piece.end_time {
        return Err(ctx.cannot_finalize(piece));
    }
    Ok(())
}

fn finalize_scalar(
    mut piece: QueryPiece,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<SelectQuery> {
    let scalar_type = ctx.scalar_type;

    if matches!(piece.store, Store::Empty) {
        let structure = format!(
            "{} {}, {} {}",
            TIMESTAMP,
            ctx.timestamp_type.name(),
            VALUE,
            scalar_type.name()
        );
        return Ok(finish(no_rows(structure), None, ctx));
    }
    ensure_single_instant(&piece, ctx)?;

    let (value, root) = match piece.take_store() {
        // SELECT <start> AS timestamp, <scalar> AS value
        Store::ConstScalar(value) => (scalar_type.literal(value), None),
        // SELECT <start> AS timestamp, CAST(value, '<type>') AS value FROM <root>
        Store::SingleScalar(query) => (scalar_type.cast(Expr::ident(VALUE)), Some(query)),
        // SELECT <start> AS timestamp, CAST(values[1], '<type>') AS value FROM <root>
        Store::ScalarGrid(query) => (scalar_type.cast(first_value()), Some(query)),
        store @ (Store::Empty
        | Store::ConstString(_)
        | Store::VectorGrid(_)
        | Store::RawData(_)) => {
            return Err(ctx.unexpected_store_method(&piece.with_store(store)));
        }
    };

    let builder = SelectQueryBuilder::new()
        .select_as(ctx.timestamp_type.literal(piece.start_time), TIMESTAMP)
        .select_as(value, VALUE);
    Ok(finish(builder, root, ctx))
}

fn finalize_string(
    mut piece: QueryPiece,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<SelectQuery> {
    let value = match piece.take_store() {
        Store::ConstString(value) => value,
        store => return Err(ctx.unexpected_store_method(&piece.with_store(store))),
    };

    if piece.start_time != piece.end_time {
        return Err(ctx.cannot_finalize(&piece.with_store(Store::ConstString(value))));
    }

    // SELECT <start> AS timestamp, '<string>' AS value
    let builder = SelectQueryBuilder::new()
        .select_as(ctx.timestamp_type.literal(piece.start_time), TIMESTAMP)
        .select_as(Expr::string(value), VALUE);
    Ok(finish(builder, None, ctx))
}

fn finalize_instant_vector(
    mut piece: QueryPiece,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<SelectQuery> {
    let scalar_type = ctx.scalar_type;

    if matches!(piece.store, Store::Empty) {
        let structure = format!(
            "{} {}, {} {}, {} {}",
            TAGS,
            TAGS_TYPE,
            TIMESTAMP,
            ctx.timestamp_type.name(),
            VALUE,
            scalar_type.name()
        );
        return Ok(finish(no_rows(structure), None, ctx));
    }
    ensure_single_instant(&piece, ctx)?;

    let mut filter = None;
    let (tags, value, root) = match piece.take_store() {
        Store::ConstScalar(value) => (no_tags(), scalar_type.literal(value), None),
        Store::SingleScalar(query) => {
            (no_tags(), scalar_type.cast(Expr::ident(VALUE)), Some(query))
        }
        Store::ScalarGrid(query) => (no_tags(), scalar_type.cast(first_value()), Some(query)),
        Store::VectorGrid(query) => {
            // Series without a sample at this instant are dropped:
            // WHERE isNotNull(values[1])
            filter = Some(Expr::function("isNotNull", vec![first_value()]));
            let value = scalar_type.cast(Expr::function("assumeNotNull", vec![first_value()]));
            (tags_of_group(), value, Some(query))
        }
        store @ (Store::Empty | Store::ConstString(_) | Store::RawData(_)) => {
            return Err(ctx.unexpected_store_method(&piece.with_store(store)));
        }
    };

    let mut builder = SelectQueryBuilder::new()
        .select(tags)
        .select_as(ctx.timestamp_type.literal(piece.start_time), TIMESTAMP)
        .select_as(value, VALUE);
    if let Some(filter) = filter {
        builder = builder.filter(filter);
    }
    Ok(finish(builder, root, ctx))
}

fn finalize_range_vector(
    mut piece: QueryPiece,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<SelectQuery> {
    let scalar_type = ctx.scalar_type;
    let ts = ctx.timestamp_type.clone();

    if matches!(piece.store, Store::Empty) {
        let structure = format!(
            "{} {}, {} Array(Tuple({}, {}))",
            TAGS,
            TAGS_TYPE,
            TIME_SERIES,
            ts.name(),
            scalar_type.name()
        );
        let builder = no_rows(structure).order_by(Expr::ident(TAGS));
        return Ok(finish(builder, None, ctx));
    }

    let steps = steps_in_range(piece.start_time, piece.end_time, piece.step) as u64;
    // arrayResize([], <steps>, <value>)
    let spread = |value: Expr| {
        Expr::function(
            "arrayResize",
            vec![Expr::empty_array(), Expr::uint(steps), value],
        )
    };

    let mut builder = SelectQueryBuilder::new();
    let (tags, values, root) = match piece.take_store() {
        Store::ConstScalar(value) => (no_tags(), spread(scalar_type.literal(value)), None),
        Store::SingleScalar(query) => (
            no_tags(),
            spread(scalar_type.cast(Expr::ident(VALUE))),
            Some(query),
        ),
        Store::ScalarGrid(query) => (
            no_tags(),
            Expr::cast(Expr::ident(VALUES), scalar_type.array_name()),
            Some(query),
        ),
        Store::VectorGrid(query) => {
            // WHERE notEmpty(time_series)
            builder = builder.filter(Expr::function("notEmpty", vec![Expr::ident(TIME_SERIES)]));
            let values = Expr::cast(Expr::ident(VALUES), scalar_type.nullable_array_name());
            (tags_of_group(), values, Some(query))
        }
        Store::RawData(query) => {
            // SELECT timeSeriesGroupToTags(group) AS tags,
            //        timeSeriesGroupArray(timestamp, value) AS time_series
            // FROM <root>
            // GROUP BY group
            // HAVING notEmpty(time_series)
            // ORDER BY tags ASC
            let time_series = Expr::function(
                "timeSeriesGroupArray",
                vec![ts.cast(Expr::ident(TIMESTAMP)), scalar_type.cast(Expr::ident(VALUE))],
            );
            let builder = builder
                .select(tags_of_group())
                .select_as(time_series, TIME_SERIES)
                .group_by(Expr::ident(GROUP))
                .having(Expr::function("notEmpty", vec![Expr::ident(TIME_SERIES)]))
                .order_by(Expr::ident(TAGS))
                .order_direction(SortDirection::Asc);
            return Ok(finish(builder, Some(query), ctx));
        }
        store @ (Store::Empty | Store::ConstString(_)) => {
            return Err(ctx.unexpected_store_method(&piece.with_store(store)));
        }
    };

    // timeSeriesFromGrid(<start>, <end>, <step>, <values>) AS time_series
    let time_series = Expr::function(
        "timeSeriesFromGrid",
        vec![
            ts.literal(piece.start_time),
            ts.literal(piece.end_time),
            ts.duration_literal(piece.step),
            values,
        ],
    );
    let builder = builder
        .select(tags)
        .select_as(time_series, TIME_SERIES)
        .order_by(Expr::ident(TAGS))
        .order_direction(SortDirection::Asc);
    Ok(finish(builder, root, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::converter::error::ConvertError;
    use crate::promql::{NodeEvaluationRange, NodeId, NodeRanges, PromQLTree};
    use crate::sql::TableSource;

    struct Fixture {
        tree: PromQLTree,
        ranges: NodeRanges,
        config: ConverterConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tree = PromQLTree::new();
            tree.selector("up", vec![]);
            Self {
                tree,
                ranges: NodeRanges::new(),
                config: ConverterConfig::default(),
            }
        }

        fn finalize(&self, piece: QueryPiece) -> ConvertResult<SelectQuery> {
            let mut ctx = ConverterContext::new(&self.tree, &self.ranges, &self.config);
            finalize(piece, &mut ctx)
        }
    }

    fn piece(result_type: ResultType, store: Store, range: NodeEvaluationRange) -> QueryPiece {
        QueryPiece::new(NodeId(0), result_type, store, range)
    }

    fn grid_query() -> SelectQuery {
        SelectQueryBuilder::new()
            .select(Expr::ident(GROUP))
            .select_as(Expr::ident(VALUES), VALUES)
            .from_table("t")
            .build()
    }

    #[test]
    fn test_const_scalar() {
        let fixture = Fixture::new();
        let query = fixture
            .finalize(piece(
                ResultType::Scalar,
                Store::ConstScalar(2.0),
                NodeEvaluationRange::instant(1_000),
            ))
            .unwrap();

        assert_eq!(
            query.to_string(),
            "SELECT toDateTime64(1.000, 3) AS timestamp, 2.0 AS value"
        );
        assert!(query.from.is_none());
    }

    #[test]
    fn test_scalar_needs_single_instant() {
        let fixture = Fixture::new();
        let result = fixture.finalize(piece(
            ResultType::Scalar,
            Store::ConstScalar(2.0),
            NodeEvaluationRange::new(0, 60_000, 15_000),
        ));
        assert!(matches!(result, Err(ConvertError::CannotFinalize { .. })));
    }

    #[test]
    fn test_scalar_rejects_vector_store() {
        let fixture = Fixture::new();
        let result = fixture.finalize(piece(
            ResultType::Scalar,
            Store::VectorGrid(grid_query()),
            NodeEvaluationRange::instant(0),
        ));
        assert!(matches!(result, Err(ConvertError::UnexpectedStoreMethod { .. })));
    }

    #[test]
    fn test_empty_instant_vector_has_schema() {
        let fixture = Fixture::new();
        let query = fixture
            .finalize(QueryPiece::empty(NodeId(0), ResultType::InstantVector))
            .unwrap();

        assert_eq!(
            query.to_string(),
            "SELECT * FROM null('tags Array(Tuple(String, String)), timestamp DateTime64(3), value Float64')"
        );
    }

    #[test]
    fn test_empty_scalar_has_schema() {
        let fixture = Fixture::new();
        let query = fixture
            .finalize(QueryPiece::empty(NodeId(0), ResultType::Scalar))
            .unwrap();

        assert_eq!(
            query.to_string(),
            "SELECT * FROM null('timestamp DateTime64(3), value Float64')"
        );
    }

    #[test]
    fn test_instant_vector_grid_filters_missing_samples() {
        let fixture = Fixture::new();
        let query = fixture
            .finalize(piece(
                ResultType::InstantVector,
                Store::VectorGrid(grid_query()),
                NodeEvaluationRange::instant(5_000),
            ))
            .unwrap();

        assert_eq!(query.with.len(), 1);
        assert_eq!(query.with[0].name.as_str(), "__table1");
        assert!(matches!(query.from, Some(TableSource::Table(ref t)) if t.as_str() == "__table1"));
        assert_eq!(
            query.where_clause.as_ref().map(|e| e.to_string()),
            Some("isNotNull(arrayElement(values, 1))".to_string())
        );
        assert_eq!(
            query.column(VALUE).map(|e| e.to_string()),
            Some("CAST(assumeNotNull(arrayElement(values, 1)), 'Float64') AS value".to_string())
        );
    }

    #[test]
    fn test_range_vector_is_ordered_by_tags() {
        let fixture = Fixture::new();
        let range = NodeEvaluationRange::new(0, 60_000, 15_000);
        let stores = vec![
            Store::Empty,
            Store::ConstScalar(1.0),
            Store::ScalarGrid(SelectQuery::default()),
            Store::VectorGrid(grid_query()),
            Store::RawData(grid_query()),
        ];

        for store in stores {
            let method = store.method();
            let query = fixture.finalize(piece(ResultType::RangeVector, store, range)).unwrap();
            assert_eq!(query.order_by.len(), 1, "{}", method);
            assert_eq!(query.order_by[0].expr, Expr::ident(TAGS));
            assert_eq!(query.order_by[0].direction, SortDirection::Asc);
        }
    }

    #[test]
    fn test_range_vector_const_scalar() {
        let fixture = Fixture::new();
        let query = fixture
            .finalize(piece(
                ResultType::RangeVector,
                Store::ConstScalar(1.5),
                NodeEvaluationRange::new(0, 60_000, 15_000),
            ))
            .unwrap();

        assert_eq!(
            query.to_string(),
            "SELECT materialize(CAST([], 'Array(Tuple(String, String))')) AS tags, \
             timeSeriesFromGrid(toDateTime64(0.000, 3), toDateTime64(60.000, 3), toDecimal64(15.000, 3), \
             arrayResize([], 5, 1.5)) AS time_series ORDER BY tags ASC"
        );
    }

    #[test]
    fn test_range_vector_raw_data() {
        let fixture = Fixture::new();
        let query = fixture
            .finalize(piece(
                ResultType::RangeVector,
                Store::RawData(grid_query()),
                NodeEvaluationRange::instant(60_000).with_window(60_000),
            ))
            .unwrap();

        assert_eq!(query.group_by, vec![Expr::ident(GROUP)]);
        assert!(query.having.is_some());
        assert!(query.where_clause.is_none());
        assert_eq!(
            query.column(TIME_SERIES).map(|e| e.to_string()),
            Some(
                "timeSeriesGroupArray(CAST(timestamp, 'DateTime64(3)'), CAST(value, 'Float64')) AS time_series"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_string() {
        let fixture = Fixture::new();
        let query = fixture
            .finalize(piece(
                ResultType::String,
                Store::ConstString("hi".to_string()),
                NodeEvaluationRange::instant(0),
            ))
            .unwrap();
        assert_eq!(
            query.to_string(),
            "SELECT toDateTime64(0.000, 3) AS timestamp, 'hi' AS value"
        );

        let result = fixture.finalize(QueryPiece::empty(NodeId(0), ResultType::String));
        assert!(matches!(result, Err(ConvertError::UnexpectedStoreMethod { .. })));
    }

    #[test]
    fn test_pending_subqueries_lead_with_clause() {
        let fixture = Fixture::new();
        let mut ctx = ConverterContext::new(&fixture.tree, &fixture.ranges, &fixture.config);
        ctx.add_subquery(SelectQuery::default());
        ctx.add_subquery(SelectQuery::default());

        let query = finalize(
            piece(
                ResultType::Scalar,
                Store::ScalarGrid(SelectQuery::default()),
                NodeEvaluationRange::instant(0),
            ),
            &mut ctx,
        )
        .unwrap();

        let names: Vec<_> = query.with.iter().map(|cte| cte.name.as_str().to_string()).collect();
        assert_eq!(names, vec!["__table1", "__table2", "__table3"]);
        assert_eq!(query.source_table().map(|t| t.as_str()), Some("__table3"));
        assert_eq!(query.nesting_depth(), 1);
        assert!(ctx.subqueries.is_empty());
    }
}
