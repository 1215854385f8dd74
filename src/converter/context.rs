use tracing::debug;

use super::error::ConvertError;
use super::piece::QueryPiece;
use crate::config::ConverterConfig;
use crate::promql::{NodeEvaluationRange, NodeId, NodeRangeGetter, PromQLTree};
use crate::sql::types::format_decimal;
use crate::sql::{Cte, Ident, ScalarType, SelectQuery, TimestampType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    Table,
}

/// A previously built SELECT that later queries read by name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSubquery {
    pub index: usize,
    pub query: SelectQuery,
    pub kind: SubqueryKind,
}

impl NamedSubquery {
    pub fn name(&self) -> Ident {
        Ident::new(format!("__table{}", self.index + 1))
    }

    pub fn into_cte(self) -> Cte {
        Cte::new(self.name(), self.query)
    }
}

/// Append-only list of named subqueries. Names follow list position, so the
/// order of `push` calls is the order of the final WITH clause.
#[derive(Debug, Default)]
pub struct SubqueryChain {
    subqueries: Vec<NamedSubquery>,
}

impl SubqueryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query and returns the name to reference it by.
    pub fn push(&mut self, query: SelectQuery) -> Ident {
        let subquery = NamedSubquery {
            index: self.subqueries.len(),
            query,
            kind: SubqueryKind::Table,
        };
        let name = subquery.name();
        self.subqueries.push(subquery);
        name
    }

    pub fn len(&self) -> usize {
        self.subqueries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subqueries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedSubquery> {
        self.subqueries.iter()
    }

    pub fn into_ctes(self) -> Vec<Cte> {
        self.subqueries.into_iter().map(NamedSubquery::into_cte).collect()
    }
}

/// State threaded through the translation of one query.
pub struct ConverterContext<'a> {
    pub tree: &'a PromQLTree,
    pub ranges: &'a dyn NodeRangeGetter,
    pub subqueries: SubqueryChain,
    pub scalar_type: ScalarType,
    pub timestamp_type: TimestampType,
}

impl<'a> ConverterContext<'a> {
    pub fn new(
        tree: &'a PromQLTree,
        ranges: &'a dyn NodeRangeGetter,
        config: &ConverterConfig,
    ) -> Self {
        Self {
            tree,
            ranges,
            subqueries: SubqueryChain::new(),
            scalar_type: config.scalar_type,
            timestamp_type: config.timestamp_type(),
        }
    }

    pub fn node_range(&self, node: NodeId) -> Option<NodeEvaluationRange> {
        self.ranges.get(node)
    }

    /// Turns `query` into the next named subquery and returns its name.
    pub fn add_subquery(&mut self, query: SelectQuery) -> Ident {
        let name = self.subqueries.push(query);
        debug!(subquery = %name, total = self.subqueries.len(), "Appended named subquery");
        name
    }

    /// The PromQL source text of the expression a piece was built for.
    pub fn promql_text(&self, piece: &QueryPiece) -> String {
        self.tree.to_promql(piece.node)
    }

    /// Error for a store method that earlier type checks should have ruled out.
    pub fn unexpected_store_method(&self, piece: &QueryPiece) -> ConvertError {
        ConvertError::UnexpectedStoreMethod {
            expression: self.promql_text(piece),
            result_type: piece.result_type,
            store_method: piece.store_method(),
        }
    }

    /// Error for a root piece that does not fit the output schema of its type.
    pub fn cannot_finalize(&self, piece: &QueryPiece) -> ConvertError {
        ConvertError::CannotFinalize {
            expression: self.promql_text(piece),
            result_type: piece.result_type,
            store_method: piece.store_method(),
            start: self.timestamp_type.format(piece.start_time),
            end: self.timestamp_type.format(piece.end_time),
            step: format!("{}s", format_decimal(piece.step, self.timestamp_type.scale)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{Expr, SelectQueryBuilder};

    #[test]
    fn test_chain_names_follow_position() {
        let mut chain = SubqueryChain::new();
        let a = chain.push(SelectQuery::default());
        let b = chain.push(SelectQueryBuilder::new().select(Expr::ident("value")).build());

        assert_eq!(a.as_str(), "__table1");
        assert_eq!(b.as_str(), "__table2");
        assert_eq!(chain.len(), 2);

        let ctes = chain.into_ctes();
        assert_eq!(ctes[0].name.as_str(), "__table1");
        assert_eq!(ctes[1].name.as_str(), "__table2");
        assert_eq!(ctes[1].query.select_list, vec![Expr::ident("value")]);
    }
}
