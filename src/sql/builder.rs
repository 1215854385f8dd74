use super::expr::{Expr, FunctionCall, Ident};
use super::query::{Cte, OrderBy, SelectQuery, SortDirection, TableSource};

/// Accumulates the parts of one SELECT statement.
#[derive(Debug, Default)]
pub struct SelectQueryBuilder {
    with: Vec<Cte>,
    select_list: Vec<Expr>,
    from: Option<TableSource>,
    where_clause: Option<Expr>,
    group_by: Vec<Expr>,
    having: Option<Expr>,
    order_by: Vec<Expr>,
    order_direction: SortDirection,
}

impl SelectQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, expr: Expr) -> Self {
        self.select_list.push(expr);
        self
    }

    /// Adds `expr AS alias` to the select list.
    pub fn select_as(self, expr: Expr, alias: &str) -> Self {
        self.select(expr.alias(alias))
    }

    pub fn from_table(mut self, name: impl Into<Ident>) -> Self {
        self.from = Some(TableSource::Table(name.into()));
        self
    }

    pub fn from_table_function(mut self, call: FunctionCall) -> Self {
        self.from = Some(TableSource::Function(call));
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn having(mut self, expr: Expr) -> Self {
        self.having = Some(expr);
        self
    }

    pub fn order_by(mut self, expr: Expr) -> Self {
        self.order_by.push(expr);
        self
    }

    pub fn order_direction(mut self, direction: SortDirection) -> Self {
        self.order_direction = direction;
        self
    }

    pub fn with(mut self, ctes: Vec<Cte>) -> Self {
        self.with = ctes;
        self
    }

    pub fn build(self) -> SelectQuery {
        let direction = self.order_direction;
        SelectQuery {
            with: self.with,
            select_list: self.select_list,
            from: self.from,
            where_clause: self.where_clause,
            group_by: self.group_by,
            having: self.having,
            order_by: self
                .order_by
                .into_iter()
                .map(|expr| OrderBy { expr, direction })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query() {
        let query = SelectQueryBuilder::new()
            .select(Expr::ident("tags"))
            .select_as(Expr::ident("x"), "time_series")
            .from_table("__table3")
            .group_by(Expr::ident("group"))
            .order_by(Expr::ident("tags"))
            .build();

        assert_eq!(query.select_list.len(), 2);
        assert_eq!(query.group_by, vec![Expr::ident("group")]);
        assert_eq!(query.order_by.len(), 1);
        assert_eq!(query.order_by[0].direction, SortDirection::Asc);
        assert!(matches!(query.from, Some(TableSource::Table(ref t)) if t.as_str() == "__table3"));
    }
}
