//! SELECT statements and the WITH clause.

use super::expr::{Expr, FunctionCall, Ident};

/// A named subquery in a WITH clause: `name AS (query)`
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: Ident,
    pub query: Box<SelectQuery>,
}

impl Cte {
    pub fn new(name: impl Into<Ident>, query: SelectQuery) -> Self {
        Self {
            name: name.into(),
            query: Box::new(query),
        }
    }
}

/// Where a SELECT reads its rows from.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// A table or a named subquery
    Table(Ident),
    /// A table function such as `null('structure')`
    Function(FunctionCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub with: Vec<Cte>,
    pub select_list: Vec<Expr>,
    pub from: Option<TableSource>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
}

impl SelectQuery {
    /// Finds the select-list entry producing the column `name`.
    pub fn column(&self, name: &str) -> Option<&Expr> {
        self.select_list.iter().find(|e| e.output_name() == Some(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Expr> {
        self.select_list.iter_mut().find(|e| e.output_name() == Some(name))
    }

    /// Name of the table or named subquery this query reads from.
    pub fn source_table(&self) -> Option<&Ident> {
        match &self.from {
            Some(TableSource::Table(name)) => Some(name),
            _ => None,
        }
    }

    /// How deep WITH clauses are nested below this query.
    pub fn nesting_depth(&self) -> usize {
        self.with
            .iter()
            .map(|cte| 1 + cte.query.nesting_depth())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup() {
        let query = SelectQuery {
            select_list: vec![
                Expr::ident("group"),
                Expr::function("abs", vec![Expr::ident("values")]).alias("values"),
            ],
            from: Some(TableSource::Table(Ident::new("__table1"))),
            ..Default::default()
        };

        assert!(query.column("group").is_some());
        assert!(query.column("values").is_some());
        assert!(query.column("value").is_none());
        assert_eq!(query.source_table().map(|t| t.as_str()), Some("__table1"));
    }

    #[test]
    fn test_nesting_depth() {
        let leaf = SelectQuery::default();
        let mid = SelectQuery {
            with: vec![Cte::new("a", leaf.clone())],
            ..Default::default()
        };
        let top = SelectQuery {
            with: vec![Cte::new("b", mid), Cte::new("c", leaf)],
            ..Default::default()
        };
        assert_eq!(top.nesting_depth(), 2);
    }
}
