//! SQL string rendering
//!
//! Converts statement trees to ClickHouse-dialect SQL text. This is the only
//! place where SQL strings are produced.

use std::fmt;

use super::expr::{Expr, FunctionCall, Ident, Literal};
use super::query::{Cte, SelectQuery, TableSource};
use super::types::format_decimal;

/// Words that must be quoted when used as identifiers.
const RESERVED: &[&str] = &[
    "all", "and", "array", "as", "by", "from", "group", "having", "in", "join", "limit", "not",
    "null", "or", "order", "select", "where", "with",
];

/// Trait for tree nodes that can be rendered to SQL.
pub trait Render {
    fn render(&self, renderer: &mut SqlRenderer);
}

impl Render for SelectQuery {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_select(self);
    }
}

impl Render for Expr {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_expr(self);
    }
}

impl Render for Ident {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.write_ident(self);
    }
}

/// Default buffer capacity for a rendered query
const DEFAULT_BUFFER_CAPACITY: usize = 1024;

pub struct SqlRenderer {
    output: String,
}

impl SqlRenderer {
    pub fn new() -> Self {
        Self {
            output: String::with_capacity(DEFAULT_BUFFER_CAPACITY),
        }
    }

    pub fn into_sql(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn render_select(&mut self, query: &SelectQuery) {
        self.render_ctes(&query.with);
        self.write("SELECT ");
        self.render_expr_list(&query.select_list);

        if let Some(from) = &query.from {
            self.write(" FROM ");
            match from {
                TableSource::Table(name) => self.write_ident(name),
                TableSource::Function(call) => self.render_function(call),
            }
        }

        if let Some(where_clause) = &query.where_clause {
            self.write(" WHERE ");
            self.render_expr(where_clause);
        }

        if !query.group_by.is_empty() {
            self.write(" GROUP BY ");
            self.render_expr_list(&query.group_by);
        }

        if let Some(having) = &query.having {
            self.write(" HAVING ");
            self.render_expr(having);
        }

        if !query.order_by.is_empty() {
            self.write(" ORDER BY ");
            for (i, order) in query.order_by.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                self.render_expr(&order.expr);
                self.write(" ");
                self.write(order.direction.as_sql());
            }
        }
    }

    fn render_ctes(&mut self, ctes: &[Cte]) {
        if ctes.is_empty() {
            return;
        }
        self.write("WITH ");
        for (i, cte) in ctes.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write_ident(&cte.name);
            self.write(" AS (");
            self.render_select(&cte.query);
            self.write(")");
        }
        self.write(" ");
    }

    fn render_expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_expr(expr);
        }
    }

    pub fn render_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier { table, name } => {
                if let Some(table) = table {
                    self.write_ident(table);
                    self.write(".");
                }
                self.write_ident(name);
            }
            Expr::Literal(literal) => self.render_literal(literal),
            Expr::Function(call) => self.render_function(call),
            Expr::Lambda { params, body } => {
                if params.len() == 1 {
                    self.write_ident(&params[0]);
                } else {
                    self.write("(");
                    for (i, param) in params.iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        self.write_ident(param);
                    }
                    self.write(")");
                }
                self.write(" -> ");
                self.render_expr(body);
            }
            Expr::Alias { expr, alias } => {
                self.render_expr(expr);
                self.write(" AS ");
                self.write_ident(alias);
            }
            Expr::Asterisk => self.write("*"),
        }
    }

    fn render_function(&mut self, call: &FunctionCall) {
        self.write(&call.name);
        if !call.parameters.is_empty() {
            self.write("(");
            self.render_expr_list(&call.parameters);
            self.write(")");
        }
        self.write("(");
        self.render_expr_list(&call.args);
        self.write(")");
    }

    fn render_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::UInt(v) => self.write(&v.to_string()),
            Literal::Float(v) => {
                if v.is_nan() {
                    self.write("nan");
                } else if v.is_infinite() {
                    self.write(if *v > 0.0 { "inf" } else { "-inf" });
                } else {
                    // Debug formatting always keeps a decimal point or exponent.
                    self.write(&format!("{:?}", v));
                }
            }
            Literal::Decimal { value, scale } => self.write(&format_decimal(*value, *scale)),
            Literal::String(s) => self.write_string(s),
            Literal::EmptyArray => self.write("[]"),
        }
    }

    fn write_string(&mut self, s: &str) {
        self.output.push('\'');
        for c in s.chars() {
            match c {
                '\'' => self.output.push_str("\\'"),
                '\\' => self.output.push_str("\\\\"),
                _ => self.output.push(c),
            }
        }
        self.output.push('\'');
    }

    pub fn write_ident(&mut self, ident: &Ident) {
        let s = ident.as_str();
        let plain = !s.is_empty()
            && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !RESERVED.contains(&s.to_ascii_lowercase().as_str());

        if plain {
            self.write(s);
        } else {
            self.output.push('`');
            self.write(&s.replace('`', "\\`"));
            self.output.push('`');
        }
    }
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render any node to a SQL string.
pub fn render<T: Render>(node: &T) -> String {
    let mut renderer = SqlRenderer::new();
    node.render(&mut renderer);
    renderer.into_sql()
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::builder::SelectQueryBuilder;
    use crate::sql::query::SortDirection;

    #[test]
    fn test_render_literals() {
        assert_eq!(Expr::float(1.0).to_string(), "1.0");
        assert_eq!(Expr::float(-0.25).to_string(), "-0.25");
        assert_eq!(Expr::float(f64::NAN).to_string(), "nan");
        assert_eq!(Expr::float(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(Expr::string("it's").to_string(), r"'it\'s'");
        assert_eq!(Expr::empty_array().to_string(), "[]");
        assert_eq!(
            Expr::Literal(Literal::Decimal { value: 60_000, scale: 3 }).to_string(),
            "60.000"
        );
    }

    #[test]
    fn test_render_identifiers() {
        assert_eq!(Expr::ident("values").to_string(), "values");
        assert_eq!(Expr::ident("group").to_string(), "`group`");
        assert_eq!(Expr::qualified("__table1", "group").to_string(), "__table1.`group`");
        assert_eq!(Expr::ident("my col").to_string(), "`my col`");
    }

    #[test]
    fn test_render_lambda_and_parametric() {
        let map = Expr::function(
            "arrayMap",
            vec![
                Expr::lambda(vec!["x"], Expr::function("abs", vec![Expr::ident("x")])),
                Expr::ident("values"),
            ],
        )
        .alias("values");
        assert_eq!(map.to_string(), "arrayMap(x -> abs(x), values) AS values");

        let two = Expr::lambda(vec!["x", "y"], Expr::ident("y"));
        assert_eq!(two.to_string(), "(x, y) -> y");

        let agg = Expr::parametric(
            "timeSeriesRateToGrid",
            vec![Expr::uint(1), Expr::uint(2)],
            vec![Expr::ident("timestamp"), Expr::ident("value")],
        );
        assert_eq!(agg.to_string(), "timeSeriesRateToGrid(1, 2)(timestamp, value)");
    }

    #[test]
    fn test_render_select_with_ctes() {
        let inner = SelectQueryBuilder::new()
            .select_as(Expr::float(1.0), "value")
            .build();
        let query = SelectQueryBuilder::new()
            .with(vec![Cte::new("__table1", inner)])
            .select(Expr::ident("tags"))
            .from_table("__table1")
            .filter(Expr::function("notEmpty", vec![Expr::ident("time_series")]))
            .group_by(Expr::ident("group"))
            .having(Expr::function("notEmpty", vec![Expr::ident("time_series")]))
            .order_by(Expr::ident("tags"))
            .order_direction(SortDirection::Asc)
            .build();

        assert_eq!(
            query.to_string(),
            "WITH __table1 AS (SELECT 1.0 AS value) SELECT tags FROM __table1 \
             WHERE notEmpty(time_series) GROUP BY `group` HAVING notEmpty(time_series) ORDER BY tags ASC"
        );
    }
}
