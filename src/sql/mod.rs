//! SQL statement trees
//!
//! A small, type-safe representation of the SELECT statements the converter
//! emits, plus the renderer that turns them into text.
//!
//! - [`expr`]: identifiers, literals, function calls, lambdas
//! - [`query`]: SELECT statements and WITH clauses
//! - [`builder`]: incremental construction of one SELECT
//! - [`types`]: target column types and typed literals
//! - [`render`]: SQL string generation

pub mod builder;
pub mod expr;
pub mod query;
pub mod render;
pub mod types;

pub use builder::SelectQueryBuilder;
pub use expr::{Expr, FunctionCall, Ident, Literal};
pub use query::{Cte, OrderBy, SelectQuery, SortDirection, TableSource};
pub use render::{render, Render, SqlRenderer};
pub use types::{ScalarType, TimestampType};

/// Column names shared by every intermediate query shape.
pub mod columns {
    pub const VALUE: &str = "value";
    pub const VALUES: &str = "values";
    pub const GROUP: &str = "group";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TAGS: &str = "tags";
    pub const TIME_SERIES: &str = "time_series";
}
