//! SQL expression types
//!
//! Expressions are the building blocks of the generated queries: columns,
//! literals, function calls, lambdas and aliases.

use std::fmt;

/// A SQL identifier (table name, column name, alias).
///
/// Quoting is decided by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(pub String);

impl Ident {
    #[inline]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SQL literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    UInt(u64),
    /// Rendered with a decimal point so it is typed as a float; NaN and
    /// infinities use the engine's `nan`/`inf` spellings.
    Float(f64),
    /// Fixed-point number `value * 10^-scale`.
    Decimal { value: i64, scale: u32 },
    String(String),
    EmptyArray,
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }
}

/// A function call, optionally with parameters: `name(params)(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// Parameters of a parametric aggregate function.
    pub parameters: Vec<Expr>,
    pub args: Vec<Expr>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            args,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Expr>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference, optionally qualified with the table it comes from.
    Identifier { table: Option<Ident>, name: Ident },
    Literal(Literal),
    Function(FunctionCall),
    /// Higher-order function argument: `(x, y) -> body`
    Lambda { params: Vec<Ident>, body: Box<Expr> },
    /// `expr AS alias`
    Alias { expr: Box<Expr>, alias: Ident },
    Asterisk,
}

impl Expr {
    pub fn ident(name: impl Into<Ident>) -> Self {
        Self::Identifier {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<Ident>, name: impl Into<Ident>) -> Self {
        Self::Identifier {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    pub fn literal(literal: Literal) -> Self {
        Self::Literal(literal)
    }

    pub fn uint(value: u64) -> Self {
        Self::Literal(Literal::UInt(value))
    }

    pub fn float(value: f64) -> Self {
        Self::Literal(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::string(value))
    }

    pub fn empty_array() -> Self {
        Self::Literal(Literal::EmptyArray)
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Function(FunctionCall::new(name, args))
    }

    pub fn parametric(name: impl Into<String>, parameters: Vec<Expr>, args: Vec<Expr>) -> Self {
        Self::Function(FunctionCall::new(name, args).with_parameters(parameters))
    }

    pub fn lambda(params: Vec<&str>, body: Expr) -> Self {
        Self::Lambda {
            params: params.into_iter().map(Ident::from).collect(),
            body: Box::new(body),
        }
    }

    pub fn cast(expr: Expr, type_name: impl Into<String>) -> Self {
        Self::function("CAST", vec![expr, Self::string(type_name)])
    }

    /// `array[index]` with a 1-based index.
    pub fn array_element(array: Expr, index: u64) -> Self {
        Self::function("arrayElement", vec![array, Self::uint(index)])
    }

    /// `tuple.index` with a 1-based index.
    pub fn tuple_element(tuple: Expr, index: u64) -> Self {
        Self::function("tupleElement", vec![tuple, Self::uint(index)])
    }

    /// Wraps this expression in `AS alias`, replacing any previous alias.
    pub fn alias(self, alias: impl Into<Ident>) -> Self {
        Self::Alias {
            expr: Box::new(self.unaliased()),
            alias: alias.into(),
        }
    }

    /// Strips a top-level alias.
    pub fn unaliased(self) -> Self {
        match self {
            Self::Alias { expr, .. } => *expr,
            other => other,
        }
    }

    /// Name of the column this expression produces in a select list, when
    /// it is known without evaluating anything.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Self::Alias { alias, .. } => Some(alias.as_str()),
            Self::Identifier { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_replaces_previous() {
        let e = Expr::ident("x").alias("a").alias("b");
        assert_eq!(
            e,
            Expr::Alias {
                expr: Box::new(Expr::ident("x")),
                alias: Ident::new("b")
            }
        );
        assert_eq!(e.output_name(), Some("b"));
    }

    #[test]
    fn test_output_name() {
        assert_eq!(Expr::qualified("t", "group").output_name(), Some("group"));
        assert_eq!(Expr::function("abs", vec![Expr::ident("x")]).output_name(), None);
    }
}
