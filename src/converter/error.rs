use thiserror::Error;

use super::piece::{ResultType, StoreMethod};
use crate::promql::RangeError;

/// Broad category of a conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The query uses something this converter does not support yet.
    Unimplemented,
    /// The query itself is wrong.
    UserQuery,
    /// The converter reached a state earlier checks should have excluded.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unimplemented => "unimplemented",
            ErrorKind::UserQuery => "user_query",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Function {name} is not implemented")]
    Unimplemented { name: String },

    #[error("Function '{function}' expects {expected} {}, but was called with {actual} arguments", plural(.expected))]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Function '{function}' expects an argument of type {expected}, but expression {expression} has type {actual}")]
    ArgumentType {
        function: String,
        expected: String,
        expression: String,
        actual: ResultType,
    },

    #[error("Operator '{operator}' expects an argument of type {expected}, but expression {expression} has type {actual}")]
    OperatorArgumentType {
        operator: String,
        expected: String,
        expression: String,
        actual: ResultType,
    },

    #[error("Unknown unary operator with name {operator}")]
    UnknownOperator { operator: String },

    #[error("Expression '{expression}' (type {result_type}) has unexpected store method {store_method}")]
    UnexpectedStoreMethod {
        expression: String,
        result_type: ResultType,
        store_method: StoreMethod,
    },

    #[error("Cannot finalize expression {expression} with type: {result_type}, store method: {store_method}, start_time: {start}, end_time: {end}, step: {step}")]
    CannotFinalize {
        expression: String,
        result_type: ResultType,
        store_method: StoreMethod,
        start: String,
        end: String,
        step: String,
    },

    #[error("Expression '{expression}' has no '{column}' column to rewrite")]
    MissingColumn { expression: String, column: String },

    #[error("Invalid evaluation range: {0}")]
    Range(#[from] RangeError),

    #[error("Query tree is malformed: {0}")]
    MalformedTree(String),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Unimplemented { .. } => ErrorKind::Unimplemented,
            ConvertError::ArgumentCount { .. }
            | ConvertError::ArgumentType { .. }
            | ConvertError::OperatorArgumentType { .. }
            | ConvertError::UnknownOperator { .. }
            | ConvertError::Range(_) => ErrorKind::UserQuery,
            ConvertError::UnexpectedStoreMethod { .. }
            | ConvertError::CannotFinalize { .. }
            | ConvertError::MissingColumn { .. }
            | ConvertError::MalformedTree(_) => ErrorKind::Internal,
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;

fn plural(count: &usize) -> &'static str {
    if *count == 1 { "argument" } else { "arguments" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_count_message() {
        let one = ConvertError::ArgumentCount {
            function: "abs".to_string(),
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            one.to_string(),
            "Function 'abs' expects 1 argument, but was called with 2 arguments"
        );

        let none = ConvertError::ArgumentCount {
            function: "pi".to_string(),
            expected: 0,
            actual: 1,
        };
        assert_eq!(
            none.to_string(),
            "Function 'pi' expects 0 arguments, but was called with 1 arguments"
        );
    }

    #[test]
    fn test_argument_type_message() {
        let err = ConvertError::ArgumentType {
            function: "rate".to_string(),
            expected: ResultType::RangeVector.to_string(),
            expression: "up".to_string(),
            actual: ResultType::InstantVector,
        };
        assert_eq!(
            err.to_string(),
            "Function 'rate' expects an argument of type range vector, but expression up has type instant vector"
        );
        assert_eq!(err.kind(), ErrorKind::UserQuery);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            ConvertError::Unimplemented { name: "foo".to_string() }.kind(),
            ErrorKind::Unimplemented
        );
        assert_eq!(ConvertError::MalformedTree("x".to_string()).kind(), ErrorKind::Internal);
    }
}
