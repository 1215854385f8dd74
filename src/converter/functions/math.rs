use std::f64::consts::PI;

use super::single_argument;
use crate::converter::context::ConverterContext;
use crate::converter::elementwise::map_values;
use crate::converter::error::ConvertResult;
use crate::converter::piece::{QueryPiece, ResultType, Store};
use crate::promql::NodeId;
use crate::sql::Expr;

/// Single-argument numeric functions applied to every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    Abs,
    Sgn,
    Floor,
    Ceil,
    Sqrt,
    Exp,
    Ln,
    Log2,
    Log10,
    Rad,
    Deg,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
}

impl MathFunction {
    pub const ALL: [MathFunction; 23] = [
        Self::Abs,
        Self::Sgn,
        Self::Floor,
        Self::Ceil,
        Self::Sqrt,
        Self::Exp,
        Self::Ln,
        Self::Log2,
        Self::Log10,
        Self::Rad,
        Self::Deg,
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Asin,
        Self::Acos,
        Self::Atan,
        Self::Sinh,
        Self::Cosh,
        Self::Tanh,
        Self::Asinh,
        Self::Acosh,
        Self::Atanh,
    ];

    /// PromQL name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Sgn => "sgn",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log2 => "log2",
            Self::Log10 => "log10",
            Self::Rad => "rad",
            Self::Deg => "deg",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Asinh => "asinh",
            Self::Acosh => "acosh",
            Self::Atanh => "atanh",
        }
    }

    /// SQL function computing the same thing
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Sgn => "sign",
            Self::Ln => "log",
            Self::Rad => "radians",
            Self::Deg => "degrees",
            other => other.name(),
        }
    }

    /// Evaluates the function on a value known at translation time.
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Self::Abs => x.abs(),
            Self::Sgn => {
                if x.is_nan() || x == 0.0 {
                    x
                } else {
                    x.signum()
                }
            }
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Sqrt => x.sqrt(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Log2 => x.log2(),
            Self::Log10 => x.log10(),
            Self::Rad => x * (PI / 180.0),
            Self::Deg => x * (180.0 / PI),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Asinh => x.asinh(),
            Self::Acosh => x.acosh(),
            Self::Atanh => x.atanh(),
        }
    }
}

/// `abs(v)`, `ln(v)`, ...: constants are folded, queries get an elementwise wrapper.
pub fn apply_math_function(
    node: NodeId,
    function: MathFunction,
    args: Vec<QueryPiece>,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    let argument = single_argument(function.name(), args, ResultType::InstantVector, ctx)?;
    let piece = argument.relabel(node, ResultType::InstantVector);

    match piece.store {
        Store::Empty => Ok(piece),
        Store::ConstScalar(value) => {
            let folded = function.eval(value);
            Ok(piece.with_store(Store::ConstScalar(folded)))
        }
        _ => map_values(piece, ctx, |x| Expr::function(function.sql_name(), vec![x])),
    }
}
