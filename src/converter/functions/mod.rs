//! PromQL function lowering
//!
//! One module per function family. [`apply_function`] looks the name up in
//! the built-in [`FunctionRegistry`] and hands the translated arguments to
//! the family that owns it. Each family checks its own arguments.

pub mod datetime;
pub mod math;
pub mod over_range;
pub mod pi;
pub mod registry;
pub mod scalar;
pub mod time;
pub mod vector;

pub use datetime::DateTimeFunction;
pub use math::MathFunction;
pub use over_range::RangeFunction;
pub use registry::{FunctionImpl, FunctionRegistry, RegistryError, RegistryResult};

use super::context::ConverterContext;
use super::error::{ConvertError, ConvertResult};
use super::piece::{QueryPiece, ResultType};
use crate::promql::NodeId;

/// Lowers the call `name(args...)` found at `node`.
pub fn apply_function(
    node: NodeId,
    name: &str,
    args: Vec<QueryPiece>,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    let Some(implementation) = FunctionRegistry::builtin().get(name) else {
        return Err(ConvertError::Unimplemented {
            name: name.to_string(),
        });
    };

    match implementation {
        FunctionImpl::Vector => vector::apply_function_vector(node, name, args, ctx),
        FunctionImpl::Scalar => scalar::apply_function_scalar(node, name, args, ctx),
        FunctionImpl::Time => time::from_function_time(node, name, args, ctx),
        FunctionImpl::DateTime(function) => {
            datetime::apply_datetime_function(node, function, args, ctx)
        }
        FunctionImpl::Math(function) => math::apply_math_function(node, function, args, ctx),
        FunctionImpl::Pi => pi::from_function_pi(node, name, args, ctx),
        FunctionImpl::OverRange(function) => {
            over_range::apply_function_over_range(node, function, args, ctx)
        }
    }
}

pub(crate) fn check_argument_count(
    function: &str,
    args: &[QueryPiece],
    expected: usize,
) -> ConvertResult<()> {
    if args.len() != expected {
        return Err(ConvertError::ArgumentCount {
            function: function.to_string(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_argument_type(
    function: &str,
    argument: &QueryPiece,
    expected: ResultType,
    ctx: &ConverterContext<'_>,
) -> ConvertResult<()> {
    if argument.result_type != expected {
        return Err(ConvertError::ArgumentType {
            function: function.to_string(),
            expected: expected.to_string(),
            expression: ctx.promql_text(argument),
            actual: argument.result_type,
        });
    }
    Ok(())
}

/// Checks that `args` is exactly one argument of type `expected` and returns it.
pub(crate) fn single_argument(
    function: &str,
    args: Vec<QueryPiece>,
    expected: ResultType,
    ctx: &ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    check_argument_count(function, &args, 1)?;
    let mut args = args.into_iter();
    let Some(argument) = args.next() else {
        return Err(ConvertError::ArgumentCount {
            function: function.to_string(),
            expected: 1,
            actual: 0,
        });
    };
    check_argument_type(function, &argument, expected, ctx)?;
    Ok(argument)
}
