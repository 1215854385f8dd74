use super::single_argument;
use crate::converter::context::ConverterContext;
use crate::converter::elementwise::map_values;
use crate::converter::error::ConvertResult;
use crate::converter::piece::{QueryPiece, ResultType, Store};
use crate::promql::NodeId;
use crate::sql::columns::VALUE;
use crate::sql::{Expr, SelectQueryBuilder};

/// Calendar components of a sample value read as seconds since epoch, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeFunction {
    DayOfWeek,
    DayOfMonth,
    DaysInMonth,
    DayOfYear,
    Minute,
    Hour,
    Month,
    Year,
}

impl DateTimeFunction {
    pub const ALL: [DateTimeFunction; 8] = [
        Self::DayOfWeek,
        Self::DayOfMonth,
        Self::DaysInMonth,
        Self::DayOfYear,
        Self::Minute,
        Self::Hour,
        Self::Month,
        Self::Year,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DayOfWeek => "day_of_week",
            Self::DayOfMonth => "day_of_month",
            Self::DaysInMonth => "days_in_month",
            Self::DayOfYear => "day_of_year",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Builds the SQL computing this component of the date-time `t`.
    pub fn transform(&self, t: Expr) -> Expr {
        match self {
            // 0 is Sunday
            Self::DayOfWeek => Expr::function("toDayOfWeek", vec![t, Expr::uint(2)]),
            Self::DayOfMonth => Expr::function("toDayOfMonth", vec![t]),
            Self::DaysInMonth => Expr::function(
                "plus",
                vec![
                    Expr::function(
                        "dateDiff",
                        vec![
                            Expr::string("days"),
                            Expr::function("toStartOfMonth", vec![t.clone()]),
                            Expr::function("toLastDayOfMonth", vec![t]),
                        ],
                    ),
                    Expr::uint(1),
                ],
            ),
            Self::DayOfYear => Expr::function("toDayOfYear", vec![t]),
            Self::Minute => Expr::function("toMinute", vec![t]),
            Self::Hour => Expr::function("toHour", vec![t]),
            Self::Month => Expr::function("toMonth", vec![t]),
            Self::Year => Expr::function("toYear", vec![t]),
        }
    }
}

/// `toDateTime64(x, 0, 'UTC')`
fn seconds_to_datetime(x: Expr) -> Expr {
    Expr::function("toDateTime64", vec![x, Expr::uint(0), Expr::string("UTC")])
}

/// `hour(v)`, `year(v)`, ...
///
/// Constant arguments are not folded: they become a one-row query so the
/// calendar arithmetic always runs in the engine.
pub fn apply_datetime_function(
    node: NodeId,
    function: DateTimeFunction,
    args: Vec<QueryPiece>,
    ctx: &mut ConverterContext<'_>,
) -> ConvertResult<QueryPiece> {
    let argument = single_argument(function.name(), args, ResultType::InstantVector, ctx)?;
    let piece = argument.relabel(node, ResultType::InstantVector);
    let scalar_type = ctx.scalar_type;
    let component = move |x: Expr| scalar_type.cast(function.transform(seconds_to_datetime(x)));

    match piece.store {
        Store::Empty => Ok(piece),
        Store::ConstScalar(value) => {
            let query = SelectQueryBuilder::new()
                .select_as(component(scalar_type.literal(value)), VALUE)
                .build();
            Ok(piece.with_store(Store::SingleScalar(query)))
        }
        _ => map_values(piece, ctx, component),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let t = Expr::ident("t");
        assert_eq!(
            DateTimeFunction::DayOfWeek.transform(t.clone()).to_string(),
            "toDayOfWeek(t, 2)"
        );
        assert_eq!(
            DateTimeFunction::DaysInMonth.transform(t.clone()).to_string(),
            "plus(dateDiff('days', toStartOfMonth(t), toLastDayOfMonth(t)), 1)"
        );
        assert_eq!(DateTimeFunction::Year.transform(t).to_string(), "toYear(t)");
    }

    #[test]
    fn test_seconds_to_datetime() {
        assert_eq!(
            seconds_to_datetime(Expr::ident("x")).to_string(),
            "toDateTime64(x, 0, 'UTC')"
        );
    }
}
