//! Target column types and typed literal helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::expr::{Expr, Literal};
use crate::promql::{Duration, Timestamp};

/// The numeric type sample values are cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalarType {
    Float32,
    #[default]
    Float64,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
        }
    }

    /// A literal of this type.
    pub fn literal(&self, value: f64) -> Expr {
        match self {
            Self::Float64 => Expr::float(value),
            Self::Float32 => self.cast(Expr::float(value)),
        }
    }

    /// `CAST(expr, '<type>')`
    pub fn cast(&self, expr: Expr) -> Expr {
        Expr::cast(expr, self.name())
    }

    pub fn array_name(&self) -> String {
        format!("Array({})", self.name())
    }

    pub fn nullable_array_name(&self) -> String {
        format!("Array(Nullable({}))", self.name())
    }
}

/// `DateTime64(scale[, timezone])`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampType {
    pub scale: u32,
    pub timezone: Option<String>,
}

impl TimestampType {
    pub fn new(scale: u32) -> Self {
        Self { scale, timezone: None }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn name(&self) -> String {
        match &self.timezone {
            Some(tz) => format!("DateTime64({}, '{}')", self.scale, tz),
            None => format!("DateTime64({})", self.scale),
        }
    }

    /// `toDateTime64(<decimal>, scale[, timezone])`
    pub fn literal(&self, timestamp: Timestamp) -> Expr {
        let mut args = vec![
            Expr::Literal(Literal::Decimal {
                value: timestamp,
                scale: self.scale,
            }),
            Expr::uint(self.scale as u64),
        ];
        if let Some(tz) = &self.timezone {
            args.push(Expr::string(tz.clone()));
        }
        Expr::function("toDateTime64", args)
    }

    /// A duration in the same decimal scale as the timestamps: `toDecimal64(<decimal>, scale)`
    pub fn duration_literal(&self, duration: Duration) -> Expr {
        Expr::function(
            "toDecimal64",
            vec![
                Expr::Literal(Literal::Decimal {
                    value: duration,
                    scale: self.scale,
                }),
                Expr::uint(self.scale as u64),
            ],
        )
    }

    pub fn cast(&self, expr: Expr) -> Expr {
        Expr::cast(expr, self.name())
    }

    /// Seconds since epoch as a float, the way PromQL reports `time()`.
    pub fn to_seconds(&self, timestamp: Timestamp) -> f64 {
        timestamp as f64 / 10_f64.powi(self.scale as i32)
    }

    /// Human-readable UTC rendering for diagnostics.
    pub fn format(&self, timestamp: Timestamp) -> String {
        let divisor = 10_i64.pow(self.scale.min(9));
        let secs = timestamp.div_euclid(divisor);
        let frac = timestamp.rem_euclid(divisor);
        let nanos = (frac * 10_i64.pow(9 - self.scale.min(9))) as u32;
        match DateTime::<Utc>::from_timestamp(secs, nanos) {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => format_decimal(timestamp, self.scale),
        }
    }
}

impl Default for TimestampType {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Formats `value * 10^-scale` with exactly `scale` fractional digits.
pub fn format_decimal(value: i64, scale: u32) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let digits = value.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if value < 0 { "-" } else { "" };
    format!("{}{}.{}", sign, int_part, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(1500, 3), "1.500");
        assert_eq!(format_decimal(5, 3), "0.005");
        assert_eq!(format_decimal(-5, 3), "-0.005");
        assert_eq!(format_decimal(-12345, 2), "-123.45");
        assert_eq!(format_decimal(42, 0), "42");
    }

    #[test]
    fn test_timestamp_type_name() {
        assert_eq!(TimestampType::new(3).name(), "DateTime64(3)");
        assert_eq!(
            TimestampType::new(6).with_timezone("UTC").name(),
            "DateTime64(6, 'UTC')"
        );
    }

    #[test]
    fn test_format_timestamp() {
        let ty = TimestampType::new(3);
        assert_eq!(ty.format(0), "1970-01-01T00:00:00Z");
        assert_eq!(ty.format(1_500), "1970-01-01T00:00:01.500Z");
        assert_eq!(ty.to_seconds(1_500), 1.5);
    }

    #[test]
    fn test_scalar_literal() {
        assert_eq!(ScalarType::Float64.literal(1.0), Expr::float(1.0));
        assert_eq!(
            ScalarType::Float32.literal(1.0),
            Expr::cast(Expr::float(1.0), "Float32")
        );
    }
}
