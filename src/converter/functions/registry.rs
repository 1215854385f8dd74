use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::warn;

use super::datetime::DateTimeFunction;
use super::math::MathFunction;
use super::over_range::RangeFunction;

/// Errors that can occur while building a function registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Function {name} is claimed by both {existing} and {new}")]
    AlreadyRegistered {
        name: String,
        existing: &'static str,
        new: &'static str,
    },
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// How a PromQL function is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionImpl {
    Vector,
    Scalar,
    Time,
    DateTime(DateTimeFunction),
    Math(MathFunction),
    Pi,
    OverRange(RangeFunction),
}

impl FunctionImpl {
    /// Name of the family this implementation belongs to.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Scalar => "scalar",
            Self::Time => "time",
            Self::DateTime(_) => "datetime",
            Self::Math(_) => "math",
            Self::Pi => "pi",
            Self::OverRange(_) => "over_range",
        }
    }
}

/// Every built-in function, families in dispatch priority order.
fn builtin_functions() -> Vec<(&'static str, FunctionImpl)> {
    let mut functions = vec![
        ("vector", FunctionImpl::Vector),
        ("scalar", FunctionImpl::Scalar),
        ("time", FunctionImpl::Time),
    ];
    functions.extend(DateTimeFunction::ALL.iter().map(|f| (f.name(), FunctionImpl::DateTime(*f))));
    functions.extend(MathFunction::ALL.iter().map(|f| (f.name(), FunctionImpl::Math(*f))));
    functions.push(("pi", FunctionImpl::Pi));
    functions.extend(RangeFunction::ALL.iter().map(|f| (f.name(), FunctionImpl::OverRange(*f))));
    functions
}

static BUILTIN: OnceLock<FunctionRegistry> = OnceLock::new();

/// Maps PromQL function names to their lowering.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionImpl>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`. A name can only belong to one implementation.
    pub fn register(
        &mut self,
        name: &'static str,
        implementation: FunctionImpl,
    ) -> RegistryResult<()> {
        if let Some(existing) = self.functions.get(name) {
            return Err(RegistryError::AlreadyRegistered {
                name: name.to_string(),
                existing: existing.family(),
                new: implementation.family(),
            });
        }
        self.functions.insert(name, implementation);
        Ok(())
    }

    /// Builds the registry of built-in functions, failing on any name two
    /// families both claim.
    pub fn try_builtin() -> RegistryResult<Self> {
        let mut registry = Self::new();
        for (name, implementation) in builtin_functions() {
            registry.register(name, implementation)?;
        }
        Ok(registry)
    }

    /// The process-wide built-in registry. On a name conflict the family
    /// earlier in dispatch order keeps the name.
    pub fn builtin() -> &'static FunctionRegistry {
        BUILTIN.get_or_init(|| {
            let mut registry = Self::new();
            for (name, implementation) in builtin_functions() {
                if let Err(e) = registry.register(name, implementation) {
                    warn!("Ignoring duplicate function registration: {}", e);
                }
            }
            registry
        })
    }

    pub fn get(&self, name: &str) -> Option<FunctionImpl> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_consistent() {
        let registry = FunctionRegistry::try_builtin().unwrap();
        assert_eq!(registry.len(), 3 + 8 + 23 + 1 + 5);
        assert_eq!(registry.len(), FunctionRegistry::builtin().len());
    }

    #[test]
    fn test_lookup() {
        let registry = FunctionRegistry::builtin();
        assert_eq!(registry.get("vector"), Some(FunctionImpl::Vector));
        assert_eq!(registry.get("abs"), Some(FunctionImpl::Math(MathFunction::Abs)));
        assert_eq!(
            registry.get("day_of_week"),
            Some(FunctionImpl::DateTime(DateTimeFunction::DayOfWeek))
        );
        assert_eq!(
            registry.get("last_over_time"),
            Some(FunctionImpl::OverRange(RangeFunction::LastOverTime))
        );
        assert_eq!(registry.get("histogram_quantile"), None);
        assert!(!registry.contains("sum_over_time"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = FunctionRegistry::new();
        registry.register("abs", FunctionImpl::Math(MathFunction::Abs)).unwrap();

        let result = registry.register("abs", FunctionImpl::Pi);
        assert!(matches!(
            result,
            Err(RegistryError::AlreadyRegistered { existing: "math", new: "pi", .. })
        ));
        assert_eq!(registry.get("abs"), Some(FunctionImpl::Math(MathFunction::Abs)));
    }
}
