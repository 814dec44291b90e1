// Engine tunables
// Loaded from a TOML file by the CLI; every section falls back to its defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CashFlowError;
use crate::types::Rate;
use crate::CashFlowResult;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub irr: IrrSolverConfig,
    pub scenarios: ScenarioConfig,
}

impl EngineConfig {
    /// Parse a TOML document. Missing sections and keys use defaults.
    pub fn from_toml_str(source: &str) -> CashFlowResult<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CashFlowResult<()> {
        self.irr.validate()
    }
}

/// Search budget for the IRR solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrSolverConfig {
    /// Starting point for Newton-Raphson
    pub guess: Rate,
    /// Lower edge of the bisection bracket (must be > -100%)
    pub lower_bound: Rate,
    /// Upper edge of the bisection bracket
    pub upper_bound: Rate,
    pub max_newton_iterations: u32,
    pub max_bisection_iterations: u32,
    /// |NPV| below which a rate is accepted as the root
    pub tolerance: Decimal,
}

impl Default for IrrSolverConfig {
    fn default() -> Self {
        Self {
            guess: dec!(0.10),
            lower_bound: dec!(-0.99),
            upper_bound: dec!(10.0),
            max_newton_iterations: 100,
            max_bisection_iterations: 200,
            tolerance: dec!(0.0000001),
        }
    }
}

impl IrrSolverConfig {
    pub fn validate(&self) -> CashFlowResult<()> {
        if self.lower_bound <= dec!(-1) {
            return Err(CashFlowError::ConfigError(
                "irr.lower_bound must be greater than -1".into(),
            ));
        }
        if self.lower_bound >= self.upper_bound {
            return Err(CashFlowError::ConfigError(format!(
                "irr bracket is empty: [{}, {}]",
                self.lower_bound, self.upper_bound
            )));
        }
        if self.guess <= dec!(-1) {
            return Err(CashFlowError::ConfigError(
                "irr.guess must be greater than -1".into(),
            ));
        }
        if self.max_newton_iterations == 0 || self.max_bisection_iterations == 0 {
            return Err(CashFlowError::ConfigError(
                "irr iteration budgets must be positive".into(),
            ));
        }
        if self.tolerance <= Decimal::ZERO {
            return Err(CashFlowError::ConfigError(
                "irr.tolerance must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Adjustment applied to every year of the base assumptions to derive a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioShift {
    /// Added to each year's revenue growth rate
    pub growth_delta: Rate,
    /// Added to each year's COGS percentage
    pub cogs_delta: Rate,
    /// Added to each year's R&D, S&M and G&A percentages
    pub opex_delta: Rate,
}

impl Default for ScenarioShift {
    fn default() -> Self {
        Self {
            growth_delta: Decimal::ZERO,
            cogs_delta: Decimal::ZERO,
            opex_delta: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub best: ScenarioShift,
    pub worst: ScenarioShift,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            best: ScenarioShift {
                growth_delta: dec!(0.10),
                cogs_delta: dec!(-0.02),
                opex_delta: dec!(-0.02),
            },
            worst: ScenarioShift {
                growth_delta: dec!(-0.10),
                cogs_delta: dec!(0.03),
                opex_delta: dec!(0.03),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let source = r#"
[irr]
guess = "0.25"
max_newton_iterations = 20

[scenarios.worst]
growth_delta = "-0.3"
"#;
        let config = EngineConfig::from_toml_str(source).unwrap();
        assert_eq!(config.irr.guess, dec!(0.25));
        assert_eq!(config.irr.max_newton_iterations, 20);
        assert_eq!(config.irr.upper_bound, dec!(10.0));
        assert_eq!(config.scenarios.worst.growth_delta, dec!(-0.3));
        assert_eq!(config.scenarios.worst.cogs_delta, Decimal::ZERO);
        assert_eq!(config.scenarios.best, ScenarioConfig::default().best);
    }

    #[test]
    fn test_inverted_bracket_rejected() {
        let source = r#"
[irr]
lower_bound = "0.5"
upper_bound = "0.1"
"#;
        assert!(matches!(
            EngineConfig::from_toml_str(source),
            Err(CashFlowError::ConfigError(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("[irr\nguess = 1"),
            Err(CashFlowError::ConfigError(_))
        ));
    }
}
