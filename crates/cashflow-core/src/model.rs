use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::assumptions::CashFlowAssumptions;
use crate::config::{EngineConfig, IrrSolverConfig};
use crate::projection::{project, CashFlowYear};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::valuation::{value, Valuation};
use crate::CashFlowResult;

const METHODOLOGY: &str = "Venture FCFF DCF (percent-of-revenue, end-of-year discounting)";

/// Result of one complete model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowModelOutput {
    /// The assumptions this output was derived from
    pub assumptions: CashFlowAssumptions,
    pub cash_flows: Vec<CashFlowYear>,
    pub terminal_value: Money,
    pub enterprise_value: Money,
    pub npv: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    pub valuation: Valuation,
}

/// Validate, project and value one assumption set.
pub fn run_model(
    assumptions: CashFlowAssumptions,
    irr_config: &IrrSolverConfig,
) -> CashFlowResult<CashFlowModelOutput> {
    assumptions.validate()?;
    let cash_flows = project(&assumptions)?;
    let valuation = value(&cash_flows, &assumptions, irr_config)?;

    Ok(CashFlowModelOutput {
        terminal_value: valuation.terminal_value,
        enterprise_value: valuation.enterprise_value,
        npv: valuation.npv,
        irr: valuation.irr,
        cash_flows,
        assumptions,
        valuation,
    })
}

/// Run the cash-flow model and wrap it in the standard output envelope.
pub fn build_cash_flow_model(
    assumptions: CashFlowAssumptions,
    config: &EngineConfig,
) -> CashFlowResult<ComputationOutput<CashFlowModelOutput>> {
    let start = Instant::now();

    let output = run_model(assumptions, &config.irr)?;
    let warnings = model_warnings(&output);
    debug!(warnings = warnings.len(), "built cash-flow model");

    let echoed = output.assumptions.clone();
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        METHODOLOGY,
        &echoed,
        warnings,
        elapsed,
        output,
    ))
}

/// `build_cash_flow_model` with the default engine configuration.
pub fn calculate_cash_flow_model(
    assumptions: CashFlowAssumptions,
) -> CashFlowResult<ComputationOutput<CashFlowModelOutput>> {
    build_cash_flow_model(assumptions, &EngineConfig::default())
}

pub(crate) fn model_warnings(output: &CashFlowModelOutput) -> Vec<String> {
    let mut warnings = Vec::new();

    if output.assumptions.initial_investment.is_none() {
        warnings.push(
            "No initial investment given; NPV and IRR are measured against initial revenue"
                .into(),
        );
    }
    if let Some(reason) = &output.valuation.irr_unavailable_reason {
        warnings.push(format!("IRR unavailable: {reason}"));
    }
    for year in output.cash_flows.iter().filter(|y| y.ebit < Decimal::ZERO) {
        warnings.push(format!(
            "Year {} EBIT is negative ({}); tax floored at zero with no loss carryforward",
            year.year,
            year.ebit.round_dp(2)
        ));
    }
    if output.valuation.terminal_value_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value",
            output.valuation.terminal_value_pct * dec!(100)
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::TerminalValueSpec;
    use crate::error::CashFlowError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_model_mirrors_valuation() {
        let out = calculate_cash_flow_model(CashFlowAssumptions::default()).unwrap();
        let m = &out.result;
        assert_eq!(m.cash_flows.len(), 5);
        assert_eq!(m.enterprise_value, m.valuation.enterprise_value);
        assert_eq!(m.terminal_value, m.valuation.terminal_value);
        assert_eq!(m.npv, m.valuation.npv);
        assert_eq!(m.irr, m.valuation.irr);
        assert_eq!(m.assumptions, CashFlowAssumptions::default());
        assert_eq!(out.methodology, METHODOLOGY);
    }

    #[test]
    fn test_envelope_echoes_assumptions() {
        let mut a = CashFlowAssumptions::default();
        a.initial_investment = Some(dec!(80000));
        let out = build_cash_flow_model(a.clone(), &EngineConfig::default()).unwrap();
        assert_eq!(out.assumptions, serde_json::to_value(&a).unwrap());
        assert_eq!(out.result.assumptions, a);
    }

    #[test]
    fn test_default_warns_about_revenue_basis() {
        let out = calculate_cash_flow_model(CashFlowAssumptions::default()).unwrap();
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("measured against initial revenue")));
    }

    #[test]
    fn test_validation_runs_first() {
        let mut a = CashFlowAssumptions::default();
        a.terminal_value = TerminalValueSpec::GordonGrowth {
            growth_rate: dec!(0.2),
        };
        assert!(matches!(
            calculate_cash_flow_model(a),
            Err(CashFlowError::InvalidGrowthAssumption { .. })
        ));
    }

    #[test]
    fn test_loss_years_are_flagged() {
        let mut a = CashFlowAssumptions::default();
        a.cogs_percentage = vec![dec!(0.95); 5];
        let out = calculate_cash_flow_model(a).unwrap();
        let loss_warnings = out
            .warnings
            .iter()
            .filter(|w| w.contains("no loss carryforward"))
            .count();
        assert_eq!(loss_warnings, 5);
        assert!(out.result.irr.is_none());
    }
}
