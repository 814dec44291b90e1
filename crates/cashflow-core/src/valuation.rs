use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assumptions::{check_gordon_growth, CashFlowAssumptions, TerminalValueSpec};
use crate::config::IrrSolverConfig;
use crate::error::CashFlowError;
use crate::projection::CashFlowYear;
use crate::time_value::{discount_factor, irr};
use crate::types::{Money, Rate};
use crate::CashFlowResult;

/// Valuation of one projected cash-flow series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub terminal_value: Money,
    /// Sum of present values of the explicit-period FCFFs
    pub pv_of_fcff: Money,
    pub pv_of_terminal: Money,
    /// EV = PV(FCFFs) + PV(TV)
    pub enterprise_value: Money,
    /// EV net of the initial investment
    pub npv: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr_unavailable_reason: Option<String>,
    /// Share of EV contributed by the terminal value
    pub terminal_value_pct: Rate,
}

/// Terminal value at the end of the explicit forecast.
pub fn terminal_value(
    final_year: &CashFlowYear,
    spec: &TerminalValueSpec,
    discount_rate: Rate,
) -> CashFlowResult<Money> {
    match *spec {
        TerminalValueSpec::ExitMultiple { multiple } => Ok(final_year.ebitda * multiple),
        TerminalValueSpec::GordonGrowth { growth_rate } => {
            check_gordon_growth(discount_rate, growth_rate)?;
            Ok(final_year.fcff * (Decimal::ONE + growth_rate) / (discount_rate - growth_rate))
        }
    }
}

/// The series IRR is solved over: the initial outlay followed by every FCFF.
pub fn irr_cash_flows(cash_flows: &[CashFlowYear], initial_investment: Money) -> Vec<Money> {
    std::iter::once(-initial_investment)
        .chain(cash_flows.iter().map(|y| y.fcff))
        .collect()
}

/// Value a projected series under the given assumptions.
///
/// An IRR that cannot be solved is reported as `irr: None` with a reason;
/// terminal value, EV and NPV are unaffected.
pub fn value(
    cash_flows: &[CashFlowYear],
    assumptions: &CashFlowAssumptions,
    irr_config: &IrrSolverConfig,
) -> CashFlowResult<Valuation> {
    let last = cash_flows.last().ok_or_else(|| {
        CashFlowError::InsufficientData("No projection years to value".into())
    })?;
    if cash_flows.len() != assumptions.forecast_horizon as usize {
        return Err(CashFlowError::MalformedAssumptions {
            field: "cash_flows".into(),
            reason: format!(
                "expected {} projected years, got {}",
                assumptions.forecast_horizon,
                cash_flows.len()
            ),
        });
    }

    let rate = assumptions.discount_rate;
    let terminal_value = terminal_value(last, &assumptions.terminal_value, rate)?;

    let mut pv_of_fcff = Decimal::ZERO;
    for (idx, year) in cash_flows.iter().enumerate() {
        pv_of_fcff += year.fcff * discount_factor(rate, idx as u32 + 1)?;
    }
    let pv_of_terminal = terminal_value * discount_factor(rate, assumptions.forecast_horizon)?;
    let enterprise_value = pv_of_fcff + pv_of_terminal;

    let initial_investment = assumptions.effective_initial_investment();
    let npv = enterprise_value - initial_investment;

    let (irr, irr_unavailable_reason) =
        match irr(&irr_cash_flows(cash_flows, initial_investment), irr_config) {
            Ok(r) => (Some(r), None),
            Err(e @ CashFlowError::NoConvergingRoot { .. }) => {
                warn!("IRR unavailable: {e}");
                (None, Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_of_terminal / enterprise_value
    };

    debug!(%enterprise_value, %npv, "valued cash flows");

    Ok(Valuation {
        terminal_value,
        pv_of_fcff,
        pv_of_terminal,
        enterprise_value,
        npv,
        irr,
        irr_unavailable_reason,
        terminal_value_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::project;
    use crate::time_value::npv;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn valued(a: &CashFlowAssumptions) -> CashFlowResult<Valuation> {
        let years = project(a)?;
        value(&years, a, &IrrSolverConfig::default())
    }

    #[test]
    fn test_exit_multiple_terminal_value() {
        let a = CashFlowAssumptions::default();
        let years = project(&a).unwrap();
        let v = value(&years, &a, &IrrSolverConfig::default()).unwrap();
        assert_eq!(v.terminal_value, years[4].ebitda * dec!(5));
        assert!(v.terminal_value >= Decimal::ZERO);
    }

    #[test]
    fn test_gordon_growth_terminal_value() {
        let mut a = CashFlowAssumptions::default();
        a.terminal_value = TerminalValueSpec::GordonGrowth {
            growth_rate: dec!(0.03),
        };
        let years = project(&a).unwrap();
        let v = value(&years, &a, &IrrSolverConfig::default()).unwrap();
        let expected = years[4].fcff * dec!(1.03) / dec!(0.12);
        assert_eq!(v.terminal_value, expected);
    }

    #[test]
    fn test_gordon_growth_at_discount_rate_rejected() {
        let mut a = CashFlowAssumptions::default();
        a.terminal_value = TerminalValueSpec::GordonGrowth {
            growth_rate: dec!(0.15),
        };
        let years = project(&a).unwrap();
        let err = value(&years, &a, &IrrSolverConfig::default()).unwrap_err();
        assert!(matches!(err, CashFlowError::InvalidGrowthAssumption { .. }));
    }

    #[test]
    fn test_enterprise_value_composition() {
        let a = CashFlowAssumptions::default();
        let v = valued(&a).unwrap();
        assert_eq!(v.enterprise_value, v.pv_of_fcff + v.pv_of_terminal);
        assert_eq!(v.npv, v.enterprise_value - dec!(100000));
        assert!(v.terminal_value_pct > Decimal::ZERO && v.terminal_value_pct < Decimal::ONE);
    }

    #[test]
    fn test_explicit_initial_investment_drives_npv() {
        let mut a = CashFlowAssumptions::default();
        a.initial_investment = Some(dec!(400000));
        let v = valued(&a).unwrap();
        assert_eq!(v.npv, v.enterprise_value - dec!(400000));
    }

    #[test]
    fn test_irr_zeroes_series_npv() {
        let a = CashFlowAssumptions::default();
        let years = project(&a).unwrap();
        let v = value(&years, &a, &IrrSolverConfig::default()).unwrap();
        let irr = v.irr.expect("default model has a sign change");
        let series = irr_cash_flows(&years, a.effective_initial_investment());
        assert!(npv(irr, &series).unwrap().abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_unavailable_keeps_other_fields() {
        // Heavy losses every year: the series never turns positive
        let mut a = CashFlowAssumptions::default();
        a.cogs_percentage = vec![dec!(0.95); 5];
        let v = valued(&a).unwrap();
        assert!(v.irr.is_none());
        assert!(v.irr_unavailable_reason.is_some());
        assert_eq!(v.enterprise_value, v.pv_of_fcff + v.pv_of_terminal);
    }

    #[test]
    fn test_empty_cash_flows() {
        let a = CashFlowAssumptions::default();
        assert!(matches!(
            value(&[], &a, &IrrSolverConfig::default()),
            Err(CashFlowError::InsufficientData(_))
        ));
    }
}
