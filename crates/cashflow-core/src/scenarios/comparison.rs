use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::CashFlowModelOutput;
use crate::types::{Money, Rate};

use super::scenario::{ScenarioSet, ScenarioType};

/// Running total of FCFF for one scenario, one point per forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeFcffSeries {
    pub scenario_type: ScenarioType,
    pub points: Vec<Money>,
}

/// Headline figures for one scenario relative to the base case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub scenario_type: ScenarioType,
    pub enterprise_value: Money,
    pub npv: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    pub deviation_from_base: Money,
    pub deviation_pct: Rate,
}

/// cumulative[i] = cumulative[i-1] + fcff[i], starting from zero.
pub fn cumulative_fcff(model: &CashFlowModelOutput) -> Vec<Money> {
    model
        .cash_flows
        .iter()
        .scan(Decimal::ZERO, |running, year| {
            *running += year.fcff;
            Some(*running)
        })
        .collect()
}

/// One cumulative-FCFF series per computed scenario.
pub fn comparison_series(set: &ScenarioSet) -> Vec<CumulativeFcffSeries> {
    set.scenarios()
        .into_iter()
        .map(|s| CumulativeFcffSeries {
            scenario_type: s.scenario_type,
            points: cumulative_fcff(&s.cash_flow_model),
        })
        .collect()
}

/// EV, NPV and IRR per scenario with the EV deviation from base.
pub fn compare_scenarios(set: &ScenarioSet) -> Vec<ScenarioComparison> {
    let base_ev = set.base.cash_flow_model.enterprise_value;

    set.scenarios()
        .into_iter()
        .map(|s| {
            let model = &s.cash_flow_model;
            let deviation = model.enterprise_value - base_ev;
            let deviation_pct = if base_ev.is_zero() {
                Decimal::ZERO
            } else {
                deviation / base_ev
            };
            ScenarioComparison {
                scenario_type: s.scenario_type,
                enterprise_value: model.enterprise_value,
                npv: model.npv,
                irr: model.irr,
                deviation_from_base: deviation,
                deviation_pct,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::CashFlowAssumptions;
    use crate::config::{IrrSolverConfig, ScenarioConfig};
    use crate::scenarios::run_scenarios;
    use pretty_assertions::assert_eq;

    fn default_set() -> ScenarioSet {
        run_scenarios(
            CashFlowAssumptions::default(),
            &ScenarioConfig::default(),
            &IrrSolverConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_cumulative_fcff_accumulates_from_zero() {
        let set = default_set();
        let model = &set.base.cash_flow_model;
        let points = cumulative_fcff(model);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], model.cash_flows[0].fcff);
        for i in 1..points.len() {
            assert_eq!(points[i], points[i - 1] + model.cash_flows[i].fcff);
        }
    }

    #[test]
    fn test_series_per_scenario_share_horizon() {
        let set = default_set();
        let series = comparison_series(&set);
        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|s| s.points.len() == 5));
    }

    #[test]
    fn test_base_has_zero_deviation() {
        let set = default_set();
        let rows = compare_scenarios(&set);
        assert_eq!(rows[0].scenario_type, ScenarioType::BaseCase);
        assert_eq!(rows[0].deviation_from_base, Decimal::ZERO);
        assert_eq!(rows[0].deviation_pct, Decimal::ZERO);
        assert!(rows[1].deviation_pct > Decimal::ZERO);
        assert!(rows[2].deviation_pct < Decimal::ZERO);
    }
}
