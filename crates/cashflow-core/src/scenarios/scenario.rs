use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

use crate::assumptions::CashFlowAssumptions;
use crate::config::{EngineConfig, IrrSolverConfig, ScenarioConfig, ScenarioShift};
use crate::model::{run_model, CashFlowModelOutput};
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::CashFlowResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioType {
    #[serde(rename = "Base Case")]
    BaseCase,
    #[serde(rename = "Best Case")]
    BestCase,
    #[serde(rename = "Worst Case")]
    WorstCase,
}

impl ScenarioType {
    pub fn label(self) -> &'static str {
        match self {
            ScenarioType::BaseCase => "Base Case",
            ScenarioType::BestCase => "Best Case",
            ScenarioType::WorstCase => "Worst Case",
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One scenario with its own complete model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialScenario {
    pub scenario_type: ScenarioType,
    pub cash_flow_model: CashFlowModelOutput,
}

/// A variant that could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFailure {
    pub scenario_type: ScenarioType,
    pub error: String,
}

/// Base case plus whichever variants computed successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub base: FinancialScenario,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<FinancialScenario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst: Option<FinancialScenario>,
    pub failures: Vec<ScenarioFailure>,
}

impl ScenarioSet {
    /// Present scenarios in Base, Best, Worst order.
    pub fn scenarios(&self) -> Vec<&FinancialScenario> {
        std::iter::once(&self.base)
            .chain(self.best.as_ref())
            .chain(self.worst.as_ref())
            .collect()
    }
}

/// Apply a shift to every year of the base assumptions, producing an
/// independent copy. Cost ratios are floored at zero.
pub fn derive_assumptions(base: &CashFlowAssumptions, shift: &ScenarioShift) -> CashFlowAssumptions {
    let mut derived = base.clone();

    shift_series(&mut derived.revenue_growth_rate, shift.growth_delta, None);
    shift_series(
        &mut derived.cogs_percentage,
        shift.cogs_delta,
        Some(Decimal::ZERO),
    );
    for series in [
        &mut derived.opex.research_and_development,
        &mut derived.opex.sales_and_marketing,
        &mut derived.opex.general_and_administrative,
    ] {
        shift_series(series, shift.opex_delta, Some(Decimal::ZERO));
    }

    derived
}

fn shift_series(series: &mut [Rate], delta: Rate, floor: Option<Rate>) {
    for rate in series.iter_mut() {
        let shifted = *rate + delta;
        *rate = match floor {
            Some(f) => shifted.max(f),
            None => shifted,
        };
    }
}

/// Run Base, Best and Worst, deriving the variants from the base with the
/// configured shifts.
pub fn run_scenarios(
    base: CashFlowAssumptions,
    shifts: &ScenarioConfig,
    irr_config: &IrrSolverConfig,
) -> CashFlowResult<ScenarioSet> {
    let best = derive_assumptions(&base, &shifts.best);
    let worst = derive_assumptions(&base, &shifts.worst);
    run_explicit_scenarios(base, Some(best), Some(worst), irr_config)
}

/// `run_scenarios` under an engine configuration, wrapped in the standard
/// output envelope.
pub fn build_scenarios(
    base: CashFlowAssumptions,
    config: &EngineConfig,
) -> CashFlowResult<ComputationOutput<ScenarioSet>> {
    let start = Instant::now();

    let set = run_scenarios(base, &config.scenarios, &config.irr)?;

    let warnings = set
        .failures
        .iter()
        .map(|f| format!("{} could not be computed: {}", f.scenario_type, f.error))
        .collect();

    let echoed = serde_json::json!({
        "base": &set.base.cash_flow_model.assumptions,
        "shifts": &config.scenarios,
    });
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Base/Best/Worst Scenario Cash-Flow Models",
        &echoed,
        warnings,
        elapsed,
        set,
    ))
}

/// Run caller-supplied variant assumption sets alongside the base.
///
/// Each scenario is computed from its own copy. A failing Best or Worst run
/// is recorded in `failures`; only a failing Base run is an error.
pub fn run_explicit_scenarios(
    base: CashFlowAssumptions,
    best: Option<CashFlowAssumptions>,
    worst: Option<CashFlowAssumptions>,
    irr_config: &IrrSolverConfig,
) -> CashFlowResult<ScenarioSet> {
    let base = FinancialScenario {
        scenario_type: ScenarioType::BaseCase,
        cash_flow_model: run_model(base, irr_config)?,
    };

    let mut failures = Vec::new();
    let mut run_variant = |scenario_type: ScenarioType, assumptions: Option<CashFlowAssumptions>| {
        let assumptions = assumptions?;
        match run_model(assumptions, irr_config) {
            Ok(cash_flow_model) => {
                debug!(scenario = %scenario_type, "scenario computed");
                Some(FinancialScenario {
                    scenario_type,
                    cash_flow_model,
                })
            }
            Err(e) => {
                warn!(scenario = %scenario_type, "scenario failed: {e}");
                failures.push(ScenarioFailure {
                    scenario_type,
                    error: e.to_string(),
                });
                None
            }
        }
    };

    let best = run_variant(ScenarioType::BestCase, best);
    let worst = run_variant(ScenarioType::WorstCase, worst);

    Ok(ScenarioSet {
        base,
        best,
        worst,
        failures,
    })
}
