use clap::Args;
use serde_json::{json, Value};

use cashflow_core::scenarios::{
    compare_scenarios, comparison_series, build_scenarios as run_shifted, run_explicit_scenarios,
    ScenarioSet,
};
use cashflow_core::types::{with_metadata, ComputationOutput};
use cashflow_core::{CashFlowAssumptions, EngineConfig};

use crate::commands::model::load_assumptions;
use crate::input;

/// Arguments for a Base/Best/Worst run
#[derive(Args)]
pub struct ScenariosArgs {
    /// Path to the base-case assumptions (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Explicit best-case assumptions instead of the configured shift
    #[arg(long)]
    pub best: Option<String>,

    /// Explicit worst-case assumptions instead of the configured shift
    #[arg(long)]
    pub worst: Option<String>,
}

/// Scenario set from the CLI arguments: explicit variant files when given,
/// otherwise the configured shifts applied to the base.
pub fn build_scenarios(
    args: &ScenariosArgs,
    config: &EngineConfig,
) -> Result<ComputationOutput<ScenarioSet>, Box<dyn std::error::Error>> {
    let base = load_assumptions(args.input.as_deref())?;

    if args.best.is_none() && args.worst.is_none() {
        return Ok(run_shifted(base, config)?);
    }

    let start = std::time::Instant::now();
    let best: Option<CashFlowAssumptions> = args
        .best
        .as_deref()
        .map(input::file::read_structured)
        .transpose()?;
    let worst: Option<CashFlowAssumptions> = args
        .worst
        .as_deref()
        .map(input::file::read_structured)
        .transpose()?;
    let set = run_explicit_scenarios(base, best, worst, &config.irr)?;

    let warnings = set
        .failures
        .iter()
        .map(|f| format!("{} could not be computed: {}", f.scenario_type, f.error))
        .collect();
    Ok(with_metadata(
        "Base/Best/Worst Scenario Cash-Flow Models (explicit variants)",
        &json!({ "base": &set.base.cash_flow_model.assumptions }),
        warnings,
        start.elapsed().as_micros() as u64,
        set,
    ))
}

pub fn run_scenarios(
    args: ScenariosArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let output = build_scenarios(&args, config)?;

    let summary = json!({
        "comparison": compare_scenarios(&output.result),
        "cumulative_fcff": comparison_series(&output.result),
    });
    let mut value = serde_json::to_value(&output)?;
    if let (Value::Object(map), Value::Object(extra)) = (&mut value, summary) {
        map.extend(extra);
    }
    Ok(value)
}
