use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use cashflow_core::model::build_cash_flow_model;
use cashflow_core::{CashFlowAssumptions, EngineConfig};

use crate::input;

/// Arguments for a single model run
#[derive(Args)]
pub struct ModelArgs {
    /// Path to a JSON or YAML assumptions file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Initial investment; overrides the file and replaces the revenue fallback
    #[arg(long)]
    pub initial_investment: Option<Decimal>,
}

/// Assumptions from `--input`, else piped stdin.
pub fn load_assumptions(
    path: Option<&str>,
) -> Result<CashFlowAssumptions, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_structured(path);
    }
    if let Some(assumptions) = input::stdin::read_stdin()? {
        return Ok(assumptions);
    }
    Err("No assumptions given: use --input <file> or pipe JSON/YAML on stdin (see `cfm defaults`)".into())
}

pub fn run_model(args: ModelArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut assumptions = load_assumptions(args.input.as_deref())?;
    if args.initial_investment.is_some() {
        assumptions.initial_investment = args.initial_investment;
    }

    let result = build_cash_flow_model(assumptions, config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_defaults() -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(CashFlowAssumptions::default())?)
}
