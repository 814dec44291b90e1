use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::path::PathBuf;

use cashflow_core::model::run_model;
use cashflow_core::scenarios::run_scenarios;
use cashflow_core::workbook::{export_workbook, recalculate, synthesize, ExportOptions};
use cashflow_core::EngineConfig;

use crate::commands::model::load_assumptions;

/// Arguments for workbook export
#[derive(Args)]
pub struct ExportArgs {
    /// Path to a JSON or YAML assumptions file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Venture name, used in the Dashboard and the file name
    #[arg(long, default_value = "Venture")]
    pub venture: String,

    /// Directory to write `{venture}_Cash_Flow_Model.xlsx` into
    #[arg(long, default_value = ".")]
    pub out_dir: String,

    /// Add the Base/Best/Worst comparison to the Dashboard
    #[arg(long)]
    pub with_scenarios: bool,
}

/// Arguments for the formula audit
#[derive(Args)]
pub struct AuditArgs {
    /// Path to a JSON or YAML assumptions file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Largest acceptable gap between a formula and the engine value
    #[arg(long, default_value = "0.000001")]
    pub tolerance: Decimal,
}

pub fn run_export(args: ExportArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = load_assumptions(args.input.as_deref())?;

    let set = if args.with_scenarios {
        Some(run_scenarios(assumptions.clone(), &config.scenarios, &config.irr)?)
    } else {
        None
    };
    let model = match &set {
        Some(set) => set.base.cash_flow_model.clone(),
        None => run_model(assumptions, &config.irr)?,
    };

    let options = ExportOptions {
        venture_name: args.venture,
        scenarios: set.as_ref(),
    };
    let artifact = export_workbook(Some(&model), &options)?;
    let path = artifact.save_in(&PathBuf::from(&args.out_dir))?;

    Ok(json!({
        "result": {
            "path": path.display().to_string(),
            "file_name": artifact.file_name,
            "bytes": artifact.bytes.len(),
            "sheets": artifact.sheet_names,
            "formulas_written": artifact.formulas_written,
            "enterprise_value": model.enterprise_value,
        }
    }))
}

pub fn run_audit(args: AuditArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = load_assumptions(args.input.as_deref())?;
    let model = run_model(assumptions, &config.irr)?;

    let workbook = synthesize(&model, "Audit", None)?;
    let report = recalculate(&workbook)?;
    let tolerance = args.tolerance.abs();

    let consistent = report.is_consistent(tolerance);
    let warnings: Vec<String> = report
        .inconsistent(tolerance)
        .iter()
        .map(|c| {
            format!(
                "{} ({}) recomputes to {} but the engine computed {}",
                c.address, c.formula, c.recomputed, c.cached
            )
        })
        .collect();

    Ok(json!({
        "result": {
            "consistent": consistent,
            "cells_checked": report.cells.len(),
            "max_drift": report.max_drift,
            "tolerance": tolerance,
        },
        "warnings": warnings,
    }))
}
