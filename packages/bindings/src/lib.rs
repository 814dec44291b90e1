use napi::bindgen_prelude::Buffer;
use napi::Result as NapiResult;
use napi_derive::napi;

use cashflow_core::model::{run_model, CashFlowModelOutput};
use cashflow_core::scenarios::{compare_scenarios, comparison_series, ScenarioSet};
use cashflow_core::workbook::{export_workbook as export_xlsx, ExportOptions};
use cashflow_core::{CashFlowAssumptions, EngineConfig, SuggestionOutcome};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine configuration from optional JSON; absent fields take defaults.
fn parse_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    let Some(json) = config_json else {
        return Ok(EngineConfig::default());
    };
    let config: EngineConfig = serde_json::from_str(&json).map_err(to_napi_error)?;
    config.validate().map_err(to_napi_error)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[napi]
pub fn build_cash_flow_model(
    assumptions_json: String,
    config_json: Option<String>,
) -> NapiResult<String> {
    let assumptions: CashFlowAssumptions =
        serde_json::from_str(&assumptions_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output =
        cashflow_core::model::build_cash_flow_model(assumptions, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_assumptions() -> NapiResult<String> {
    serde_json::to_string(&CashFlowAssumptions::default()).map_err(to_napi_error)
}

/// Returns the assumptions to run on after a suggestion request, or null.
#[napi]
pub fn accept_suggestion(
    previous_json: Option<String>,
    outcome_json: String,
) -> NapiResult<Option<String>> {
    let previous: Option<CashFlowAssumptions> = previous_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(to_napi_error)?;
    let outcome: SuggestionOutcome = serde_json::from_str(&outcome_json).map_err(to_napi_error)?;

    cashflow_core::accept_suggestion(previous, outcome)
        .map(|a| serde_json::to_string(&a))
        .transpose()
        .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn run_scenarios(base_json: String, config_json: Option<String>) -> NapiResult<String> {
    let base: CashFlowAssumptions = serde_json::from_str(&base_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output =
        cashflow_core::scenarios::build_scenarios(base, &config).map_err(to_napi_error)?;

    let response = serde_json::json!({
        "scenarios": &output,
        "comparison": compare_scenarios(&output.result),
        "cumulative_fcff": comparison_series(&output.result),
    });
    serde_json::to_string(&response).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

/// xlsx bytes for a computed model (the `result` of `buildCashFlowModel`).
///
/// The model is recomputed from its own assumptions, so values edited or
/// left stale on the JS side never reach the workbook.
#[napi]
pub fn export_workbook(
    model_json: Option<String>,
    venture_name: String,
    scenarios_json: Option<String>,
    config_json: Option<String>,
) -> NapiResult<Buffer> {
    let model: Option<CashFlowModelOutput> = model_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let model = model
        .map(|m| run_model(m.assumptions, &config.irr))
        .transpose()
        .map_err(to_napi_error)?;
    let scenarios: Option<ScenarioSet> = scenarios_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(to_napi_error)?;

    let options = ExportOptions {
        venture_name,
        scenarios: scenarios.as_ref(),
    };
    let artifact = export_xlsx(model.as_ref(), &options).map_err(to_napi_error)?;
    Ok(Buffer::from(artifact.bytes))
}

#[napi]
pub fn workbook_file_name(venture_name: String) -> String {
    cashflow_core::workbook::default_file_name(&venture_name)
}
