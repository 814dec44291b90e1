use cashflow_core::model::calculate_cash_flow_model;
use cashflow_core::scenarios::build_scenarios;
use cashflow_core::workbook::layout::{column_letter, year_column, CALCULATIONS_SHEET};
use cashflow_core::workbook::{
    export_workbook, recalculate, synthesize, CalcRow, CellContent, ExportOptions, ValuationRow,
    FORMULA_TOLERANCE,
};
use cashflow_core::{CashFlowAssumptions, CashFlowModelOutput, EngineConfig, TerminalValueSpec};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Steady-state venture over `years` years with flat ratios.
fn venture(years: usize, cogs: Decimal) -> CashFlowAssumptions {
    let mut a = CashFlowAssumptions::default();
    a.forecast_horizon = years as u32;
    a.revenue_growth_rate = vec![dec!(0.2); years];
    a.cogs_percentage = vec![cogs; years];
    a.opex.research_and_development = vec![dec!(0.1); years];
    a.opex.sales_and_marketing = vec![dec!(0.1); years];
    a.opex.general_and_administrative = vec![dec!(0.05); years];
    a.capex_percentage = vec![dec!(0.05); years];
    a.depreciation_percentage = vec![dec!(0.05); years];
    a
}

fn model_for(a: CashFlowAssumptions) -> CashFlowModelOutput {
    assert!(a.validate().is_ok());
    calculate_cash_flow_model(a).unwrap().result
}

fn calc_formula(model: &CashFlowModelOutput, row: u32, col: u16) -> String {
    let wb = synthesize(model, "Horizon", None).unwrap();
    let calc = wb.sheet(CALCULATIONS_SHEET).unwrap();
    match &calc.get(row, col).unwrap().content {
        CellContent::Formula { formula, .. } => formula.clone(),
        other => panic!("expected a formula, got {other:?}"),
    }
}

// ===========================================================================
// Short horizon
// ===========================================================================

#[test]
fn test_three_year_model_round_trips() {
    let model = model_for(venture(3, dec!(0.3)));
    assert_eq!(model.cash_flows.len(), 3);

    let wb = synthesize(&model, "Short", None).unwrap();
    assert_eq!(wb.formula_count(), 17 * 3 + 5);
    let report = recalculate(&wb).unwrap();
    assert!(report.is_consistent(FORMULA_TOLERANCE));

    let last_col = year_column(2);
    assert_eq!(column_letter(last_col), "D");
    assert_eq!(
        calc_formula(&model, ValuationRow::TerminalValue.row(), 1),
        "=D9*Inputs!$B$8"
    );
    assert_eq!(
        calc_formula(&model, ValuationRow::PvOfFcff.row(), 1),
        "=SUM(B18:D18)"
    );
    assert_eq!(
        calc_formula(&model, ValuationRow::PvOfTerminal.row(), 1),
        "=B20/(1+Inputs!$B$6)^3"
    );
}

#[test]
fn test_single_year_model() {
    let model = model_for(venture(1, dec!(0.3)));
    let wb = synthesize(&model, "One", None).unwrap();
    assert!(recalculate(&wb).unwrap().is_consistent(FORMULA_TOLERANCE));
    assert_eq!(
        calc_formula(&model, CalcRow::Revenue.row(), year_column(0)),
        "=Inputs!$B$2*(1+Inputs!B9)"
    );
}

// ===========================================================================
// Long horizon
// ===========================================================================

#[test]
fn test_ten_year_model_round_trips() {
    let mut a = venture(10, dec!(0.3));
    a.terminal_value = TerminalValueSpec::GordonGrowth {
        growth_rate: dec!(0.03),
    };
    let model = model_for(a);
    assert_eq!(model.cash_flows.len(), 10);
    assert!(model.irr.is_some());

    let wb = synthesize(&model, "Long", None).unwrap();
    assert_eq!(wb.formula_count(), 17 * 10 + 5);
    assert!(recalculate(&wb).unwrap().is_consistent(FORMULA_TOLERANCE));

    assert_eq!(column_letter(year_column(9)), "K");
    assert_eq!(
        calc_formula(&model, CalcRow::Revenue.row(), year_column(9)),
        "=J2*(1+Inputs!K9)"
    );
    assert_eq!(
        calc_formula(&model, ValuationRow::TerminalValue.row(), 1),
        "=K16*(1+Inputs!$B$8)/(Inputs!$B$6-Inputs!$B$8)"
    );
}

#[test]
fn test_long_loss_making_model_reports_irr_unavailable() {
    for years in [12, 16, 30] {
        let out = calculate_cash_flow_model(venture(years, dec!(0.95))).unwrap();
        let model = &out.result;
        assert_eq!(model.cash_flows.len(), years);
        assert!(model.cash_flows.iter().all(|y| y.fcff < Decimal::ZERO));
        assert!(model.irr.is_none(), "horizon {years}");
        assert!(model.valuation.irr_unavailable_reason.is_some());
        assert_eq!(
            model.npv,
            model.enterprise_value - model.assumptions.effective_initial_investment()
        );
        assert!(out.warnings.iter().any(|w| w.starts_with("IRR unavailable")));
    }
}

#[test]
fn test_long_horizon_export_with_scenarios() {
    let a = venture(12, dec!(0.95));
    let model = model_for(a.clone());
    let set = build_scenarios(a, &EngineConfig::default()).unwrap().result;
    assert!(set.failures.is_empty());
    for scenario in set.scenarios() {
        assert_eq!(scenario.cash_flow_model.cash_flows.len(), 12);
    }

    let options = ExportOptions {
        venture_name: "Twelve".into(),
        scenarios: Some(&set),
    };
    let artifact = export_workbook(Some(&model), &options).unwrap();
    assert_eq!(artifact.formulas_written, 17 * 12 + 5);
    assert!(artifact.bytes.starts_with(b"PK"));
}
