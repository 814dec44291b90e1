use cashflow_core::assumptions::{accept_suggestion, SuggestionOutcome, TerminalValueSpec};
use cashflow_core::config::{EngineConfig, IrrSolverConfig};
use cashflow_core::model::{build_cash_flow_model, calculate_cash_flow_model, run_model};
use cashflow_core::projection::project;
use cashflow_core::scenarios::{build_scenarios, comparison_series, ScenarioType};
use cashflow_core::time_value::{irr, npv};
use cashflow_core::{CashFlowAssumptions, CashFlowError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// End-to-end example
// ===========================================================================

#[test]
fn test_reference_venture_year_one() {
    let out = calculate_cash_flow_model(CashFlowAssumptions::default()).unwrap();
    let y1 = &out.result.cash_flows[0];

    // 100000 * (1 + 1.5) = 250000; COGS 30% = 75000
    assert_eq!(y1.revenue, dec!(250000));
    assert_eq!(y1.cogs, dec!(75000));
    assert_eq!(y1.gross_profit, dec!(175000));
    // opex 20% + 25% + 10% of 250000
    assert_eq!(y1.opex.total, dec!(137500));
    assert_eq!(y1.ebitda, dec!(37500));
    // EBIT = 37500 - 37500 D&A = 0, so no tax; capex 25000, NWC 7500
    assert_eq!(y1.fcff, dec!(5000));
    assert!(out.result.terminal_value >= Decimal::ZERO);
}

#[test]
fn test_reference_venture_valuation() {
    let model = calculate_cash_flow_model(CashFlowAssumptions::default())
        .unwrap()
        .result;

    let fcff: Vec<Decimal> = model.cash_flows.iter().map(|y| y.fcff).collect();
    assert_eq!(
        fcff,
        vec![
            dec!(5000),
            dec!(58260),
            dec!(210540),
            dec!(513766),
            dec!(933134.4)
        ]
    );
    // Exit multiple: 5 * final-year EBITDA of 1330560
    assert_eq!(model.terminal_value, dec!(6652800));
    assert_eq!(
        model.enterprise_value,
        model.valuation.pv_of_fcff + model.valuation.pv_of_terminal
    );
    // Investment defaults to initial revenue
    assert_eq!(model.npv, model.enterprise_value - dec!(100000));

    let irr = model.irr.expect("IRR should solve for the reference venture");
    assert!((irr - dec!(1.0249)).abs() < dec!(0.001), "irr = {irr}");
}

// ===========================================================================
// Boundaries
// ===========================================================================

#[test]
fn test_zero_growth_holds_revenue_flat() {
    let mut a = CashFlowAssumptions::default();
    a.revenue_growth_rate = vec![Decimal::ZERO; 5];
    let years = project(&a).unwrap();

    for year in &years {
        assert_eq!(year.revenue, dec!(100000));
        assert_eq!(year.change_in_nwc, Decimal::ZERO);
    }
}

#[test]
fn test_gordon_growth_equal_to_discount_rejected() {
    let mut a = CashFlowAssumptions::default();
    a.terminal_value = TerminalValueSpec::GordonGrowth {
        growth_rate: a.discount_rate,
    };
    let err = calculate_cash_flow_model(a).unwrap_err();
    assert!(matches!(err, CashFlowError::InvalidGrowthAssumption { .. }));
}

#[test]
fn test_gordon_growth_values_final_fcff() {
    let mut a = CashFlowAssumptions::default();
    a.terminal_value = TerminalValueSpec::GordonGrowth {
        growth_rate: dec!(0.03),
    };
    let model = calculate_cash_flow_model(a).unwrap().result;
    // 933134.4 * 1.03 / 0.12
    assert_eq!(model.terminal_value, dec!(8009403.6));
}

#[test]
fn test_series_length_mismatch_rejected() {
    let mut a = CashFlowAssumptions::default();
    a.capex_percentage.push(dec!(0.05));
    match calculate_cash_flow_model(a) {
        Err(CashFlowError::MalformedAssumptions { field, .. }) => {
            assert_eq!(field, "capex_percentage")
        }
        other => panic!("expected MalformedAssumptions, got {other:?}"),
    }
}

#[test]
fn test_projection_is_idempotent() {
    let a = CashFlowAssumptions::default();
    let first = run_model(a.clone(), &IrrSolverConfig::default()).unwrap();
    let second = run_model(a, &IrrSolverConfig::default()).unwrap();
    assert_eq!(first, second);
}

// ===========================================================================
// IRR
// ===========================================================================

#[test]
fn test_irr_recovers_known_rate() {
    // -1000 then 1210 after two years is exactly 10%
    let flows = [dec!(-1000), dec!(0), dec!(1210)];
    let rate = irr(&flows, &IrrSolverConfig::default()).unwrap();
    assert!((rate - dec!(0.10)).abs() < dec!(0.000001));
    assert!(npv(rate, &flows).unwrap().abs() < dec!(0.001));
}

#[test]
fn test_unsolvable_irr_leaves_other_fields() {
    let mut a = CashFlowAssumptions::default();
    // Costs above revenue every year: every FCFF is negative
    a.cogs_percentage = vec![dec!(0.9); 5];
    a.initial_investment = Some(dec!(50000));
    let out = build_cash_flow_model(a, &EngineConfig::default()).unwrap();

    assert_eq!(out.result.irr, None);
    assert!(out.result.valuation.irr_unavailable_reason.is_some());
    assert!(out.warnings.iter().any(|w| w.starts_with("IRR unavailable")));
    assert_eq!(
        out.result.npv,
        out.result.enterprise_value - dec!(50000)
    );
}

// ===========================================================================
// Scenarios and suggestions
// ===========================================================================

#[test]
fn test_scenario_series_start_from_first_fcff() {
    let set = build_scenarios(CashFlowAssumptions::default(), &EngineConfig::default())
        .unwrap()
        .result;
    let series = comparison_series(&set);

    assert_eq!(series.len(), 3);
    assert_eq!(series[0].scenario_type, ScenarioType::BaseCase);
    for s in &series {
        let model = &set
            .scenarios()
            .into_iter()
            .find(|f| f.scenario_type == s.scenario_type)
            .unwrap()
            .cash_flow_model;
        assert_eq!(s.points.len(), 5);
        assert_eq!(s.points[0], model.cash_flows[0].fcff);
    }
}

#[test]
fn test_cancelled_suggestion_keeps_previous() {
    let previous = CashFlowAssumptions::default();
    let kept = accept_suggestion(Some(previous.clone()), SuggestionOutcome::Cancelled);
    assert_eq!(kept, Some(previous));
    assert_eq!(accept_suggestion(None, SuggestionOutcome::Cancelled), None);
}
