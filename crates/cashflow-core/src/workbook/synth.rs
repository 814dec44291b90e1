use rust_decimal::Decimal;
use tracing::debug;

use crate::assumptions::{CashFlowAssumptions, TerminalValueSpec};
use crate::error::CashFlowError;
use crate::model::CashFlowModelOutput;
use crate::projection::CashFlowYear;
use crate::scenarios::{compare_scenarios, comparison_series, ScenarioSet};
use crate::types::Rate;
use crate::CashFlowResult;

use super::layout::{
    calc_ref, input_scalar_ref, input_year_ref, valuation_ref, year_column, CalcRow, InputRow,
    ValuationRow, CALCULATIONS_SHEET, DASHBOARD_SHEET, HEADER_ROW, INPUTS_SHEET, LABEL_COL,
    NOTE_COL, VALUE_COL,
};
use super::sheet::{CellStyle, Sheet, SynthesizedWorkbook};

/// Lay the model out as Dashboard, Calculations and Inputs sheets.
///
/// Calculations cells carry a formula and the engine's value for it; the
/// Dashboard is a literal snapshot. Scenario tables are added to the
/// Dashboard when a scenario set is given.
pub fn synthesize(
    model: &CashFlowModelOutput,
    venture_name: &str,
    scenarios: Option<&ScenarioSet>,
) -> CashFlowResult<SynthesizedWorkbook> {
    let horizon = model.assumptions.forecast_horizon as usize;
    if model.cash_flows.is_empty() || model.cash_flows.len() != horizon {
        return Err(CashFlowError::MalformedAssumptions {
            field: "cash_flows".into(),
            reason: format!(
                "expected {horizon} projected years, got {}",
                model.cash_flows.len()
            ),
        });
    }
    model.assumptions.check_shape()?;

    let sheets = vec![
        dashboard_sheet(model, venture_name, scenarios),
        calculations_sheet(model),
        inputs_sheet(&model.assumptions),
    ];

    let workbook = SynthesizedWorkbook {
        venture_name: venture_name.to_string(),
        sheets,
    };
    debug!(
        formulas = workbook.formula_count(),
        "synthesized workbook for {venture_name}"
    );
    Ok(workbook)
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

fn inputs_sheet(assumptions: &CashFlowAssumptions) -> Sheet {
    let mut sheet = Sheet::new(INPUTS_SHEET);
    let horizon = assumptions.forecast_horizon as usize;

    sheet.set_text(HEADER_ROW, LABEL_COL, "Assumption", CellStyle::Header);
    for idx in 0..horizon {
        sheet.set_text(HEADER_ROW, year_column(idx), year_header(idx), CellStyle::Header);
    }

    for row in InputRow::ALL {
        let r = row.row();
        let label = match row {
            InputRow::TerminalParameter => assumptions.terminal_value.parameter_label(),
            other => other.label(),
        };
        sheet.set_text(r, LABEL_COL, label, CellStyle::Plain);

        if let Some(series) = input_series(assumptions, row) {
            for (idx, rate) in series.iter().enumerate() {
                sheet.set_number(r, year_column(idx), *rate, CellStyle::Percent);
            }
            continue;
        }

        match row {
            InputRow::InitialRevenue => {
                sheet.set_number(r, VALUE_COL, assumptions.initial_revenue, CellStyle::Currency)
            }
            InputRow::InitialInvestment => {
                sheet.set_number(
                    r,
                    VALUE_COL,
                    assumptions.effective_initial_investment(),
                    CellStyle::Currency,
                );
                if assumptions.initial_investment.is_none() {
                    sheet.set_text(
                        r,
                        NOTE_COL,
                        "Not provided; initial revenue used",
                        CellStyle::Plain,
                    );
                }
            }
            InputRow::TaxRate => {
                sheet.set_number(r, VALUE_COL, assumptions.tax_rate, CellStyle::Percent)
            }
            InputRow::ChangeInNwcPct => sheet.set_number(
                r,
                VALUE_COL,
                assumptions.change_in_nwc_percentage,
                CellStyle::Percent,
            ),
            InputRow::DiscountRate => {
                sheet.set_number(r, VALUE_COL, assumptions.discount_rate, CellStyle::Percent)
            }
            InputRow::TerminalMethod => sheet.set_text(
                r,
                VALUE_COL,
                assumptions.terminal_value.label(),
                CellStyle::Plain,
            ),
            InputRow::TerminalParameter => {
                let style = match assumptions.terminal_value {
                    TerminalValueSpec::ExitMultiple { .. } => CellStyle::Multiple,
                    TerminalValueSpec::GordonGrowth { .. } => CellStyle::Percent,
                };
                sheet.set_number(r, VALUE_COL, assumptions.terminal_value.parameter(), style)
            }
            _ => {}
        }
    }

    sheet
}

/// The per-year series behind an Inputs row, if it is one.
fn input_series(assumptions: &CashFlowAssumptions, row: InputRow) -> Option<&[Rate]> {
    let field = row.series_field()?;
    assumptions
        .per_year_series()
        .into_iter()
        .find(|(name, _)| *name == field)
        .map(|(_, series)| series)
}

// ---------------------------------------------------------------------------
// Calculations
// ---------------------------------------------------------------------------

fn calculations_sheet(model: &CashFlowModelOutput) -> Sheet {
    let mut sheet = Sheet::new(CALCULATIONS_SHEET);

    sheet.set_text(HEADER_ROW, LABEL_COL, "Line Item", CellStyle::Header);
    for row in CalcRow::ALL {
        sheet.set_text(row.row(), LABEL_COL, row.label(), CellStyle::Plain);
    }

    for (idx, year) in model.cash_flows.iter().enumerate() {
        let col = year_column(idx);
        sheet.set_text(HEADER_ROW, col, year_header(idx), CellStyle::Header);
        for row in CalcRow::ALL {
            sheet.set_formula(
                row.row(),
                col,
                calc_formula(row, idx),
                calc_value(year, row),
                calc_style(row),
            );
        }
    }

    let heading_row = ValuationRow::TerminalValue.row() - 1;
    sheet.set_text(heading_row, LABEL_COL, "Valuation", CellStyle::Header);
    let last_idx = model.cash_flows.len() - 1;
    for row in ValuationRow::ALL {
        sheet.set_text(row.row(), LABEL_COL, row.label(), CellStyle::Plain);
        sheet.set_formula(
            row.row(),
            VALUE_COL,
            valuation_formula(row, &model.assumptions.terminal_value, last_idx),
            valuation_value(model, row),
            CellStyle::Currency,
        );
    }

    sheet
}

/// Formula for one line item in one year. Year 1 reads the year-0 basis
/// from Inputs; later years read the preceding column.
fn calc_formula(row: CalcRow, idx: usize) -> String {
    let cell = |r: CalcRow| calc_ref(r, idx);
    let revenue = cell(CalcRow::Revenue);
    let prev_revenue = if idx == 0 {
        input_scalar_ref(InputRow::InitialRevenue)
    } else {
        calc_ref(CalcRow::Revenue, idx - 1)
    };

    match row {
        CalcRow::Revenue => format!(
            "={prev_revenue}*(1+{})",
            input_year_ref(InputRow::RevenueGrowth, idx)
        ),
        CalcRow::Cogs => format!("={revenue}*{}", input_year_ref(InputRow::CogsPct, idx)),
        CalcRow::GrossProfit => format!("={revenue}-{}", cell(CalcRow::Cogs)),
        CalcRow::ResearchAndDevelopment => format!(
            "={revenue}*{}",
            input_year_ref(InputRow::ResearchAndDevelopmentPct, idx)
        ),
        CalcRow::SalesAndMarketing => format!(
            "={revenue}*{}",
            input_year_ref(InputRow::SalesAndMarketingPct, idx)
        ),
        CalcRow::GeneralAndAdministrative => format!(
            "={revenue}*{}",
            input_year_ref(InputRow::GeneralAndAdministrativePct, idx)
        ),
        CalcRow::TotalOpex => format!(
            "={}+{}+{}",
            cell(CalcRow::ResearchAndDevelopment),
            cell(CalcRow::SalesAndMarketing),
            cell(CalcRow::GeneralAndAdministrative)
        ),
        CalcRow::Ebitda => format!(
            "={}-{}",
            cell(CalcRow::GrossProfit),
            cell(CalcRow::TotalOpex)
        ),
        CalcRow::Depreciation => format!(
            "={revenue}*{}",
            input_year_ref(InputRow::DepreciationPct, idx)
        ),
        CalcRow::Ebit => format!(
            "={}-{}",
            cell(CalcRow::Ebitda),
            cell(CalcRow::Depreciation)
        ),
        CalcRow::Taxes => format!(
            "=MAX(0,{}*{})",
            cell(CalcRow::Ebit),
            input_scalar_ref(InputRow::TaxRate)
        ),
        CalcRow::Nopat => format!("={}-{}", cell(CalcRow::Ebit), cell(CalcRow::Taxes)),
        CalcRow::Capex => format!("={revenue}*{}", input_year_ref(InputRow::CapexPct, idx)),
        CalcRow::ChangeInNwc => format!(
            "=({revenue}-{prev_revenue})*{}",
            input_scalar_ref(InputRow::ChangeInNwcPct)
        ),
        CalcRow::Fcff => format!(
            "={}+{}-{}-{}",
            cell(CalcRow::Nopat),
            cell(CalcRow::Depreciation),
            cell(CalcRow::Capex),
            cell(CalcRow::ChangeInNwc)
        ),
        CalcRow::DiscountFactor => format!(
            "=1/(1+{})^{}",
            input_scalar_ref(InputRow::DiscountRate),
            idx + 1
        ),
        CalcRow::PvFcff => format!(
            "={}*{}",
            cell(CalcRow::Fcff),
            cell(CalcRow::DiscountFactor)
        ),
    }
}

fn calc_value(year: &CashFlowYear, row: CalcRow) -> Decimal {
    match row {
        CalcRow::Revenue => year.revenue,
        CalcRow::Cogs => year.cogs,
        CalcRow::GrossProfit => year.gross_profit,
        CalcRow::ResearchAndDevelopment => year.opex.research_and_development,
        CalcRow::SalesAndMarketing => year.opex.sales_and_marketing,
        CalcRow::GeneralAndAdministrative => year.opex.general_and_administrative,
        CalcRow::TotalOpex => year.opex.total,
        CalcRow::Ebitda => year.ebitda,
        CalcRow::Depreciation => year.depreciation,
        CalcRow::Ebit => year.ebit,
        CalcRow::Taxes => year.taxes,
        CalcRow::Nopat => year.nopat,
        CalcRow::Capex => year.capex,
        CalcRow::ChangeInNwc => year.change_in_nwc,
        CalcRow::Fcff => year.fcff,
        CalcRow::DiscountFactor => year.discount_factor,
        CalcRow::PvFcff => year.pv_fcff,
    }
}

fn calc_style(row: CalcRow) -> CellStyle {
    match row {
        CalcRow::DiscountFactor => CellStyle::Factor,
        _ => CellStyle::Currency,
    }
}

fn valuation_formula(row: ValuationRow, spec: &TerminalValueSpec, last_idx: usize) -> String {
    let discount = input_scalar_ref(InputRow::DiscountRate);
    let parameter = input_scalar_ref(InputRow::TerminalParameter);

    match row {
        ValuationRow::TerminalValue => match spec {
            TerminalValueSpec::ExitMultiple { .. } => {
                format!("={}*{parameter}", calc_ref(CalcRow::Ebitda, last_idx))
            }
            TerminalValueSpec::GordonGrowth { .. } => format!(
                "={}*(1+{parameter})/({discount}-{parameter})",
                calc_ref(CalcRow::Fcff, last_idx)
            ),
        },
        ValuationRow::PvOfFcff => format!(
            "=SUM({}:{})",
            calc_ref(CalcRow::PvFcff, 0),
            calc_ref(CalcRow::PvFcff, last_idx)
        ),
        ValuationRow::PvOfTerminal => format!(
            "={}/(1+{discount})^{}",
            valuation_ref(ValuationRow::TerminalValue),
            last_idx + 1
        ),
        ValuationRow::EnterpriseValue => format!(
            "={}+{}",
            valuation_ref(ValuationRow::PvOfFcff),
            valuation_ref(ValuationRow::PvOfTerminal)
        ),
        ValuationRow::Npv => format!(
            "={}-{}",
            valuation_ref(ValuationRow::EnterpriseValue),
            input_scalar_ref(InputRow::InitialInvestment)
        ),
    }
}

fn valuation_value(model: &CashFlowModelOutput, row: ValuationRow) -> Decimal {
    let v = &model.valuation;
    match row {
        ValuationRow::TerminalValue => v.terminal_value,
        ValuationRow::PvOfFcff => v.pv_of_fcff,
        ValuationRow::PvOfTerminal => v.pv_of_terminal,
        ValuationRow::EnterpriseValue => v.enterprise_value,
        ValuationRow::Npv => v.npv,
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

fn dashboard_sheet(
    model: &CashFlowModelOutput,
    venture_name: &str,
    scenarios: Option<&ScenarioSet>,
) -> Sheet {
    let mut sheet = Sheet::new(DASHBOARD_SHEET);
    let v = &model.valuation;

    sheet.set_text(HEADER_ROW, LABEL_COL, "Cash Flow Model", CellStyle::Header);
    sheet.set_text(HEADER_ROW, VALUE_COL, venture_name, CellStyle::Header);

    let mut row = HEADER_ROW + 2;
    let mut metric = |sheet: &mut Sheet, label: &str, value: Option<Decimal>, style: CellStyle| {
        sheet.set_text(row, LABEL_COL, label, CellStyle::Plain);
        match value {
            Some(n) => sheet.set_number(row, VALUE_COL, n, style),
            None => sheet.set_text(row, VALUE_COL, "Unavailable", CellStyle::Plain),
        }
        row += 1;
    };
    metric(&mut sheet, "Enterprise Value", Some(v.enterprise_value), CellStyle::Currency);
    metric(&mut sheet, "Net Present Value", Some(v.npv), CellStyle::Currency);
    metric(&mut sheet, "IRR", v.irr, CellStyle::Percent);
    metric(&mut sheet, "Terminal Value", Some(v.terminal_value), CellStyle::Currency);
    metric(
        &mut sheet,
        "Terminal Value % of EV",
        Some(v.terminal_value_pct),
        CellStyle::Percent,
    );

    sheet.set_text(row, LABEL_COL, "Terminal Value Method", CellStyle::Plain);
    sheet.set_text(
        row,
        VALUE_COL,
        model.assumptions.terminal_value.label(),
        CellStyle::Plain,
    );
    row += 1;

    if let Some(set) = scenarios {
        scenario_tables(&mut sheet, set, row + 1);
    }

    sheet
}

fn scenario_tables(sheet: &mut Sheet, set: &ScenarioSet, start_row: u32) {
    let mut row = start_row;

    for (col, heading) in ["Scenario", "Enterprise Value", "NPV", "IRR", "EV vs Base"]
        .into_iter()
        .enumerate()
    {
        sheet.set_text(row, col as u16, heading, CellStyle::Header);
    }
    row += 1;
    for cmp in compare_scenarios(set) {
        sheet.set_text(row, 0, cmp.scenario_type.label(), CellStyle::Plain);
        sheet.set_number(row, 1, cmp.enterprise_value, CellStyle::Currency);
        sheet.set_number(row, 2, cmp.npv, CellStyle::Currency);
        match cmp.irr {
            Some(irr) => sheet.set_number(row, 3, irr, CellStyle::Percent),
            None => sheet.set_text(row, 3, "Unavailable", CellStyle::Plain),
        }
        sheet.set_number(row, 4, cmp.deviation_pct, CellStyle::Percent);
        row += 1;
    }
    for failure in &set.failures {
        sheet.set_text(row, 0, failure.scenario_type.label(), CellStyle::Plain);
        sheet.set_text(row, 1, format!("Not computed: {}", failure.error), CellStyle::Plain);
        row += 1;
    }

    row += 1;
    sheet.set_text(row, LABEL_COL, "Cumulative FCFF", CellStyle::Header);
    let horizon = set.base.cash_flow_model.cash_flows.len();
    for idx in 0..horizon {
        sheet.set_text(row, year_column(idx), year_header(idx), CellStyle::Header);
    }
    row += 1;
    for series in comparison_series(set) {
        sheet.set_text(row, LABEL_COL, series.scenario_type.label(), CellStyle::Plain);
        for (idx, point) in series.points.iter().enumerate() {
            sheet.set_number(row, year_column(idx), *point, CellStyle::Currency);
        }
        row += 1;
    }
}

fn year_header(idx: usize) -> String {
    format!("Year {}", idx + 1)
}
