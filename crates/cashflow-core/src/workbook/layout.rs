// Cell layout for the exported workbook.
//
// Every row the synthesizer writes is declared here once. The declaration
// order of each enum is the row order on its sheet, so moving a variant moves
// both the literal value and every formula that references it.

/// Sheet names, in workbook order.
pub const DASHBOARD_SHEET: &str = "Dashboard";
pub const CALCULATIONS_SHEET: &str = "Calculations";
pub const INPUTS_SHEET: &str = "Inputs";
pub const SHEET_ORDER: [&str; 3] = [DASHBOARD_SHEET, CALCULATIONS_SHEET, INPUTS_SHEET];

/// Rows and columns are 0-based, as in the xlsx writer.
pub const HEADER_ROW: u32 = 0;
pub const LABEL_COL: u16 = 0;
/// Scalar inputs and the valuation block live in this column.
pub const VALUE_COL: u16 = 1;
/// Column of forecast year 1 on both Inputs and Calculations.
pub const FIRST_YEAR_COL: u16 = 1;
/// Free-text notes next to scalar inputs.
pub const NOTE_COL: u16 = 2;

const FIRST_INPUT_ROW: u32 = HEADER_ROW + 1;
const FIRST_CALC_ROW: u32 = HEADER_ROW + 1;
const FIRST_VALUATION_ROW: u32 = FIRST_CALC_ROW + CalcRow::ALL.len() as u32 + 1;

// ---------------------------------------------------------------------------
// Inputs sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRow {
    InitialRevenue,
    InitialInvestment,
    TaxRate,
    ChangeInNwcPct,
    DiscountRate,
    TerminalMethod,
    TerminalParameter,
    RevenueGrowth,
    CogsPct,
    ResearchAndDevelopmentPct,
    SalesAndMarketingPct,
    GeneralAndAdministrativePct,
    CapexPct,
    DepreciationPct,
}

impl InputRow {
    pub const ALL: [InputRow; 14] = [
        InputRow::InitialRevenue,
        InputRow::InitialInvestment,
        InputRow::TaxRate,
        InputRow::ChangeInNwcPct,
        InputRow::DiscountRate,
        InputRow::TerminalMethod,
        InputRow::TerminalParameter,
        InputRow::RevenueGrowth,
        InputRow::CogsPct,
        InputRow::ResearchAndDevelopmentPct,
        InputRow::SalesAndMarketingPct,
        InputRow::GeneralAndAdministrativePct,
        InputRow::CapexPct,
        InputRow::DepreciationPct,
    ];

    pub fn row(self) -> u32 {
        FIRST_INPUT_ROW + self as u32
    }

    /// For rows holding one value per forecast year, the assumption series
    /// they show, named as in `CashFlowAssumptions::per_year_series`.
    pub fn series_field(self) -> Option<&'static str> {
        match self {
            InputRow::RevenueGrowth => Some("revenue_growth_rate"),
            InputRow::CogsPct => Some("cogs_percentage"),
            InputRow::ResearchAndDevelopmentPct => Some("opex.research_and_development"),
            InputRow::SalesAndMarketingPct => Some("opex.sales_and_marketing"),
            InputRow::GeneralAndAdministrativePct => Some("opex.general_and_administrative"),
            InputRow::CapexPct => Some("capex_percentage"),
            InputRow::DepreciationPct => Some("depreciation_percentage"),
            _ => None,
        }
    }

    /// Fixed label; the terminal parameter row is labelled by its method.
    pub fn label(self) -> &'static str {
        match self {
            InputRow::InitialRevenue => "Initial Revenue",
            InputRow::InitialInvestment => "Initial Investment",
            InputRow::TaxRate => "Tax Rate",
            InputRow::ChangeInNwcPct => "Change in NWC (% of revenue change)",
            InputRow::DiscountRate => "Discount Rate",
            InputRow::TerminalMethod => "Terminal Value Method",
            InputRow::TerminalParameter => "Terminal Parameter",
            InputRow::RevenueGrowth => "Revenue Growth",
            InputRow::CogsPct => "COGS (% of revenue)",
            InputRow::ResearchAndDevelopmentPct => "R&D (% of revenue)",
            InputRow::SalesAndMarketingPct => "S&M (% of revenue)",
            InputRow::GeneralAndAdministrativePct => "G&A (% of revenue)",
            InputRow::CapexPct => "CapEx (% of revenue)",
            InputRow::DepreciationPct => "D&A (% of revenue)",
        }
    }
}

// ---------------------------------------------------------------------------
// Calculations sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalcRow {
    Revenue,
    Cogs,
    GrossProfit,
    ResearchAndDevelopment,
    SalesAndMarketing,
    GeneralAndAdministrative,
    TotalOpex,
    Ebitda,
    Depreciation,
    Ebit,
    Taxes,
    Nopat,
    Capex,
    ChangeInNwc,
    Fcff,
    DiscountFactor,
    PvFcff,
}

impl CalcRow {
    pub const ALL: [CalcRow; 17] = [
        CalcRow::Revenue,
        CalcRow::Cogs,
        CalcRow::GrossProfit,
        CalcRow::ResearchAndDevelopment,
        CalcRow::SalesAndMarketing,
        CalcRow::GeneralAndAdministrative,
        CalcRow::TotalOpex,
        CalcRow::Ebitda,
        CalcRow::Depreciation,
        CalcRow::Ebit,
        CalcRow::Taxes,
        CalcRow::Nopat,
        CalcRow::Capex,
        CalcRow::ChangeInNwc,
        CalcRow::Fcff,
        CalcRow::DiscountFactor,
        CalcRow::PvFcff,
    ];

    pub fn row(self) -> u32 {
        FIRST_CALC_ROW + self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            CalcRow::Revenue => "Revenue",
            CalcRow::Cogs => "COGS",
            CalcRow::GrossProfit => "Gross Profit",
            CalcRow::ResearchAndDevelopment => "R&D",
            CalcRow::SalesAndMarketing => "S&M",
            CalcRow::GeneralAndAdministrative => "G&A",
            CalcRow::TotalOpex => "Total OpEx",
            CalcRow::Ebitda => "EBITDA",
            CalcRow::Depreciation => "D&A",
            CalcRow::Ebit => "EBIT",
            CalcRow::Taxes => "Taxes",
            CalcRow::Nopat => "NOPAT",
            CalcRow::Capex => "CapEx",
            CalcRow::ChangeInNwc => "Change in NWC",
            CalcRow::Fcff => "FCFF",
            CalcRow::DiscountFactor => "Discount Factor",
            CalcRow::PvFcff => "PV of FCFF",
        }
    }
}

/// Valuation block below the yearly grid on the Calculations sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValuationRow {
    TerminalValue,
    PvOfFcff,
    PvOfTerminal,
    EnterpriseValue,
    Npv,
}

impl ValuationRow {
    pub const ALL: [ValuationRow; 5] = [
        ValuationRow::TerminalValue,
        ValuationRow::PvOfFcff,
        ValuationRow::PvOfTerminal,
        ValuationRow::EnterpriseValue,
        ValuationRow::Npv,
    ];

    pub fn row(self) -> u32 {
        FIRST_VALUATION_ROW + self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            ValuationRow::TerminalValue => "Terminal Value",
            ValuationRow::PvOfFcff => "Sum of PV of FCFF",
            ValuationRow::PvOfTerminal => "PV of Terminal Value",
            ValuationRow::EnterpriseValue => "Enterprise Value",
            ValuationRow::Npv => "Net Present Value",
        }
    }
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Column of a 0-based forecast year index.
pub fn year_column(year_idx: usize) -> u16 {
    FIRST_YEAR_COL + year_idx as u16
}

/// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn column_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as usize;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Relative A1 address, e.g. "C5".
pub fn cell_name(row: u32, col: u16) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// Absolute A1 address, e.g. "$C$5".
pub fn absolute_cell_name(row: u32, col: u16) -> String {
    format!("${}${}", column_letter(col), row + 1)
}

/// Absolute reference to a scalar on the Inputs sheet.
pub fn input_scalar_ref(row: InputRow) -> String {
    format!("{INPUTS_SHEET}!{}", absolute_cell_name(row.row(), VALUE_COL))
}

/// Reference to one year of a per-year series on the Inputs sheet.
pub fn input_year_ref(row: InputRow, year_idx: usize) -> String {
    format!("{INPUTS_SHEET}!{}", cell_name(row.row(), year_column(year_idx)))
}

/// Same-sheet reference to a yearly line item on Calculations.
pub fn calc_ref(row: CalcRow, year_idx: usize) -> String {
    cell_name(row.row(), year_column(year_idx))
}

/// Same-sheet reference to a valuation-block cell on Calculations.
pub fn valuation_ref(row: ValuationRow) -> String {
    cell_name(row.row(), VALUE_COL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_year_columns_start_at_b() {
        assert_eq!(column_letter(year_column(0)), "B");
        assert_eq!(column_letter(year_column(4)), "F");
    }

    #[test]
    fn test_rows_follow_declaration_order() {
        for (idx, row) in InputRow::ALL.iter().enumerate() {
            assert_eq!(row.row(), FIRST_INPUT_ROW + idx as u32);
        }
        for (idx, row) in CalcRow::ALL.iter().enumerate() {
            assert_eq!(row.row(), FIRST_CALC_ROW + idx as u32);
        }
    }

    #[test]
    fn test_valuation_block_below_grid() {
        let last_calc = CalcRow::PvFcff.row();
        let valuation_rows: HashSet<u32> = ValuationRow::ALL.iter().map(|r| r.row()).collect();
        assert_eq!(valuation_rows.len(), ValuationRow::ALL.len());
        assert!(valuation_rows.iter().all(|r| *r > last_calc + 1));
    }

    #[test]
    fn test_per_year_rows_name_every_assumption_series() {
        let assumptions = crate::assumptions::CashFlowAssumptions::default();
        let series: HashSet<&str> = assumptions
            .per_year_series()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        let rows: HashSet<&str> = InputRow::ALL
            .iter()
            .filter_map(|r| r.series_field())
            .collect();
        assert_eq!(rows, series);
        assert_eq!(InputRow::InitialRevenue.series_field(), None);
    }

    #[test]
    fn test_references() {
        assert_eq!(input_scalar_ref(InputRow::InitialRevenue), "Inputs!$B$2");
        assert_eq!(input_year_ref(InputRow::RevenueGrowth, 2), "Inputs!D9");
        assert_eq!(calc_ref(CalcRow::Revenue, 0), "B2");
        assert_eq!(calc_ref(CalcRow::Fcff, 4), "F16");
        assert_eq!(valuation_ref(ValuationRow::TerminalValue), "B20");
    }
}
