use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assumptions::CashFlowAssumptions;
use crate::time_value::discount_factor;
use crate::types::Money;
use crate::CashFlowResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Operating expense lines for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpexBreakdown {
    pub research_and_development: Money,
    pub sales_and_marketing: Money,
    pub general_and_administrative: Money,
    pub total: Money,
}

/// One projected year (1-indexed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    pub year: u32,
    pub revenue: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub opex: OpexBreakdown,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    /// Floored at zero; losses earn no credit or carryforward
    pub taxes: Money,
    pub nopat: Money,
    pub capex: Money,
    pub change_in_nwc: Money,
    pub fcff: Money,
    pub discount_factor: Decimal,
    pub pv_fcff: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project the explicit forecast years.
///
/// Only the shape of the assumptions is checked here; a length mismatch in
/// any per-year series is an error, never truncated or padded.
pub fn project(assumptions: &CashFlowAssumptions) -> CashFlowResult<Vec<CashFlowYear>> {
    assumptions.check_shape()?;

    let n_years = assumptions.forecast_horizon as usize;
    let mut years = Vec::with_capacity(n_years);
    let mut prev_revenue = assumptions.initial_revenue;

    for idx in 0..n_years {
        let year = idx as u32 + 1;
        let revenue = prev_revenue * (Decimal::ONE + assumptions.revenue_growth_rate[idx]);
        let cogs = revenue * assumptions.cogs_percentage[idx];
        let gross_profit = revenue - cogs;

        let rd = revenue * assumptions.opex.research_and_development[idx];
        let sm = revenue * assumptions.opex.sales_and_marketing[idx];
        let ga = revenue * assumptions.opex.general_and_administrative[idx];
        let opex = OpexBreakdown {
            research_and_development: rd,
            sales_and_marketing: sm,
            general_and_administrative: ga,
            total: rd + sm + ga,
        };

        let ebitda = gross_profit - opex.total;
        let depreciation = revenue * assumptions.depreciation_percentage[idx];
        let ebit = ebitda - depreciation;
        let taxes = (ebit * assumptions.tax_rate).max(Decimal::ZERO);
        let nopat = ebit - taxes;

        let capex = revenue * assumptions.capex_percentage[idx];
        let change_in_nwc = (revenue - prev_revenue) * assumptions.change_in_nwc_percentage;

        // FCFF = NOPAT + D&A - CapEx - Delta NWC
        let fcff = nopat + depreciation - capex - change_in_nwc;

        let discount_factor = discount_factor(assumptions.discount_rate, year)?;
        let pv_fcff = fcff * discount_factor;

        years.push(CashFlowYear {
            year,
            revenue,
            cogs,
            gross_profit,
            opex,
            ebitda,
            depreciation,
            ebit,
            taxes,
            nopat,
            capex,
            change_in_nwc,
            fcff,
            discount_factor,
            pv_fcff,
        });

        prev_revenue = revenue;
    }

    debug!(years = years.len(), "projected cash flows");
    Ok(years)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CashFlowError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_year1_line_items() {
        let a = CashFlowAssumptions::default();
        let years = project(&a).unwrap();
        let y1 = &years[0];

        assert_eq!(y1.year, 1);
        // 100000 * 2.5
        assert_eq!(y1.revenue, dec!(250000));
        assert_eq!(y1.cogs, dec!(75000));
        assert_eq!(y1.gross_profit, dec!(175000));
        // 20% + 25% + 10% of 250000
        assert_eq!(y1.opex.total, dec!(137500));
        assert_eq!(y1.ebitda, dec!(37500));
        assert_eq!(y1.depreciation, dec!(37500));
        assert_eq!(y1.ebit, Decimal::ZERO);
        assert_eq!(y1.taxes, Decimal::ZERO);
        assert_eq!(y1.capex, dec!(25000));
        // (250000 - 100000) * 0.05
        assert_eq!(y1.change_in_nwc, dec!(7500));
        // 0 + 37500 - 25000 - 7500
        assert_eq!(y1.fcff, dec!(5000));
    }

    #[test]
    fn test_revenue_recurrence() {
        let a = CashFlowAssumptions::default();
        let years = project(&a).unwrap();
        assert_eq!(years[1].revenue, dec!(550000));
        assert_eq!(years[2].revenue, dec!(1100000));
        assert_eq!(years[3].revenue, dec!(1980000));
        assert_eq!(years[4].revenue, dec!(3168000));
    }

    #[test]
    fn test_loss_year_pays_no_tax() {
        let mut a = CashFlowAssumptions::default();
        a.cogs_percentage = vec![dec!(0.9); 5];
        let years = project(&a).unwrap();
        for y in &years {
            assert!(y.ebit < Decimal::ZERO);
            assert_eq!(y.taxes, Decimal::ZERO);
            assert_eq!(y.nopat, y.ebit);
        }
    }

    #[test]
    fn test_declining_revenue_releases_nwc() {
        let mut a = CashFlowAssumptions::default();
        a.revenue_growth_rate = vec![dec!(-0.2); 5];
        let years = project(&a).unwrap();
        assert!(years.iter().all(|y| y.change_in_nwc < Decimal::ZERO));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let mut a = CashFlowAssumptions::default();
        a.depreciation_percentage = vec![dec!(0.15); 6];
        assert!(matches!(
            project(&a),
            Err(CashFlowError::MalformedAssumptions { .. })
        ));
    }

    #[test]
    fn test_discounting_per_year() {
        let a = CashFlowAssumptions::default();
        let years = project(&a).unwrap();
        let y2 = &years[1];
        assert_eq!(y2.discount_factor, Decimal::ONE / (dec!(1.15) * dec!(1.15)));
        assert_eq!(y2.pv_fcff, y2.fcff * y2.discount_factor);
    }
}
