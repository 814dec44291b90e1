use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CashFlowError;
use crate::types::{Money, Multiple, Rate};
use crate::CashFlowResult;

/// Number of explicit forecast years in the standard model.
pub const FORECAST_HORIZON: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the value beyond the explicit forecast is estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TerminalValueSpec {
    /// TV = final-year EBITDA * multiple
    ExitMultiple { multiple: Multiple },
    /// TV = final-year FCFF * (1 + g) / (discount_rate - g)
    GordonGrowth { growth_rate: Rate },
}

impl TerminalValueSpec {
    pub fn label(&self) -> &'static str {
        match self {
            TerminalValueSpec::ExitMultiple { .. } => "Exit Multiple",
            TerminalValueSpec::GordonGrowth { .. } => "Gordon Growth",
        }
    }

    /// The one scalar the active method carries.
    pub fn parameter(&self) -> Decimal {
        match self {
            TerminalValueSpec::ExitMultiple { multiple } => *multiple,
            TerminalValueSpec::GordonGrowth { growth_rate } => *growth_rate,
        }
    }

    pub fn parameter_label(&self) -> &'static str {
        match self {
            TerminalValueSpec::ExitMultiple { .. } => "Exit Multiple",
            TerminalValueSpec::GordonGrowth { .. } => "Terminal Growth Rate",
        }
    }
}

/// Operating expenses, each a per-year fraction of that year's revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpexAssumptions {
    pub research_and_development: Vec<Rate>,
    pub sales_and_marketing: Vec<Rate>,
    pub general_and_administrative: Vec<Rate>,
}

/// Inputs to one cash-flow model run. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowAssumptions {
    #[serde(default = "default_horizon")]
    pub forecast_horizon: u32,
    /// Year-0 revenue; year 1 grows from here
    pub initial_revenue: Money,
    /// Up-front outlay netted against EV and used as the IRR seed flow.
    /// Falls back to `initial_revenue` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_investment: Option<Money>,
    pub revenue_growth_rate: Vec<Rate>,
    pub cogs_percentage: Vec<Rate>,
    pub opex: OpexAssumptions,
    pub tax_rate: Rate,
    pub capex_percentage: Vec<Rate>,
    pub depreciation_percentage: Vec<Rate>,
    /// Applied to the year-over-year revenue change
    pub change_in_nwc_percentage: Rate,
    pub discount_rate: Rate,
    pub terminal_value: TerminalValueSpec,
}

fn default_horizon() -> u32 {
    FORECAST_HORIZON
}

impl Default for CashFlowAssumptions {
    fn default() -> Self {
        Self {
            forecast_horizon: FORECAST_HORIZON,
            initial_revenue: dec!(100000),
            initial_investment: None,
            revenue_growth_rate: vec![dec!(1.5), dec!(1.2), dec!(1.0), dec!(0.8), dec!(0.6)],
            cogs_percentage: vec![dec!(0.3), dec!(0.28), dec!(0.26), dec!(0.25), dec!(0.25)],
            opex: OpexAssumptions {
                research_and_development: vec![
                    dec!(0.20),
                    dec!(0.18),
                    dec!(0.15),
                    dec!(0.12),
                    dec!(0.10),
                ],
                sales_and_marketing: vec![
                    dec!(0.25),
                    dec!(0.22),
                    dec!(0.20),
                    dec!(0.18),
                    dec!(0.16),
                ],
                general_and_administrative: vec![
                    dec!(0.10),
                    dec!(0.09),
                    dec!(0.08),
                    dec!(0.07),
                    dec!(0.07),
                ],
            },
            tax_rate: dec!(0.21),
            capex_percentage: vec![dec!(0.1), dec!(0.08), dec!(0.06), dec!(0.05), dec!(0.05)],
            depreciation_percentage: vec![dec!(0.15); 5],
            change_in_nwc_percentage: dec!(0.05),
            discount_rate: dec!(0.15),
            terminal_value: TerminalValueSpec::ExitMultiple {
                multiple: dec!(5),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl CashFlowAssumptions {
    /// Every per-year sequence, by field name.
    pub fn per_year_series(&self) -> [(&'static str, &[Rate]); 7] {
        [
            ("revenue_growth_rate", self.revenue_growth_rate.as_slice()),
            ("cogs_percentage", self.cogs_percentage.as_slice()),
            (
                "opex.research_and_development",
                self.opex.research_and_development.as_slice(),
            ),
            (
                "opex.sales_and_marketing",
                self.opex.sales_and_marketing.as_slice(),
            ),
            (
                "opex.general_and_administrative",
                self.opex.general_and_administrative.as_slice(),
            ),
            ("capex_percentage", self.capex_percentage.as_slice()),
            (
                "depreciation_percentage",
                self.depreciation_percentage.as_slice(),
            ),
        ]
    }

    /// Reject shape errors: zero horizon or any series of the wrong length.
    pub fn check_shape(&self) -> CashFlowResult<()> {
        if self.forecast_horizon == 0 {
            return Err(CashFlowError::MalformedAssumptions {
                field: "forecast_horizon".into(),
                reason: "Forecast horizon must be at least one year".into(),
            });
        }
        let expected = self.forecast_horizon as usize;
        for (field, series) in self.per_year_series() {
            if series.len() != expected {
                return Err(CashFlowError::MalformedAssumptions {
                    field: field.into(),
                    reason: format!(
                        "expected {expected} yearly values, got {}",
                        series.len()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Full validation, run before any computation.
    pub fn validate(&self) -> CashFlowResult<()> {
        self.check_shape()?;

        if self.initial_revenue <= Decimal::ZERO {
            return Err(CashFlowError::InvalidInput {
                field: "initial_revenue".into(),
                reason: "Initial revenue must be positive".into(),
            });
        }
        if let Some(outlay) = self.initial_investment {
            if outlay <= Decimal::ZERO {
                return Err(CashFlowError::InvalidInput {
                    field: "initial_investment".into(),
                    reason: "Initial investment must be positive".into(),
                });
            }
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(CashFlowError::InvalidInput {
                field: "tax_rate".into(),
                reason: "Tax rate must be between 0 and 1".into(),
            });
        }
        if self.discount_rate <= dec!(-1) {
            return Err(CashFlowError::InvalidInput {
                field: "discount_rate".into(),
                reason: "Discount rate must be greater than -100%".into(),
            });
        }
        if self.revenue_growth_rate.iter().any(|g| *g <= dec!(-1)) {
            return Err(CashFlowError::InvalidInput {
                field: "revenue_growth_rate".into(),
                reason: "Growth rates must be greater than -100%".into(),
            });
        }

        match self.terminal_value {
            TerminalValueSpec::ExitMultiple { multiple } => {
                if multiple < Decimal::ZERO {
                    return Err(CashFlowError::InvalidInput {
                        field: "terminal_value.multiple".into(),
                        reason: "Exit multiple cannot be negative".into(),
                    });
                }
            }
            TerminalValueSpec::GordonGrowth { growth_rate } => {
                check_gordon_growth(self.discount_rate, growth_rate)?;
            }
        }

        Ok(())
    }

    /// The outlay NPV and IRR are measured against.
    pub fn effective_initial_investment(&self) -> Money {
        self.initial_investment.unwrap_or(self.initial_revenue)
    }
}

/// Gordon growth needs discount_rate > growth_rate.
pub(crate) fn check_gordon_growth(discount_rate: Rate, growth_rate: Rate) -> CashFlowResult<()> {
    if discount_rate <= growth_rate {
        return Err(CashFlowError::InvalidGrowthAssumption {
            discount_rate,
            terminal_growth_rate: growth_rate,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Suggested assumptions
// ---------------------------------------------------------------------------

/// Result of asking the suggestion service for a replacement assumption set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SuggestionOutcome {
    Completed(CashFlowAssumptions),
    Cancelled,
    Failed(String),
}

/// Decide which assumptions the engine runs on after a suggestion request.
///
/// A suggestion replaces `previous` only if it completed and validates as a
/// whole; otherwise `previous` (possibly `None`) is returned untouched.
pub fn accept_suggestion(
    previous: Option<CashFlowAssumptions>,
    outcome: SuggestionOutcome,
) -> Option<CashFlowAssumptions> {
    match outcome {
        SuggestionOutcome::Completed(suggested) => match suggested.validate() {
            Ok(()) => {
                debug!("accepted suggested assumptions");
                Some(suggested)
            }
            Err(e) => {
                warn!("rejected suggested assumptions: {e}");
                previous
            }
        },
        SuggestionOutcome::Cancelled => {
            debug!("suggestion cancelled; keeping previous assumptions");
            previous
        }
        SuggestionOutcome::Failed(reason) => {
            warn!("suggestion failed: {reason}");
            previous
        }
    }
}
