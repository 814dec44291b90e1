pub mod assumptions;
pub mod config;
pub mod error;
pub mod model;
pub mod projection;
pub mod time_value;
pub mod types;
pub mod valuation;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "workbook")]
pub mod workbook;

pub use assumptions::{
    accept_suggestion, CashFlowAssumptions, OpexAssumptions, SuggestionOutcome,
    TerminalValueSpec,
};
pub use config::EngineConfig;
pub use error::CashFlowError;
pub use model::{build_cash_flow_model, calculate_cash_flow_model, CashFlowModelOutput};
pub use types::*;

/// Standard result type for all cash-flow engine operations
pub type CashFlowResult<T> = Result<T, CashFlowError>;
