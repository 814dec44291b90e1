use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CashFlowError {
    #[error("Malformed assumptions: {field} — {reason}")]
    MalformedAssumptions { field: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid growth assumption: discount rate ({discount_rate}) must exceed terminal growth rate ({terminal_growth_rate})")]
    InvalidGrowthAssumption {
        discount_rate: Decimal,
        terminal_growth_rate: Decimal,
    },

    #[error("No converging root: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    NoConvergingRoot {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("No cash-flow model to export")]
    NoModelToExport,

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Formula error in {cell}: {reason}")]
    FormulaError { cell: String, reason: String },

    #[error("Workbook error: {0}")]
    WorkbookError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for CashFlowError {
    fn from(e: serde_json::Error) -> Self {
        CashFlowError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for CashFlowError {
    fn from(e: toml::de::Error) -> Self {
        CashFlowError::ConfigError(e.to_string())
    }
}

#[cfg(feature = "workbook")]
impl From<rust_xlsxwriter::XlsxError> for CashFlowError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        CashFlowError::WorkbookError(e.to_string())
    }
}
