pub mod comparison;
pub mod scenario;

pub use comparison::{
    compare_scenarios, comparison_series, cumulative_fcff, CumulativeFcffSeries,
    ScenarioComparison,
};
pub use scenario::{
    build_scenarios, derive_assumptions, run_explicit_scenarios, run_scenarios, FinancialScenario,
    ScenarioFailure, ScenarioSet, ScenarioType,
};
