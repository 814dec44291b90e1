pub mod formula;
pub mod layout;
pub mod recalc;
pub mod sheet;
pub mod synth;
pub mod xlsx;

pub use layout::{CalcRow, InputRow, ValuationRow, SHEET_ORDER};
pub use recalc::{recalculate, CellRecalc, RecalcReport};
pub use sheet::{Cell, CellContent, CellStyle, Sheet, SynthesizedWorkbook};
pub use synth::synthesize;
pub use xlsx::{
    default_file_name, export_workbook, write_xlsx, ExportOptions, WorkbookArtifact,
    FORMULA_TOLERANCE,
};
