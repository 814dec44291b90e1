use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::CashFlowError;
use crate::model::CashFlowModelOutput;
use crate::scenarios::ScenarioSet;
use crate::CashFlowResult;

use super::layout::LABEL_COL;
use super::recalc::recalculate;
use super::sheet::{CellContent, CellStyle, Sheet, SynthesizedWorkbook};
use super::synth::synthesize;

const FILE_SUFFIX: &str = "_Cash_Flow_Model.xlsx";
const FALLBACK_VENTURE: &str = "Venture";
const LABEL_WIDTH: f64 = 34.0;
const VALUE_WIDTH: f64 = 16.0;

/// Largest gap allowed between a formula and the value written beside it.
pub const FORMULA_TOLERANCE: Decimal = dec!(0.000001);

#[derive(Debug, Clone, Default)]
pub struct ExportOptions<'a> {
    pub venture_name: String,
    /// Adds the scenario comparison tables to the Dashboard
    pub scenarios: Option<&'a ScenarioSet>,
}

/// A rendered workbook ready to be written or handed to a caller.
#[derive(Debug, Clone, Serialize)]
pub struct WorkbookArtifact {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub sheet_names: Vec<String>,
    pub formulas_written: usize,
}

impl WorkbookArtifact {
    /// Write the artifact into `dir` under its file name.
    pub fn save_in(&self, dir: &Path) -> CashFlowResult<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .map_err(|e| CashFlowError::WorkbookError(format!("{}: {e}", path.display())))?;
        Ok(path)
    }
}

/// `{venture}_Cash_Flow_Model.xlsx`, with whitespace turned into
/// underscores and filesystem-reserved characters dropped.
pub fn default_file_name(venture_name: &str) -> String {
    let cleaned: String = venture_name
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    if cleaned.is_empty() {
        format!("{FALLBACK_VENTURE}{FILE_SUFFIX}")
    } else {
        format!("{cleaned}{FILE_SUFFIX}")
    }
}

/// Synthesize and serialise a model as an xlsx workbook.
///
/// Refuses to produce anything when no model has been computed, or when the
/// model's values no longer follow from its assumptions (every formula is
/// recalculated and must land within `FORMULA_TOLERANCE` of its value).
pub fn export_workbook(
    model: Option<&CashFlowModelOutput>,
    options: &ExportOptions<'_>,
) -> CashFlowResult<WorkbookArtifact> {
    let model = model.ok_or(CashFlowError::NoModelToExport)?;

    let synthesized = synthesize(model, &options.venture_name, options.scenarios)?;
    let report = recalculate(&synthesized)?;
    if let Some(cell) = report.inconsistent(FORMULA_TOLERANCE).first() {
        return Err(CashFlowError::FormulaError {
            cell: cell.address.clone(),
            reason: format!(
                "{} gives {} but the model holds {}; recompute the model before exporting",
                cell.formula, cell.recomputed, cell.cached
            ),
        });
    }
    let bytes = write_xlsx(&synthesized)?;

    let artifact = WorkbookArtifact {
        file_name: default_file_name(&options.venture_name),
        sheet_names: synthesized
            .sheet_names()
            .into_iter()
            .map(String::from)
            .collect(),
        formulas_written: synthesized.formula_count(),
        bytes,
    };
    info!(
        file = %artifact.file_name,
        bytes = artifact.bytes.len(),
        formulas = artifact.formulas_written,
        "exported workbook"
    );
    Ok(artifact)
}

/// Serialise a synthesized workbook; sheets are written in their stored order.
pub fn write_xlsx(synthesized: &SynthesizedWorkbook) -> CashFlowResult<Vec<u8>> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();

    for sheet in &synthesized.sheets {
        let worksheet = workbook.add_worksheet().set_name(&sheet.name)?;
        write_sheet(worksheet, sheet, &formats)?;
    }

    Ok(workbook.save_to_buffer()?)
}

struct Formats {
    plain: Format,
    header: Format,
    currency: Format,
    percent: Format,
    multiple: Format,
    factor: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            plain: Format::new(),
            header: Format::new().set_bold(),
            currency: Format::new().set_num_format("#,##0.00;[Red]-#,##0.00"),
            percent: Format::new().set_num_format("0.00%"),
            multiple: Format::new().set_num_format("0.0\"x\""),
            factor: Format::new().set_num_format("0.0000"),
        }
    }

    fn for_style(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Plain => &self.plain,
            CellStyle::Header => &self.header,
            CellStyle::Currency => &self.currency,
            CellStyle::Percent => &self.percent,
            CellStyle::Multiple => &self.multiple,
            CellStyle::Factor => &self.factor,
        }
    }
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, formats: &Formats) -> CashFlowResult<()> {
    for (row, col, cell) in sheet.cells() {
        let format = formats.for_style(cell.style);
        match &cell.content {
            CellContent::Number(n) => {
                worksheet.write_number_with_format(row, col, to_f64(*n, sheet, row, col)?, format)?;
            }
            CellContent::Text(s) => {
                worksheet.write_string_with_format(row, col, s, format)?;
            }
            CellContent::Formula { formula, cached } => {
                // rust_xlsxwriter wants the formula without its leading '='
                let body = formula.strip_prefix('=').unwrap_or(formula);
                let cached = to_f64(*cached, sheet, row, col)?;
                worksheet.write_formula_with_format(
                    row,
                    col,
                    Formula::new(body).set_result(cached.to_string()),
                    format,
                )?;
            }
        }
    }

    worksheet.set_column_width(LABEL_COL, LABEL_WIDTH)?;
    for col in (LABEL_COL + 1)..=sheet.max_col() {
        worksheet.set_column_width(col, VALUE_WIDTH)?;
    }
    Ok(())
}

fn to_f64(value: Decimal, sheet: &Sheet, row: u32, col: u16) -> CashFlowResult<f64> {
    value.to_f64().ok_or_else(|| {
        CashFlowError::WorkbookError(format!(
            "{} cannot be written as a number: {value}",
            sheet.address(row, col)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::CashFlowAssumptions;
    use crate::model::calculate_cash_flow_model;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name("Acme"), "Acme_Cash_Flow_Model.xlsx");
        assert_eq!(
            default_file_name("  Acme Rockets  Inc "),
            "Acme_Rockets__Inc_Cash_Flow_Model.xlsx"
        );
        assert_eq!(default_file_name("a/b:c?"), "abc_Cash_Flow_Model.xlsx");
        assert_eq!(default_file_name(""), "Venture_Cash_Flow_Model.xlsx");
        assert_eq!(default_file_name("<>|"), "Venture_Cash_Flow_Model.xlsx");
    }

    #[test]
    fn test_no_model_refused() {
        let options = ExportOptions {
            venture_name: "Acme".into(),
            scenarios: None,
        };
        assert!(matches!(
            export_workbook(None, &options),
            Err(CashFlowError::NoModelToExport)
        ));
    }

    #[test]
    fn test_export_produces_zip_bytes() {
        let model = calculate_cash_flow_model(CashFlowAssumptions::default())
            .unwrap()
            .result;
        let options = ExportOptions {
            venture_name: "Acme".into(),
            scenarios: None,
        };
        let artifact = export_workbook(Some(&model), &options).unwrap();
        assert_eq!(artifact.file_name, "Acme_Cash_Flow_Model.xlsx");
        assert_eq!(artifact.sheet_names, vec!["Dashboard", "Calculations", "Inputs"]);
        assert!(artifact.bytes.starts_with(b"PK"));
        assert_eq!(artifact.formulas_written, 17 * 5 + 5);
    }

    #[test]
    fn test_edited_model_is_refused() {
        let mut model = calculate_cash_flow_model(CashFlowAssumptions::default())
            .unwrap()
            .result;
        model.valuation.enterprise_value += dec!(1000);
        let options = ExportOptions {
            venture_name: "Acme".into(),
            scenarios: None,
        };

        let err = export_workbook(Some(&model), &options).unwrap_err();
        match err {
            CashFlowError::FormulaError { cell, reason } => {
                assert!(cell.starts_with("Calculations!"));
                assert!(reason.contains("recompute the model"));
            }
            other => panic!("expected FormulaError, got {other:?}"),
        }
    }
}
