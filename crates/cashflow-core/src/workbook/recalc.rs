use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::CashFlowError;
use crate::CashFlowResult;

use super::formula::{self, CellAddr};
use super::sheet::{CellContent, SynthesizedWorkbook};

/// One formula cell re-evaluated from its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecalc {
    /// Qualified address, e.g. "Calculations!B2"
    pub address: String,
    pub formula: String,
    pub cached: Decimal,
    pub recomputed: Decimal,
    pub drift: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub cells: Vec<CellRecalc>,
    pub max_drift: Decimal,
}

impl RecalcReport {
    /// True when every recomputed value is within `tolerance` of its cached value.
    pub fn is_consistent(&self, tolerance: Decimal) -> bool {
        self.max_drift <= tolerance
    }

    /// Cells whose drift exceeds `tolerance`.
    pub fn inconsistent(&self, tolerance: Decimal) -> Vec<&CellRecalc> {
        self.cells.iter().filter(|c| c.drift > tolerance).collect()
    }
}

/// Re-evaluate every formula in the workbook from the literal cells it
/// ultimately depends on, ignoring cached results.
pub fn recalculate(workbook: &SynthesizedWorkbook) -> CashFlowResult<RecalcReport> {
    let mut evaluator = Evaluator {
        workbook,
        memo: HashMap::new(),
        in_progress: HashSet::new(),
    };

    let mut cells = Vec::new();
    let mut max_drift = Decimal::ZERO;

    for (sheet_idx, sheet) in workbook.sheets.iter().enumerate() {
        for (row, col, cell) in sheet.cells() {
            let CellContent::Formula { formula, cached } = &cell.content else {
                continue;
            };
            let recomputed = evaluator
                .value(sheet_idx, row, col)
                .map_err(|reason| CashFlowError::FormulaError {
                    cell: sheet.address(row, col),
                    reason,
                })?;
            let drift = (recomputed - *cached).abs();
            max_drift = max_drift.max(drift);
            cells.push(CellRecalc {
                address: sheet.address(row, col),
                formula: formula.clone(),
                cached: *cached,
                recomputed,
                drift,
            });
        }
    }

    debug!(cells = cells.len(), %max_drift, "recalculated workbook");
    Ok(RecalcReport { cells, max_drift })
}

type CellKey = (usize, u32, u16);

struct Evaluator<'a> {
    workbook: &'a SynthesizedWorkbook,
    memo: HashMap<CellKey, Decimal>,
    in_progress: HashSet<CellKey>,
}

impl Evaluator<'_> {
    fn value(&mut self, sheet_idx: usize, row: u32, col: u16) -> Result<Decimal, String> {
        let key = (sheet_idx, row, col);
        if let Some(v) = self.memo.get(&key) {
            return Ok(*v);
        }

        let workbook = self.workbook;
        let sheet = &workbook.sheets[sheet_idx];
        let Some(cell) = sheet.get(row, col) else {
            return Ok(Decimal::ZERO);
        };

        let value = match &cell.content {
            CellContent::Number(n) => *n,
            CellContent::Text(_) => {
                return Err(format!(
                    "{} holds text, not a number",
                    sheet.address(row, col)
                ))
            }
            CellContent::Formula { formula: text, .. } => {
                if !self.in_progress.insert(key) {
                    return Err(format!(
                        "Circular reference through {}",
                        sheet.address(row, col)
                    ));
                }
                let expr = formula::parse(text)
                    .map_err(|e| format!("{}: {e}", sheet.address(row, col)))?;
                let result = formula::evaluate(&expr, &mut |addr: &CellAddr| {
                    let target = self.sheet_index(sheet_idx, addr)?;
                    self.value(target, addr.row, addr.col)
                });
                self.in_progress.remove(&key);
                result?
            }
        };

        self.memo.insert(key, value);
        Ok(value)
    }

    fn sheet_index(&self, current: usize, addr: &CellAddr) -> Result<usize, String> {
        match &addr.sheet {
            None => Ok(current),
            Some(name) => self
                .workbook
                .sheets
                .iter()
                .position(|s| s.name == *name)
                .ok_or_else(|| format!("Unknown sheet '{name}'")),
        }
    }
}
