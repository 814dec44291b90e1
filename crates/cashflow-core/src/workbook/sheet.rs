// In-memory workbook produced by the synthesizer.
// The xlsx writer serialises it; the recalculator evaluates it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::layout::cell_name;

/// Display hint carried to the xlsx writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStyle {
    Plain,
    Header,
    Currency,
    Percent,
    Multiple,
    Factor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    Number(Decimal),
    Text(String),
    /// Formula text (with leading '=') and the value the engine computed for it
    Formula { formula: String, cached: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub content: CellContent,
    pub style: CellStyle,
}

/// One worksheet, keyed by 0-based (row, col).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(u32, u16), Cell>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
        }
    }

    pub fn set_number(&mut self, row: u32, col: u16, value: Decimal, style: CellStyle) {
        self.cells.insert(
            (row, col),
            Cell {
                content: CellContent::Number(value),
                style,
            },
        );
    }

    pub fn set_text(&mut self, row: u32, col: u16, text: impl Into<String>, style: CellStyle) {
        self.cells.insert(
            (row, col),
            Cell {
                content: CellContent::Text(text.into()),
                style,
            },
        );
    }

    pub fn set_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: String,
        cached: Decimal,
        style: CellStyle,
    ) {
        self.cells.insert(
            (row, col),
            Cell {
                content: CellContent::Formula { formula, cached },
                style,
            },
        );
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &Cell)> {
        self.cells.iter().map(|(&(row, col), cell)| (row, col, cell))
    }

    pub fn formula_count(&self) -> usize {
        self.cells
            .values()
            .filter(|c| matches!(c.content, CellContent::Formula { .. }))
            .count()
    }

    /// Highest column in use, for sizing.
    pub fn max_col(&self) -> u16 {
        self.cells.keys().map(|&(_, col)| col).max().unwrap_or(0)
    }

    pub fn address(&self, row: u32, col: u16) -> String {
        format!("{}!{}", self.name, cell_name(row, col))
    }
}

/// The three-sheet workbook for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedWorkbook {
    pub venture_name: String,
    pub sheets: Vec<Sheet>,
}

impl SynthesizedWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn formula_count(&self) -> usize {
        self.sheets.iter().map(Sheet::formula_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cells_iterate_row_major() {
        let mut sheet = Sheet::new("Test");
        sheet.set_number(2, 0, dec!(3), CellStyle::Plain);
        sheet.set_text(0, 1, "b", CellStyle::Header);
        sheet.set_formula(1, 0, "=A1".into(), dec!(1), CellStyle::Plain);

        let order: Vec<(u32, u16)> = sheet.cells().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(order, vec![(0, 1), (1, 0), (2, 0)]);
        assert_eq!(sheet.formula_count(), 1);
        assert_eq!(sheet.max_col(), 1);
        assert_eq!(sheet.address(1, 0), "Test!A2");
    }

    #[test]
    fn test_overwrite_replaces_cell() {
        let mut sheet = Sheet::new("Test");
        sheet.set_number(0, 0, dec!(1), CellStyle::Plain);
        sheet.set_number(0, 0, dec!(2), CellStyle::Currency);
        let cell = sheet.get(0, 0).unwrap();
        assert_eq!(cell.content, CellContent::Number(dec!(2)));
        assert_eq!(cell.style, CellStyle::Currency);
    }
}
