use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A single spreadsheet value, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Formula text (without the leading `=`) and the value last computed for it.
    Formula { formula: String, value: Box<Cell> },
}

const EMPTY_CELL: Cell = Cell::Empty;

/// `n` as an i64 when it lies inside the i64 range; decimals are truncated.
pub fn checked_i64(n: f64) -> Option<i64> {
    let bound = -(i64::MIN as f64);
    (n.is_finite() && n >= i64::MIN as f64 && n < bound).then(|| n.trunc() as i64)
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// The computed value of a formula cell, the cell itself otherwise.
    pub fn value(&self) -> &Cell {
        match self {
            Cell::Formula { value, .. } => value,
            other => other,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self.value() {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 作為查找 key 的文字；空白儲存格回傳 None
    ///
    /// Integral numbers lose their decimal part so `12345.0` matches `"12345"`.
    pub fn as_key(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        match self.value() {
            Cell::Text(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Integer view of the cell. Decimals are truncated toward zero.
    pub fn as_integer(&self) -> Option<i64> {
        match self.value() {
            Cell::Number(n) => checked_i64(*n),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(checked_i64))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            // 整數不輸出小數點
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Cell::Formula { value, .. } => fmt::Display::fmt(value, f),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Row-major grid of cells. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Overwrites one cell. Short rows are padded; the row count never changes.
    pub fn set(&mut self, row: usize, col: usize, value: Cell) -> bool {
        let Some(cells) = self.rows.get_mut(row) else {
            return false;
        };
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = value;
        true
    }
}

/// One worksheet, or the whole of a CSV file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: Option<String>,
    pub table: Table,
}

/// Every worksheet of a spreadsheet file plus the one that was active when it
/// was saved. Always holds at least one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    sheets: Vec<Sheet>,
    active: usize,
}

impl Document {
    /// None when `sheets` is empty. An out-of-range `active` falls back to 0.
    pub fn new(sheets: Vec<Sheet>, active: usize) -> Option<Self> {
        if sheets.is_empty() {
            return None;
        }
        let active = if active < sheets.len() { active } else { 0 };
        Some(Self { sheets, active })
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn first_sheet(&self) -> &Sheet {
        &self.sheets[0]
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[self.active]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheets[self.active]
    }

    /// A copy with the active sheet's table replaced; other sheets are kept as-is.
    pub fn with_active_table(&self, table: Table) -> Self {
        let mut document = self.clone();
        document.active_sheet_mut().table = table;
        document
    }
}

impl From<Sheet> for Document {
    fn from(sheet: Sheet) -> Self {
        Self {
            sheets: vec![sheet],
            active: 0,
        }
    }
}

/// An output template loaded for one run. Projections work on the active
/// sheet, whose row 0 is the header.
///
/// Projections never mutate a template; they clone the table into a working
/// copy, so one snapshot can feed any number of runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub document: Document,
}

impl Template {
    pub const HEADER_ROWS: usize = 1;

    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn table(&self) -> &Table {
        &self.document.active_sheet().table
    }

    pub fn data_rows(&self) -> Range<usize> {
        Self::HEADER_ROWS.min(self.table().len())..self.table().len()
    }
}

/// Zero-based positions of the key column and the column a run overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub key_column: usize,
    pub value_column: usize,
}

impl ColumnLayout {
    /// 庫存範本：G 欄為商品編號，B 欄為庫存
    pub const STOCK: ColumnLayout = ColumnLayout {
        key_column: 6,
        value_column: 1,
    };

    /// 價格範本：D 欄為商品編號，J 欄為價格
    pub const PRICE: ColumnLayout = ColumnLayout {
        key_column: 3,
        value_column: 9,
    };
}

/// Which stock-template rows are zeroed before merged values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    #[serde(rename = "none")]
    Disabled,
    /// Only the last data row. This is what production has always done and is
    /// kept as the default until someone confirms that all rows were meant.
    #[default]
    LastRow,
    AllRows,
    /// Inclusive sheet row numbers (the header is row 1).
    Rows { first: usize, last: usize },
}

impl ResetScope {
    /// Table row indices covered by the scope, clamped to the data rows.
    pub fn row_indices(&self, template: &Template) -> Range<usize> {
        let data = template.data_rows();
        match *self {
            ResetScope::Disabled => data.start..data.start,
            ResetScope::LastRow if data.is_empty() => data,
            ResetScope::LastRow => data.end - 1..data.end,
            ResetScope::AllRows => data,
            ResetScope::Rows { first, last } => {
                let start = first.saturating_sub(1).clamp(data.start, data.end);
                let end = last.clamp(start, data.end);
                start..end
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_with_rows(n: usize) -> Template {
        let rows = (0..n).map(|i| vec![Cell::from(i as i64)]).collect();
        Template::new(
            Sheet {
                name: None,
                table: Table::new(rows),
            }
            .into(),
        )
    }

    #[test]
    fn test_cell_key_normalizes_numbers() {
        assert_eq!(Cell::Number(12345.0).as_key(), Some("12345".to_string()));
        assert_eq!(Cell::text(" AB-1 ").as_key(), Some("AB-1".to_string()));
        assert_eq!(Cell::text("   ").as_key(), None);
        assert_eq!(Cell::Empty.as_key(), None);
    }

    #[test]
    fn test_cell_as_integer() {
        assert_eq!(Cell::Number(100.0).as_integer(), Some(100));
        assert_eq!(Cell::Number(99.9).as_integer(), Some(99));
        assert_eq!(Cell::text("42").as_integer(), Some(42));
        assert_eq!(Cell::text("12.5").as_integer(), Some(12));
        assert_eq!(Cell::text("n/a").as_integer(), None);
        assert_eq!(Cell::Empty.as_integer(), None);
        assert_eq!(Cell::Number(f64::NAN).as_integer(), None);
        assert_eq!(Cell::Number(1e20).as_integer(), None);
        assert_eq!(Cell::text("1e20").as_integer(), None);
    }

    #[test]
    fn test_formula_cells_read_as_their_value() {
        let cell = Cell::Formula {
            formula: "B2*2".to_string(),
            value: Box::new(Cell::Number(14.0)),
        };
        assert_eq!(cell.as_integer(), Some(14));
        assert_eq!(cell.as_key(), Some("14".to_string()));
        assert_eq!(cell.to_string(), "14");
        assert!(!cell.is_blank());
    }

    #[test]
    fn test_document_projects_onto_active_sheet() {
        let sheet = |name: &str, value: i64| Sheet {
            name: Some(name.to_string()),
            table: Table::new(vec![vec![Cell::from(value)]]),
        };
        let document = Document::new(vec![sheet("Notes", 1), sheet("Prices", 2)], 1).unwrap();
        let template = Template::new(document);
        assert_eq!(template.table().cell(0, 0), &Cell::Number(2.0));

        let updated = template
            .document
            .with_active_table(Table::new(vec![vec![Cell::from(9)]]));
        assert_eq!(updated.sheets().len(), 2);
        assert_eq!(updated.sheets()[0].table.cell(0, 0), &Cell::Number(1.0));
        assert_eq!(updated.active_sheet().table.cell(0, 0), &Cell::Number(9.0));
        // 範本本身不變
        assert_eq!(template.table().cell(0, 0), &Cell::Number(2.0));

        assert!(Document::new(Vec::new(), 0).is_none());
        assert_eq!(Document::new(vec![sheet("A", 1)], 5).unwrap().active_index(), 0);
    }

    #[test]
    fn test_table_set_pads_short_rows_without_adding_rows() {
        let mut table = Table::new(vec![vec![Cell::text("a")]]);
        assert!(table.set(0, 3, Cell::from(5)));
        assert_eq!(table.rows[0].len(), 4);
        assert_eq!(table.cell(0, 3), &Cell::Number(5.0));
        assert!(!table.set(1, 0, Cell::from(1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reset_scope_rows() {
        let template = template_with_rows(5); // header + 4 data rows
        assert_eq!(ResetScope::LastRow.row_indices(&template), 4..5);
        assert_eq!(ResetScope::AllRows.row_indices(&template), 1..5);
        assert_eq!(ResetScope::Disabled.row_indices(&template), 1..1);
        assert_eq!(
            ResetScope::Rows { first: 2, last: 3 }.row_indices(&template),
            1..3
        );
        assert_eq!(
            ResetScope::Rows { first: 1, last: 99 }.row_indices(&template),
            1..5
        );
    }

    #[test]
    fn test_reset_scope_on_header_only_template() {
        let template = template_with_rows(1);
        assert!(ResetScope::LastRow.row_indices(&template).is_empty());
        assert!(ResetScope::AllRows.row_indices(&template).is_empty());
    }
}
