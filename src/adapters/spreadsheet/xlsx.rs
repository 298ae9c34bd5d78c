use crate::domain::table::{Cell, Document, Sheet, Table};
use crate::utils::error::{EtlError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use rust_xlsxwriter::{Formula, Workbook, Worksheet};
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // 日期保留為 Excel 序號
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

/// 存檔時的作用中分頁 (xl/workbook.xml 的 activeTab)，xls/ods 或讀不到時為 0
fn active_tab(bytes: &[u8]) -> usize {
    let Ok(mut archive) = ZipArchive::new(Cursor::new(bytes)) else {
        return 0;
    };
    let mut xml = String::new();
    match archive.by_name("xl/workbook.xml") {
        Ok(mut entry) => {
            if entry.read_to_string(&mut xml).is_err() {
                return 0;
            }
        }
        Err(_) => return 0,
    }

    regex::Regex::new(r#"activeTab="(\d+)""#)
        .ok()
        .and_then(|re| re.captures(&xml).and_then(|caps| caps[1].parse().ok()))
        .unwrap_or(0)
}

/// calamine trims the used range to the first non-empty cell; the leading
/// rows and columns are padded back so column indices match the sheet.
fn value_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    if let Some((start_row, start_col)) = range.start() {
        rows.resize(start_row as usize, Vec::new());
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_col as usize];
            cells.extend(row.iter().map(convert));
            while cells.last().is_some_and(Cell::is_blank) {
                cells.pop();
            }
            rows.push(cells);
        }
    }
    rows
}

/// Wraps the cached values in `rows` with the formulas that produced them.
fn apply_formulas(rows: &mut Vec<Vec<Cell>>, formulas: &Range<String>) {
    let Some((start_row, start_col)) = formulas.start() else {
        return;
    };

    for (r, c, formula) in formulas.used_cells() {
        let row = start_row as usize + r;
        let col = start_col as usize + c;
        if rows.len() <= row {
            rows.resize(row + 1, Vec::new());
        }
        let cells = &mut rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        let value = std::mem::take(&mut cells[col]);
        cells[col] = Cell::Formula {
            formula: formula.trim_start_matches('=').to_string(),
            value: Box::new(value),
        };
    }
}

/// Reads every worksheet (xlsx, xls, xlsb, ods) from memory, formulas included.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Document> {
    let active = active_tab(&bytes);
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let mut rows = value_rows(&range);

        match workbook.worksheet_formula(&name) {
            Ok(formulas) => apply_formulas(&mut rows, &formulas),
            Err(e) => tracing::warn!("Formulas of sheet '{}' not readable, keeping values: {}", name, e),
        }

        tracing::debug!("Read sheet '{}' with {} rows", name, rows.len());
        sheets.push(Sheet {
            name: Some(name),
            table: Table::new(rows),
        });
    }

    Document::new(sheets, active).ok_or_else(|| EtlError::processing("Excel file contains no sheets"))
}

fn write_cells(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx)
            .map_err(|_| EtlError::processing(format!("Row {} out of range", row_idx)))?;

        for (col_idx, cell) in row.iter().enumerate() {
            let col_num = u16::try_from(col_idx)
                .map_err(|_| EtlError::processing(format!("Column {} out of range", col_idx)))?;

            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col_num, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_num, col_num, *n)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_num, col_num, *b)?;
                }
                Cell::Formula { formula, value } => {
                    let formula = Formula::new(formula).set_result(value.to_string());
                    worksheet.write_formula(row_num, col_num, formula)?;
                }
            }
        }
    }
    Ok(())
}

/// Writes every sheet in order and marks the active one.
pub fn write_workbook(document: &Document) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for (idx, sheet) in document.sheets().iter().enumerate() {
        let worksheet = workbook.add_worksheet();

        if let Some(name) = &sheet.name {
            if let Err(e) = worksheet.set_name(name) {
                tracing::warn!("Keeping default sheet name, '{}' rejected: {}", name, e);
            }
        }
        if idx == document.active_index() {
            worksheet.set_active(true);
        }

        write_cells(worksheet, &sheet.table)?;
    }

    Ok(workbook.save_to_buffer()?)
}
