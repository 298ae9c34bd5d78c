use crate::domain::table::{Cell, Sheet, Table};
use crate::utils::error::{EtlError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV 沒有表頭概念，所有列原樣讀入
pub fn read_sheet(bytes: &[u8]) -> Result<Sheet> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::text(field)
                    }
                })
                .collect(),
        );
    }

    Ok(Sheet {
        name: None,
        table: Table::new(rows),
    })
}

pub fn write_sheet(table: &Table) -> Result<Vec<u8>> {
    let mut writer = ::csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::processing(format!("Failed to flush CSV output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_ragged_csv_with_bom() {
        let data = "\u{feff}Brand,,Name\nACME,x\n".as_bytes();
        let sheet = read_sheet(data).unwrap();

        assert_eq!(sheet.table.len(), 2);
        assert_eq!(sheet.table.cell(0, 0), &Cell::text("Brand"));
        assert_eq!(sheet.table.cell(0, 1), &Cell::Empty);
        assert_eq!(sheet.table.rows[1].len(), 2);
    }

    #[test]
    fn test_write_numbers_without_decimals() {
        let table = Table::new(vec![
            vec![Cell::text("article"), Cell::text("stock")],
            vec![Cell::text("A, quoted"), Cell::Number(15.0), Cell::text(">20")],
        ]);
        let out = String::from_utf8(write_sheet(&table).unwrap()).unwrap();

        assert_eq!(out, "article,stock\n\"A, quoted\",15,>20\n");
    }
}
