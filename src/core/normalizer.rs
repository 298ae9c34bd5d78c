use crate::adapters::spreadsheet::read_table;
use crate::domain::model::{Dataset, SourceDataset, Stock, WarehouseItem};
use crate::domain::ports::Storage;
use crate::domain::table::{checked_i64, Cell, Table};
use crate::utils::error::{EtlError, Result};
use std::io::ErrorKind;
use std::path::Path;

/// Positional layout of a warehouse export. There is no header row.
pub mod columns {
    pub const BRAND: usize = 0;
    /// 第二欄的商品編號不使用 (供應商格式如此)
    pub const UNUSED_ARTICLE: usize = 1;
    pub const NAME: usize = 2;
    pub const ARTICLE: usize = 3;
    pub const SELLER_ARTICLE: usize = 4;
    pub const STOCK: usize = 5;
    pub const PRICE: usize = 6;

    pub const COUNT: usize = 7;
}

fn malformed(label: &str, row: usize, field: &str, cell: &Cell) -> EtlError {
    EtlError::MalformedValue {
        source_name: label.to_string(),
        row: row + 1,
        field: field.to_string(),
        value: cell.to_string(),
    }
}

pub fn parse_stock(cell: &Cell) -> Option<Stock> {
    match cell.value() {
        Cell::Number(n) if n.fract() == 0.0 => checked_i64(*n).map(Stock::Known),
        Cell::Text(s) => Stock::parse(s),
        _ => None,
    }
}

pub fn parse_price(cell: &Cell) -> Option<i64> {
    cell.as_integer()
}

/// Turns one raw export into a map keyed by seller article.
///
/// Duplicate seller articles overwrite earlier rows (last row wins).
pub fn normalize(label: &str, table: &Table) -> Result<Dataset> {
    let mut dataset = Dataset::new();
    let mut duplicates = 0usize;

    for (idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }

        let cell = |col: usize| table.cell(idx, col);
        let text = |col: usize| cell(col).as_key().unwrap_or_default();

        let Some(seller_article) = cell(columns::SELLER_ARTICLE).as_key() else {
            tracing::warn!("{}: row {} has no seller article, skipping", label, idx + 1);
            continue;
        };

        let stock = parse_stock(cell(columns::STOCK))
            .ok_or_else(|| malformed(label, idx, "stock", cell(columns::STOCK)))?;
        let price = parse_price(cell(columns::PRICE))
            .ok_or_else(|| malformed(label, idx, "price", cell(columns::PRICE)))?;

        let item = WarehouseItem {
            seller_article: seller_article.clone(),
            article: text(columns::ARTICLE),
            brand: text(columns::BRAND),
            name: text(columns::NAME),
            stock,
            price,
        };

        if dataset.insert(seller_article, item).is_some() {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        tracing::debug!("{}: {} duplicate seller article(s) overwritten", label, duplicates);
    }

    Ok(dataset)
}

/// Reads and normalizes one warehouse export through `storage`.
pub async fn load_dataset<S: Storage>(storage: &S, path: &Path) -> Result<SourceDataset> {
    let path_str = path.to_string_lossy();
    let bytes = storage.read_file(&path_str).await.map_err(|e| match e {
        EtlError::IoError(io) if io.kind() == ErrorKind::NotFound => EtlError::SourceNotFound {
            path: path_str.to_string(),
        },
        other => other,
    })?;

    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());

    // 倉庫匯出檔只讀第一張工作表
    let document = read_table(path, bytes)?;
    let items = normalize(&label, &document.first_sheet().table)?;

    tracing::info!("[+] Loaded {} ({} articles)", label, items.len());
    Ok(SourceDataset { label, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: [&str; columns::COUNT]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| if v.is_empty() { Cell::Empty } else { Cell::text(*v) })
            .collect()
    }

    #[test]
    fn test_normalize_keys_by_seller_article() {
        let table = Table::new(vec![
            row(["Bosch", "ignored", "Filter", "0451103316", "BO-316", "10", "100"]),
            row(["Mann", "ignored", "Oil filter", "W712", "MA-712", ">50", "250"]),
        ]);

        let dataset = normalize("sklad1.xlsx", &table).unwrap();

        assert_eq!(dataset.len(), 2);
        let item = &dataset["BO-316"];
        assert_eq!(item.article, "0451103316");
        assert_eq!(item.brand, "Bosch");
        assert_eq!(item.name, "Filter");
        assert_eq!(item.stock, Stock::Known(10));
        assert_eq!(item.price, 100);
        assert_eq!(dataset["MA-712"].stock, Stock::AtLeast(50));
    }

    #[test]
    fn test_duplicate_keys_last_row_wins() {
        let table = Table::new(vec![
            row(["A", "", "first", "X", "K1", "1", "10"]),
            row(["B", "", "second", "Y", "K1", "2", "20"]),
        ]);

        let dataset = normalize("dup.csv", &table).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset["K1"].name, "second");
        assert_eq!(dataset["K1"].price, 20);
    }

    #[test]
    fn test_numeric_cells_from_workbooks() {
        let table = Table::new(vec![vec![
            Cell::text("Brand"),
            Cell::Number(1.0),
            Cell::text("Name"),
            Cell::Number(555.0),
            Cell::Number(12345.0),
            Cell::Number(7.0),
            Cell::Number(99.5),
        ]]);

        let dataset = normalize("numeric.xlsx", &table).unwrap();
        let item = &dataset["12345"];

        assert_eq!(item.article, "555");
        assert_eq!(item.stock, Stock::Known(7));
        assert_eq!(item.price, 99);
    }

    #[test]
    fn test_blank_rows_are_ignored() {
        let table = Table::new(vec![
            Vec::new(),
            row(["", "", "", "", "", "", ""]),
            row(["A", "", "n", "X", "K1", "0", "5"]),
        ]);

        assert_eq!(normalize("blank.csv", &table).unwrap().len(), 1);
    }

    #[test]
    fn test_garbage_stock_is_an_error() {
        let table = Table::new(vec![row(["A", "", "n", "X", "K1", "many", "5"])]);

        match normalize("bad.csv", &table) {
            Err(EtlError::MalformedValue { field, row, value, .. }) => {
                assert_eq!(field, "stock");
                assert_eq!(row, 1);
                assert_eq!(value, "many");
            }
            other => panic!("expected malformed stock, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_price_is_an_error() {
        let table = Table::new(vec![row(["A", "", "n", "X", "K1", "3", ""])]);
        assert!(matches!(
            normalize("bad.csv", &table),
            Err(EtlError::MalformedValue { ref field, .. }) if field == "price"
        ));
    }

    #[test]
    fn test_out_of_range_numbers_are_malformed() {
        let mut cells = row(["A", "", "n", "X", "K1", "", "5"]);
        cells[columns::STOCK] = Cell::Number(1e20);
        let table = Table::new(vec![cells]);
        assert!(matches!(
            normalize("huge.xlsx", &table),
            Err(EtlError::MalformedValue { ref field, .. }) if field == "stock"
        ));

        let mut cells = row(["A", "", "n", "X", "K1", "3", ""]);
        cells[columns::PRICE] = Cell::Number(-1e19);
        let table = Table::new(vec![cells]);
        assert!(matches!(
            normalize("huge.xlsx", &table),
            Err(EtlError::MalformedValue { ref field, .. }) if field == "price"
        ));
    }

    #[test]
    fn test_explicit_zero_is_not_garbage() {
        let table = Table::new(vec![row(["A", "", "n", "X", "K1", "0", "0"])]);
        let dataset = normalize("zero.csv", &table).unwrap();
        assert_eq!(dataset["K1"].stock, Stock::ZERO);
        assert_eq!(dataset["K1"].price, 0);
    }
}
