use crate::core::protected::ProtectedArticles;
use crate::domain::model::{MergedArticleRecord, MergedReport, Stock};
use crate::domain::table::{Cell, ColumnLayout, ResetScope, Table, Template};
use serde::Serialize;
use std::collections::HashMap;

/// What one projection did to its template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionSummary {
    pub rows_reset: usize,
    pub rows_updated: usize,
    /// Report articles with no row in the template, in report order.
    pub unmatched: Vec<String>,
}

/// A template's working copy after projection.
#[derive(Debug, Clone)]
pub struct Projection {
    pub table: Table,
    pub summary: ProjectionSummary,
}

pub fn stock_cell(stock: &Stock) -> Cell {
    match stock {
        Stock::Known(n) => Cell::from(*n),
        Stock::AtLeast(_) => Cell::Text(stock.to_string()),
    }
}

/// Key → row index over the data rows. Blank keys are not indexed; for a
/// key that repeats, the last row is the one that gets written.
pub fn index_rows(template: &Template, key_column: usize) -> HashMap<String, usize> {
    template
        .data_rows()
        .filter_map(|row| {
            template
                .table()
                .cell(row, key_column)
                .as_key()
                .map(|key| (key, row))
        })
        .collect()
}

/// Writes one value per matched report article into `table`.
fn overwrite<F>(
    template: &Template,
    table: &mut Table,
    report: &MergedReport,
    layout: ColumnLayout,
    label: &str,
    value: F,
) -> (usize, Vec<String>)
where
    F: Fn(&MergedArticleRecord) -> Cell,
{
    let rows = index_rows(template, layout.key_column);
    let mut updated = 0;
    let mut unmatched = Vec::new();

    for (article, record) in report {
        match rows.get(article) {
            Some(&row) => {
                let cell = value(record);
                tracing::debug!("[+] {}: article {} -> {} (row {})", label, article, cell, row + 1);
                table.set(row, layout.value_column, cell);
                updated += 1;
            }
            None => {
                tracing::debug!("[-] {}: article {} not in template, skipping", label, article);
                unmatched.push(article.clone());
            }
        }
    }

    (updated, unmatched)
}

/// Projects merged stock onto the stock template.
///
/// Rows in `reset` whose key is not protected are zeroed first, then every
/// report article with a row gets its merged stock. No row is added or removed.
pub fn project_stock(
    report: &MergedReport,
    protected: &ProtectedArticles,
    template: &Template,
    layout: ColumnLayout,
    reset: ResetScope,
) -> Projection {
    let mut table = template.table().clone();

    let mut rows_reset = 0;
    for row in reset.row_indices(template) {
        let key = template.table().cell(row, layout.key_column).as_key();
        if key.as_deref().is_some_and(|k| protected.contains(k)) {
            continue;
        }
        table.set(row, layout.value_column, stock_cell(&Stock::ZERO));
        rows_reset += 1;
    }

    let (rows_updated, unmatched) = overwrite(template, &mut table, report, layout, "stock", |r| {
        stock_cell(&r.stock)
    });

    tracing::info!(
        "📦 Stock template: {} reset, {} updated, {} not found",
        rows_reset,
        rows_updated,
        unmatched.len()
    );

    Projection {
        table,
        summary: ProjectionSummary {
            rows_reset,
            rows_updated,
            unmatched,
        },
    }
}

/// Projects merged sale prices onto the price template.
pub fn project_price(report: &MergedReport, template: &Template, layout: ColumnLayout) -> Projection {
    let mut table = template.table().clone();

    let (rows_updated, unmatched) = overwrite(template, &mut table, report, layout, "price", |r| {
        Cell::from(r.price)
    });

    tracing::info!(
        "💰 Price template: {} updated, {} not found",
        rows_updated,
        unmatched.len()
    );

    Projection {
        table,
        summary: ProjectionSummary {
            rows_reset: 0,
            rows_updated,
            unmatched,
        },
    }
}
