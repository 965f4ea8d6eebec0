use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::FetchError;
use crate::table::Table;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("table selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("row selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").expect("cell selector"));

/// Parse the first `<table>` of an HTML document.
///
/// Fewer than two rows yields an empty table. With `headers` set the first
/// row names the columns, otherwise columns are positional.
pub fn parse_first_table(html: &str, headers: bool) -> Result<Table, FetchError> {
    let doc = Html::parse_document(html);
    let table = doc.select(&TABLE).next().ok_or(FetchError::NoTable)?;

    let mut rows: Vec<Vec<String>> = table.select(&ROW).map(row_cells).collect();
    if rows.len() < 2 {
        return Ok(Table::empty());
    }

    if headers {
        let header = rows.remove(0);
        Ok(Table::from_header_rows(header, rows))
    } else {
        Ok(Table::from_rows(rows))
    }
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select(&CELL)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect()
}
