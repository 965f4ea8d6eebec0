use std::collections::HashSet;

use crate::process::normalize::normalize_column;

/// Cell storage for one column. Columns start out as text and are coerced
/// to numbers in place, one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<String>),
    Numeric(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    /// Display text for row `i`; missing numbers render as an empty string.
    pub fn display(&self, i: usize) -> String {
        match &self.data {
            ColumnData::Text(v) => v[i].clone(),
            ColumnData::Numeric(v) => v[i].map(|x| x.to_string()).unwrap_or_default(),
        }
    }

    /// Numeric view of the column. Text columns are normalized on the fly
    /// without mutating the table.
    pub fn numeric(&self) -> Vec<Option<f64>> {
        match &self.data {
            ColumnData::Numeric(v) => v.clone(),
            ColumnData::Text(v) => normalize_column(v),
        }
    }
}

/// Ordered, uniquely named, equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table whose first row supplies the column names.
    pub fn from_header_rows(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(header.len());
        let mut names = header;
        for i in names.len()..width {
            names.push(i.to_string());
        }
        Self::build(dedupe_names(names), rows, width)
    }

    /// Build a table with positional column names (`0`, `1`, ...).
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let names = (0..width).map(|i| i.to_string()).collect();
        Self::build(names, rows, width)
    }

    fn build(names: Vec<String>, rows: Vec<Vec<String>>, width: usize) -> Self {
        let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); width];
        for mut row in rows {
            row.resize(width, String::new());
            for (col, value) in cells.iter_mut().zip(row) {
                col.push(value);
            }
        }
        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, v)| Column {
                name,
                data: ColumnData::Text(v),
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.row_count() == 0
    }

    /// Coerce the named column to numbers in place. Returns `false` when the
    /// column does not exist. Already-numeric columns are left untouched.
    pub fn normalize(&mut self, name: &str) -> bool {
        let Some(col) = self.columns.iter_mut().find(|c| c.name == name) else {
            return false;
        };
        if let ColumnData::Text(raw) = &col.data {
            col.data = ColumnData::Numeric(normalize_column(raw));
        }
        true
    }

    /// Normalize every column except `keep`.
    pub fn normalize_all_except(&mut self, keep: &str) {
        let names: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.name != keep)
            .map(|c| c.name.clone())
            .collect();
        for name in names {
            self.normalize(&name);
        }
    }

    /// Drop the first and last column. Tables with two or fewer columns
    /// become empty.
    pub fn drop_outer_columns(mut self) -> Self {
        if self.columns.len() <= 2 {
            return Self::empty();
        }
        self.columns.pop();
        self.columns.remove(0);
        self
    }
}

fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}.{}", name, n);
                n += 1;
            }
            candidate
        })
        .collect()
}
