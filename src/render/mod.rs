//! Static HTML reports: styled tables and Plotly charts.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::table::Table;

pub mod bar;
pub mod donut;
pub mod page;
pub mod table;
pub mod timeseries;
pub mod write;

pub use bar::HorizontalBarChart;
pub use donut::DonutChart;
pub use table::{HeaderStyle, StyledTable};
pub use timeseries::TimeSeriesComparison;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("required column {0:?} not found")]
    MissingColumn(String),
    #[error("got {colors} colours for {rows} rows")]
    ColorCount { colors: usize, rows: usize },
    #[error("invalid colour {0:?}")]
    InvalidColor(String),
    #[error("expected exactly 2 series columns besides {date:?}, found {found}")]
    SeriesCount { date: String, found: usize },
    #[error("no rows left to plot")]
    NoData,
    #[error("writing {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A finished HTML document and the file name it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub file_name: String,
    pub html: String,
}

impl ReportArtifact {
    /// Replace `<dir>/<file_name>` with this document.
    pub fn persist(&self, dir: &Path) -> Result<PathBuf, RenderError> {
        write::replace_file(&dir.join(&self.file_name), self.html.as_bytes())
    }
}

/// Shared contract of every renderer: table in, one self-contained page out.
pub trait Report {
    /// Output file stem; the artifact is written as `<name>.html`.
    fn name(&self) -> &str;

    fn render(&self, table: &Table) -> Result<String, RenderError>;

    fn artifact(&self, table: &Table) -> Result<ReportArtifact, RenderError> {
        Ok(ReportArtifact {
            file_name: format!("{}.html", self.name()),
            html: self.render(table)?,
        })
    }

    fn write_to(&self, table: &Table, dir: &Path) -> Result<PathBuf, RenderError> {
        self.artifact(table)?.persist(dir)
    }
}

pub(crate) fn require<'t>(
    table: &'t Table,
    name: &str,
) -> Result<&'t crate::table::Column, RenderError> {
    table
        .column(name)
        .ok_or_else(|| RenderError::MissingColumn(name.to_string()))
}
