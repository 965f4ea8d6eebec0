//! One update run: fetch every tab, normalize, colour, render, publish.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{Config, ConfigError};
use crate::fetch::{FetchError, PageSource, SheetFetcher};
use crate::process::{map_colors, GradientError, Rgb};
use crate::render::{
    DonutChart, HeaderStyle, HorizontalBarChart, RenderError, Report, StyledTable,
    TimeSeriesComparison,
};
use crate::table::Table;

/// Where a report is in its run. Every report starts `Idle` and ends in
/// `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Fetching,
    Normalizing,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Normalizing => "normalizing",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Spreadsheet tabs the reports are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Portfolio,
    Returns,
    Sums,
    Valuations,
    Benchmark,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching tab {tab:?}")]
    Fetch {
        tab: Tab,
        #[source]
        source: Arc<FetchError>,
    },
    #[error("colouring column {column:?}")]
    Gradient {
        column: String,
        #[source]
        source: GradientError,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug)]
pub struct ReportFailure {
    pub report: String,
    pub stage: Stage,
    pub error: PipelineError,
}

/// Returned when at least one report could not be published.
#[derive(Debug, Error)]
#[error("{} of {} reports failed", failures.len(), attempted)]
pub struct UpdateError {
    pub attempted: usize,
    pub written: Vec<PathBuf>,
    pub failures: Vec<ReportFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
}

enum Renderer {
    Bars(HorizontalBarChart, Vec<Rgb>),
    Donut(DonutChart, Vec<Rgb>),
    Lines(TimeSeriesComparison),
    Table { table: StyledTable, drop_outer: bool },
}

struct Step {
    tab: Tab,
    renderer: Renderer,
}

impl Step {
    fn name(&self) -> &str {
        match &self.renderer {
            Renderer::Bars(r, _) => r.name(),
            Renderer::Donut(r, _) => r.name(),
            Renderer::Lines(r) => r.name(),
            Renderer::Table { table, .. } => table.name(),
        }
    }
}

pub struct UpdatePipeline<S> {
    config: Config,
    fetcher: SheetFetcher<S>,
}

impl<S: PageSource> UpdatePipeline<S> {
    /// Validate `config`, create the output directory and bind the source.
    pub fn new(config: Config, source: S) -> Result<Self, ConfigError> {
        config.validate()?;
        fs::create_dir_all(&config.output_dir).map_err(|source| ConfigError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;
        let fetcher = SheetFetcher::new(source, &config.sheet_host, config.spreadsheet_id.clone())
            .map_err(|_| ConfigError::Host(config.sheet_host.clone()))?;
        Ok(Self { config, fetcher })
    }

    fn tab_id(&self, tab: Tab) -> &str {
        let tabs = &self.config.tabs;
        match tab {
            Tab::Portfolio => &tabs.tab,
            Tab::Returns => &tabs.stopa,
            Tab::Sums => &tabs.sums,
            Tab::Valuations => &tabs.wyceny,
            Tab::Benchmark => &tabs.wig,
        }
    }

    fn plan(&self) -> Vec<Step> {
        let cols = &self.config.columns;
        let table = |name: &str, style: HeaderStyle, font_size: u32, link: Option<&str>| StyledTable {
            name: name.to_string(),
            style,
            font_size,
            link: link.map(String::from),
        };
        vec![
            Step {
                tab: Tab::Returns,
                renderer: Renderer::Bars(
                    HorizontalBarChart {
                        name: "stopa-zwrotu".into(),
                        value_col: cols.return_rate.clone(),
                        label_col: cols.name.clone(),
                        colors: None,
                        font_size: 13,
                    },
                    self.config.return_gradient(),
                ),
            },
            Step {
                tab: Tab::Returns,
                renderer: Renderer::Donut(
                    DonutChart {
                        name: "udzial".into(),
                        value_col: cols.share.clone(),
                        label_col: cols.name.clone(),
                        colors: None,
                        font_size: 11,
                    },
                    self.config.share_gradient.clone(),
                ),
            },
            Step {
                tab: Tab::Benchmark,
                renderer: Renderer::Lines(TimeSeriesComparison {
                    name: "portfolio_vs_wig".into(),
                    date_col: cols.date.clone(),
                    font_size: 17,
                    height: 450,
                }),
            },
            Step {
                tab: Tab::Portfolio,
                renderer: Renderer::Table {
                    table: table("portfolio_tab", HeaderStyle::Emphasized, 14, None),
                    drop_outer: false,
                },
            },
            Step {
                tab: Tab::Valuations,
                renderer: Renderer::Table {
                    table: table("wyceny_tab", HeaderStyle::Emphasized, 14, Some(cols.link.as_str())),
                    drop_outer: false,
                },
            },
            Step {
                tab: Tab::Sums,
                renderer: Renderer::Table {
                    table: table("sums_tab", HeaderStyle::Plain, 18, None),
                    drop_outer: true,
                },
            },
        ]
    }

    /// Run every report once. Each report is isolated: a failure is logged
    /// with its full cause chain and the remaining reports still run. Tabs
    /// are fetched at most once per run.
    pub fn run(&self) -> Result<RunSummary, UpdateError> {
        info!("=== Starting daily update ===");
        let plan = self.plan();
        let mut tabs: HashMap<Tab, Result<Table, Arc<FetchError>>> = HashMap::new();
        let mut written = Vec::new();
        let mut failures = Vec::new();

        for step in &plan {
            let span = info_span!("report", name = step.name());
            let _enter = span.enter();
            debug!(stage = %Stage::Idle, "report");

            match self.run_step(step, &mut tabs) {
                Ok(path) => {
                    debug!(stage = %Stage::Done, "report");
                    written.push(path);
                }
                Err((stage, err)) => {
                    debug!(stage = %Stage::Failed, "report");
                    error!("ERROR occurred during update!");
                    error!(
                        "report {} failed while {}: {}",
                        step.name(),
                        stage,
                        error_chain(&err)
                    );
                    failures.push(ReportFailure {
                        report: step.name().to_string(),
                        stage,
                        error: err,
                    });
                }
            }
        }

        let result = if failures.is_empty() {
            info!("All plots and tables saved successfully.");
            Ok(RunSummary { written })
        } else {
            Err(UpdateError {
                attempted: plan.len(),
                written,
                failures,
            })
        };
        info!("=== Daily update completed ===");
        result
    }

    fn fetch(
        &self,
        tab: Tab,
        cache: &mut HashMap<Tab, Result<Table, Arc<FetchError>>>,
    ) -> Result<Table, PipelineError> {
        let cached = cache.entry(tab).or_insert_with(|| {
            self.fetcher
                .fetch_tab(self.tab_id(tab), true)
                .map_err(Arc::new)
        });
        match cached {
            Ok(table) => Ok(table.clone()),
            Err(e) => Err(PipelineError::Fetch {
                tab,
                source: Arc::clone(e),
            }),
        }
    }

    fn run_step(
        &self,
        step: &Step,
        cache: &mut HashMap<Tab, Result<Table, Arc<FetchError>>>,
    ) -> Result<PathBuf, (Stage, PipelineError)> {
        debug!(stage = %Stage::Fetching, "report");
        let mut table = self
            .fetch(step.tab, cache)
            .map_err(|e| (Stage::Fetching, e))?;

        debug!(stage = %Stage::Normalizing, "report");
        let normalizing = |e: PipelineError| (Stage::Normalizing, e);
        let report: Box<dyn Report> = match &step.renderer {
            Renderer::Bars(chart, anchors) => {
                let colors = self
                    .row_colors(&mut table, &chart.value_col, anchors)
                    .map_err(normalizing)?;
                Box::new(HorizontalBarChart {
                    colors: Some(colors),
                    ..chart.clone()
                })
            }
            Renderer::Donut(chart, anchors) => {
                let colors = self
                    .row_colors(&mut table, &chart.value_col, anchors)
                    .map_err(normalizing)?;
                Box::new(DonutChart {
                    colors: Some(colors),
                    ..chart.clone()
                })
            }
            Renderer::Lines(chart) => {
                table.normalize_all_except(&chart.date_col);
                Box::new(chart.clone())
            }
            Renderer::Table {
                table: styled,
                drop_outer,
            } => {
                if *drop_outer {
                    table = table.drop_outer_columns();
                }
                Box::new(styled.clone())
            }
        };

        debug!(stage = %Stage::Rendering, "report");
        report
            .write_to(&table, &self.config.output_dir)
            .map_err(|e| (Stage::Rendering, e.into()))
    }

    /// Normalize `column` in place and map it onto `anchors` as hex colours.
    fn row_colors(
        &self,
        table: &mut Table,
        column: &str,
        anchors: &[Rgb],
    ) -> Result<Vec<String>, PipelineError> {
        if !table.normalize(column) {
            return Err(RenderError::MissingColumn(column.to_string()).into());
        }
        let values = table
            .column(column)
            .map(|c| c.numeric())
            .unwrap_or_default();
        let mapping = map_colors(&values, anchors, self.config.missing_color).map_err(|source| {
            PipelineError::Gradient {
                column: column.to_string(),
                source,
            }
        })?;
        match mapping.range {
            Some((min, max)) => debug!(column, min, max, "mapped colours"),
            None => warn!(column, "no numeric values, every row takes the missing colour"),
        }
        Ok(mapping.hex_colors())
    }
}

/// `outer: inner: innermost` rendering of an error and its sources.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::{tempdir, NamedTempFile};
    use tracing_subscriber::EnvFilter;
    use url::Url;

    use crate::telemetry;

    const CONFIG: &str = r#"
spreadsheet_id: sheet
tabs:
  tab: "1"
  stopa: "2"
  sums: "3"
  wyceny: "4"
  wig: "5"
"#;

    /// Serves canned pages keyed by the `gid` query parameter.
    struct Fixture(HashMap<String, String>);

    impl PageSource for Fixture {
        fn get_html(&self, url: &Url) -> Result<String, FetchError> {
            let gid = url
                .query_pairs()
                .find(|(k, _)| k == "gid")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            Ok(self
                .0
                .get(&gid)
                .cloned()
                .unwrap_or_else(|| "<html><body>Sign in</body></html>".to_string()))
        }
    }

    fn html_table(rows: &[&[&str]]) -> String {
        let mut s = String::from("<html><body><table>");
        for row in rows {
            s.push_str("<tr>");
            for cell in row.iter() {
                s.push_str(&format!("<td>{}</td>", cell));
            }
            s.push_str("</tr>");
        }
        s.push_str("</table></body></html>");
        s
    }

    fn full_fixture() -> HashMap<String, String> {
        let mut pages = HashMap::new();
        pages.insert(
            "1".to_string(),
            html_table(&[&["Nazwa", "Ilość"], &["AAA", "10"], &["BBB", "5"]]),
        );
        pages.insert(
            "2".to_string(),
            html_table(&[
                &["Nazwa", "Stopa zwrotu", "Udział w portfelu"],
                &["AAA", "12,5%", "60%"],
                &["BBB", "-3,25%", "40%"],
            ]),
        );
        pages.insert(
            "3".to_string(),
            html_table(&[&["", "Suma", "Zysk", ""], &["x", "1 000", "5%", "y"]]),
        );
        pages.insert(
            "4".to_string(),
            html_table(&[
                &["Spółka", "Wycena", "link (hidden)"],
                &["AAA", "Raport AAA", "https://example.com/aaa"],
            ]),
        );
        pages.insert(
            "5".to_string(),
            html_table(&[
                &["Data", "Portfel", "WIG"],
                &["2024-01-02", "0,00%", "0,00%"],
                &["zła data", "1,00%", "1,00%"],
                &["2024-01-03", "1,50%", "-0,40%"],
            ]),
        );
        pages
    }

    fn pipeline(pages: HashMap<String, String>, out: &std::path::Path) -> UpdatePipeline<Fixture> {
        let mut config = Config::from_yaml(CONFIG).unwrap();
        config.output_dir = out.to_path_buf();
        UpdatePipeline::new(config, Fixture(pages)).unwrap()
    }

    fn with_log<T>(f: impl FnOnce() -> T) -> (T, String) {
        let log = NamedTempFile::new().unwrap();
        let sub = telemetry::subscriber(Mutex::new(log.reopen().unwrap()), EnvFilter::new("info"));
        let out = tracing::subscriber::with_default(sub, f);
        (out, std::fs::read_to_string(log.path()).unwrap())
    }

    #[test]
    fn test_full_run_writes_all_artifacts() {
        let dir = tempdir().unwrap();
        let p = pipeline(full_fixture(), dir.path());
        let (result, log) = with_log(|| p.run());
        let summary = result.unwrap();

        let mut names: Vec<String> = summary
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "portfolio_tab.html",
                "portfolio_vs_wig.html",
                "stopa-zwrotu.html",
                "sums_tab.html",
                "udzial.html",
                "wyceny_tab.html",
            ]
        );

        let wyceny = fs::read_to_string(dir.path().join("wyceny_tab.html")).unwrap();
        assert!(!wyceny.contains("link (hidden)"));
        assert!(wyceny.contains(r#"<a href="https://example.com/aaa" target="_blank">Raport AAA</a>"#));

        let sums = fs::read_to_string(dir.path().join("sums_tab.html")).unwrap();
        assert!(sums.contains("<th>Suma</th>"));
        assert!(!sums.contains("<td>x</td>"));

        let bars = fs::read_to_string(dir.path().join("stopa-zwrotu.html")).unwrap();
        // worst return gets the dark red anchor, best the dark green one
        assert!(bars.contains(r##""color":["#304536","#852029"]"##));

        let wig = fs::read_to_string(dir.path().join("portfolio_vs_wig.html")).unwrap();
        assert!(!wig.contains("zła data"));

        assert!(log.contains("=== Starting daily update ==="));
        assert!(log.contains("All plots and tables saved successfully."));
        assert!(log.trim_end().ends_with("=== Daily update completed ==="));
    }

    #[test]
    fn test_rerun_replaces_artifacts() {
        let dir = tempdir().unwrap();
        let p = pipeline(full_fixture(), dir.path());
        fs::write(dir.path().join("udzial.html"), "stale").unwrap();

        let (result, log) = with_log(|| p.run());
        result.unwrap();
        let donut = fs::read_to_string(dir.path().join("udzial.html")).unwrap();
        assert!(donut.contains("Plotly.newPlot"));
        assert!(log.contains("Replaced existing file"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 6);
    }

    #[test]
    fn test_missing_table_is_logged_and_run_completes() {
        let dir = tempdir().unwrap();
        let p = pipeline(HashMap::new(), dir.path());
        let (result, log) = with_log(|| p.run());

        let err = result.unwrap_err();
        assert_eq!(err.attempted, 6);
        assert_eq!(err.failures.len(), 6);
        assert!(err.written.is_empty());
        for f in &err.failures {
            assert_eq!(f.stage, Stage::Fetching);
            assert!(matches!(
                &f.error,
                PipelineError::Fetch { source, .. } if matches!(**source, FetchError::NoTable)
            ));
        }
        assert_eq!(err.to_string(), "6 of 6 reports failed");

        let error_at = log.find("ERROR occurred during update!").unwrap();
        let done_at = log.find("=== Daily update completed ===").unwrap();
        assert!(error_at < done_at);
        assert!(log.contains("no <table> element in response"));
        assert!(!log.contains("All plots and tables saved successfully."));
    }

    #[test]
    fn test_one_broken_tab_does_not_block_others() {
        let dir = tempdir().unwrap();
        let mut pages = full_fixture();
        pages.remove("5");
        let p = pipeline(pages, dir.path());
        let (result, _) = with_log(|| p.run());

        let err = result.unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].report, "portfolio_vs_wig");
        assert_eq!(err.written.len(), 5);
        assert!(dir.path().join("wyceny_tab.html").exists());
        assert!(!dir.path().join("portfolio_vs_wig.html").exists());
    }

    #[test]
    fn test_missing_value_column_fails_while_normalizing() {
        let dir = tempdir().unwrap();
        let mut pages = full_fixture();
        pages.insert(
            "2".to_string(),
            html_table(&[&["Nazwa", "Udział w portfelu"], &["AAA", "100%"]]),
        );
        let p = pipeline(pages, dir.path());
        let (result, _) = with_log(|| p.run());

        let err = result.unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].report, "stopa-zwrotu");
        assert_eq!(err.failures[0].stage, Stage::Normalizing);
        assert!(dir.path().join("udzial.html").exists());
    }

    #[test]
    fn test_all_missing_values_render_in_missing_colour() {
        let dir = tempdir().unwrap();
        let mut pages = full_fixture();
        pages.insert(
            "2".to_string(),
            html_table(&[
                &["Nazwa", "Stopa zwrotu", "Udział w portfelu"],
                &["AAA", "-", "60%"],
                &["BBB", "", "40%"],
            ]),
        );
        let p = pipeline(pages, dir.path());
        let (result, log) = with_log(|| p.run());

        result.unwrap();
        let bars = fs::read_to_string(dir.path().join("stopa-zwrotu.html")).unwrap();
        assert!(bars.contains(r##""color":["#d3d3d3","#d3d3d3"]"##));
        assert!(log.contains("every row takes the missing colour"));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let dir = tempdir().unwrap();
        let mut config = Config::from_yaml(CONFIG).unwrap();
        config.output_dir = dir.path().to_path_buf();
        config.spreadsheet_id = String::new();
        assert!(matches!(
            UpdatePipeline::new(config, Fixture(HashMap::new())),
            Err(ConfigError::MissingSpreadsheetId)
        ));
    }
}
