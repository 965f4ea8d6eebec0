use chrono::NaiveDate;
use plotly::common::{Anchor, Font, Line, Mode, Orientation};
use plotly::layout::{Annotation, Axis, HoverMode, Legend, Margin, Shape, ShapeLine, ShapeType};
use plotly::{Layout, Plot, Scatter};

use super::page::chart_page;
use super::{require, Report, RenderError};
use crate::process::date_parser::parse_date;
use crate::table::Table;

pub const PORTFOLIO_COLOR: &str = "#304536";
pub const BENCHMARK_COLOR: &str = "#852029";

/// Portfolio vs. benchmark lines over time. The x axis is replaced by a
/// zero line with the first and last date written at its ends.
#[derive(Debug, Clone)]
pub struct TimeSeriesComparison {
    pub name: String,
    pub date_col: String,
    pub font_size: u32,
    pub height: u32,
}

/// Rows that survived date parsing and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub dates: Vec<NaiveDate>,
    pub names: [String; 2],
    pub portfolio: Vec<f64>,
    pub benchmark: Vec<f64>,
}

impl TimeSeriesComparison {
    /// Drop every row whose date does not parse or whose series values are
    /// missing. The two non-date columns are portfolio and benchmark, in
    /// column order.
    pub fn prepare(&self, table: &Table) -> Result<Series, RenderError> {
        let dates = require(table, &self.date_col)?;
        let series: Vec<_> = table
            .columns()
            .iter()
            .filter(|c| c.name != self.date_col)
            .collect();
        let [first, second] = series.as_slice() else {
            return Err(RenderError::SeriesCount {
                date: self.date_col.clone(),
                found: series.len(),
            });
        };

        let a = first.numeric();
        let b = second.numeric();
        let mut out = Series {
            dates: Vec::new(),
            names: [first.name.clone(), second.name.clone()],
            portfolio: Vec::new(),
            benchmark: Vec::new(),
        };
        for i in 0..table.row_count() {
            if let (Some(d), Some(p), Some(q)) = (parse_date(&dates.display(i)), a[i], b[i]) {
                out.dates.push(d);
                out.portfolio.push(p);
                out.benchmark.push(q);
            }
        }
        if out.dates.is_empty() {
            return Err(RenderError::NoData);
        }
        Ok(out)
    }

    pub fn figure(&self, table: &Table) -> Result<Plot, RenderError> {
        let s = self.prepare(table)?;
        let fmt = |d: &NaiveDate| d.format("%Y-%m-%d").to_string();
        let x: Vec<String> = s.dates.iter().map(fmt).collect();

        // prepare() guarantees at least one row
        let (first, last) = (&x[0], &x[x.len() - 1]);
        let lo = s.dates.iter().min().map(fmt).unwrap_or_default();
        let hi = s.dates.iter().max().map(fmt).unwrap_or_default();
        let font = Font::new()
            .family("Arial")
            .size(self.font_size as usize)
            .color("black");

        let edge = |date: &str, anchor: Anchor| {
            Annotation::new()
                .x(date)
                .y(0.0)
                .text(date)
                .show_arrow(false)
                .x_anchor(anchor)
                .y_anchor(Anchor::Top)
                .font(font.clone())
        };
        let line = |name: &str, y: Vec<f64>, color: &'static str| {
            Scatter::new(x.clone(), y)
                .mode(Mode::Lines)
                .name(name)
                .line(Line::new().color(color).width(2.0))
                .hover_template("%{y:.2f}%<extra></extra>")
        };

        let layout = Layout::new()
            .font(font.clone())
            .x_axis(
                Axis::new()
                    .show_tick_labels(false)
                    .show_grid(false)
                    .zero_line(false)
                    .show_line(false),
            )
            .y_axis(
                Axis::new()
                    .show_grid(true)
                    .grid_color("lightgray")
                    .zero_line(false),
            )
            .shapes(vec![Shape::new()
                .shape_type(ShapeType::Line)
                .x0(lo.as_str())
                .x1(hi.as_str())
                .y0(0.0)
                .y1(0.0)
                .line(ShapeLine::new().color("black").width(2.0))])
            .annotations(vec![
                edge(first.as_str(), Anchor::Left),
                edge(last.as_str(), Anchor::Right),
            ])
            .plot_background_color("white")
            .hover_mode(HoverMode::XUnified)
            .height(self.height as usize)
            .legend(
                Legend::new()
                    .orientation(Orientation::Horizontal)
                    .y_anchor(Anchor::Bottom)
                    .y(1.05)
                    .x_anchor(Anchor::Center)
                    .x(0.5)
                    .font(Font::new().size(self.font_size as usize)),
            )
            .margin(Margin::new().left(50).right(50).top(30).bottom(50));

        let mut plot = Plot::new();
        plot.add_trace(line(s.names[0].as_str(), s.portfolio.clone(), PORTFOLIO_COLOR));
        plot.add_trace(line(s.names[1].as_str(), s.benchmark.clone(), BENCHMARK_COLOR));
        plot.set_layout(layout);
        Ok(plot)
    }
}

impl Report for TimeSeriesComparison {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, table: &Table) -> Result<String, RenderError> {
        Ok(chart_page(&self.name, self.figure(table)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn chart() -> TimeSeriesComparison {
        TimeSeriesComparison {
            name: "portfolio_vs_wig".into(),
            date_col: "Data".into(),
            font_size: 17,
            height: 450,
        }
    }

    fn wig() -> Table {
        Table::from_header_rows(
            strings(&["Data", "Portfel", "WIG"]),
            vec![
                strings(&["2024-01-02", "0,00%", "0,00%"]),
                strings(&["2024-01-03", "1,50%", "-0,40%"]),
                strings(&["wkrótce", "2,00%", "1,00%"]),
                strings(&["2024-01-05", "-", "0,10%"]),
                strings(&["2024-01-08", "2,25%", "0,90%"]),
                strings(&["2024-01-09", "3,00%", ""]),
            ],
        )
    }

    #[test]
    fn test_unparseable_and_missing_rows_dropped() {
        let s = chart().prepare(&wig()).unwrap();
        assert_eq!(s.dates.len(), 3);
        assert_eq!(s.names, ["Portfel".to_string(), "WIG".to_string()]);
        assert_eq!(s.portfolio, vec![0.0, 1.5, 2.25]);
        assert_eq!(s.benchmark, vec![0.0, -0.4, 0.9]);
    }

    #[test]
    fn test_axis_labels_are_retained_ends() {
        let plot = chart().figure(&wig()).unwrap();
        let fig: Value = serde_json::from_str(&plot.to_json()).unwrap();
        let ann = &fig["layout"]["annotations"];
        assert_eq!(ann[0]["text"], "2024-01-02");
        assert_eq!(ann[0]["xanchor"], "left");
        assert_eq!(ann[1]["text"], "2024-01-08");
        assert_eq!(ann[1]["xanchor"], "right");
        assert_eq!(fig["layout"]["shapes"][0]["x0"], "2024-01-02");
        assert_eq!(fig["layout"]["shapes"][0]["x1"], "2024-01-08");
        assert_eq!(fig["layout"]["xaxis"]["showticklabels"], false);
        assert_eq!(fig["data"][0]["line"]["color"], PORTFOLIO_COLOR);
        assert_eq!(fig["data"][1]["line"]["color"], BENCHMARK_COLOR);

        let x = fig["data"][0]["x"].as_array().unwrap();
        assert_eq!(x.len(), 3);
        assert!(!x.iter().any(|d| d == "2024-01-05"));

        let html = chart().render(&wig()).unwrap();
        assert!(!html.contains("wkrótce"));
    }

    #[test]
    fn test_series_count_and_empty() {
        let t = Table::from_header_rows(strings(&["Data", "Portfel"]), vec![strings(&["2024-01-02", "1"])]);
        assert!(matches!(
            chart().prepare(&t),
            Err(RenderError::SeriesCount { found: 1, .. })
        ));

        let t = Table::from_header_rows(
            strings(&["Data", "A", "B"]),
            vec![strings(&["never", "1", "2"])],
        );
        assert!(matches!(chart().prepare(&t), Err(RenderError::NoData)));

        let t = Table::from_header_rows(strings(&["Date", "A", "B"]), vec![]);
        assert!(matches!(chart().prepare(&t), Err(RenderError::MissingColumn(_))));
    }
}
