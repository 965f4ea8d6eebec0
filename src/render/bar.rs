use plotly::common::{Anchor, Font, Marker, Orientation};
use plotly::layout::{Annotation, Axis, Margin, Shape, ShapeLine, ShapeType};
use plotly::{Bar, Layout, Plot};

use super::page::chart_page;
use super::{require, Report, RenderError};
use crate::table::Table;

const DEFAULT_BAR_COLOR: &str = "gray";

/// One horizontal bar per row, first row on top, with a `12.34%` label at
/// the end of each bar.
#[derive(Debug, Clone)]
pub struct HorizontalBarChart {
    pub name: String,
    pub value_col: String,
    pub label_col: String,
    /// Per-row colours; must match the row count when set.
    pub colors: Option<Vec<String>>,
    pub font_size: u32,
}

impl HorizontalBarChart {
    fn font(&self, color: &'static str) -> Font {
        Font::new()
            .family("Arial")
            .size(self.font_size as usize)
            .color(color)
    }

    pub fn figure(&self, table: &Table) -> Result<Plot, RenderError> {
        // missing values are drawn as zero-length bars
        let values: Vec<f64> = require(table, &self.value_col)?
            .numeric()
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        let label_col = require(table, &self.label_col)?;
        let n = values.len();
        let labels: Vec<String> = (0..n).map(|i| label_col.display(i)).collect();

        let colors = match &self.colors {
            Some(c) if c.len() != n => {
                return Err(RenderError::ColorCount {
                    colors: c.len(),
                    rows: n,
                })
            }
            Some(c) => c.clone(),
            None => vec![DEFAULT_BAR_COLOR.to_string(); n],
        };

        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let dx = if n > 0 { 0.015 * (max - min) } else { 0.0 };
        // category axis from the last row down to the first
        let top = n as f64 - 0.5;

        let annotations: Vec<Annotation> = values
            .iter()
            .zip(&labels)
            .map(|(&v, label)| {
                let (x, color) = if v >= 0.0 {
                    (v + dx, "black")
                } else {
                    (v + dx.min(0.4 * v.abs()), "white")
                };
                Annotation::new()
                    .x(x)
                    .y(label.as_str())
                    .text(format!("{:.2}%", v))
                    .x_anchor(Anchor::Left)
                    .y_anchor(Anchor::Middle)
                    .font(self.font(color))
                    .show_arrow(false)
            })
            .collect();

        let trace = Bar::new(values, labels)
            .orientation(Orientation::Horizontal)
            .marker(Marker::new().color_array(colors))
            .hover_template("%{y}: %{x:.2f}%<extra></extra>")
            .show_legend(false);

        let layout = Layout::new()
            .annotations(annotations)
            .font(self.font("black"))
            .x_axis(
                Axis::new()
                    .show_grid(true)
                    .grid_color("lightgray")
                    .zero_line(true)
                    .zero_line_color("black")
                    .zero_line_width(1),
            )
            .y_axis(Axis::new().range(vec![top, -0.5]).show_grid(false))
            .plot_background_color("white")
            .paper_background_color("white")
            .shapes(vec![Shape::new()
                .shape_type(ShapeType::Line)
                .x0(0.0)
                .x1(0.0)
                .y0(-0.5)
                .y1(top)
                .line(ShapeLine::new().color("black").width(1.3))])
            .margin(Margin::new().left(150).right(50).top(30).bottom(50))
            .bar_gap(0.5);

        let mut plot = Plot::new();
        plot.add_trace(trace);
        plot.set_layout(layout);
        Ok(plot)
    }
}

impl Report for HorizontalBarChart {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, table: &Table) -> Result<String, RenderError> {
        Ok(chart_page(&self.name, self.figure(table)?))
    }
}
