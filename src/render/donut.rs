use plotly::common::{Anchor, Font, Line, Marker, Orientation, Position};
use plotly::layout::{Legend, Margin};
use plotly::{Layout, Pie, Plot};

use super::page::chart_page;
use super::{require, Report, RenderError};
use crate::process::Rgb;
use crate::table::Table;

/// Ring chart: one wedge per row with the percentage drawn inside and a
/// legend on the right.
#[derive(Debug, Clone)]
pub struct DonutChart {
    pub name: String,
    pub value_col: String,
    pub label_col: String,
    /// Per-row colours, written out as canonical `#rrggbb`.
    pub colors: Option<Vec<String>>,
    pub font_size: u32,
}

/// Fallback palette: the green channel steps by 10 per row and wraps at 255.
pub fn synthesized_color(i: usize) -> String {
    format!("rgba(31,{},200,0.8)", i * 10 % 255)
}

impl DonutChart {
    fn wedge_colors(&self, rows: usize) -> Result<Vec<String>, RenderError> {
        match &self.colors {
            None => Ok((0..rows).map(synthesized_color).collect()),
            Some(c) if c.len() != rows => Err(RenderError::ColorCount {
                colors: c.len(),
                rows,
            }),
            Some(c) => c
                .iter()
                .map(|s| {
                    s.parse::<Rgb>()
                        .map(|rgb| rgb.to_hex())
                        .map_err(|_| RenderError::InvalidColor(s.clone()))
                })
                .collect(),
        }
    }

    pub fn figure(&self, table: &Table) -> Result<Plot, RenderError> {
        let values: Vec<f64> = require(table, &self.value_col)?
            .numeric()
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        let label_col = require(table, &self.label_col)?;
        let labels: Vec<String> = (0..values.len()).map(|i| label_col.display(i)).collect();
        let colors = self.wedge_colors(values.len())?;
        let font_size = self.font_size as usize;

        let trace = Pie::new(values)
            .labels(labels)
            .hole(0.5)
            .marker(Marker::new().line(Line::new().color("white").width(1.0)))
            .text_info("percent")
            .text_position(Position::Inside)
            .inside_text_font(Font::new().size(font_size).color("black"))
            .hover_template("%{label}: %{value}<extra></extra>")
            .show_legend(true);

        // pie slices take their colours from the layout, in row order
        let layout = Layout::new()
            .pie_colorway(colors)
            .legend(
                Legend::new()
                    .orientation(Orientation::Vertical)
                    .y_anchor(Anchor::Middle)
                    .y(0.5)
                    .x_anchor(Anchor::Left)
                    .x(1.05)
                    .font(Font::new().size(font_size)),
            )
            .margin(Margin::new().top(40).bottom(40).left(40).right(120))
            .paper_background_color("white");

        let mut plot = Plot::new();
        plot.add_trace(trace);
        plot.set_layout(layout);
        Ok(plot)
    }
}

impl Report for DonutChart {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, table: &Table) -> Result<String, RenderError> {
        Ok(chart_page(&self.name, self.figure(table)?))
    }
}
