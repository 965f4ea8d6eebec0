use maud::{html, Markup, PreEscaped, DOCTYPE};

use super::{Report, RenderError};
use crate::table::Table;

/// Header look of a [`StyledTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Dark green header with white bold text.
    Emphasized,
    /// White header with black bold text.
    Plain,
}

/// Zebra-striped HTML table. When `link` names a present column, the column
/// right before it becomes a hyperlink to that column's value and the link
/// column itself is left out.
#[derive(Debug, Clone)]
pub struct StyledTable {
    pub name: String,
    pub style: HeaderStyle,
    pub font_size: u32,
    pub link: Option<String>,
}

struct Cell {
    text: String,
    href: Option<String>,
}

const RESIZE_JS: &str = "const container = document.getElementById('table-container');
function resizeTable() {
    container.style.height = window.innerHeight + 'px';
}
window.addEventListener('resize', resizeTable);
resizeTable();";

impl StyledTable {
    fn css(&self) -> String {
        let (th_bg, th_fg, th_border) = match self.style {
            HeaderStyle::Emphasized => ("#304536", "white", "3px"),
            HeaderStyle::Plain => ("white", "black", "2px"),
        };
        format!(
            "html, body {{ margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; }}
#table-container {{ width: 100%; height: 100%; overflow: auto; }}
table {{ border-collapse: collapse; width: 100%; font-family: Arial, sans-serif; font-size: {font}px; }}
th {{ background-color: {th_bg}; color: {th_fg}; font-weight: bold; padding: 0.7em 1em; border-bottom: {th_border} solid black; text-align: center; }}
td {{ padding: 0.7em 1em; text-align: center; color: black; }}
tr:nth-child(even) td {{ background-color: #cedbce; }}
tr:nth-child(odd) td {{ background-color: #ffffff; }}
tr:hover td {{ background-color: #f0a1a1; }}
a {{ color: #852029; text-decoration: none; }}
a:hover {{ text-decoration: underline; }}",
            font = self.font_size,
            th_bg = th_bg,
            th_fg = th_fg,
            th_border = th_border,
        )
    }

    fn body(&self, table: &Table) -> (Vec<String>, Vec<Vec<Cell>>) {
        let link_idx = self.link.as_deref().and_then(|l| table.column_index(l));
        let anchor_idx = link_idx.and_then(|i| i.checked_sub(1));
        let columns = table.columns();

        let headers = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != link_idx)
            .map(|(_, c)| c.name.clone())
            .collect();

        let rows = (0..table.row_count())
            .map(|r| {
                columns
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| Some(*i) != link_idx)
                    .map(|(i, c)| Cell {
                        text: c.display(r),
                        href: match (anchor_idx, link_idx) {
                            (Some(a), Some(l)) if a == i => Some(columns[l].display(r)),
                            _ => None,
                        },
                    })
                    .collect()
            })
            .collect();

        (headers, rows)
    }

    fn markup(&self, table: &Table) -> Markup {
        let (headers, rows) = self.body(table);
        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8";
                    style { (PreEscaped(self.css())) }
                }
                body {
                    div id="table-container" {
                        table {
                            thead {
                                tr {
                                    @for h in &headers { th { (h) } }
                                }
                            }
                            tbody {
                                @for row in &rows {
                                    tr {
                                        @for cell in row {
                                            td {
                                                @if let Some(href) = &cell.href {
                                                    a href=(href) target="_blank" { (cell.text) }
                                                } @else {
                                                    (cell.text)
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    @if self.style == HeaderStyle::Emphasized {
                        script { (PreEscaped(RESIZE_JS)) }
                    }
                }
            }
        }
    }
}

impl Report for StyledTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, table: &Table) -> Result<String, RenderError> {
        Ok(self.markup(table).into_string())
    }
}
