use maud::{html, PreEscaped, DOCTYPE};
use plotly::{Configuration, Plot};

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const CHART_DIV: &str = "chart";

const PAGE_CSS: &str = "html, body { margin: 0; padding: 0; width: 100%; height: 100%; }";

/// Wrap a figure in a complete page that pulls plotly.js from the CDN.
pub fn chart_page(title: &str, mut plot: Plot) -> String {
    plot.set_configuration(Configuration::new().responsive(true));
    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) }
                script src=(PLOTLY_CDN) {}
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                (PreEscaped(plot.to_inline_html(Some(CHART_DIV))))
            }
        }
    };
    markup.into_string()
}
