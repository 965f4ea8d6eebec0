use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::table::Table;

pub mod html;

pub use html::parse_first_table;

pub const DEFAULT_SHEET_HOST: &str = "https://docs.google.com";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GET {url} returned non-HTML content type {content_type:?}")]
    NotHtml { url: String, content_type: String },
    #[error("no <table> element in response")]
    NoTable,
    #[error("invalid sheet url")]
    Url(#[from] url::ParseError),
}

/// Anything that can hand back the body of an HTML page.
pub trait PageSource {
    fn get_html(&self, url: &Url) -> Result<String, FetchError>;
}

/// Blocking HTTP page source.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl PageSource for HttpSource {
    fn get_html(&self, url: &Url) -> Result<String, FetchError> {
        let request_err = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };
        debug!(%url, "fetching");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(request_err)?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .map(|ct| ct.to_str().unwrap_or_default().to_string());
        ensure_html(url, content_type.as_deref())?;
        resp.text().map_err(request_err)
    }
}

/// Reject responses that declare a non-HTML body. A missing header passes.
fn ensure_html(url: &Url, content_type: Option<&str>) -> Result<(), FetchError> {
    match content_type.map(str::to_ascii_lowercase) {
        Some(ct) if !ct.contains("html") => Err(FetchError::NotHtml {
            url: url.to_string(),
            content_type: ct,
        }),
        _ => Ok(()),
    }
}

/// Published-spreadsheet reader: one request per tab, first table only.
pub struct SheetFetcher<S> {
    source: S,
    host: Url,
    spreadsheet_id: String,
}

impl<S: PageSource> SheetFetcher<S> {
    pub fn new(source: S, host: &str, spreadsheet_id: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            source,
            host: Url::parse(host)?,
            spreadsheet_id: spreadsheet_id.into(),
        })
    }

    pub fn tab_url(&self, tab_id: &str) -> Result<Url, FetchError> {
        let base = self.host.as_str().trim_end_matches('/');
        let url = format!(
            "{}/spreadsheets/u/0/d/{}/gviz/tq?tqx=out:html&tq=&gid={}",
            base, self.spreadsheet_id, tab_id
        );
        Ok(Url::parse(&url)?)
    }

    #[instrument(level = "info", skip(self))]
    pub fn fetch_tab(&self, tab_id: &str, headers: bool) -> Result<Table, FetchError> {
        let url = self.tab_url(tab_id)?;
        let body = self.source.get_html(&url)?;
        let table = parse_first_table(&body, headers)?;
        info!(
            rows = table.row_count(),
            columns = table.columns().len(),
            "fetched tab"
        );
        Ok(table)
    }
}
