use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::fetch::DEFAULT_SHEET_HOST;
use crate::process::Rgb;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config")]
    Parse(#[from] serde_yaml::Error),
    #[error("spreadsheet id not set (config `spreadsheet_id` or env SHEET_ID)")]
    MissingSpreadsheetId,
    #[error("tab id `{0}` is empty")]
    EmptyTab(&'static str),
    #[error("`share_gradient` needs at least 2 colours, got {0}")]
    TooFewAnchors(usize),
    #[error("invalid sheet host {0:?}")]
    Host(String),
    #[error("creating output directory {}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tab (gid) of every sheet the reports read.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TabIds {
    /// Portfolio holdings table.
    pub tab: String,
    /// Per-position return rate and portfolio share.
    pub stopa: String,
    /// Totals table.
    pub sums: String,
    /// Valuation reports with links.
    pub wyceny: String,
    /// Portfolio vs. benchmark time series.
    pub wig: String,
}

impl TabIds {
    fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("tab", self.tab.as_str()),
            ("stopa", self.stopa.as_str()),
            ("sums", self.sums.as_str()),
            ("wyceny", self.wyceny.as_str()),
            ("wig", self.wig.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Palette {
    pub dark_green: Rgb,
    pub light_green: Rgb,
    pub dark_red: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            dark_green: Rgb::new(48.0 / 255.0, 69.0 / 255.0, 54.0 / 255.0),
            light_green: Rgb::new(206.0 / 255.0, 219.0 / 255.0, 206.0 / 255.0),
            dark_red: Rgb::new(133.0 / 255.0, 32.0 / 255.0, 41.0 / 255.0),
        }
    }
}

/// Spreadsheet column headers the reports look up by name.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnNames {
    pub name: String,
    pub return_rate: String,
    pub share: String,
    pub date: String,
    pub link: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "Nazwa".into(),
            return_rate: "Stopa zwrotu".into(),
            share: "Udział w portfelu".into(),
            date: "Data".into(),
            link: "link (hidden)".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_host")]
    pub sheet_host: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    pub tabs: TabIds,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default = "default_share_gradient")]
    pub share_gradient: Vec<Rgb>,
    #[serde(default = "default_missing_color")]
    pub missing_color: Rgb,
    #[serde(default)]
    pub columns: ColumnNames,
}

fn default_sheet_host() -> String {
    DEFAULT_SHEET_HOST.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("update.log")
}

fn default_share_gradient() -> Vec<Rgb> {
    vec![
        Rgb::new(221.0 / 255.0, 238.0 / 255.0, 221.0 / 255.0),
        Rgb::new(34.0 / 255.0, 68.0 / 255.0, 34.0 / 255.0),
    ]
}

fn default_missing_color() -> Rgb {
    Rgb::new(211.0 / 255.0, 211.0 / 255.0, 211.0 / 255.0)
}

impl Config {
    /// Read a YAML config, let `SHEET_ID` (or `sheetId`) override the
    /// spreadsheet id, and validate the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text)?;
        if let Some(id) = ["SHEET_ID", "sheetId"].iter().find_map(|k| env::var(k).ok()) {
            config.spreadsheet_id = id;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse without validation or environment overrides.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::MissingSpreadsheetId);
        }
        if let Some((key, _)) = self
            .tabs
            .entries()
            .into_iter()
            .find(|(_, v)| v.trim().is_empty())
        {
            return Err(ConfigError::EmptyTab(key));
        }
        if self.share_gradient.len() < 2 {
            return Err(ConfigError::TooFewAnchors(self.share_gradient.len()));
        }
        Url::parse(&self.sheet_host).map_err(|_| ConfigError::Host(self.sheet_host.clone()))?;
        Ok(())
    }

    /// Anchors of the return-rate bar colours: red for the worst, dark green
    /// for the best.
    pub fn return_gradient(&self) -> Vec<Rgb> {
        vec![
            self.palette.dark_red,
            self.palette.light_green,
            self.palette.dark_green,
        ]
    }
}
