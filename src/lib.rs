pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod table;
pub mod telemetry;

pub use config::Config;
pub use pipeline::{RunSummary, UpdateError, UpdatePipeline};
pub use table::Table;
