//! CLI command implementations

pub mod datasets;
pub mod enrich;
pub mod error;
pub mod fetch;

pub use datasets::DatasetsCommand;
pub use enrich::EnrichArgs;
pub use error::CliError;
pub use fetch::{Cli, Commands, OutputFormat};
