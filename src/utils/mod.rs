pub mod errors;
pub mod output;
pub mod paths;

pub use errors::{CaError, Result};
pub use output::{build_table_data, GetColumnValue, OutputFormat};
pub use paths::StorePaths;
