pub mod concurrency;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod errors;
pub mod fs;
pub mod io;

pub mod prelude {
    pub use super::concurrency::{build_worker_pool, determine_allowed_cpus};
    pub use super::config::{FileConfig, Overrides, Settings};
    pub use super::diagnostics::{Diagnostic, DiagnosticReport, DiagnosticSink, NullSink};
    pub use super::error::{CoverageError, Result};
    pub use super::errors::is_broken_pipe;
    pub use super::fs::{is_gzipped, make_parent_dirs};
    pub use super::io::{get_writer, open_lines};
}
