pub mod ast;
pub mod client;
pub mod generator;
pub mod oracle;
pub mod printer;
pub mod update;

use std::path::PathBuf;

use getset::{Getters, Setters, WithSetters};

pub use client::{MockClient, SqlClient};
pub use generator::StatementGenerator;
pub use oracle::QueryOracle;
pub use update::update_generator;

/// Errors surfaced by the harness. Server rejections are not errors (they
/// are reported as `Ok(false)` from the client); invariant violations inside
/// generation are programming bugs and panic instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Both sides of an oracle pair succeeded but their digests differ.
    #[error("{oracle} oracle failed: result digests differ")]
    OracleMismatch { oracle: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Knobs of one generator instance.
#[derive(Clone, Debug, Getters, Setters, WithSetters)]
#[getset(get = "pub", set = "pub", set_with = "pub")]
pub struct GeneratorOptions {
    /// Recursion budget shared by type, value and query synthesis.
    max_depth: u32,
    /// Width budget for composite types and column lists.
    max_width: u32,
    max_databases: usize,
    max_tables: usize,
    max_views: usize,
    max_functions: usize,
    /// Upper bound on rows per generated INSERT ... VALUES.
    max_insert_rows: u32,
    /// Upper bound on generated string literal length.
    max_string_length: u32,
    fuzz_floating_points: bool,
    supports_cloud_features: bool,
    /// Directory the server writes `query.data` and `table.data` into.
    db_file_path: PathBuf,
    seed: u64,
}

impl GeneratorOptions {
    pub fn new() -> GeneratorOptions {
        GeneratorOptions::default()
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            max_depth: 3,
            max_width: 5,
            max_databases: 4,
            max_tables: 10,
            max_views: 5,
            max_functions: 5,
            max_insert_rows: 100,
            max_string_length: 1009,
            fuzz_floating_points: true,
            supports_cloud_features: false,
            db_file_path: std::env::temp_dir(),
            seed: 0,
        }
    }
}
