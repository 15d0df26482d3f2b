mod catalog;
mod objects;
pub mod settings;

pub use catalog::Catalog;
pub use objects::{
    ColumnSpecial, DatabaseEngine, DefaultModifier, DetachStatus, EngineOption, InsertEntry,
    SqlColumn, SqlDatabase, SqlFunction, SqlIndex, SqlTable, SqlView, TableEngine,
};
pub use settings::{
    merge_tree_column_settings, merge_tree_table_settings, server_settings, TestSetting,
};
