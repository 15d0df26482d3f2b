use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use querystorm_types::SqlType;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnSpecial {
    #[default]
    None,
    Sign,
    IsDeleted,
    Version,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetachStatus {
    #[default]
    Attached,
    Detached,
    PermDetached,
}

/// Column default modifier. A column is insertable iff it has no modifier or
/// a plain `DEFAULT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultModifier {
    Default,
    Materialized,
    Alias,
    Ephemeral,
}

impl fmt::Display for DefaultModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefaultModifier::Default => "DEFAULT",
            DefaultModifier::Materialized => "MATERIALIZED",
            DefaultModifier::Alias => "ALIAS",
            DefaultModifier::Ephemeral => "EPHEMERAL",
        })
    }
}

#[derive(Clone, Debug)]
pub struct SqlColumn {
    pub id: u32,
    pub ctype: SqlType,
    pub special: ColumnSpecial,
    pub nullable: Option<bool>,
    pub dmod: Option<DefaultModifier>,
}

impl SqlColumn {
    pub fn can_be_inserted(&self) -> bool {
        matches!(self.dmod, None | Some(DefaultModifier::Default))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SqlIndex {
    pub id: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatabaseEngine {
    Atomic,
    Replicated,
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatabaseEngine::Atomic => "Atomic",
            DatabaseEngine::Replicated => "Replicated",
        })
    }
}

#[derive(Clone, Debug)]
pub struct SqlDatabase {
    pub id: u32,
    pub attached: DetachStatus,
    pub engine: DatabaseEngine,
    pub zoo_path: Option<u32>,
}

/// Replication flavor of a MergeTree-family engine, rendered as a name
/// prefix (`ReplicatedMergeTree`, `SharedMergeTree`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineOption {
    Replicated,
    Shared,
}

impl EngineOption {
    pub fn prefix(&self) -> &'static str {
        match self {
            EngineOption::Replicated => "Replicated",
            EngineOption::Shared => "Shared",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableEngine {
    MergeTree,
    ReplacingMergeTree,
    SummingMergeTree,
    AggregatingMergeTree,
    CollapsingMergeTree,
    VersionedCollapsingMergeTree,
    StripeLog,
    Log,
    TinyLog,
    Memory,
    File,
    Join,
    Null,
    Set,
    Buffer,
    EmbeddedRocksDB,
    MySQL,
    PostgreSQL,
    SQLite,
    MongoDB,
    Redis,
    S3,
    S3Queue,
    Hudi,
    DeltaLake,
    IcebergS3,
}

impl TableEngine {
    pub const ALL: [TableEngine; 26] = [
        TableEngine::MergeTree,
        TableEngine::ReplacingMergeTree,
        TableEngine::SummingMergeTree,
        TableEngine::AggregatingMergeTree,
        TableEngine::CollapsingMergeTree,
        TableEngine::VersionedCollapsingMergeTree,
        TableEngine::StripeLog,
        TableEngine::Log,
        TableEngine::TinyLog,
        TableEngine::Memory,
        TableEngine::File,
        TableEngine::Join,
        TableEngine::Null,
        TableEngine::Set,
        TableEngine::Buffer,
        TableEngine::EmbeddedRocksDB,
        TableEngine::MySQL,
        TableEngine::PostgreSQL,
        TableEngine::SQLite,
        TableEngine::MongoDB,
        TableEngine::Redis,
        TableEngine::S3,
        TableEngine::S3Queue,
        TableEngine::Hudi,
        TableEngine::DeltaLake,
        TableEngine::IcebergS3,
    ];

    /// Engines usable for `CREATE TABLE ... AS existing` clones.
    pub const LIKE_ENGINES: [TableEngine; 8] = [
        TableEngine::Memory,
        TableEngine::MergeTree,
        TableEngine::ReplacingMergeTree,
        TableEngine::SummingMergeTree,
        TableEngine::AggregatingMergeTree,
        TableEngine::StripeLog,
        TableEngine::Log,
        TableEngine::TinyLog,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TableEngine::MergeTree => "MergeTree",
            TableEngine::ReplacingMergeTree => "ReplacingMergeTree",
            TableEngine::SummingMergeTree => "SummingMergeTree",
            TableEngine::AggregatingMergeTree => "AggregatingMergeTree",
            TableEngine::CollapsingMergeTree => "CollapsingMergeTree",
            TableEngine::VersionedCollapsingMergeTree => "VersionedCollapsingMergeTree",
            TableEngine::StripeLog => "StripeLog",
            TableEngine::Log => "Log",
            TableEngine::TinyLog => "TinyLog",
            TableEngine::Memory => "Memory",
            TableEngine::File => "File",
            TableEngine::Join => "Join",
            TableEngine::Null => "Null",
            TableEngine::Set => "Set",
            TableEngine::Buffer => "Buffer",
            TableEngine::EmbeddedRocksDB => "EmbeddedRocksDB",
            TableEngine::MySQL => "MySQL",
            TableEngine::PostgreSQL => "PostgreSQL",
            TableEngine::SQLite => "SQLite",
            TableEngine::MongoDB => "MongoDB",
            TableEngine::Redis => "Redis",
            TableEngine::S3 => "S3",
            TableEngine::S3Queue => "S3Queue",
            TableEngine::Hudi => "Hudi",
            TableEngine::DeltaLake => "DeltaLake",
            TableEngine::IcebergS3 => "IcebergS3",
        }
    }

    pub fn is_merge_tree_family(&self) -> bool {
        matches!(
            self,
            TableEngine::MergeTree
                | TableEngine::ReplacingMergeTree
                | TableEngine::SummingMergeTree
                | TableEngine::AggregatingMergeTree
                | TableEngine::CollapsingMergeTree
                | TableEngine::VersionedCollapsingMergeTree
        )
    }

    pub fn supports_final(&self) -> bool {
        matches!(
            self,
            TableEngine::ReplacingMergeTree
                | TableEngine::SummingMergeTree
                | TableEngine::AggregatingMergeTree
                | TableEngine::CollapsingMergeTree
                | TableEngine::VersionedCollapsingMergeTree
                | TableEngine::Buffer
        )
    }

    pub fn has_sign_column(&self) -> bool {
        matches!(
            self,
            TableEngine::CollapsingMergeTree | TableEngine::VersionedCollapsingMergeTree
        )
    }

    pub fn has_version_column(&self) -> bool {
        matches!(self, TableEngine::VersionedCollapsingMergeTree)
    }

    /// Engines for which `TRUNCATE` is rejected: foreign-database wrappers,
    /// object-store engines, lake formats, `Null` and `Set`.
    pub fn is_not_truncable(&self) -> bool {
        matches!(
            self,
            TableEngine::Null
                | TableEngine::Set
                | TableEngine::MySQL
                | TableEngine::PostgreSQL
                | TableEngine::SQLite
                | TableEngine::MongoDB
                | TableEngine::Redis
                | TableEngine::S3
                | TableEngine::S3Queue
                | TableEngine::Hudi
                | TableEngine::DeltaLake
                | TableEngine::IcebergS3
        )
    }
}

impl fmt::Display for TableEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flattened view of one insertable column. Nested columns expand into one
/// entry per subcolumn (`c1.c2`), typed as an array of the subtype.
#[derive(Clone, Debug)]
pub struct InsertEntry {
    pub special: ColumnSpecial,
    pub nullable: Option<bool>,
    pub cname1: u32,
    pub cname2: Option<u32>,
    pub ctype: SqlType,
    pub dmod: Option<DefaultModifier>,
}

#[derive(Clone, Debug)]
pub struct SqlTable {
    pub id: u32,
    pub db: Option<u32>,
    pub attached: DetachStatus,
    pub engine: TableEngine,
    pub engine_option: Option<EngineOption>,
    pub is_temp: bool,
    pub col_counter: u32,
    pub idx_counter: u32,
    pub proj_counter: u32,
    pub constr_counter: u32,
    pub cols: BTreeMap<u32, SqlColumn>,
    pub staged_cols: BTreeMap<u32, SqlColumn>,
    pub idxs: BTreeMap<u32, SqlIndex>,
    pub staged_idxs: BTreeMap<u32, SqlIndex>,
    pub projs: BTreeSet<u32>,
    pub staged_projs: BTreeSet<u32>,
    pub constrs: BTreeSet<u32>,
    pub staged_constrs: BTreeSet<u32>,
}

impl SqlTable {
    pub fn new(id: u32, db: Option<u32>, engine: TableEngine) -> SqlTable {
        SqlTable {
            id,
            db,
            attached: DetachStatus::Attached,
            engine,
            engine_option: None,
            is_temp: false,
            col_counter: 0,
            idx_counter: 0,
            proj_counter: 0,
            constr_counter: 0,
            cols: BTreeMap::new(),
            staged_cols: BTreeMap::new(),
            idxs: BTreeMap::new(),
            staged_idxs: BTreeMap::new(),
            projs: BTreeSet::new(),
            staged_projs: BTreeSet::new(),
            constrs: BTreeSet::new(),
            staged_constrs: BTreeSet::new(),
        }
    }

    /// Number of columns after nested expansion.
    pub fn real_number_of_columns(&self) -> usize {
        self.cols
            .values()
            .map(|c| match &c.ctype {
                SqlType::Nested(fields) => fields.len(),
                _ => 1,
            })
            .sum()
    }

    /// Committed columns flattened for INSERT/OPTIMIZE/key construction, with
    /// nested columns expanded into their subcolumns.
    pub fn flat_columns(&self) -> Vec<InsertEntry> {
        flatten_columns(self.cols.values())
    }

    /// Like [`flat_columns`](Self::flat_columns), keeping insertable columns
    /// only.
    pub fn insertable_columns(&self) -> Vec<InsertEntry> {
        flatten_columns(self.cols.values().filter(|c| c.can_be_inserted()))
    }

    pub fn supports_final(&self) -> bool {
        self.engine.supports_final()
    }

    pub fn is_merge_tree_family(&self) -> bool {
        self.engine.is_merge_tree_family()
    }

    pub fn has_sign_column(&self) -> bool {
        self.engine.has_sign_column()
    }

    pub fn has_version_column(&self) -> bool {
        self.engine.has_version_column()
    }

    pub fn is_not_truncable(&self) -> bool {
        self.engine.is_not_truncable()
    }
}

fn flatten_columns<'a>(cols: impl Iterator<Item = &'a SqlColumn>) -> Vec<InsertEntry> {
    let mut entries = Vec::new();
    for col in cols {
        match &col.ctype {
            SqlType::Nested(fields) => {
                for field in fields {
                    entries.push(InsertEntry {
                        special: ColumnSpecial::None,
                        nullable: None,
                        cname1: col.id,
                        cname2: Some(field.name),
                        ctype: SqlType::Array(Box::new(field.ftype.clone())),
                        dmod: col.dmod,
                    });
                }
            }
            other => entries.push(InsertEntry {
                special: col.special,
                nullable: col.nullable,
                cname1: col.id,
                cname2: None,
                ctype: other.clone(),
                dmod: col.dmod,
            }),
        }
    }
    entries
}

#[derive(Clone, Debug)]
pub struct SqlView {
    pub id: u32,
    pub db: Option<u32>,
    pub attached: DetachStatus,
    pub is_materialized: bool,
    pub is_refreshable: bool,
    pub is_deterministic: bool,
    pub engine: Option<TableEngine>,
    pub engine_option: Option<EngineOption>,
    pub ncols: u32,
    pub staged_ncols: u32,
}

impl SqlView {
    pub fn new(id: u32, db: Option<u32>) -> SqlView {
        SqlView {
            id,
            db,
            attached: DetachStatus::Attached,
            is_materialized: false,
            is_refreshable: false,
            is_deterministic: true,
            engine: None,
            engine_option: None,
            ncols: 1,
            staged_ncols: 1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SqlFunction {
    pub id: u32,
    pub nargs: u32,
    pub is_deterministic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use querystorm_types::NestedField;

    #[test]
    fn test_insertable_excludes_alias_and_materialized() {
        let mut t = SqlTable::new(0, Some(0), TableEngine::MergeTree);
        for (id, dmod) in [
            (0, None),
            (1, Some(DefaultModifier::Default)),
            (2, Some(DefaultModifier::Materialized)),
            (3, Some(DefaultModifier::Alias)),
            (4, Some(DefaultModifier::Ephemeral)),
        ] {
            t.cols.insert(
                id,
                SqlColumn {
                    id,
                    ctype: SqlType::Bool,
                    special: ColumnSpecial::None,
                    nullable: None,
                    dmod,
                },
            );
        }
        let ids: Vec<u32> = t.insertable_columns().iter().map(|e| e.cname1).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_nested_expansion() {
        let mut t = SqlTable::new(0, Some(0), TableEngine::MergeTree);
        t.cols.insert(
            0,
            SqlColumn {
                id: 0,
                ctype: SqlType::Nested(vec![
                    NestedField {
                        name: 1,
                        ftype: SqlType::Bool,
                    },
                    NestedField {
                        name: 2,
                        ftype: SqlType::Uuid,
                    },
                ]),
                special: ColumnSpecial::None,
                nullable: None,
                dmod: None,
            },
        );
        assert_eq!(t.real_number_of_columns(), 2);
        let entries = t.flat_columns();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].cname2, Some(1));
        assert_eq!(
            entries[1].ctype,
            SqlType::Array(Box::new(SqlType::Uuid))
        );
    }

    #[test]
    fn test_engine_predicates() {
        assert!(TableEngine::CollapsingMergeTree.is_merge_tree_family());
        assert!(TableEngine::CollapsingMergeTree.has_sign_column());
        assert!(!TableEngine::CollapsingMergeTree.has_version_column());
        assert!(TableEngine::VersionedCollapsingMergeTree.has_version_column());
        assert!(TableEngine::Buffer.supports_final());
        assert!(!TableEngine::MergeTree.supports_final());
        assert!(TableEngine::S3Queue.is_not_truncable());
        assert!(!TableEngine::Memory.is_not_truncable());
    }
}
