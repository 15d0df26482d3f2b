//! Abstract statement trees emitted by the generator.
//!
//! Object references carry the numeric ids of the identifier scheme
//! (`d3`.`t7`, columns `c1`, indexes `i0`, ...) so the update pipeline can
//! apply outcomes without re-parsing rendered names. Literal values are
//! carried as pre-rendered SQL text. Rendering to SQL lives in
//! [`crate::printer`].

use std::path::PathBuf;

use querystorm_catalog::{DatabaseEngine, DefaultModifier, EngineOption, TableEngine};
use querystorm_types::SqlType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectName {
    Table(u32),
    View(u32),
}

impl ObjectName {
    pub fn id(&self) -> u32 {
        match self {
            ObjectName::Table(id) | ObjectName::View(id) => *id,
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, ObjectName::View(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableRef {
    pub db: Option<u32>,
    pub name: ObjectName,
}

impl TableRef {
    pub fn table(db: Option<u32>, id: u32) -> TableRef {
        TableRef {
            db,
            name: ObjectName::Table(id),
        }
    }

    pub fn view(db: Option<u32>, id: u32) -> TableRef {
        TableRef {
            db,
            name: ObjectName::View(id),
        }
    }
}

/// A column or nested subcolumn reference in DDL/DML position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnPath {
    pub col: u32,
    pub sub: Option<u32>,
}

impl ColumnPath {
    pub fn new(col: u32) -> ColumnPath {
        ColumnPath { col, sub: None }
    }

    pub fn with_sub(col: u32, sub: u32) -> ColumnPath {
        ColumnPath {
            col,
            sub: Some(sub),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameUnits {
    Rows,
    Range,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameBound {
    CurrentRow,
    UnboundedPreceding,
    UnboundedFollowing,
    Preceding(Box<Expr>),
    Following(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderTerm>,
    pub frame: Option<(FrameUnits, FrameBound, Option<FrameBound>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Pre-rendered literal, including quotes and optional cast suffix.
    Lit(String),
    /// Rendered column reference, optionally qualified by a relation name.
    Col {
        rel: Option<String>,
        name: String,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Func {
        name: String,
        args: Vec<Expr>,
        window: Option<WindowSpec>,
    },
    Between {
        negated: bool,
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InList {
        negated: bool,
        expr: Box<Expr>,
        list: Vec<Expr>,
    },
    InSubquery {
        negated: bool,
        expr: Box<Expr>,
        subquery: Box<Select>,
    },
    Like {
        negated: bool,
        expr: Box<Expr>,
        pattern: Box<Expr>,
    },
    IsNull {
        negated: bool,
        expr: Box<Expr>,
    },
    Subquery(Box<Select>),
    Exists(Box<Select>),
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn lit(text: impl Into<String>) -> Expr {
        Expr::Lit(text.into())
    }

    pub fn col(name: impl Into<String>) -> Expr {
        Expr::Col {
            rel: None,
            name: name.into(),
        }
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Func {
            name: name.into(),
            args,
            window: None,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderTerm {
    pub expr: Expr,
    pub direction: Option<OrderDirection>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderBy {
    All,
    Terms(Vec<OrderTerm>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupByModifier {
    Rollup,
    Cube,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GroupBy {
    All,
    Exprs {
        exprs: Vec<Expr>,
        modifier: Option<GroupByModifier>,
    },
    GroupingSets(Vec<Vec<Expr>>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    LeftSemi,
    RightSemi,
    LeftAnti,
    RightAnti,
}

#[derive(Clone, Debug, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FromItem {
    Table {
        table: TableRef,
        alias: Option<String>,
        final_: bool,
    },
    /// Reference to a CTE bound in an enclosing WITH.
    Cte { name: String },
    Derived {
        select: Box<Select>,
        alias: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum JoinElement {
    Join {
        kind: JoinKind,
        item: FromItem,
        constraint: Option<JoinConstraint>,
    },
    ArrayJoin {
        left: bool,
        exprs: Vec<(Expr, String)>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FromClause {
    pub first: FromItem,
    pub joins: Vec<JoinElement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultCol {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SelectCore {
    pub distinct: bool,
    pub columns: Vec<ResultCol>,
    pub from: Option<FromClause>,
    pub prewhere: Option<Expr>,
    pub where_: Option<Expr>,
    pub group_by: Option<GroupBy>,
    pub having: Option<Expr>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOp {
    UnionAll,
    UnionDistinct,
    Intersect,
    Except,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cte {
    pub name: String,
    pub select: Select,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectBody {
    Core(SelectCore),
    SetOp {
        op: SetOp,
        left: Box<SelectBody>,
        right: Box<SelectBody>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    pub ctes: Vec<Cte>,
    pub body: SelectBody,
}

impl Select {
    pub fn from_core(core: SelectCore) -> Select {
        Select {
            ctes: Vec::new(),
            body: SelectBody::Core(core),
        }
    }
}

/// Wire formats accepted in `FORMAT` clauses. OUT and IN mates share names;
/// `ProtobufList` and `RawBLOB` are excluded from the dump/reload pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WireFormat {
    TabSeparated,
    TabSeparatedWithNames,
    TabSeparatedWithNamesAndTypes,
    CSV,
    CSVWithNames,
    CSVWithNamesAndTypes,
    CustomSeparated,
    CustomSeparatedWithNames,
    CustomSeparatedWithNamesAndTypes,
    Values,
    JSON,
    JSONColumns,
    JSONColumnsWithMetadata,
    JSONCompact,
    JSONCompactColumns,
    JSONEachRow,
    JSONStringsEachRow,
    JSONCompactEachRow,
    JSONCompactEachRowWithNames,
    JSONCompactEachRowWithNamesAndTypes,
    JSONCompactStringsEachRow,
    JSONCompactStringsEachRowWithNames,
    JSONCompactStringsEachRowWithNamesAndTypes,
    JSONObjectEachRow,
    BSONEachRow,
    TSKV,
    Protobuf,
    ProtobufSingle,
    Avro,
    Parquet,
    Arrow,
    ArrowStream,
    ORC,
    Npy,
    RowBinary,
    RowBinaryWithNames,
    RowBinaryWithNamesAndTypes,
    Native,
    MsgPack,
}

impl WireFormat {
    /// Formats usable on both the OUT and IN side of a dump/reload pair.
    pub const DUMP_RELOAD_POOL: [WireFormat; 39] = [
        WireFormat::TabSeparated,
        WireFormat::TabSeparatedWithNames,
        WireFormat::TabSeparatedWithNamesAndTypes,
        WireFormat::CSV,
        WireFormat::CSVWithNames,
        WireFormat::CSVWithNamesAndTypes,
        WireFormat::CustomSeparated,
        WireFormat::CustomSeparatedWithNames,
        WireFormat::CustomSeparatedWithNamesAndTypes,
        WireFormat::Values,
        WireFormat::JSON,
        WireFormat::JSONColumns,
        WireFormat::JSONColumnsWithMetadata,
        WireFormat::JSONCompact,
        WireFormat::JSONCompactColumns,
        WireFormat::JSONEachRow,
        WireFormat::JSONStringsEachRow,
        WireFormat::JSONCompactEachRow,
        WireFormat::JSONCompactEachRowWithNames,
        WireFormat::JSONCompactEachRowWithNamesAndTypes,
        WireFormat::JSONCompactStringsEachRow,
        WireFormat::JSONCompactStringsEachRowWithNames,
        WireFormat::JSONCompactStringsEachRowWithNamesAndTypes,
        WireFormat::JSONObjectEachRow,
        WireFormat::BSONEachRow,
        WireFormat::TSKV,
        WireFormat::Protobuf,
        WireFormat::ProtobufSingle,
        WireFormat::Avro,
        WireFormat::Parquet,
        WireFormat::Arrow,
        WireFormat::ArrowStream,
        WireFormat::ORC,
        WireFormat::Npy,
        WireFormat::RowBinary,
        WireFormat::RowBinaryWithNames,
        WireFormat::RowBinaryWithNamesAndTypes,
        WireFormat::Native,
        WireFormat::MsgPack,
    ];

    /// The IN-side mate of an OUT format.
    pub fn in_mate(&self) -> WireFormat {
        *self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileCompression {
    None,
    Gz,
    Br,
    Xz,
    Zst,
    Lz4,
    Bz2,
}

impl FileCompression {
    pub const ALL: [FileCompression; 7] = [
        FileCompression::None,
        FileCompression::Gz,
        FileCompression::Br,
        FileCompression::Xz,
        FileCompression::Zst,
        FileCompression::Lz4,
        FileCompression::Bz2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FileCompression::None => "none",
            FileCompression::Gz => "gz",
            FileCompression::Br => "br",
            FileCompression::Xz => "xz",
            FileCompression::Zst => "zst",
            FileCompression::Lz4 => "lz4",
            FileCompression::Bz2 => "bz2",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntoFile {
    pub path: PathBuf,
    pub truncate: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopSelect {
    pub select: Select,
    pub into_file: Option<IntoFile>,
    pub format: Option<WireFormat>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetValue {
    pub name: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub path: ColumnPath,
    pub ctype: SqlType,
    pub nullable: Option<bool>,
    pub default: Option<(DefaultModifier, Option<Expr>)>,
    pub codecs: Vec<String>,
    pub statistics: Vec<StatType>,
    pub settings: Vec<SetValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatType {
    TDigest,
    Uniq,
    CountMin,
    MinMax,
}

impl StatType {
    pub const ALL: [StatType; 4] = [
        StatType::TDigest,
        StatType::Uniq,
        StatType::CountMin,
        StatType::MinMax,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatType::TDigest => "tdigest",
            StatType::Uniq => "uniq",
            StatType::CountMin => "countmin",
            StatType::MinMax => "minmax",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    MinMax,
    Set,
    BloomFilter,
    NgramBfV1,
    TokenBfV1,
    FullText,
    Inverted,
    Hypothesis,
}

impl IndexKind {
    pub const ALL: [IndexKind; 8] = [
        IndexKind::MinMax,
        IndexKind::Set,
        IndexKind::BloomFilter,
        IndexKind::NgramBfV1,
        IndexKind::TokenBfV1,
        IndexKind::FullText,
        IndexKind::Inverted,
        IndexKind::Hypothesis,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::MinMax => "minmax",
            IndexKind::Set => "set",
            IndexKind::BloomFilter => "bloom_filter",
            IndexKind::NgramBfV1 => "ngrambf_v1",
            IndexKind::TokenBfV1 => "tokenbf_v1",
            IndexKind::FullText => "full_text",
            IndexKind::Inverted => "inverted",
            IndexKind::Hypothesis => "hypothesis",
        }
    }

    /// Text-oriented indexes only accept string-shaped expressions.
    pub fn requires_text(&self) -> bool {
        matches!(
            self,
            IndexKind::NgramBfV1 | IndexKind::TokenBfV1 | IndexKind::FullText | IndexKind::Inverted
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IndexParam {
    Int(u64),
    Float(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexDef {
    pub id: u32,
    pub kind: IndexKind,
    pub expr: Expr,
    pub params: Vec<IndexParam>,
    pub granularity: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionDef {
    pub id: u32,
    pub select: Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    Check,
    Assume,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintDef {
    pub id: u32,
    pub kind: ConstraintKind,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableDefItem {
    Column(ColumnDef),
    Index(IndexDef),
    Projection(ProjectionDef),
    Constraint(ConstraintDef),
}

/// ENGINE clause: `ENGINE = <option?><engine>(params) ORDER BY ... PRIMARY
/// KEY ... PARTITION BY ...`.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineClause {
    pub engine: TableEngine,
    pub option: Option<EngineOption>,
    /// Sign/version columns for collapsing engines.
    pub params: Vec<ColumnPath>,
    pub order_by: Vec<ColumnPath>,
    pub primary_key: Vec<ColumnPath>,
    pub partition_by: Vec<ColumnPath>,
}

impl EngineClause {
    pub fn bare(engine: TableEngine) -> EngineClause {
        EngineClause {
            engine,
            option: None,
            params: Vec::new(),
            order_by: Vec::new(),
            primary_key: Vec::new(),
            partition_by: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CreateTableBody {
    Defined(Vec<TableDefItem>),
    AsTable { src: TableRef, clone: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateTable {
    pub replace: bool,
    pub is_temp: bool,
    pub table: TableRef,
    pub body: CreateTableBody,
    pub engine: EngineClause,
    pub settings: Vec<SetValue>,
    pub as_select: Option<Select>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPolicyKind {
    Every,
    After,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RefreshPolicy {
    pub kind: RefreshPolicyKind,
    pub interval_seconds: u32,
    pub offset_seconds: Option<u32>,
    pub randomize_seconds: Option<u32>,
    pub append: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateView {
    pub replace: bool,
    pub view: TableRef,
    pub is_materialized: bool,
    pub engine: Option<EngineClause>,
    pub to_table: Option<TableRef>,
    pub refresh: Option<RefreshPolicy>,
    pub empty: bool,
    pub populate: bool,
    pub select: Select,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateDatabase {
    pub db: u32,
    pub engine: DatabaseEngine,
    pub zoo_path: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateFunction {
    pub id: u32,
    pub params: Vec<String>,
    pub body: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectRef {
    Table(TableRef),
    View(TableRef),
    Database(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Drop {
    pub object: ObjectRef,
    pub is_temp: bool,
    pub if_empty: bool,
    pub sync: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attach {
    pub object: ObjectRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detach {
    pub object: ObjectRef,
    pub permanently: bool,
    pub sync: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExchangeTables {
    pub lhs: TableRef,
    pub rhs: TableRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddPosition {
    First,
    After(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnProperty {
    Default,
    Materialized,
    Alias,
    Ephemeral,
    Codec,
    Comment,
    Ttl,
    Settings,
}

impl ColumnProperty {
    pub const ALL: [ColumnProperty; 8] = [
        ColumnProperty::Default,
        ColumnProperty::Materialized,
        ColumnProperty::Alias,
        ColumnProperty::Ephemeral,
        ColumnProperty::Codec,
        ColumnProperty::Comment,
        ColumnProperty::Ttl,
        ColumnProperty::Settings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnProperty::Default => "DEFAULT",
            ColumnProperty::Materialized => "MATERIALIZED",
            ColumnProperty::Alias => "ALIAS",
            ColumnProperty::Ephemeral => "EPHEMERAL",
            ColumnProperty::Codec => "CODEC",
            ColumnProperty::Comment => "COMMENT",
            ColumnProperty::Ttl => "TTL",
            ColumnProperty::Settings => "SETTINGS",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AlterItem {
    OrderBy(Vec<ColumnPath>),
    HeavyDelete(Expr),
    HeavyUpdate {
        updates: Vec<(ColumnPath, Expr)>,
        where_: Expr,
    },
    AddColumn {
        def: ColumnDef,
        position: Option<AddPosition>,
    },
    MaterializeColumn(u32),
    DropColumn(u32),
    RenameColumn {
        old: u32,
        new: u32,
    },
    ModifyColumn {
        def: ColumnDef,
        position: Option<AddPosition>,
    },
    DeleteMask,
    AddStatistics {
        cols: Vec<u32>,
        stats: Vec<StatType>,
    },
    ModifyStatistics {
        cols: Vec<u32>,
        stats: Vec<StatType>,
    },
    DropStatistics(Vec<u32>),
    ClearStatistics(Vec<u32>),
    MaterializeStatistics(Vec<u32>),
    AddIndex {
        def: IndexDef,
        position: Option<AddPosition>,
    },
    MaterializeIndex(u32),
    ClearIndex(u32),
    DropIndex(u32),
    RemoveColumnProperty {
        col: u32,
        property: ColumnProperty,
    },
    ModifyColumnSetting {
        col: u32,
        settings: Vec<SetValue>,
    },
    RemoveColumnSetting {
        col: u32,
        names: Vec<String>,
    },
    ModifyTableSetting(Vec<SetValue>),
    RemoveTableSetting(Vec<String>),
    AddProjection(ProjectionDef),
    RemoveProjection(u32),
    MaterializeProjection(u32),
    ClearProjection(u32),
    AddConstraint(ConstraintDef),
    RemoveConstraint(u32),
    RefreshView(RefreshPolicy),
    ModifyQuery {
        ncols: u32,
        select: Select,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlterTable {
    pub target: TableRef,
    pub items: Vec<AlterItem>,
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct FileFunc {
    pub path: PathBuf,
    pub format: WireFormat,
    /// Rendered `c0 Type, c1 Type` structure argument.
    pub structure: String,
    pub compression: Option<FileCompression>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InsertTarget {
    Table {
        table: TableRef,
        cols: Vec<ColumnPath>,
    },
    FileFunc(FileFunc),
}

#[derive(Clone, Debug, PartialEq)]
pub enum InsertSource {
    /// Pre-rendered literal rows: `(1, 'a'), (2, 'b')`.
    Values(String),
    Select(Select),
    /// Expression-valued rows.
    ValueExprs(Vec<Vec<Expr>>),
    InFile {
        path: PathBuf,
        format: WireFormat,
        compression: Option<FileCompression>,
        settings: Vec<SetValue>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Insert {
    pub target: InsertTarget,
    pub source: InsertSource,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightDelete {
    pub table: TableRef,
    pub where_: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Truncate {
    pub table: TableRef,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Deduplicate {
    Plain,
    By(Vec<ColumnPath>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptimizeTable {
    pub table: TableRef,
    pub final_: bool,
    pub dedup: Option<Deduplicate>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckTable {
    pub table: TableRef,
    pub single_result: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DescTable {
    pub table: TableRef,
    pub sub_cols: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExplainKind {
    Ast,
    Syntax,
    QueryTree,
    Plan,
    Pipeline,
    Estimate,
}

impl ExplainKind {
    pub const ALL: [ExplainKind; 6] = [
        ExplainKind::Ast,
        ExplainKind::Syntax,
        ExplainKind::QueryTree,
        ExplainKind::Plan,
        ExplainKind::Pipeline,
        ExplainKind::Estimate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExplainKind::Ast => "AST",
            ExplainKind::Syntax => "SYNTAX",
            ExplainKind::QueryTree => "QUERY TREE",
            ExplainKind::Plan => "PLAN",
            ExplainKind::Pipeline => "PIPELINE",
            ExplainKind::Estimate => "ESTIMATE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Explain {
    pub kind: Option<ExplainKind>,
    pub inner: Box<Statement>,
}

/// The abstract statement value handed to the renderer and, after execution,
/// to the update pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Select(TopSelect),
    Insert(Insert),
    Delete(LightDelete),
    CreateTable(CreateTable),
    CreateView(CreateView),
    CreateDatabase(CreateDatabase),
    CreateFunction(CreateFunction),
    Drop(Drop),
    Truncate(Truncate),
    Optimize(OptimizeTable),
    Check(CheckTable),
    Desc(DescTable),
    Alter(AlterTable),
    Exchange(ExchangeTables),
    Attach(Attach),
    Detach(Detach),
    Set(Vec<SetValue>),
    Explain(Explain),
}

impl Statement {
    /// The statement with any EXPLAIN wrapper stripped.
    pub fn unwrap_explain(&self) -> &Statement {
        match self {
            Statement::Explain(e) => &e.inner,
            other => other,
        }
    }

    /// EXPLAIN-wrapped statements never mutate server state, so the update
    /// pipeline ignores their inner statement.
    pub fn is_explain(&self) -> bool {
        matches!(self, Statement::Explain(_))
    }
}
