pub mod segment;

use std::fmt::Display;

use self::segment::{
    ColumnDefinition, ColumnSegment, Expr, IndexSegment, Projection, SimpleTableSegment,
    TableSegment,
};

/// Statement handed over by the parser, table and column segments already split out.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    CreateTable(CreateTableStmt),
    AlterTable(AlterTableStmt),
    DropTable(DropTableStmt),
    CreateIndex(CreateIndexStmt),
    AlterIndex(AlterIndexStmt),
    DropIndex(DropIndexStmt),
    CreateView(CreateViewStmt),
    AlterView(AlterViewStmt),
    DropView(DropViewStmt),
    CreateSchema(CreateSchemaStmt),
    AlterSchema(AlterSchemaStmt),
    DropSchema(DropSchemaStmt),
}

/// Discriminant of `Statement`, the key validators and refreshers are registered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    AlterTable,
    DropTable,
    CreateIndex,
    AlterIndex,
    DropIndex,
    CreateView,
    AlterView,
    DropView,
    CreateSchema,
    AlterSchema,
    DropSchema,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Select(_) => StatementKind::Select,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
            Self::CreateTable(_) => StatementKind::CreateTable,
            Self::AlterTable(_) => StatementKind::AlterTable,
            Self::DropTable(_) => StatementKind::DropTable,
            Self::CreateIndex(_) => StatementKind::CreateIndex,
            Self::AlterIndex(_) => StatementKind::AlterIndex,
            Self::DropIndex(_) => StatementKind::DropIndex,
            Self::CreateView(_) => StatementKind::CreateView,
            Self::AlterView(_) => StatementKind::AlterView,
            Self::DropView(_) => StatementKind::DropView,
            Self::CreateSchema(_) => StatementKind::CreateSchema,
            Self::AlterSchema(_) => StatementKind::AlterSchema,
            Self::DropSchema(_) => StatementKind::DropSchema,
        }
    }
}

/// Unwrap the `$variant` payload of a `&Statement`, returning `Error::Internal`
/// from the enclosing function when the statement is another kind.
#[macro_export]
macro_rules! statement_of {
    ($stmt:expr, $variant:ident) => {
        match $stmt {
            $crate::ast::Statement::$variant(stmt) => stmt,
            other => {
                return Err($crate::error::Error::Internal($crate::fmt_err!(
                    "expect {} but got {}",
                    stringify!($variant),
                    other
                )))
            }
        }
    };
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Statement: {:?}", self.kind())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStmt {
    pub projections: Vec<Projection>,
    pub from: Option<TableSegment>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: SimpleTableSegment,
    pub columns: Vec<ColumnSegment>,
    pub values: Vec<Vec<Expr>>,
    pub select: Option<Box<SelectStmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table: TableSegment,
    pub assignments: Vec<(ColumnSegment, Expr)>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table: TableSegment,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table: SimpleTableSegment,
    pub columns: Vec<ColumnDefinition>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlterTableStmt {
    pub table: Option<SimpleTableSegment>,
    pub rename_table: Option<SimpleTableSegment>,
    pub add_columns: Vec<ColumnDefinition>,
    pub drop_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStmt {
    pub tables: Vec<SimpleTableSegment>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStmt {
    pub index: IndexSegment,
    pub table: SimpleTableSegment,
    pub columns: Vec<ColumnSegment>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterIndexStmt {
    pub index: IndexSegment,
    pub rename_index: Option<IndexSegment>,
    /// MySQL style `ALTER TABLE t RENAME INDEX`; otherwise the owner is looked up
    pub table: Option<SimpleTableSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropIndexStmt {
    pub indexes: Vec<IndexSegment>,
    pub table: Option<SimpleTableSegment>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateViewStmt {
    pub view: SimpleTableSegment,
    pub select: SelectStmt,
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterViewStmt {
    pub view: SimpleTableSegment,
    pub rename_view: Option<SimpleTableSegment>,
    pub select: Option<SelectStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropViewStmt {
    pub views: Vec<SimpleTableSegment>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSchemaStmt {
    pub schema_name: String,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterSchemaStmt {
    pub schema_name: String,
    pub rename_schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropSchemaStmt {
    pub schema_names: Vec<String>,
    pub if_exists: bool,
}
