use crate::types::{value::Value, LogicalType};

/// `[owner.]table [AS alias]`; the owner is a schema name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleTableSegment {
    pub owner: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl SimpleTableSegment {
    pub fn new(name: &str) -> Self {
        Self {
            owner: None,
            name: name.to_owned(),
            alias: None,
        }
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_owned());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_owned());
        self
    }

    /// Whether `name` is this table's name or alias.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .alias
                .as_deref()
                .map(|alias| alias.eq_ignore_ascii_case(name))
                .unwrap_or(false)
    }
}

/// `[owner.]column`; the owner is a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSegment {
    pub owner: Option<String>,
    pub name: String,
}

impl ColumnSegment {
    pub fn new(name: &str) -> Self {
        Self {
            owner: None,
            name: name.to_owned(),
        }
    }

    pub fn owned(owner: &str, name: &str) -> Self {
        Self {
            owner: Some(owner.to_owned()),
            name: name.to_owned(),
        }
    }

    /// Text the column was written as, e.g. `o.order_id`.
    pub fn expression(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// `[owner.]index`; the owner is a schema name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSegment {
    pub owner: Option<String>,
    pub name: String,
}

impl IndexSegment {
    pub fn new(name: &str) -> Self {
        Self {
            owner: None,
            name: name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnSegment),
    Literal(Value),
    /// `?` placeholder, zero based
    Parameter(usize),
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Subquery(SubquerySegment),
}

impl Expr {
    /// Collect every column this expression reads, sub-selects excluded.
    pub fn columns<'a>(&'a self, result: &mut Vec<&'a ColumnSegment>) {
        match self {
            Expr::Column(col) => result.push(col),
            Expr::Binary { left, right, .. } => {
                left.columns(result);
                right.columns(result);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.columns(result);
                }
            }
            Expr::Literal(_) | Expr::Parameter(_) | Expr::Subquery(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Column {
        column: ColumnSegment,
        alias: Option<String>,
    },
    /// `*` or `owner.*`
    Star { owner: Option<String> },
    Expression { expr: Expr, alias: Option<String> },
}

/// A sub-select; `start_index` is its offset in the SQL text and identifies it
/// within one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SubquerySegment {
    pub start_index: usize,
    pub select: Box<super::SelectStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableSegment {
    Simple(SimpleTableSegment),
    Subquery {
        subquery: SubquerySegment,
        alias: Option<String>,
    },
    Join {
        left: Box<TableSegment>,
        right: Box<TableSegment>,
        condition: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: LogicalType,
    pub primary_key: bool,
    pub nullable: Option<bool>,
    pub unique: bool,
    pub references: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: LogicalType, primary_key: bool) -> Self {
        Self {
            name: name.to_owned(),
            data_type,
            primary_key,
            nullable: None,
            unique: false,
            references: None,
        }
    }
}
