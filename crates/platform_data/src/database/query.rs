//! Backend-neutral query description for the two-table entity store.
//!
//! The store has an entities table (`guid`, `type`, `handling_class`,
//! `created_ts`) aliased `o`, and a metadata table (`id`, `guid`, `name`,
//! `value`) joined under per-predicate aliases. Queries are plain data; a
//! backend interprets them. [`fmt::Display`] renders an SQL-like transcript
//! used for logging and as the query cache key.

use crate::Guid;
use serde_json::Value;
use std::fmt;

pub const ENTITY_TABLE: &str = "objects";
pub const METADATA_TABLE: &str = "objects_metadata";
/// Alias of the entities table in select queries.
pub const ENTITY_ALIAS: &str = "o";
/// Name of the column carrying an aggregate result.
pub const AGGREGATE_COLUMN: &str = "select_func_result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Entities,
    Metadata,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Entities => ENTITY_TABLE,
            Self::Metadata => METADATA_TABLE,
        }
    }
}

/// Fixed columns of the entities table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Guid,
    Type,
    HandlingClass,
    CreatedTs,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Self::Guid => "guid",
            Self::Type => "type",
            Self::HandlingClass => "handling_class",
            Self::CreatedTs => "created_ts",
        }
    }

    /// Resolves a core column by name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "guid" | "id" => Some(Self::Guid),
            "type" => Some(Self::Type),
            "handling_class" => Some(Self::HandlingClass),
            "created_ts" => Some(Self::CreatedTs),
            _ => None,
        }
    }
}

/// Comparison operator of an attribute predicate.
///
/// Parsing never fails: anything unrecognised is carried as [`Operator::Other`]
/// and left for the backend to reject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
    In,
    Not,
    Other(String),
}

impl Operator {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Self::Eq,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "like" => Self::Like,
            "in" => Self::In,
            "not" | "!=" | "<>" => Self::Not,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_sql(&self) -> &str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Not => "!=",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Scalar(String),
    List(Vec<String>),
}

impl Operand {
    /// Every value the operand stands for.
    pub fn values(&self) -> &[String] {
        match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for Operand {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "{}", quote(value)),
            Self::List(values) => {
                let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "({})", quoted.join(","))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Case-insensitive `asc` / `desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// A filter over the selected rows. Conditions of a query are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Row guid equals the value.
    Guid(Guid),
    /// Entity type matches any of the LIKE patterns.
    TypeLike(Vec<String>),
    /// Joined metadata row carries `name` and its value satisfies the operator.
    Metadata {
        alias: String,
        name: String,
        operator: Operator,
        operand: Operand,
    },
    /// Joined metadata row carries `name`, any value.
    MetadataName { alias: String, name: String },
}

/// What a query orders by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderTarget {
    Column(Column),
    /// The `value` column of a joined metadata alias.
    Joined(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub target: OrderTarget,
    pub direction: SortOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Full rows.
    #[default]
    Rows,
    /// A single row holding `COUNT(*)` under [`AGGREGATE_COLUMN`].
    Count,
}

/// A read query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Select {
    pub table: Table,
    pub selection: Selection,
    /// Metadata aliases joined on `alias.guid = o.guid`, in join order.
    pub joins: Vec<String>,
    pub conditions: Vec<Condition>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            selection: Selection::Rows,
            joins: Vec::new(),
            conditions: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Entities row by guid.
    pub fn entity(guid: Guid) -> Self {
        Self::new(Table::Entities).filter(Condition::Guid(guid))
    }

    /// Every metadata row of an entity, in storage order.
    pub fn metadata(guid: Guid) -> Self {
        Self::new(Table::Metadata).filter(Condition::Guid(guid))
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn join(mut self, alias: impl Into<String>) -> Self {
        self.joins.push(alias.into());
        self
    }

    pub fn count(mut self) -> Self {
        self.selection = Selection::Count;
        self
    }

    pub fn order(mut self, target: OrderTarget, direction: SortOrder) -> Self {
        self.order_by = Some(OrderBy { target, direction });
        self
    }

    pub fn paginate(mut self, limit: Option<u64>, offset: Option<u64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// A row-creating query. Backends return the new row's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Insert {
    Entity {
        type_path: String,
        handling_class: String,
        created_ts: i64,
    },
    Metadata {
        guid: Guid,
        name: String,
        value: String,
    },
}

/// Overwrites columns of an entities row.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub guid: Guid,
    pub set: Vec<(Column, Value)>,
}

/// Removes every row of `table` belonging to `guid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Delete {
    pub table: Table,
    pub guid: Guid,
}

impl Delete {
    pub fn entity(guid: Guid) -> Self {
        Self {
            table: Table::Entities,
            guid,
        }
    }

    pub fn metadata(guid: Guid) -> Self {
        Self {
            table: Table::Metadata,
            guid,
        }
    }
}

/// Any statement a backend can execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Query {
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Select(_))
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guid(guid) => write!(f, "guid={guid}"),
            Self::TypeLike(patterns) => {
                let clauses: Vec<String> = patterns
                    .iter()
                    .map(|p| format!("{ENTITY_ALIAS}.type LIKE {}", quote(p)))
                    .collect();
                write!(f, "({})", clauses.join(" OR "))
            }
            Self::Metadata {
                alias,
                name,
                operator,
                operand,
            } => write!(
                f,
                "({alias}.name={} AND {alias}.value {operator} {operand})",
                quote(name)
            ),
            Self::MetadataName { alias, name } => write!(f, "{alias}.name={}", quote(name)),
        }
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expr = match (self.selection, self.table) {
            (Selection::Count, _) => "COUNT(*)".to_string(),
            (Selection::Rows, Table::Entities) => format!("{ENTITY_ALIAS}.*"),
            (Selection::Rows, Table::Metadata) => "*".to_string(),
        };

        match self.table {
            Table::Entities => write!(f, "SELECT {expr} FROM {ENTITY_TABLE} {ENTITY_ALIAS}")?,
            Table::Metadata => write!(f, "SELECT {expr} FROM {METADATA_TABLE}")?,
        }

        for alias in &self.joins {
            write!(
                f,
                " JOIN {METADATA_TABLE} {alias} ON {alias}.guid={ENTITY_ALIAS}.guid"
            )?;
        }

        if !self.conditions.is_empty() {
            let clauses: Vec<String> = self
                .conditions
                .iter()
                .map(|condition| match (condition, self.table) {
                    (Condition::Guid(guid), Table::Entities) => {
                        format!("{ENTITY_ALIAS}.guid={guid}")
                    }
                    (condition, _) => condition.to_string(),
                })
                .collect();
            write!(f, " WHERE {}", clauses.join(" AND "))?;
        }

        if let Some(order) = &self.order_by {
            match &order.target {
                OrderTarget::Column(column) => {
                    write!(f, " ORDER BY {ENTITY_ALIAS}.{}", column.name())?
                }
                OrderTarget::Joined(alias) => write!(f, " ORDER BY {alias}.value")?,
            }
            write!(f, " {}", order.direction.as_sql())?;
        }

        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => fmt::Display::fmt(select, f),
            Self::Insert(Insert::Entity {
                type_path,
                handling_class,
                created_ts,
            }) => write!(
                f,
                "INSERT INTO {ENTITY_TABLE} SET type={}, handling_class={}, created_ts={created_ts}",
                quote(type_path),
                quote(handling_class)
            ),
            Self::Insert(Insert::Metadata { guid, name, value }) => write!(
                f,
                "INSERT INTO {METADATA_TABLE} SET guid={guid}, name={}, value={}",
                quote(name),
                quote(value)
            ),
            Self::Update(update) => {
                let sets: Vec<String> = update
                    .set
                    .iter()
                    .map(|(column, value)| format!("{}={}", column.name(), value))
                    .collect();
                write!(
                    f,
                    "UPDATE {ENTITY_TABLE} SET {} WHERE guid={}",
                    sets.join(", "),
                    update.guid
                )
            }
            Self::Delete(delete) => write!(
                f,
                "DELETE FROM {} WHERE guid={}",
                delete.table.name(),
                delete.guid
            ),
        }
    }
}
