//! In-process implementation of the two-table store.
//!
//! Selects follow SQL join semantics: every joined alias ranges over the
//! entity's metadata rows, so an entity appears once per combination of
//! joined rows that satisfies the conditions.

use super::backend::{LinkKind, QueryOutcome, Row, StorageBackend};
use super::query::{
    Column, Condition, Delete, Insert, Operand, Operator, OrderTarget, Query, Select, Selection,
    SortOrder, Table, Update, AGGREGATE_COLUMN,
};
use crate::error::BackendError;
use crate::Guid;
use parking_lot::RwLock;
use regex::RegexBuilder;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct EntityRecord {
    guid: Guid,
    type_path: String,
    handling_class: String,
    created_ts: i64,
}

impl EntityRecord {
    fn column(&self, column: Column) -> Value {
        match column {
            Column::Guid => Value::from(self.guid),
            Column::Type => Value::from(self.type_path.clone()),
            Column::HandlingClass => Value::from(self.handling_class.clone()),
            Column::CreatedTs => Value::from(self.created_ts),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("guid", self.guid)
            .with("type", self.type_path.clone())
            .with("handling_class", self.handling_class.clone())
            .with("created_ts", self.created_ts)
    }
}

#[derive(Debug, Clone)]
struct MetadataRecord {
    id: i64,
    guid: Guid,
    name: String,
    value: String,
}

impl MetadataRecord {
    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("guid", self.guid)
            .with("name", self.name.clone())
            .with("value", self.value.clone())
    }
}

#[derive(Debug, Default)]
struct Tables {
    last_guid: Guid,
    last_metadata_id: i64,
    entities: BTreeMap<Guid, EntityRecord>,
    metadata: Vec<MetadataRecord>,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `table`.
    pub fn row_count(&self, table: Table) -> usize {
        let tables = self.tables.read();
        match table {
            Table::Entities => tables.entities.len(),
            Table::Metadata => tables.metadata.len(),
        }
    }

    fn select(&self, select: &Select) -> Result<Vec<Row>, BackendError> {
        check_operators(select)?;
        let tables = self.tables.read();
        match select.table {
            Table::Metadata => select_metadata(&tables, select),
            Table::Entities => select_entities(&tables, select),
        }
    }

    fn insert(&self, insert: &Insert) -> Guid {
        let mut tables = self.tables.write();
        match insert {
            Insert::Entity {
                type_path,
                handling_class,
                created_ts,
            } => {
                tables.last_guid += 1;
                let guid = tables.last_guid;
                tables.entities.insert(
                    guid,
                    EntityRecord {
                        guid,
                        type_path: type_path.clone(),
                        handling_class: handling_class.clone(),
                        created_ts: *created_ts,
                    },
                );
                guid
            }
            Insert::Metadata { guid, name, value } => {
                tables.last_metadata_id += 1;
                let id = tables.last_metadata_id;
                tables.metadata.push(MetadataRecord {
                    id,
                    guid: *guid,
                    name: name.clone(),
                    value: value.clone(),
                });
                id
            }
        }
    }

    fn update(&self, update: &Update) -> Result<u64, BackendError> {
        let mut tables = self.tables.write();
        let Some(record) = tables.entities.get_mut(&update.guid) else {
            return Ok(0);
        };

        for (column, value) in &update.set {
            match (column, value) {
                (Column::Type, Value::String(text)) => record.type_path = text.clone(),
                (Column::HandlingClass, Value::String(text)) => record.handling_class = text.clone(),
                (Column::CreatedTs, value) => {
                    record.created_ts = value.as_i64().ok_or_else(|| {
                        BackendError::query(Query::Update(update.clone()), "created_ts must be an integer")
                    })?
                }
                (column, _) => {
                    return Err(BackendError::query(
                        Query::Update(update.clone()),
                        format!("column {} cannot be set to that value", column.name()),
                    ))
                }
            }
        }
        Ok(1)
    }

    fn delete(&self, delete: &Delete) -> u64 {
        let mut tables = self.tables.write();
        match delete.table {
            Table::Entities => u64::from(tables.entities.remove(&delete.guid).is_some()),
            Table::Metadata => {
                let before = tables.metadata.len();
                tables.metadata.retain(|record| record.guid != delete.guid);
                (before - tables.metadata.len()) as u64
            }
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn establish_link(&self, _link: LinkKind) -> Result<(), BackendError> {
        Ok(())
    }

    /// Values never reach a query string here, so they are stored as given.
    fn sanitize(&self, value: &str) -> String {
        value.to_string()
    }

    fn execute(&self, _link: LinkKind, query: &Query) -> Result<QueryOutcome, BackendError> {
        match query {
            Query::Select(select) => self.select(select).map(QueryOutcome::Rows),
            Query::Insert(insert) => Ok(QueryOutcome::Inserted(Some(self.insert(insert)))),
            Query::Update(update) => self.update(update).map(QueryOutcome::Affected),
            Query::Delete(delete) => Ok(QueryOutcome::Affected(self.delete(delete))),
        }
    }
}

/// Rejects unknown operators up front, whether or not any row would reach them.
fn check_operators(select: &Select) -> Result<(), BackendError> {
    for condition in &select.conditions {
        if let Condition::Metadata {
            operator: Operator::Other(raw),
            ..
        } = condition
        {
            return Err(BackendError::UnsupportedOperator(raw.clone()));
        }
    }
    Ok(())
}

fn select_metadata(tables: &Tables, select: &Select) -> Result<Vec<Row>, BackendError> {
    let mut rows = Vec::new();
    for record in &tables.metadata {
        let keep = select.conditions.iter().all(|condition| match condition {
            Condition::Guid(guid) => record.guid == *guid,
            _ => true,
        });
        if keep {
            rows.push(record.to_row());
        }
    }
    Ok(paginate(rows, select))
}

/// One candidate result: the entity plus the metadata row bound to each alias.
struct Binding<'a> {
    entity: &'a EntityRecord,
    joined: Vec<&'a MetadataRecord>,
}

fn select_entities(tables: &Tables, select: &Select) -> Result<Vec<Row>, BackendError> {
    let mut bindings: Vec<Binding<'_>> = Vec::new();

    for entity in tables.entities.values() {
        if !entity_matches(entity, &select.conditions, select)? {
            continue;
        }

        let own: Vec<&MetadataRecord> = tables
            .metadata
            .iter()
            .filter(|record| record.guid == entity.guid)
            .collect();

        // Candidate rows per alias, then their cartesian product.
        let mut per_alias: Vec<Vec<&MetadataRecord>> = Vec::with_capacity(select.joins.len());
        for alias in &select.joins {
            let mut candidates = Vec::new();
            for record in &own {
                if alias_matches(record, alias, &select.conditions, select)? {
                    candidates.push(*record);
                }
            }
            per_alias.push(candidates);
        }

        let mut combos: Vec<Vec<&MetadataRecord>> = vec![Vec::new()];
        for candidates in &per_alias {
            let mut next = Vec::with_capacity(combos.len() * candidates.len());
            for combo in &combos {
                for candidate in candidates {
                    let mut extended = combo.clone();
                    extended.push(*candidate);
                    next.push(extended);
                }
            }
            combos = next;
        }

        bindings.extend(combos.into_iter().map(|joined| Binding { entity, joined }));
    }

    if select.selection == Selection::Count {
        let row = Row::new().with(AGGREGATE_COLUMN, bindings.len() as u64);
        return Ok(vec![row]);
    }

    if let Some(order) = &select.order_by {
        let position = match &order.target {
            OrderTarget::Joined(alias) => select.joins.iter().position(|a| a == alias),
            OrderTarget::Column(_) => None,
        };
        bindings.sort_by(|a, b| {
            let ordering = match (&order.target, position) {
                (OrderTarget::Column(column), _) => {
                    compare_values(&a.entity.column(*column), &b.entity.column(*column))
                }
                (OrderTarget::Joined(_), Some(index)) => {
                    compare_text(&a.joined[index].value, &b.joined[index].value)
                }
                (OrderTarget::Joined(_), None) => Ordering::Equal,
            };
            match order.direction {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }

    let rows = bindings.into_iter().map(|b| b.entity.to_row()).collect();
    Ok(paginate(rows, select))
}

fn entity_matches(
    entity: &EntityRecord,
    conditions: &[Condition],
    select: &Select,
) -> Result<bool, BackendError> {
    for condition in conditions {
        let keep = match condition {
            Condition::Guid(guid) => entity.guid == *guid,
            Condition::TypeLike(patterns) => {
                let mut any = false;
                for pattern in patterns {
                    if like(&entity.type_path, pattern, select)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            _ => true,
        };
        if !keep {
            return Ok(false);
        }
    }
    Ok(true)
}

fn alias_matches(
    record: &MetadataRecord,
    alias: &str,
    conditions: &[Condition],
    select: &Select,
) -> Result<bool, BackendError> {
    for condition in conditions {
        let keep = match condition {
            Condition::Metadata {
                alias: target,
                name,
                operator,
                operand,
            } if target == alias => {
                record.name == *name && compare(&record.value, operator, operand, select)?
            }
            Condition::MetadataName {
                alias: target,
                name,
            } if target == alias => record.name == *name,
            _ => true,
        };
        if !keep {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare(
    value: &str,
    operator: &Operator,
    operand: &Operand,
    select: &Select,
) -> Result<bool, BackendError> {
    let first = operand.values().first().map(String::as_str).unwrap_or_default();
    Ok(match operator {
        Operator::Eq => equal(value, first),
        Operator::Not => !equal(value, first),
        Operator::Lt => compare_text(value, first) == Ordering::Less,
        Operator::Gt => compare_text(value, first) == Ordering::Greater,
        Operator::Le => compare_text(value, first) != Ordering::Greater,
        Operator::Ge => compare_text(value, first) != Ordering::Less,
        Operator::Like => like(value, first, select)?,
        Operator::In => operand.values().iter().any(|candidate| equal(value, candidate)),
        Operator::Other(raw) => return Err(BackendError::UnsupportedOperator(raw.clone())),
    })
}

fn equal(a: &str, b: &str) -> bool {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

/// Numeric when both sides are numbers, byte-wise otherwise.
fn compare_text(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Case-insensitive SQL LIKE with `%` and `_` wildcards.
fn like(value: &str, pattern: &str, select: &Select) -> Result<bool, BackendError> {
    let mut expression = String::with_capacity(pattern.len() + 8);
    expression.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expression.push('$');

    let regex = RegexBuilder::new(&expression)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| BackendError::query(select, e.to_string()))?;
    Ok(regex.is_match(value))
}

fn paginate(rows: Vec<Row>, select: &Select) -> Vec<Row> {
    let offset = select.offset.unwrap_or(0) as usize;
    let iter = rows.into_iter().skip(offset);
    match select.limit {
        Some(limit) => iter.take(limit as usize).collect(),
        None => iter.collect(),
    }
}
