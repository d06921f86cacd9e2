//! Entity search: a type and predicate description translated into
//! join-based selects over the entities and metadata tables.
//!
//! Each attribute predicate joins the metadata table under its own alias
//! (`m0`, `m1`, ...), so one attribute may appear in several predicates, for
//! example both ends of a range. Predicates are AND-ed with each other and
//! with the type filter; several type patterns are OR-ed.
//!
//! Operators are not checked here. Anything unrecognised reaches the backend
//! as written and the backend decides whether to reject it.

use crate::context::DataContext;
use crate::database::query::{
    Column, Condition, Operand, Operator, OrderTarget, Select, SortOrder, Table, AGGREGATE_COLUMN,
};
use crate::database::Row;
use crate::entity::{Entity, Viewable};
use crate::error::DataError;
use crate::Guid;
use platform_events::{HookValue, Params};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Alias of the metadata join used for ordering by an attribute.
pub const SORT_ALIAS: &str = "sort";

/// One `name operator value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub name: String,
    pub operator: Operator,
    pub operand: Operand,
}

/// A search over entities.
///
/// ```
/// use platform_data::search::ObjectQuery;
///
/// let query = ObjectQuery::new()
///     .of_type("obj:blog")
///     .where_eq("title", "Hello")
///     .where_op("views", ">", "10")
///     .limit(10);
/// assert_eq!(query.predicates().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectQuery {
    types: Vec<String>,
    predicates: Vec<Predicate>,
    limit: Option<u64>,
    offset: Option<u64>,
    order_by: Option<String>,
    order: SortOrder,
    no_count: bool,
}

impl ObjectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a LIKE pattern for the type path (`%` and `_` wildcards).
    pub fn of_type(mut self, pattern: &str) -> Self {
        self.types.push(pattern.to_string());
        self
    }

    pub fn where_eq(self, name: &str, value: &str) -> Self {
        self.where_op(name, "=", value)
    }

    pub fn where_op(mut self, name: &str, operator: &str, value: impl Into<Operand>) -> Self {
        self.predicates.push(Predicate {
            name: name.to_string(),
            operator: Operator::parse(operator),
            operand: value.into(),
        });
        self
    }

    pub fn where_in(self, name: &str, values: Vec<String>) -> Self {
        self.where_op(name, "in", values)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Orders by a core column (`guid`, `type`, `handling_class`,
    /// `created_ts`) or else by the named attribute.
    pub fn order_by(mut self, field: &str) -> Self {
        self.order_by = Some(field.to_string());
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Skips the count query; the page then carries no total.
    pub fn no_count(mut self) -> Self {
        self.no_count = true;
        self
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Page number for the requested window: `offset / limit + 1`, or 1.
    pub fn page(&self) -> u64 {
        match (self.offset, self.limit) {
            (Some(offset), Some(limit)) if offset > 0 && limit > 0 => offset / limit + 1,
            _ => 1,
        }
    }

    /// The row select. Every user-supplied string passes through `sanitize`.
    pub fn build(&self, sanitize: impl Fn(&str) -> String) -> Select {
        let mut select = self.filtered(&sanitize);

        let direction = self.order;
        select = match self.order_by.as_deref().map(|field| (field, Column::parse(field))) {
            Some((_, Some(column))) => select.order(OrderTarget::Column(column), direction),
            Some((field, None)) => select
                .join(SORT_ALIAS)
                .filter(Condition::MetadataName {
                    alias: SORT_ALIAS.to_string(),
                    name: sanitize(field),
                })
                .order(OrderTarget::Joined(SORT_ALIAS.to_string()), direction),
            None => select.order(OrderTarget::Column(Column::CreatedTs), direction),
        };

        select.paginate(self.limit, self.offset)
    }

    /// The matching COUNT select: same filters, no sort join, no window.
    pub fn build_count(&self, sanitize: impl Fn(&str) -> String) -> Select {
        self.filtered(&sanitize).count()
    }

    fn filtered(&self, sanitize: &impl Fn(&str) -> String) -> Select {
        let mut select = Select::new(Table::Entities);

        if !self.types.is_empty() {
            let patterns = self.types.iter().map(|t| sanitize(t)).collect();
            select = select.filter(Condition::TypeLike(patterns));
        }

        for (index, predicate) in self.predicates.iter().enumerate() {
            let alias = format!("m{index}");
            let operand = match &predicate.operand {
                Operand::Scalar(value) => Operand::Scalar(sanitize(value)),
                Operand::List(values) => Operand::List(values.iter().map(|v| sanitize(v)).collect()),
            };
            select = select.join(alias.clone()).filter(Condition::Metadata {
                alias,
                name: sanitize(&predicate.name),
                operator: predicate.operator.clone(),
                operand,
            });
        }

        select
    }
}

/// Type filter of a [`QueryDescriptor`]: one pattern or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeFilter {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub orderby: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub no_count: bool,
}

/// Serialisable search description:
///
/// ```json
/// {
///   "type": "obj:blog",
///   "attributes": { "title": "Hello", "views": { ">": 10 }, "tags": ["a", "b"] },
///   "params": { "limit": 10, "orderby": "title", "order": "desc" }
/// }
/// ```
///
/// A literal attribute means equality, an array means `in`, and an object
/// maps operators to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    #[serde(default, rename = "type")]
    pub types: Option<TypeFilter>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub params: QueryParams,
}

impl From<QueryDescriptor> for ObjectQuery {
    fn from(descriptor: QueryDescriptor) -> Self {
        let mut query = ObjectQuery::new();
        query.types = match descriptor.types {
            Some(TypeFilter::One(pattern)) => vec![pattern],
            Some(TypeFilter::Many(patterns)) => patterns,
            None => Vec::new(),
        };

        for (name, filter) in descriptor.attributes {
            match filter {
                Value::Object(operators) => {
                    for (operator, value) in operators {
                        query = query.where_op(&name, &operator, operand(value));
                    }
                }
                value @ Value::Array(_) => query = query.where_op(&name, "in", operand(value)),
                value => query = query.where_op(&name, "=", operand(value)),
            }
        }

        let params = descriptor.params;
        query.limit = params.limit;
        query.offset = params.offset;
        query.order_by = params.orderby.filter(|field| !field.is_empty());
        if let Some(order) = params.order {
            match SortOrder::parse(&order) {
                Some(order) => query.order = order,
                None => warn!("⚠️ Unknown sort order {:?}, using ascending", order),
            }
        }
        query.no_count = params.no_count;
        query
    }
}

fn operand(value: Value) -> Operand {
    match value {
        Value::Array(items) => Operand::List(items.into_iter().map(scalar_text).collect()),
        other => Operand::Scalar(scalar_text(other)),
    }
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub items: Vec<Entity>,
    pub page: u64,
    /// Requested limit, 0 when unlimited
    pub items_per_page: u64,
    /// Matches across all pages, unless counting was skipped
    pub total_items: Option<u64>,
}

impl ResultPage {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.items.iter()
    }

    pub fn total_pages(&self) -> Option<u64> {
        let total = self.total_items?;
        Some(match self.items_per_page {
            0 => u64::from(total > 0),
            per_page => total.div_ceil(per_page),
        })
    }

    pub fn export(&self, ctx: &DataContext) -> Result<Value, DataError> {
        let items = self
            .items
            .iter()
            .map(|item| item.export(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({
            "page": self.page,
            "items_per_page": self.items_per_page,
            "total_items": self.total_items,
            "total_pages": self.total_pages(),
            "items": items,
        }))
    }
}

impl Viewable for ResultPage {
    fn view_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(2);
        if let Some(first) = self.items.first() {
            names.push(format!("data/lists/{}", first.handling_class().to_lowercase()));
        }
        names.push("data/lists/__default".to_string());
        names
    }

    fn view_variable(&self) -> &'static str {
        "list"
    }

    fn view_data(&self, ctx: &DataContext) -> Result<Value, DataError> {
        self.export(ctx)
    }
}

impl DataContext {
    /// Runs a search and, unless suppressed, the matching count.
    pub fn get_objects(&self, query: &ObjectQuery) -> Result<ResultPage, DataError> {
        let db = self.database()?;
        let select = query.build(|value| db.sanitize(value));
        let items = db.select_with(&select, |row| Entity::from_row(self, &row))?;

        let total_items = if query.no_count {
            None
        } else {
            Some(self.get_objects_count(query)?)
        };

        debug!("🔎 Search returned {} entities", items.len());
        Ok(ResultPage {
            items,
            page: query.page(),
            items_per_page: query.limit.unwrap_or(0),
            total_items,
        })
    }

    /// Number of entities the query matches across all pages.
    pub fn get_objects_count(&self, query: &ObjectQuery) -> Result<u64, DataError> {
        let db = self.database()?;
        let select = query.build_count(|value| db.sanitize(value));
        let count = db
            .select_one(&select)?
            .and_then(|row| row.get_i64(AGGREGATE_COLUMN))
            .unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub fn get_object(&self, guid: Guid) -> Result<Option<Entity>, DataError> {
        let db = self.database()?;
        db.select_one(&Select::entity(guid))?
            .map(|row: Row| Entity::from_row(self, &row))
            .transpose()
    }

    /// Resolves a URL to an entity.
    ///
    /// Listeners of the `object:getbyurl` hook may answer with an entity or
    /// a guid; otherwise the default `<wwwroot>object/<guid>` form is parsed.
    pub fn get_object_by_url(&self, url: &str) -> Result<Option<Entity>, DataError> {
        let params = Params::new().with("url", url);
        let answer = self
            .events()
            .trigger_hook("object", "getbyurl", &params, HookValue::Null)?;

        if let Some(entity) = answer.object_cloned::<Entity>() {
            return Ok(Some(entity));
        }
        if let Some(guid) = answer.as_json().and_then(Value::as_i64) {
            return self.get_object(guid);
        }

        let pattern = format!(r"^{}object/([0-9]+)(?:[/?#].*)?$", regex::escape(self.wwwroot()));
        let regex = Regex::new(&pattern).map_err(|e| DataError::invalid_row(e.to_string()))?;
        match regex
            .captures(url)
            .and_then(|captures| captures.get(1))
            .and_then(|guid| guid.as_str().parse::<Guid>().ok())
        {
            Some(guid) => self.get_object(guid),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(value: &str) -> String {
        value.trim().to_string()
    }

    #[test]
    fn predicates_get_their_own_alias() {
        let select = ObjectQuery::new()
            .of_type("obj:%")
            .where_op("age", ">=", "18")
            .where_op("age", "<", "65")
            .build(trimmed);

        assert_eq!(select.joins, vec!["m0", "m1"]);
        assert_eq!(select.conditions.len(), 3);
        assert_eq!(
            select.order_by.unwrap().target,
            OrderTarget::Column(Column::CreatedTs)
        );
    }

    #[test]
    fn ordering_by_attribute_adds_a_sort_join() {
        let query = ObjectQuery::new().where_eq("a", "1").order_by("title").order(SortOrder::Desc);
        let select = query.build(trimmed);
        assert_eq!(select.joins, vec!["m0", SORT_ALIAS]);
        assert_eq!(select.order_by.unwrap().direction, SortOrder::Desc);

        let count = query.build_count(trimmed);
        assert_eq!(count.joins, vec!["m0"]);
        assert!(count.order_by.is_none());
        assert!(count.limit.is_none());
    }

    #[test]
    fn ordering_by_core_column_has_no_join() {
        let select = ObjectQuery::new().order_by("guid").build(trimmed);
        assert!(select.joins.is_empty());
        assert_eq!(select.order_by.unwrap().target, OrderTarget::Column(Column::Guid));
    }

    #[test]
    fn user_strings_are_sanitized() {
        let select = ObjectQuery::new()
            .of_type(" user ")
            .where_in("role", vec![" admin ".to_string()])
            .build(trimmed);
        assert_eq!(select.conditions[0], Condition::TypeLike(vec!["user".to_string()]));
        match &select.conditions[1] {
            Condition::Metadata { operand, .. } => {
                assert_eq!(operand, &Operand::List(vec!["admin".to_string()]))
            }
            other => panic!("unexpected condition {other:?}"),
        }
    }

    #[test]
    fn page_follows_offset_and_limit() {
        assert_eq!(ObjectQuery::new().page(), 1);
        assert_eq!(ObjectQuery::new().limit(10).offset(0).page(), 1);
        assert_eq!(ObjectQuery::new().limit(10).offset(25).page(), 3);
        assert_eq!(ObjectQuery::new().offset(25).page(), 1);
    }

    #[test]
    fn descriptor_translates_attribute_forms() {
        let descriptor: QueryDescriptor = serde_json::from_value(json!({
            "type": ["obj:blog", "obj:page"],
            "attributes": {
                "title": "Hello",
                "views": { ">": 10, "between": 3 },
                "tags": ["a", "b"]
            },
            "params": { "limit": 5, "offset": 5, "orderby": "title", "order": "desc", "no_count": true }
        }))
        .unwrap();

        let query = ObjectQuery::from(descriptor);
        assert_eq!(query.types(), ["obj:blog", "obj:page"]);
        assert_eq!(query.page(), 2);

        let operators: Vec<(&str, &Operator)> = query
            .predicates()
            .iter()
            .map(|p| (p.name.as_str(), &p.operator))
            .collect();
        assert!(operators.contains(&("title", &Operator::Eq)));
        assert!(operators.contains(&("tags", &Operator::In)));
        assert!(operators.contains(&("views", &Operator::Gt)));
        assert!(operators.contains(&("views", &Operator::Other("between".to_string()))));

        let select = query.build(trimmed);
        assert_eq!(select.order_by.unwrap().direction, SortOrder::Desc);
        assert_eq!(select.limit, Some(5));
    }

    #[test]
    fn descriptor_accepts_a_single_type() {
        let descriptor: QueryDescriptor =
            serde_json::from_value(json!({ "type": "user", "attributes": { "age": 30 } })).unwrap();
        let query = ObjectQuery::from(descriptor);
        assert_eq!(query.types(), ["user"]);
        assert_eq!(query.predicates()[0].operand, Operand::Scalar("30".to_string()));
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = |per_page, total| ResultPage {
            items: Vec::new(),
            page: 1,
            items_per_page: per_page,
            total_items: total,
        };
        assert_eq!(page(10, Some(25)).total_pages(), Some(3));
        assert_eq!(page(0, Some(4)).total_pages(), Some(1));
        assert_eq!(page(0, Some(0)).total_pages(), Some(0));
        assert_eq!(page(10, None).total_pages(), None);
    }
}
