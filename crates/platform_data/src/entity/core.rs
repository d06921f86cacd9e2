use super::AttributeValue;
use crate::Guid;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub(crate) type TypeHierarchy = SmallVec<[CompactString; 4]>;

/// Where an entity is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Never stored.
    New,
    /// Has a guid assigned by the store.
    Saved,
    /// Removed from the store.
    Deleted,
}

/// A persisted domain object: a type hierarchy, a few core fields and an
/// open attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub(crate) guid: Option<Guid>,
    pub(crate) type_hierarchy: TypeHierarchy,
    pub(crate) handling_class: CompactString,
    pub(crate) created_ts: Option<i64>,
    pub(crate) attributes: BTreeMap<String, AttributeValue>,
    pub(crate) modified: bool,
    pub(crate) deleted: bool,
}

impl Entity {
    /// Untyped entity of `handling_class`. It cannot be saved until typed
    /// through [`EntityBuilder`].
    pub fn new(handling_class: &str) -> Self {
        Self {
            guid: None,
            type_hierarchy: SmallVec::new(),
            handling_class: CompactString::from(handling_class),
            created_ts: None,
            attributes: BTreeMap::new(),
            modified: false,
            deleted: false,
        }
    }

    pub fn builder(handling_class: &str) -> EntityBuilder {
        EntityBuilder::new(handling_class)
    }

    pub fn guid(&self) -> Option<Guid> {
        self.guid
    }

    pub fn type_hierarchy(&self) -> &[CompactString] {
        &self.type_hierarchy
    }

    /// The hierarchy joined with `:`, which is also the event namespace.
    pub fn type_path(&self) -> String {
        self.type_hierarchy.join(":")
    }

    pub fn has_type(&self, tag: &str) -> bool {
        self.type_hierarchy.iter().any(|t| t.as_str() == tag)
    }

    pub fn handling_class(&self) -> &str {
        &self.handling_class
    }

    pub fn created_ts(&self) -> Option<i64> {
        self.created_ts
    }

    /// Back-dates an entity. Only possible before the first save.
    pub fn set_created_ts(&mut self, timestamp: i64) -> bool {
        if self.guid.is_some() {
            warn!("⚠️ created_ts of entity {:?} is frozen after save", self.guid);
            return false;
        }
        self.created_ts = Some(timestamp);
        true
    }

    pub fn state(&self) -> EntityState {
        match (self.deleted, self.guid) {
            (true, _) => EntityState::Deleted,
            (false, Some(_)) => EntityState::Saved,
            (false, None) => EntityState::New,
        }
    }

    /// Whether attributes changed since they were last persisted.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// First value of an attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::first)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Assigns an attribute. `guid` is owned by the store and ignored;
    /// `created_ts` is routed to [`Entity::set_created_ts`].
    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        match name {
            "guid" => debug!("🚫 Ignoring assignment to guid"),
            "created_ts" => match value.first().and_then(|v| v.trim().parse().ok()) {
                Some(timestamp) => {
                    self.set_created_ts(timestamp);
                }
                None => warn!("⚠️ Ignoring non-numeric created_ts: {}", value),
            },
            _ => {
                if self.attributes.get(name) != Some(&value) {
                    self.attributes.insert(name.to_string(), value);
                    self.modified = true;
                }
            }
        }
    }

    /// Removes an attribute, marking the entity dirty if it was present.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }
}

/// Constructs an entity and fixes its type hierarchy.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    entity: Entity,
}

impl EntityBuilder {
    pub fn new(handling_class: &str) -> Self {
        Self {
            entity: Entity::new(handling_class),
        }
    }

    /// Appends a type tag, e.g. `obj` then `blog` for `obj:blog`.
    pub fn with_type(mut self, tag: &str) -> Self {
        self.entity.type_hierarchy.push(CompactString::from(tag));
        self
    }

    pub fn created_at(mut self, timestamp: i64) -> Self {
        self.entity.created_ts = Some(timestamp);
        self
    }

    pub fn attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.entity.set(name, value);
        self
    }

    pub fn build(self) -> Entity {
        self.entity
    }
}
