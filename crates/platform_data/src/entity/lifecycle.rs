//! Save, delete and rehydration.
//!
//! Lifecycle events fire in the entity's type path namespace, so a listener
//! on `obj:*` sees every subtype of `obj`:
//!
//! | operation | pre-event (veto) | post-event |
//! |---|---|---|
//! | first save | `saving` | `saved` |
//! | later save | `updating` | `updated` |
//! | delete | `deleting` | `deleted` |
//!
//! A veto makes the operation return `Ok(None)` / `Ok(false)` without
//! touching the store.

use super::{AttributeValue, Entity};
use crate::context::DataContext;
use crate::database::query::{Delete, Insert, Query, Select};
use crate::database::Row;
use crate::error::{BackendError, DataError};
use crate::Guid;
use chrono::Utc;
use compact_str::CompactString;
use platform_events::Params;
use tracing::{debug, error, info, warn};

impl Entity {
    /// Inserts or updates the entity. Returns the guid, or `None` when a
    /// listener vetoed the save.
    pub fn save(&mut self, ctx: &DataContext) -> Result<Option<Guid>, DataError> {
        if self.type_hierarchy.is_empty() {
            return Err(DataError::MissingType {
                class: self.handling_class.to_string(),
            });
        }

        let namespace = self.type_path();
        let (before, after) = match self.guid {
            Some(_) => ("updating", "updated"),
            None => ("saving", "saved"),
        };

        if !self.fire(ctx, &namespace, before)? {
            info!("🚫 {} of {} vetoed", before, namespace);
            return Ok(None);
        }

        let db = ctx.database()?;
        let guid = match self.guid {
            Some(guid) => {
                if self.modified {
                    db.delete(&Delete::metadata(guid))?;
                }
                guid
            }
            None => {
                let created_ts = self.created_ts.unwrap_or_else(|| Utc::now().timestamp());
                let insert = Insert::Entity {
                    type_path: namespace.clone(),
                    handling_class: self.handling_class.to_string(),
                    created_ts,
                };
                let guid = db
                    .insert(&insert)?
                    .ok_or_else(|| BackendError::query(Query::Insert(insert.clone()), "store assigned no guid"))?;
                self.guid = Some(guid);
                self.created_ts = Some(created_ts);
                guid
            }
        };

        if self.modified {
            for (name, value) in &self.attributes {
                for item in value.values() {
                    db.insert(&Insert::Metadata {
                        guid,
                        name: db.sanitize(name),
                        value: db.sanitize(item),
                    })?;
                }
            }
            self.modified = false;
        }

        debug!("✅ {} {} as {}", after, namespace, guid);
        self.fire(ctx, &namespace, after)?;
        Ok(Some(guid))
    }

    /// Removes the entity row, then its metadata.
    ///
    /// Not atomic: if the metadata delete fails after the entity row is gone,
    /// the error is logged, nothing is rolled back and `Ok(false)` is returned.
    /// Removing zero metadata rows is a success, since an entity without
    /// attributes has none.
    pub fn delete(&mut self, ctx: &DataContext) -> Result<bool, DataError> {
        let Some(guid) = self.guid else {
            return Ok(false);
        };

        let namespace = self.type_path();
        if !self.fire(ctx, &namespace, "deleting")? {
            info!("🚫 Delete of {} {} vetoed", namespace, guid);
            return Ok(false);
        }

        let db = ctx.database()?;
        if db.delete(&Delete::entity(guid))? == 0 {
            warn!("⚠️ Entity {} was not in the store", guid);
            return Ok(false);
        }
        if let Err(e) = db.delete(&Delete::metadata(guid)) {
            error!("❌ Entity {} deleted but its metadata was left behind: {}", guid, e);
            return Ok(false);
        }

        self.deleted = true;
        self.fire(ctx, &namespace, "deleted")?;
        debug!("✅ Deleted {} {}", namespace, guid);
        Ok(true)
    }

    /// Rebuilds an entity from an entities-table row and its metadata.
    ///
    /// The row must carry a guid and a handling class registered in the
    /// context's [`EntityKinds`](super::EntityKinds). Repeated metadata names
    /// coalesce into a list in storage order.
    pub fn from_row(ctx: &DataContext, row: &Row) -> Result<Self, DataError> {
        let guid = row
            .get_i64("guid")
            .ok_or_else(|| DataError::invalid_row("row has no guid"))?;
        let class = row
            .get_string("handling_class")
            .filter(|class| !class.is_empty())
            .ok_or_else(|| DataError::invalid_row(format!("row {guid} has no handling class")))?;
        let mut entity = ctx
            .kinds()
            .create(&class)
            .ok_or_else(|| DataError::invalid_row(format!("row {guid} has unknown handling class {class}")))?;

        if entity.type_hierarchy.is_empty() {
            if let Some(type_path) = row.get_string("type") {
                entity.type_hierarchy = type_path
                    .split(':')
                    .filter(|tag| !tag.is_empty())
                    .map(CompactString::from)
                    .collect();
            }
        }

        entity.guid = Some(guid);
        entity.created_ts = row.get_i64("created_ts");
        entity.attributes.clear();

        let db = ctx.database()?;
        for meta in db.select(&Select::metadata(guid))? {
            let (Some(name), Some(value)) = (meta.get_string("name"), meta.get_string("value")) else {
                return Err(DataError::invalid_row(format!("metadata of {guid} is incomplete")));
            };
            match entity.attributes.get_mut(&name) {
                Some(existing) => existing.push(value),
                None => {
                    entity.attributes.insert(name, AttributeValue::Single(value));
                }
            }
        }

        entity.modified = false;
        entity.deleted = false;
        Ok(entity)
    }

    fn fire(&self, ctx: &DataContext, namespace: &str, event: &str) -> Result<bool, DataError> {
        let mut params = Params::new().with_object(self);
        if let Some(guid) = self.guid {
            params.insert("guid", guid);
        }
        Ok(ctx.events().trigger_event(namespace, event, &params)?)
    }
}
