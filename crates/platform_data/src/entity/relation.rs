//! Relationships and annotations: entities that only describe other,
//! already stored entities.

use super::{Entity, EntityBuilder};
use crate::DataError;
use tracing::debug;

/// Root type tag of relationship entities.
pub const RELATIONSHIP_TYPE: &str = "relationship";
/// Root type tag of annotation entities.
pub const ANNOTATION_TYPE: &str = "annotation";

/// Attribute names written by [`Entity::link`] and [`Entity::annotate`].
pub const GUID_ONE: &str = "guid_one";
pub const GUID_TWO: &str = "guid_two";
pub const ANNOTATING_GUID: &str = "annotating_guid";

impl Entity {
    /// Builder rooted at the `relationship` type, e.g. `relationship:friend`.
    pub fn relationship(handling_class: &str) -> EntityBuilder {
        EntityBuilder::new(handling_class).with_type(RELATIONSHIP_TYPE)
    }

    /// Builder rooted at the `annotation` type, e.g. `annotation:comment`.
    pub fn annotation(handling_class: &str) -> EntityBuilder {
        EntityBuilder::new(handling_class).with_type(ANNOTATION_TYPE)
    }

    /// Points this relationship at two saved entities.
    ///
    /// Fails with [`DataError::UnsavedPartner`] when either has no guid; the
    /// entity is left unchanged in that case.
    pub fn link(&mut self, one: &Entity, two: &Entity) -> Result<(), DataError> {
        let (Some(guid_one), Some(guid_two)) = (one.guid(), two.guid()) else {
            return Err(DataError::unsaved_partner(RELATIONSHIP_TYPE));
        };
        self.set(GUID_ONE, guid_one);
        self.set(GUID_TWO, guid_two);
        debug!("🔗 Linked {} -> {}", guid_one, guid_two);
        Ok(())
    }

    /// Attaches this annotation to a saved entity.
    pub fn annotate(&mut self, target: &Entity) -> Result<(), DataError> {
        let guid = target
            .guid()
            .ok_or_else(|| DataError::unsaved_partner(ANNOTATION_TYPE))?;
        self.set(ANNOTATING_GUID, guid);
        Ok(())
    }
}
