//! Entities: a type hierarchy plus an attribute bag, stored across the
//! entities and metadata tables.

mod core;
mod hooks;
mod kinds;
mod lifecycle;
mod relation;
mod value;
mod view;

pub use self::core::{Entity, EntityBuilder, EntityState};
pub use self::kinds::{EntityKinds, GENERIC_CLASS};
pub use self::relation::{ANNOTATING_GUID, ANNOTATION_TYPE, GUID_ONE, GUID_TWO, RELATIONSHIP_TYPE};
pub use self::value::AttributeValue;
pub use self::view::{Persistable, ViewRenderer, Viewable};
