//! Capability traits concrete domain types compose against.

use super::Entity;
use crate::context::DataContext;
use crate::error::DataError;
use crate::Guid;
use serde_json::{Map, Value};
use tracing::debug;

/// Renders a named view. Returns `None` when the view does not exist.
pub trait ViewRenderer {
    fn view(&self, name: &str, vars: &Map<String, Value>) -> Option<String>;
}

/// Something that can draw itself through the first view that exists.
pub trait Viewable {
    /// View names to try, most specific first.
    fn view_names(&self) -> Vec<String>;

    /// Variable the exported data is bound to.
    fn view_variable(&self) -> &'static str;

    fn view_data(&self, ctx: &DataContext) -> Result<Value, DataError>;

    fn draw(&self, ctx: &DataContext, renderer: &dyn ViewRenderer) -> Result<Option<String>, DataError> {
        let mut vars = Map::new();
        vars.insert(self.view_variable().to_string(), self.view_data(ctx)?);

        for name in self.view_names() {
            if let Some(output) = renderer.view(&name, &vars) {
                debug!("🎯 Rendered view {}", name);
                return Ok(Some(output));
            }
        }
        Ok(None)
    }
}

/// Something stored through an [`Entity`].
///
/// Domain types wrap an entity and get the lifecycle for free.
pub trait Persistable {
    fn entity(&self) -> &Entity;

    fn entity_mut(&mut self) -> &mut Entity;

    fn guid(&self) -> Option<Guid> {
        self.entity().guid()
    }

    fn save(&mut self, ctx: &DataContext) -> Result<Option<Guid>, DataError> {
        self.entity_mut().save(ctx)
    }

    fn delete(&mut self, ctx: &DataContext) -> Result<bool, DataError> {
        self.entity_mut().delete(ctx)
    }
}

impl Persistable for Entity {
    fn entity(&self) -> &Entity {
        self
    }

    fn entity_mut(&mut self) -> &mut Entity {
        self
    }
}

impl Viewable for Entity {
    fn view_names(&self) -> Vec<String> {
        vec![
            format!("data/items/{}", self.handling_class().to_lowercase()),
            "data/items/__default".to_string(),
        ]
    }

    fn view_variable(&self) -> &'static str {
        "item"
    }

    fn view_data(&self, ctx: &DataContext) -> Result<Value, DataError> {
        self.export(ctx)
    }
}
