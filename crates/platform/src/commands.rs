//! Commands run once the platform has booted.

use anyhow::Context;
use platform_data::{AttributeValue, DataContext, Entity, ObjectQuery, QueryDescriptor};
use platform_events::{EventSystem, EventSystemStats, FACTORY_NAMESPACE};
use platform_plugins::{PluginInfo, PluginManager};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// One entity to create, as read from a fixtures file.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    /// Colon-delimited type path, e.g. `obj:blog`
    #[serde(rename = "type")]
    pub type_path: String,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default)]
    pub created_ts: Option<i64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

fn default_class() -> String {
    platform_data::entity::GENERIC_CLASS.to_string()
}

impl Fixture {
    fn build(&self, data: &DataContext) -> anyhow::Result<Entity> {
        if !data.kinds().contains(&self.class) {
            anyhow::bail!("fixture uses unknown class {}", self.class);
        }
        let mut builder = Entity::builder(&self.class);
        for tag in self.type_path.split(':').filter(|tag| !tag.is_empty()) {
            builder = builder.with_type(tag);
        }
        if let Some(ts) = self.created_ts {
            builder = builder.created_at(ts);
        }
        for (name, value) in &self.attributes {
            builder = builder.attribute(name, value.clone());
        }
        Ok(builder.build())
    }
}

/// Output of the `check` command.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub plugins: Vec<PluginInfo>,
    pub stats: EventSystemStats,
    pub event_patterns: Vec<String>,
    pub factories: Vec<String>,
}

pub fn check(events: &EventSystem, plugins: &PluginManager) -> CheckReport {
    let event_patterns = events
        .event_patterns()
        .into_iter()
        .map(|(namespace, event)| format!("{namespace}:{event}"))
        .collect();
    let factories = events
        .hook_patterns()
        .into_iter()
        .filter(|(namespace, _)| namespace == FACTORY_NAMESPACE)
        .map(|(_, name)| name)
        .collect();

    CheckReport {
        plugins: plugins.plugins(),
        stats: events.get_stats(),
        event_patterns,
        factories,
    }
}

/// Output of the `query` command.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub saved: Vec<i64>,
    pub vetoed: usize,
    pub page: Value,
}

/// Saves every fixture, then runs the descriptor.
pub fn query(data: &DataContext, fixtures: &[Fixture], descriptor: QueryDescriptor) -> anyhow::Result<QueryReport> {
    let mut saved = Vec::with_capacity(fixtures.len());
    let mut vetoed = 0;

    for fixture in fixtures {
        let mut entity = fixture.build(data)?;
        match entity.save(data)? {
            Some(guid) => saved.push(guid),
            None => {
                warn!("🚫 Fixture of type {} was not saved", fixture.type_path);
                vetoed += 1;
            }
        }
    }
    debug!("📝 Saved {} fixture(s), {} vetoed", saved.len(), vetoed);

    let query = ObjectQuery::from(descriptor);
    let page = data.get_objects(&query)?;
    info!(
        "🔎 Query matched {} item(s) on page {}{}",
        page.len(),
        page.page,
        page.total_items.map(|total| format!(" of {total} total")).unwrap_or_default()
    );

    Ok(QueryReport {
        saved,
        vetoed,
        page: page.export(data)?,
    })
}

pub fn read_fixtures(path: &Path) -> anyhow::Result<Vec<Fixture>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading fixtures from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing fixtures in {}", path.display()))
}

pub fn read_descriptor(path: &Path) -> anyhow::Result<QueryDescriptor> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading query from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing query in {}", path.display()))
}
