use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use anyhow::Context;

use crate::agent::game_api::ActionError;
use crate::player::Position;
use crate::world::entities::{ContentType, Item, MapTile, Monster, Resource};

/// Read-only reference data provider. Pagination is the provider's business; every call returns
/// the complete list.
pub trait CatalogSource: Send + Sync {
    fn list_maps<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<MapTile>>> + Send + 'a>>;

    fn list_items<'a>(&'a self)
    -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Item>>> + Send + 'a>>;

    fn list_monsters<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Monster>>> + Send + 'a>>;

    fn list_resources<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Resource>>> + Send + 'a>>;
}

/// Static game data, loaded once at startup and shared read-only by every worker.
#[derive(Debug, Default)]
pub struct WorldCatalog {
    maps: Vec<MapTile>,
    items: HashMap<String, Item>,
    monsters: HashMap<String, Monster>,
    resources: HashMap<String, Resource>,
}

impl WorldCatalog {
    pub fn new(
        maps: Vec<MapTile>,
        items: Vec<Item>,
        monsters: Vec<Monster>,
        resources: Vec<Resource>,
    ) -> Self {
        Self {
            maps,
            items: items.into_iter().map(|i| (i.code.clone(), i)).collect(),
            monsters: monsters.into_iter().map(|m| (m.code.clone(), m)).collect(),
            resources: resources.into_iter().map(|r| (r.code.clone(), r)).collect(),
        }
    }

    /// Fetches all four lists and checks the fixed landmarks every worker depends on.
    pub async fn load(source: &dyn CatalogSource) -> anyhow::Result<Self> {
        let maps = source.list_maps().await.context("load maps")?;
        let items = source.list_items().await.context("load items")?;
        let monsters = source.list_monsters().await.context("load monsters")?;
        let resources = source.list_resources().await.context("load resources")?;

        let catalog = Self::new(maps, items, monsters, resources);
        catalog.validate()?;
        tracing::info!(
            maps = catalog.maps.len(),
            items = catalog.items.len(),
            monsters = catalog.monsters.len(),
            resources = catalog.resources.len(),
            "catalog.loaded"
        );
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ActionError> {
        for landmark in [ContentType::TasksMaster, ContentType::Bank] {
            if !self.maps.iter().any(|t| {
                t.content
                    .as_ref()
                    .is_some_and(|c| c.content_type == landmark)
            }) {
                return Err(ActionError::NotFound {
                    entity: "map",
                    code: landmark.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn maps(&self) -> &[MapTile] {
        &self.maps
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn item(&self, code: &str) -> Option<&Item> {
        self.items.get(code)
    }

    pub fn monster(&self, code: &str) -> Option<&Monster> {
        self.monsters.get(code)
    }

    pub fn resource(&self, code: &str) -> Option<&Resource> {
        self.resources.get(code)
    }

    /// Closest tile holding the given content. `code = None` matches any code of that type.
    pub fn nearest(
        &self,
        content_type: ContentType,
        code: Option<&str>,
        from: Position,
    ) -> Option<&MapTile> {
        self.maps
            .iter()
            .filter(|t| {
                t.content.as_ref().is_some_and(|c| {
                    c.content_type == content_type && code.is_none_or(|code| c.code == code)
                })
            })
            .min_by_key(|t| (t.position.manhattan(&from), t.position.x, t.position.y))
    }

    /// Lowest-level resource whose drop table contains `item_code`.
    pub fn resource_dropping(&self, item_code: &str) -> Option<&Resource> {
        self.resources
            .values()
            .filter(|r| r.drops.iter().any(|d| d.code == item_code))
            .min_by(|a, b| a.level.cmp(&b.level).then_with(|| a.code.cmp(&b.code)))
    }

    /// Monsters whose drop table contains `item_code`, lowest level first.
    pub fn monsters_dropping(&self, item_code: &str) -> Vec<&Monster> {
        let mut found: Vec<&Monster> = self
            .monsters
            .values()
            .filter(|m| m.drops.iter().any(|d| d.code == item_code))
            .collect();
        found.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.code.cmp(&b.code)));
        found
    }
}
