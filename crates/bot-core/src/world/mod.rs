pub mod catalog;
pub mod entities;

pub use catalog::{CatalogSource, WorldCatalog};
pub use entities::{
    ContentType, Drop, Effect, Item, MapContent, MapTile, Monster, Recipe, Resource,
};
