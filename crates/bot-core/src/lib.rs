//! Core of a headless ArtifactsMMO bot: static world data, character state, crafting and
//! combat math, and the per-character workers that drive the game through [`agent::GameClient`].
//!
//! Nothing here performs I/O directly. The runner crate supplies the HTTP client.

pub mod agent;
pub mod combat;
pub mod craft;
pub mod player;
pub mod world;
