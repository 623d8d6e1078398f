use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use artifacts_bot_core::agent::{
    ActionError, ActionReport, ApiFuture, FightDetail, GameClient, SkillDetail, TaskReward,
};
use artifacts_bot_core::player::{CharacterSnapshot, ItemStack, Slot, TaskState};
use artifacts_bot_core::world::{CatalogSource, Item, MapTile, Monster, Resource};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config_loader::ApiConfig;
use crate::wire::{
    self, ActionWire, CharacterWire, DataEnvelope, EquipBody, ErrorEnvelope, ItemBody, ItemWire,
    MapWire, MonsterWire, MoveBody, Page, ResourceWire, ServerStatus, UnequipBody,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps a non-success status and its error message onto the typed action errors.
///
/// A 499 whose message carries no duration yields a zero `remaining`; the caller resolves it
/// from the character's cooldown expiration.
pub fn error_for_status(status: u16, message: &str) -> ActionError {
    match status {
        499 => ActionError::InCooldown {
            remaining: wire::cooldown_from_message(message).unwrap_or(Duration::ZERO),
        },
        461 => ActionError::TransactionInProgress,
        486 => ActionError::ActionInProgress,
        490 => ActionError::AlreadyAtDestination,
        478 => ActionError::MissingItem,
        492 => ActionError::InsufficientGold,
        497 => ActionError::InventoryFull,
        496 => ActionError::CharacterLevelInsufficient,
        493 => ActionError::NotSkillLevelRequired,
        489 => ActionError::AlreadyHasTask,
        404 => ActionError::NotFound {
            entity: "entity",
            code: message.to_string(),
        },
        498 => ActionError::NotFound {
            entity: "character",
            code: message.to_string(),
        },
        598 => ActionError::NotFound {
            entity: "map content",
            code: message.to_string(),
        },
        other => ActionError::Transport(format!("http {other}: {message}")),
    }
}

fn transport(err: reqwest::Error) -> ActionError {
    ActionError::Transport(err.to_string())
}

/// ArtifactsMMO REST client. Serves both the per-character actions and the catalog listings.
pub struct HttpGameClient {
    http: Client,
    base_url: String,
    token: String,
    page_size: u32,
}

impl HttpGameClient {
    pub fn new(cfg: &ApiConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
            page_size: cfg.page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ActionError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        tracing::debug!(status = status.as_u16(), %message, "http.error_status");
        Err(error_for_status(status.as_u16(), &message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ActionError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ActionError::Transport(format!("decode: {e}")))
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ActionError> {
        let response = self.send(self.http.get(self.url(path))).await?;
        Ok(Self::decode::<DataEnvelope<T>>(response).await?.data)
    }

    /// Follows `page` until the server reports the last one.
    async fn get_paged<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ActionError> {
        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let request = self
                .http
                .get(self.url(path))
                .query(&[("page", page), ("size", self.page_size)]);
            let body: Page<T> = Self::decode(self.send(request).await?).await?;
            let last = body.is_last() || body.data.is_empty();
            out.extend(body.data);
            if last {
                return Ok(out);
            }
            page += 1;
        }
    }

    /// Server health and announcements from the API root.
    pub async fn server_status(&self) -> Result<ServerStatus, ActionError> {
        self.get_data("").await
    }

    async fn fetch_character(&self, name: &str) -> Result<CharacterSnapshot, ActionError> {
        let wire: CharacterWire = self.get_data(&format!("characters/{name}")).await?;
        Ok(wire.into())
    }

    async fn action<B: Serialize + ?Sized>(
        &self,
        name: &str,
        action: &str,
        body: Option<&B>,
    ) -> Result<ActionWire, ActionError> {
        let mut request = self.http.post(self.url(&format!("my/{name}/action/{action}")));
        if let Some(body) = body {
            request = request.json(body);
        }
        match self.send(request).await {
            Ok(response) => Ok(Self::decode::<DataEnvelope<ActionWire>>(response).await?.data),
            Err(ActionError::InCooldown { remaining }) if remaining.is_zero() => {
                let character = self.fetch_character(name).await?;
                Err(ActionError::InCooldown {
                    remaining: character
                        .cooldown_remaining(Utc::now())
                        .max(Duration::from_secs(1)),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn plain_action<B: Serialize + ?Sized>(
        &self,
        name: &str,
        action: &str,
        body: Option<&B>,
    ) -> Result<ActionReport<()>, ActionError> {
        let wire = self.action(name, action, body).await?;
        Ok(report(wire, ()))
    }
}

fn report<T>(wire: ActionWire, detail: T) -> ActionReport<T> {
    ActionReport {
        cooldown: wire.cooldown.remaining(),
        character: wire.character.into(),
        detail,
    }
}

fn missing(part: &str) -> ActionError {
    ActionError::Transport(format!("action response without {part}"))
}

impl GameClient for HttpGameClient {
    fn characters<'a>(&'a self) -> ApiFuture<'a, Vec<CharacterSnapshot>> {
        Box::pin(async move {
            let list: Vec<CharacterWire> = self.get_data("my/characters").await?;
            Ok(list.into_iter().map(CharacterSnapshot::from).collect())
        })
    }

    fn character<'a>(&'a self, name: &'a str) -> ApiFuture<'a, CharacterSnapshot> {
        Box::pin(self.fetch_character(name))
    }

    fn bank_items<'a>(&'a self) -> ApiFuture<'a, Vec<ItemStack>> {
        Box::pin(self.get_paged("my/bank/items"))
    }

    fn move_to<'a>(&'a self, name: &'a str, x: i32, y: i32) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.plain_action(name, "move", Some(&MoveBody { x, y }))
                .await
        })
    }

    fn fight<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<FightDetail>> {
        Box::pin(async move {
            let mut wire = self.action::<()>(name, "fight", None).await?;
            let fight = wire.fight.take().ok_or_else(|| missing("fight"))?;
            Ok(report(wire, fight.into()))
        })
    }

    fn gather<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<SkillDetail>> {
        Box::pin(async move {
            let mut wire = self.action::<()>(name, "gathering", None).await?;
            let details = wire.details.take().unwrap_or_default();
            Ok(report(wire, details.into()))
        })
    }

    fn craft<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<SkillDetail>> {
        Box::pin(async move {
            let body = ItemBody { code, quantity };
            let mut wire = self.action(name, "crafting", Some(&body)).await?;
            let details = wire.details.take().unwrap_or_default();
            Ok(report(wire, details.into()))
        })
    }

    fn deposit_item<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.plain_action(name, "bank/deposit", Some(&ItemBody { code, quantity }))
                .await
        })
    }

    fn withdraw_item<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.plain_action(name, "bank/withdraw", Some(&ItemBody { code, quantity }))
                .await
        })
    }

    fn accept_task<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<TaskState>> {
        Box::pin(async move {
            let mut wire = self.action::<()>(name, "task/new", None).await?;
            let task = wire.task.take().ok_or_else(|| missing("task"))?;
            Ok(report(wire, task.into()))
        })
    }

    fn complete_task<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<TaskReward>> {
        Box::pin(async move {
            let mut wire = self.action::<()>(name, "task/complete", None).await?;
            let reward = wire.reward.take().ok_or_else(|| missing("reward"))?;
            Ok(report(wire, wire::task_reward(reward)))
        })
    }

    fn equip<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        slot: Slot,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            let body = EquipBody {
                code,
                slot: slot.name(),
            };
            self.plain_action(name, "equip", Some(&body)).await
        })
    }

    fn unequip<'a>(
        &'a self,
        name: &'a str,
        _code: &'a str,
        slot: Slot,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            let body = UnequipBody { slot: slot.name() };
            self.plain_action(name, "unequip", Some(&body)).await
        })
    }
}

type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<Vec<T>>> + Send + 'a>>;

impl CatalogSource for HttpGameClient {
    fn list_maps<'a>(&'a self) -> CatalogFuture<'a, MapTile> {
        Box::pin(async move {
            let maps: Vec<MapWire> = self.get_paged("maps").await?;
            Ok(maps.into_iter().map(MapTile::from).collect())
        })
    }

    fn list_items<'a>(&'a self) -> CatalogFuture<'a, Item> {
        Box::pin(async move {
            let items: Vec<ItemWire> = self.get_paged("items").await?;
            Ok(items.into_iter().map(Item::from).collect())
        })
    }

    fn list_monsters<'a>(&'a self) -> CatalogFuture<'a, Monster> {
        Box::pin(async move {
            let monsters: Vec<MonsterWire> = self.get_paged("monsters").await?;
            Ok(monsters.into_iter().map(Monster::from).collect())
        })
    }

    fn list_resources<'a>(&'a self) -> CatalogFuture<'a, Resource> {
        Box::pin(async move {
            let listed: Vec<ResourceWire> = self.get_paged("resources").await?;
            let total = listed.len();
            let resources: Vec<Resource> = listed
                .into_iter()
                .filter_map(ResourceWire::into_resource)
                .collect();
            if resources.len() < total {
                tracing::debug!(
                    skipped = total - resources.len(),
                    "catalog.resources_unknown_skill"
                );
            }
            Ok(resources)
        })
    }
}
