// Hosted backend: PostgREST-style JSON endpoints over reqwest.
//
// `nba_players` is the catalog, `user_rankings` holds the slots, and
// `rpc/get_collective_rankings` computes the consensus server-side. There is
// no transaction across requests, so `replace_all` is the default two-call
// delete-then-insert and can leave a user's persisted ranking empty.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CatalogError, StoreError};
use crate::model::{CollectiveRankingRow, Player, PlayerId, RankingSlot, UserId};
use crate::store::{Aggregator, Catalog, RankingStore};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const PLAYERS: &str = "nba_players";
const RANKINGS: &str = "user_rankings";
const COLLECTIVE_RPC: &str = "rpc/get_collective_rankings";
const PLAYER_COLUMNS: &str = "id,name,team,position,image_url";
const SLOT_COLUMNS: &str = "user_id,player_id,rank_position";

// ---------------------------------------------------------------------------
// HostedBackend
// ---------------------------------------------------------------------------

pub struct HostedBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl HostedBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    /// Build from config. Returns `None` unless both the URL and the API key
    /// are present.
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.hosted.url.as_deref()?;
        let key = config.credentials.api_key.as_deref().filter(|k| !k.is_empty())?;
        Some(Self::new(url, key))
    }

    /// Authenticate row access as the signed-in user. Without a token
    /// requests go out under the anonymous key.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.http
            .request(method, format!("{}/{path}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub(crate) fn search_request(&self, query: &str, limit: usize) -> RequestBuilder {
        let mut params = vec![
            ("select", PLAYER_COLUMNS.to_string()),
            ("order", "name.asc".to_string()),
            ("limit", limit.to_string()),
        ];
        let needle = filter_literal(query);
        if !needle.is_empty() {
            params.push((
                "or",
                format!("(name.ilike.*{needle}*,team.ilike.*{needle}*,position.ilike.*{needle}*)"),
            ));
        }
        self.request(Method::GET, PLAYERS).query(&params)
    }

    pub(crate) fn lookup_request(&self, ids: &[PlayerId]) -> RequestBuilder {
        let list = ids
            .iter()
            .map(|id| format!("\"{}\"", id.as_str().replace('"', "")))
            .collect::<Vec<_>>()
            .join(",");
        self.request(Method::GET, PLAYERS)
            .query(&[("select", PLAYER_COLUMNS.to_string()), ("id", format!("in.({list})"))])
    }

    pub(crate) fn read_request(&self, user_id: &UserId) -> RequestBuilder {
        self.request(Method::GET, RANKINGS).query(&[
            ("select", SLOT_COLUMNS.to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "rank_position.asc".to_string()),
        ])
    }

    pub(crate) fn delete_request(&self, user_id: &UserId) -> RequestBuilder {
        self.request(Method::DELETE, RANKINGS)
            .query(&[("user_id", format!("eq.{user_id}"))])
    }

    pub(crate) fn insert_request(&self, slots: &[RankingSlot]) -> RequestBuilder {
        self.request(Method::POST, RANKINGS)
            .header("Prefer", "return=minimal")
            .json(slots)
    }

    pub(crate) fn all_slots_request(&self) -> RequestBuilder {
        self.request(Method::GET, RANKINGS).query(&[
            ("select", SLOT_COLUMNS.to_string()),
            ("order", "created_at.asc".to_string()),
        ])
    }

    pub(crate) fn collective_request(&self) -> RequestBuilder {
        self.request(Method::POST, COLLECTIVE_RPC)
            .json(&serde_json::json!({}))
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// A request that did not produce a 2xx response.
#[derive(Debug)]
enum Failure {
    Http(reqwest::Error),
    Status { status: u16, message: String },
}

impl From<Failure> for StoreError {
    fn from(f: Failure) -> Self {
        match f {
            Failure::Http(e) => StoreError::Http(e),
            Failure::Status { status: 409, message } => StoreError::Constraint(message),
            Failure::Status { status, message } => StoreError::Rejected { status, message },
        }
    }
}

impl From<Failure> for CatalogError {
    fn from(f: Failure) -> Self {
        match f {
            Failure::Http(e) => CatalogError::Http(e),
            Failure::Status { status, message } => CatalogError::Rejected { status, message },
        }
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, Failure> {
    let response = builder.send().await.map_err(Failure::Http)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| status.to_string());
    warn!(status = status.as_u16(), %message, "Hosted backend rejected request");
    Err(Failure::Status {
        status: status.as_u16(),
        message,
    })
}

async fn fetch<T: serde::de::DeserializeOwned>(builder: RequestBuilder) -> Result<T, Failure> {
    send(builder).await?.json().await.map_err(Failure::Http)
}

/// Pull `message` out of a PostgREST error body.
fn error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("message")?.as_str().map(str::to_string)
}

/// Strip characters that carry meaning inside a PostgREST filter.
fn filter_literal(query: &str) -> String {
    query
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect()
}

/// One row of `get_collective_rankings`: the consensus joined with display
/// columns.
#[derive(Debug, Deserialize)]
struct RpcRow {
    id: PlayerId,
    name: Option<String>,
    team: Option<String>,
    position: Option<String>,
    image_url: Option<String>,
    avg_rank: f64,
    vote_count: u32,
    collective_rank: u32,
}

impl From<RpcRow> for CollectiveRankingRow {
    fn from(row: RpcRow) -> Self {
        let player = row.name.map(|name| Player {
            id: row.id.clone(),
            name,
            team: row.team,
            position: row.position,
            image_url: row.image_url,
        });
        CollectiveRankingRow {
            player_id: row.id,
            avg_rank: row.avg_rank,
            vote_count: row.vote_count,
            collective_rank: row.collective_rank,
            player,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

#[async_trait]
impl Catalog for HostedBackend {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>, CatalogError> {
        Ok(fetch(self.search_request(query, limit)).await?)
    }

    async fn lookup(&self, ids: &[PlayerId]) -> Result<Vec<Player>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(fetch(self.lookup_request(ids)).await?)
    }
}

#[async_trait]
impl RankingStore for HostedBackend {
    async fn read_all(&self, user_id: &UserId) -> Result<Vec<RankingSlot>, StoreError> {
        Ok(fetch(self.read_request(user_id)).await?)
    }

    async fn delete_all(&self, user_id: &UserId) -> Result<(), StoreError> {
        send(self.delete_request(user_id)).await?;
        Ok(())
    }

    async fn insert_many(&self, slots: &[RankingSlot]) -> Result<(), StoreError> {
        send(self.insert_request(slots)).await?;
        debug!(rows = slots.len(), "Inserted ranking rows");
        Ok(())
    }
}

#[async_trait]
impl Aggregator for HostedBackend {
    async fn collective_rankings(&self, limit: usize) -> Result<Vec<CollectiveRankingRow>, StoreError> {
        let rows: Vec<RpcRow> = fetch(self.collective_request()).await?;
        let mut rows: Vec<CollectiveRankingRow> = rows.into_iter().map(Into::into).collect();
        rows.sort_by_key(|r| r.collective_rank);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn all_slots(&self) -> Result<Vec<RankingSlot>, StoreError> {
        Ok(fetch(self.all_slots_request()).await?)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
