use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::FetchError;
use crate::models::*;

const USER_AGENT: &str = "ZkbReport/0.1 (maintainer: admin@example.com)";

/// HTTP adapter for the game-data API and the statistics API.
///
/// Cloning is cheap; clones share the connection pool and the response cache.
#[derive(Clone)]
pub struct KillboardClient {
    http: Client,
    config: Arc<Config>,
    cache: ResponseCache,
}

impl KillboardClient {
    pub fn new(config: Config, cache: ResponseCache) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .referer(false)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                e
            })?;

        Ok(Self {
            http,
            config: Arc::new(config),
            cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    // --- Game-data API ---

    pub fn object_url(&self, subject: &str, id: EntityId, suffix: Option<&str>) -> String {
        let suffix = suffix.map(|s| format!("{}/", s)).unwrap_or_default();
        format!(
            "{}/{}/{}/{}?datasource={}",
            self.config.game_data_api_base, subject, id, suffix, self.config.datasource
        )
    }

    fn universe_url(&self, endpoint: &str) -> String {
        format!(
            "{}/universe/{}/?datasource={}",
            self.config.game_data_api_base, endpoint, self.config.datasource
        )
    }

    /// Fetches `/{subject}/{id}/[{suffix}/]`, answering from the cache when the exact URL has
    /// been fetched before.
    pub async fn object(
        &self,
        subject: &str,
        id: EntityId,
        suffix: Option<&str>,
    ) -> Result<Value, FetchError> {
        let url = self.object_url(subject, id, suffix);
        if let Some(cached) = self.cache.get(&url) {
            return Ok(cached);
        }

        let (status, value) = self.fetch(&url, self.http.get(&url)).await?;
        if status.is_success() {
            self.cache.put(&url, &value);
        } else {
            debug!("Not caching {} response for {}", status, url);
        }
        Ok(value)
    }

    /// `POST /universe/names/`. Never cached.
    pub async fn names(&self, ids: &[EntityId]) -> Result<Vec<NameEntry>, FetchError> {
        let url = self.universe_url("names");
        let (_, value) = self.fetch(&url, self.http.post(&url).json(ids)).await?;
        decode(&url, value)
    }

    /// `POST /universe/ids/`. Never cached.
    pub async fn ids<S: Serialize>(&self, names: &[S]) -> Result<IdsResult, FetchError> {
        let url = self.universe_url("ids");
        let (_, value) = self.fetch(&url, self.http.post(&url).json(names)).await?;
        decode(&url, value)
    }

    // --- Statistics API ---

    pub async fn totals(&self, side: Side, area: Area, id: EntityId) -> Result<Totals, FetchError> {
        let url = format!(
            "{}/{}/{}/{}",
            self.config.statistics_api_base,
            side.as_str(),
            area.as_str(),
            id
        );
        let pair: (i64, Option<i64>) = self.get_statistics(&url).await?;
        Ok(pair.into())
    }

    pub async fn breakdown(
        &self,
        side: Side,
        area: Area,
        id: EntityId,
        kind: BreakdownKind,
    ) -> Result<Vec<CountRecord>, FetchError> {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.config.statistics_api_base,
            side.as_str(),
            area.as_str(),
            id,
            kind.as_str()
        );
        self.get_pairs(&url).await
    }

    /// Associates of `subject`/`id` grouped by `object`, e.g. the corporations flying with a
    /// character.
    pub async fn associates(
        &self,
        relation: Relation,
        object: Area,
        subject: Area,
        id: EntityId,
    ) -> Result<Vec<CountRecord>, FetchError> {
        let url = format!(
            "{}/{}/{}/for/{}/{}",
            self.config.statistics_api_base,
            relation.as_str(),
            object.as_str(),
            subject.as_str(),
            id
        );
        self.get_pairs(&url).await
    }

    pub async fn lost(
        &self,
        scope: LostScope,
        scope_id: EntityId,
        subject: Area,
        id: EntityId,
    ) -> Result<Vec<LostRow>, FetchError> {
        let url = format!(
            "{}/lost/{}/{}/{}/{}",
            self.config.statistics_api_base,
            scope.as_str(),
            scope_id,
            subject.as_str(),
            id
        );
        self.get_statistics(&url).await
    }

    async fn get_pairs(&self, url: &str) -> Result<Vec<CountRecord>, FetchError> {
        let pairs: Vec<(EntityId, i64)> = self.get_statistics(url).await?;
        Ok(pairs.into_iter().map(CountRecord::from).collect())
    }

    async fn get_statistics<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let (_, value) = self.fetch(url, self.http.get(url)).await?;
        decode(url, value)
    }

    // --- Transport ---

    async fn fetch(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<(StatusCode, Value), FetchError> {
        debug!("<- {}", url);
        let resp = request.send().await.map_err(|source| {
            error!("Failed to reach {}: {}", url, source);
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!("{} returned error status: {}", url, status);
            if self.config.strict_status {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                });
            }
        }

        let body = resp.text().await.map_err(|source| {
            error!("Failed to read body from {}: {}", url, source);
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let value = serde_json::from_str(&body).map_err(|source| {
            error!("Failed to parse JSON from {}: {}", url, source);
            FetchError::Decode {
                url: url.to_string(),
                source,
            }
        })?;

        Ok((status, value))
    }
}

fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|source| {
        error!("Unexpected JSON shape from {}: {}", url, source);
        FetchError::Shape {
            url: url.to_string(),
            source,
        }
    })
}
