#![allow(dead_code)]

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::Value;
use std::sync::Arc;

use zkb_report::{Config, KillboardClient, MemoryStorage, ResponseCache};

pub fn config_for(server: &ServerGuard) -> Config {
    let url = server.url();
    Config::new(format!("{}/api", url), url)
}

pub fn client_for(server: &ServerGuard) -> KillboardClient {
    KillboardClient::new(config_for(server), ResponseCache::in_memory()).unwrap()
}

pub fn strict_client_for(server: &ServerGuard) -> KillboardClient {
    let mut config = config_for(server);
    config.strict_status = true;
    KillboardClient::new(config, ResponseCache::in_memory()).unwrap()
}

pub fn client_with_storage(server: &ServerGuard, storage: Arc<MemoryStorage>) -> KillboardClient {
    KillboardClient::new(config_for(server), ResponseCache::new(storage)).unwrap()
}

fn datasource() -> Matcher {
    Matcher::UrlEncoded("datasource".into(), "tranquility".into())
}

/// Mock a statistics endpoint such as `/api/wins/character/1`
pub async fn mock_statistics(
    server: &mut ServerGuard,
    path: &str,
    body: Value,
    expected_requests: usize,
) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(expected_requests)
        .create_async()
        .await
}

/// Mock a cached game-data object endpoint such as `/characters/1/`
pub async fn mock_object(
    server: &mut ServerGuard,
    path: &str,
    status: usize,
    body: Value,
    expected_requests: usize,
) -> Mock {
    server
        .mock("GET", path)
        .match_query(datasource())
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(expected_requests)
        .create_async()
        .await
}

/// Mock `/universe/names/` answering `ids` with the given `(id, name)` pairs
pub async fn mock_names(
    server: &mut ServerGuard,
    ids: Value,
    names: &[(i32, &str)],
    expected_requests: usize,
) -> Mock {
    let body: Vec<Value> = names
        .iter()
        .map(|(id, name)| serde_json::json!({"id": id, "name": name, "category": "inventory_type"}))
        .collect();
    server
        .mock("POST", "/universe/names/")
        .match_query(datasource())
        .match_body(Matcher::Json(ids))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(Value::Array(body).to_string())
        .expect(expected_requests)
        .create_async()
        .await
}
