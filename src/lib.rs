//! Killboard reports for EVE Online: win/loss totals, ship and system breakdowns and
//! friendly/enemy associates, assembled from a statistics API and named through the game-data
//! API.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod names;
pub mod report;
pub mod server;
pub mod view;

pub use cache::{FileStorage, MemoryStorage, ResponseCache, Storage};
pub use client::KillboardClient;
pub use config::Config;
pub use error::{ConfigError, FetchError};
pub use report::Reporter;
