use anyhow::{Context, Result};

use gacha_common::env_or;
use gacha_runtime::catalog::CatalogSeed;
use gacha_runtime::{Balance, Player};

pub const DEFAULT_CATALOG_PATH: &str = "services/gacha-sandbox/catalog.json";

pub fn sandbox_player() -> Player {
    Player::new(1, 1)
}

/// Starting balances of the sandbox player.
pub fn seed_balances() -> Vec<(Balance, i64)> {
    vec![
        (Balance::FrontierPoints, 1_000),
        (Balance::GachaPremium, 100),
        (Balance::GachaTrial, 30),
        (Balance::NetcafePoints, 500),
    ]
}

/// Reads the catalog named by `GACHA_CATALOG_PATH`, or the bundled one.
pub fn load_catalog() -> Result<CatalogSeed> {
    let path: String = env_or("GACHA_CATALOG_PATH", DEFAULT_CATALOG_PATH.to_string())?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("failed to read catalog {}", path))?;
    CatalogSeed::from_json(&raw).with_context(|| format!("failed to parse catalog {}", path))
}
