mod players;

pub use players::{load_catalog, sandbox_player, seed_balances, DEFAULT_CATALOG_PATH};
