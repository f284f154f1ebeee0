use std::sync::Arc;

use anyhow::Result;

use gacha_database::connect;
use gacha_runtime::store::PgStore;
use gacha_sandbox::config::{load_catalog, sandbox_player, seed_balances};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pool = connect(false, true).await?;
    let store = PgStore::new(Arc::new(pool.clone()));

    let catalog = load_catalog()?;
    store.import_catalog(&catalog).await?;

    let player = sandbox_player();
    store.seed_player(player).await?;
    for (balance, value) in seed_balances() {
        store.set_balance(player, balance, value).await?;
    }

    println!("Database initialized successfully");
    Ok(())
}
