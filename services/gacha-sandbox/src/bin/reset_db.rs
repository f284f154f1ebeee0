use anyhow::Result;

use gacha_database::{connect, drop_tables};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pool = connect(false, false).await?;
    drop_tables(pool).await?;

    println!("Database reset successfully");
    Ok(())
}
