use std::sync::Arc;

use anyhow::{anyhow, bail, Result};

use gacha_common::EnvVars;
use gacha_database::connect;
use gacha_runtime::store::{MemoryStore, PgStore, Store};
use gacha_runtime::{EngineConfig, GachaEngine, GachaId};
use gacha_sandbox::config::{load_catalog, sandbox_player, seed_balances};
use gacha_sandbox::tally::DrawnItemTally;

#[derive(Debug, Clone, Copy)]
enum Mode {
    Normal,
    Stepup,
    Box,
}

impl Mode {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "normal" => Ok(Mode::Normal),
            "stepup" => Ok(Mode::Stepup),
            "box" => Ok(Mode::Box),
            other => Err(anyhow!("unknown mode '{}', expected normal, stepup or box", other)),
        }
    }
}

async fn run<S: Store>(engine: &GachaEngine<S>, mode: Mode, gacha_id: GachaId, plays: usize) -> Result<()> {
    let player = sandbox_player();
    let mut tally = DrawnItemTally::default();

    for play in 0..plays {
        let drawn = match mode {
            Mode::Normal => engine.play_normal(player, gacha_id, 0).await.map(|p| p.items),
            Mode::Stepup => {
                let step = engine.step_status(player, gacha_id).await?.step;
                engine
                    .play_stepup(player, gacha_id, step)
                    .await
                    .map(|p| p.guaranteed.into_iter().chain(p.random).collect::<Vec<_>>())
            }
            Mode::Box => engine.play_box(player, gacha_id, 0).await.map(|p| p.items),
        };
        match drawn {
            Ok(items) => tally.record(&items),
            Err(e) => {
                tracing::warn!("[simulate] play {} stopped: {}", play + 1, e);
                break;
            }
        }
    }

    let mut collected = 0;
    loop {
        let drained = engine.receive_items(player, false).await?;
        collected += drained.emitted.len();
        if drained.remaining.is_empty() {
            break;
        }
    }

    println!("plays: {}, items drawn: {}, collected: {}", tally.plays(), tally.total(), collected);
    for (rarity, count) in tally.by_rarity() {
        println!("  rarity {}: {}", rarity, count);
    }
    let points = engine.gacha_points(player).await?;
    println!(
        "balances: frontier points {}, premium {}, trial {}",
        points.frontier_points, points.premium, points.trial
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("usage: simulate <normal|stepup|box> <gacha_id> [plays]");
    }
    let mode = Mode::parse(&args[1])?;
    let gacha_id: GachaId = args[2].parse()?;
    let plays: usize = match args.get(3) {
        Some(raw) => raw.parse()?,
        None => 10,
    };
    let config = EngineConfig::load()?;

    if std::env::var("DATABASE_URL").is_ok() {
        let pool = connect(false, true).await?;
        let engine = GachaEngine::new(PgStore::new(Arc::new(pool.clone())), config);
        run(&engine, mode, gacha_id, plays).await
    } else {
        tracing::info!("[simulate] DATABASE_URL not set, using the in-memory store");
        let store = MemoryStore::new();
        store.import_catalog(load_catalog()?).await;
        let player = sandbox_player();
        store.insert_player(player).await;
        for (balance, value) in seed_balances() {
            store.set_balance(player, balance, value).await?;
        }
        let engine = GachaEngine::new(store, config);
        run(&engine, mode, gacha_id, plays).await
    }
}
