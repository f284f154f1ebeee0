use std::sync::Arc;

use anyhow::Result;

use gacha_common::EnvVars;
use gacha_database::{connect_with, DatabaseEnv};
use gacha_runtime::catalog::{CatalogSeed, Gacha, GachaEntry, GachaKind, RewardItem, SeedEntry};
use gacha_runtime::store::{PgStore, Store, UnitOfWork};
use gacha_runtime::{Balance, EngineConfig, GachaEngine, GachaError, PendingItems, Player};

const GACHA: u32 = 90_201;
const FP_NORMAL: u32 = 90_202;
const NETCAFE_STEPUP: u32 = 90_203;

/// Connects and seeds a fresh player with 100 frontier points. Each test uses its own
/// player so tests can run in parallel.
async fn pg_store(player: Player) -> Result<Option<PgStore>> {
    dotenv::dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        println!("Skipping database test - no DATABASE_URL set");
        return Ok(None);
    }

    let env = DatabaseEnv::load()?;
    let pool = connect_with(&env, false, true).await?;
    let store = PgStore::new(Arc::new(pool));

    store
        .import_catalog(&CatalogSeed {
            gachas: vec![
                Gacha { id: GACHA, name: "pg box".into(), gacha_type: GachaKind::Box.code(), ..Default::default() },
                Gacha { id: FP_NORMAL, name: "pg normal".into(), ..Default::default() },
                Gacha { id: NETCAFE_STEPUP, name: "pg stepup".into(), gacha_type: GachaKind::StepUp.code(), ..Default::default() },
            ],
            entries: vec![
                SeedEntry {
                    entry: GachaEntry { id: 90_301, gacha_id: GACHA, entry_type: 0, item_type: 21, item_number: 10, rolls: 2, ..Default::default() },
                    items: Vec::new(),
                },
                SeedEntry {
                    entry: GachaEntry { id: 90_302, gacha_id: GACHA, entry_type: 100, weight: 1.0, ..Default::default() },
                    items: vec![RewardItem::new(7, 302, 1)],
                },
                SeedEntry {
                    entry: GachaEntry { id: 90_303, gacha_id: GACHA, entry_type: 100, weight: 2.0, ..Default::default() },
                    items: vec![RewardItem::new(7, 303, 2), RewardItem::new(8, 303, 1)],
                },
                SeedEntry {
                    entry: GachaEntry { id: 90_311, gacha_id: FP_NORMAL, entry_type: 0, item_type: 21, item_number: 1, rolls: 1, ..Default::default() },
                    items: Vec::new(),
                },
                SeedEntry {
                    entry: GachaEntry { id: 90_312, gacha_id: FP_NORMAL, entry_type: 100, weight: 1.0, ..Default::default() },
                    items: vec![RewardItem::new(7, 312, 1)],
                },
                SeedEntry {
                    entry: GachaEntry {
                        id: 90_321,
                        gacha_id: NETCAFE_STEPUP,
                        entry_type: 0,
                        item_type: 17,
                        item_number: 1,
                        rolls: 1,
                        frontier_points: 1,
                        ..Default::default()
                    },
                    items: Vec::new(),
                },
                SeedEntry {
                    entry: GachaEntry { id: 90_322, gacha_id: NETCAFE_STEPUP, entry_type: 100, weight: 1.0, ..Default::default() },
                    items: vec![RewardItem::new(7, 322, 1)],
                },
            ],
            fpoint_items: Vec::new(),
        })
        .await?;
    store.seed_player(player).await?;
    store.set_balance(player, Balance::FrontierPoints, 100).await?;

    let mut uow = store.begin().await?;
    uow.set_inventory_buffer(player.character_id, None).await?;
    uow.delete_box_entries(GACHA, player.character_id).await?;
    uow.commit().await?;
    Ok(Some(store))
}

#[tokio::test]
async fn test_pg_box_play_round_trip() -> Result<()> {
    const PLAYER: Player = Player { account_id: 90_001, character_id: 90_101 };
    let Some(store) = pg_store(PLAYER).await? else {
        return Ok(());
    };
    let engine = GachaEngine::new(store.clone(), EngineConfig::seeded(3));

    let play = engine.play_box(PLAYER, GACHA, 0).await?;
    assert_eq!(play.dealt.len(), 2);
    assert_eq!(play.items.len(), 3);

    let mut uow = store.begin().await?;
    assert_eq!(uow.balance(PLAYER, Balance::FrontierPoints).await?, 90);
    let buffer = uow.inventory_buffer(PLAYER.character_id).await?.unwrap();
    assert_eq!(PendingItems::decode(&buffer)?.len(), 3);
    uow.rollback().await?;

    let err = engine.play_box(PLAYER, GACHA, 0).await.unwrap_err();
    assert!(matches!(err, GachaError::InsufficientPool { requested: 2, available: 0 }));

    let mut uow = store.begin().await?;
    assert_eq!(uow.balance(PLAYER, Balance::FrontierPoints).await?, 90);
    uow.rollback().await?;
    Ok(())
}

#[tokio::test]
async fn test_pg_dropped_unit_of_work_rolls_back() -> Result<()> {
    const PLAYER: Player = Player { account_id: 90_002, character_id: 90_102 };
    let Some(store) = pg_store(PLAYER).await? else {
        return Ok(());
    };

    {
        let mut uow = store.begin().await?;
        uow.adjust_balance(PLAYER, Balance::FrontierPoints, -50).await?;
    }

    let mut uow = store.begin().await?;
    assert_eq!(uow.balance(PLAYER, Balance::FrontierPoints).await?, 100);
    uow.commit().await?;
    assert!(uow.commit().await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_mixed_currency_plays_do_not_deadlock() -> Result<()> {
    const PLAYER: Player = Player { account_id: 90_003, character_id: 90_103 };
    let Some(store) = pg_store(PLAYER).await? else {
        return Ok(());
    };
    store.set_balance(PLAYER, Balance::NetcafePoints, 100).await?;
    let engine = Arc::new(GachaEngine::new(store.clone(), EngineConfig::seeded(5)));

    // netcafe debit plus frontier bonus on one side, frontier debit on the other
    let mut handles = Vec::new();
    for _ in 0..10 {
        let stepup = engine.clone();
        handles.push(tokio::spawn(async move { stepup.play_stepup(PLAYER, NETCAFE_STEPUP, 0).await.map(|_| ()) }));
        let normal = engine.clone();
        handles.push(tokio::spawn(async move { normal.play_normal(PLAYER, FP_NORMAL, 0).await.map(|_| ()) }));
    }
    for handle in handles {
        handle.await??;
    }

    let mut uow = store.begin().await?;
    assert_eq!(uow.balance(PLAYER, Balance::NetcafePoints).await?, 90);
    assert_eq!(uow.balance(PLAYER, Balance::FrontierPoints).await?, 100);
    let buffer = uow.inventory_buffer(PLAYER.character_id).await?.unwrap();
    assert_eq!(PendingItems::decode(&buffer)?.len(), 20);
    uow.rollback().await?;
    Ok(())
}
