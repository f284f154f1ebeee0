use std::sync::{Arc, Mutex};

use anyhow::Result;

use gacha_runtime::catalog::{CatalogSeed, Gacha, GachaEntry, GachaKind, RewardItem, SeedEntry};
use gacha_runtime::store::{MemoryStore, MemoryTable};
use gacha_runtime::{
    handle_request, Ack, AccountId, Balance, CharacterId, EngineConfig, FpointItem, GachaEngine, GachaError,
    GachaRequest, PendingItems, Player, Session, StoreError,
};

const PLAYER: Player = Player { account_id: 1, character_id: 100 };

const NORMAL: u32 = 1;
const BOX: u32 = 2;
const STEPUP: u32 = 3;

fn entry(id: u32, gacha_id: u32, entry_type: u8) -> GachaEntry {
    GachaEntry { id, gacha_id, entry_type, ..Default::default() }
}

fn cost(id: u32, gacha_id: u32, entry_type: u8, item_type: u8, amount: u16, rolls: u8) -> SeedEntry {
    SeedEntry {
        entry: GachaEntry { item_type, item_number: amount, rolls, ..entry(id, gacha_id, entry_type) },
        items: Vec::new(),
    }
}

fn pool(id: u32, gacha_id: u32, weight: f64, rarity: u8, item_id: u16) -> SeedEntry {
    SeedEntry {
        entry: GachaEntry { weight, rarity, ..entry(id, gacha_id, 100) },
        items: vec![RewardItem::new(7, item_id, 1)],
    }
}

fn catalog() -> CatalogSeed {
    let gacha = |id, kind: GachaKind| Gacha { id, name: format!("gacha {}", id), gacha_type: kind.code(), ..Default::default() };

    let mut first_step = cost(30, STEPUP, 0, 21, 10, 1);
    first_step.entry.frontier_points = 5;
    first_step.items = vec![RewardItem::new(9, 500, 1)];

    CatalogSeed {
        gachas: vec![
            gacha(NORMAL, GachaKind::Normal),
            gacha(BOX, GachaKind::Box),
            gacha(STEPUP, GachaKind::StepUp),
        ],
        entries: vec![
            cost(10, NORMAL, 0, 21, 10, 3),
            pool(11, NORMAL, 1.0, 3, 1100),
            pool(12, NORMAL, 3.0, 1, 1200),
            cost(20, BOX, 0, 19, 1, 1),
            pool(21, BOX, 1.0, 5, 2100),
            pool(22, BOX, 1.0, 5, 2200),
            pool(23, BOX, 1.0, 5, 2300),
            first_step,
            cost(31, STEPUP, 1, 21, 20, 2),
            pool(32, STEPUP, 1.0, 2, 3200),
        ],
        fpoint_items: vec![FpointItem { id: 1, item_type: 7, item_id: 900, quantity: 2, fpoints: 5, buyable: true }],
    }
}

async fn engine_with(frontier_points: i64) -> Result<GachaEngine<MemoryStore>> {
    let store = MemoryStore::new();
    store.import_catalog(catalog()).await;
    store.insert_player(PLAYER).await;
    store.set_balance(PLAYER, Balance::FrontierPoints, frontier_points).await?;
    store.set_balance(PLAYER, Balance::GachaTrial, 10).await?;
    Ok(GachaEngine::new(store, EngineConfig::seeded(7)))
}

async fn pending(engine: &GachaEngine<MemoryStore>) -> Result<PendingItems> {
    let buffer = engine.store().inventory_buffer(PLAYER.character_id).await?;
    Ok(match buffer {
        Some(bytes) => PendingItems::decode(&bytes)?,
        None => PendingItems::empty(),
    })
}

#[tokio::test]
async fn test_normal_play_debits_and_persists() -> Result<()> {
    let engine = engine_with(50).await?;

    let play = engine.play_normal(PLAYER, NORMAL, 0).await?;
    assert_eq!(play.items.len(), 3);
    assert!(play.items.iter().all(|d| (d.item.item_id == 1100 && d.rarity == 3) || (d.item.item_id == 1200 && d.rarity == 1)));
    assert_eq!(play.debit.map(|d| d.new_balance), Some(40));

    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 40);
    let stored = engine.store().inventory_buffer(PLAYER.character_id).await?.unwrap();
    assert_eq!(stored.len(), 16);
    assert_eq!(stored[0], 3);
    Ok(())
}

#[tokio::test]
async fn test_new_items_go_before_old_ones() -> Result<()> {
    let engine = engine_with(50).await?;
    let older = RewardItem::new(1, 1, 1);
    engine
        .store()
        .set_inventory_buffer(PLAYER.character_id, Some(PendingItems::new(vec![older])?.encode()))
        .await?;

    let play = engine.play_normal(PLAYER, NORMAL, 0).await?;
    let items = pending(&engine).await?;
    assert_eq!(items.len(), 4);
    assert_eq!(items.items()[3], older);
    let won: Vec<RewardItem> = play.items.iter().map(|d| d.item).collect();
    assert_eq!(&items.items()[..3], won.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_failed_append_rolls_back_debit() -> Result<()> {
    let engine = engine_with(50).await?;
    engine.store().fail_writes(MemoryTable::Inventory, true).await;

    let err = engine.play_normal(PLAYER, NORMAL, 0).await.unwrap_err();
    assert!(matches!(err, GachaError::Store(StoreError::Injected(_))));
    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 50);

    engine.store().fail_writes(MemoryTable::Inventory, false).await;
    engine.play_normal(PLAYER, NORMAL, 0).await?;
    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 40);
    Ok(())
}

#[tokio::test]
async fn test_inventory_overflow_rolls_back_debit() -> Result<()> {
    let engine = engine_with(50).await?;
    let full = PendingItems::new(vec![RewardItem::new(1, 1, 1); 254])?;
    engine.store().set_inventory_buffer(PLAYER.character_id, Some(full.encode())).await?;

    let err = engine.play_normal(PLAYER, NORMAL, 0).await.unwrap_err();
    assert!(matches!(err, GachaError::InventoryOverflow { count: 257 }));
    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 50);
    assert_eq!(pending(&engine).await?.len(), 254);
    Ok(())
}

#[tokio::test]
async fn test_unknown_roll_type_is_catalog_missing() -> Result<()> {
    let engine = engine_with(50).await?;
    let err = engine.play_normal(PLAYER, NORMAL, 5).await.unwrap_err();
    assert!(matches!(err, GachaError::CatalogMissing(_)));
    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 50);
    Ok(())
}

#[tokio::test]
async fn test_box_never_repeats_until_reset() -> Result<()> {
    let engine = engine_with(0).await?;

    let mut dealt = Vec::new();
    for _ in 0..3 {
        let play = engine.play_box(PLAYER, BOX, 0).await?;
        assert!(play.items.iter().all(|d| d.rarity == 0));
        dealt.extend(play.dealt);
    }
    dealt.sort();
    assert_eq!(dealt, vec![21, 22, 23]);
    assert_eq!(engine.store().balance(PLAYER, Balance::GachaTrial).await?, 7);

    let err = engine.play_box(PLAYER, BOX, 0).await.unwrap_err();
    assert!(matches!(err, GachaError::InsufficientPool { requested: 1, available: 0 }));
    assert_eq!(engine.store().balance(PLAYER, Balance::GachaTrial).await?, 7);

    let status = engine.box_status(PLAYER, BOX).await?;
    assert_eq!(status.len(), 3);
    assert!(status.iter().all(|s| s.exhausted));

    engine.reset_box(PLAYER, BOX).await?;
    assert!(engine.box_status(PLAYER, BOX).await?.is_empty());
    engine.play_box(PLAYER, BOX, 0).await?;
    assert_eq!(engine.store().box_rows(BOX, PLAYER.character_id).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_stepup_sequence() -> Result<()> {
    let engine = engine_with(100).await?;
    assert_eq!(engine.step_status(PLAYER, STEPUP).await?.step, 0);

    let first = engine.play_stepup(PLAYER, STEPUP, 0).await?;
    assert_eq!(first.next_step, 1);
    assert_eq!(first.guaranteed.len(), 1);
    assert_eq!(first.guaranteed[0].item, RewardItem::new(9, 500, 1));
    assert_eq!(first.guaranteed[0].rarity, 0);
    assert_eq!(first.random.len(), 1);
    assert_eq!(first.random[0].rarity, 2);
    // 100 - 10 cost + 5 bonus
    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 95);

    let items = pending(&engine).await?;
    assert_eq!(items.items()[0], RewardItem::new(9, 500, 1));
    assert_eq!(items.items()[1], RewardItem::new(7, 3200, 1));
    assert_eq!(engine.step_status(PLAYER, STEPUP).await?.step, 1);

    let second = engine.play_stepup(PLAYER, STEPUP, 1).await?;
    assert!(second.guaranteed.is_empty());
    assert_eq!(second.random.len(), 2);
    assert_eq!(engine.store().stepup_rows(STEPUP, PLAYER.character_id).await, vec![2]);

    // no entry for step 2: the sequence starts over
    assert_eq!(engine.step_status(PLAYER, STEPUP).await?.step, 0);
    assert!(engine.store().stepup_rows(STEPUP, PLAYER.character_id).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_exchange_and_gacha_points() -> Result<()> {
    let engine = engine_with(100).await?;

    // 3 lots of 2 units at 5 points each
    assert_eq!(engine.exchange_fpoint_to_item(PLAYER, 1, 3).await?, 70);
    // 5 units is two whole lots
    assert_eq!(engine.exchange_item_to_fpoint(PLAYER, 1, 5).await?, 80);

    engine.store().set_balance(PLAYER, Balance::GachaPremium, 40).await?;
    let points = engine.use_gacha_points(PLAYER, 4, 15).await?;
    assert_eq!((points.frontier_points, points.premium, points.trial), (80, 25, 6));

    assert_eq!(engine.acquire_exchange_shop(PLAYER, &[(77, 2), (0, 9), (77, 1)]).await?, 2);
    assert_eq!(engine.purchase_count(PLAYER, 77).await?, 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_plays_serialize() -> Result<()> {
    let engine = Arc::new(engine_with(100).await?);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.play_normal(PLAYER, NORMAL, 0).await }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 0);
    assert_eq!(pending(&engine).await?.len(), 30);
    Ok(())
}

struct RecordingSession {
    player: Player,
    acks: Mutex<Vec<(u32, Ack)>>,
}

impl RecordingSession {
    fn new(player: Player) -> Self {
        Self { player, acks: Mutex::new(Vec::new()) }
    }

    fn last(&self) -> (u32, Ack) {
        self.acks.lock().unwrap().last().cloned().unwrap()
    }
}

impl Session for RecordingSession {
    fn character_id(&self) -> CharacterId {
        self.player.character_id
    }

    fn account_id(&self) -> AccountId {
        self.player.account_id
    }

    fn queue_ack(&self, ack_handle: u32, ack: Ack) {
        self.acks.lock().unwrap().push((ack_handle, ack));
    }
}

#[tokio::test]
async fn test_session_play_then_receive() -> Result<()> {
    let engine = engine_with(50).await?;
    let session = RecordingSession::new(PLAYER);

    handle_request(&engine, &session, 11, GachaRequest::PlayNormalGacha { gacha_id: NORMAL, roll_type: 0 }).await;
    let (handle, ack) = session.last();
    assert_eq!(handle, 11);
    assert!(ack.is_success());
    assert_eq!(ack.payload().len(), 1 + 3 * 6);
    assert_eq!(ack.payload()[0], 3);

    handle_request(&engine, &session, 12, GachaRequest::ReceiveGachaItem { freeze: false }).await;
    let (_, ack) = session.last();
    assert_eq!(ack.payload().len(), 16);
    assert_eq!(engine.store().inventory_buffer(PLAYER.character_id).await?, None);

    handle_request(&engine, &session, 13, GachaRequest::GetGachaPoint).await;
    let (_, ack) = session.last();
    assert_eq!(&ack.payload()[0..4], &40u32.to_be_bytes());
    assert_eq!(&ack.payload()[8..12], &10u32.to_be_bytes());
    Ok(())
}

#[tokio::test]
async fn test_single_entry_pool_reply_matches_catalog() -> Result<()> {
    const SINGLE: u32 = 5;
    let store = MemoryStore::new();
    store
        .import_catalog(CatalogSeed {
            gachas: vec![Gacha { id: SINGLE, name: "single".into(), ..Default::default() }],
            entries: vec![
                cost(50, SINGLE, 0, 21, 10, 3),
                SeedEntry {
                    entry: GachaEntry { weight: 1.0, rarity: 4, ..entry(51, SINGLE, 100) },
                    items: vec![RewardItem::new(7, 5100, 2)],
                },
            ],
            fpoint_items: Vec::new(),
        })
        .await;
    store.insert_player(PLAYER).await;
    store.set_balance(PLAYER, Balance::FrontierPoints, 50).await?;
    let engine = GachaEngine::new(store, EngineConfig::seeded(11));
    let session = RecordingSession::new(PLAYER);

    handle_request(&engine, &session, 21, GachaRequest::PlayNormalGacha { gacha_id: SINGLE, roll_type: 0 }).await;
    let (handle, ack) = session.last();
    assert_eq!(handle, 21);

    let mut expected = vec![3u8];
    for _ in 0..3 {
        expected.extend_from_slice(&[7, 0x13, 0xEC, 0x00, 0x02, 4]);
    }
    assert_eq!(ack, Ack::Succeed(expected));
    assert_eq!(engine.store().balance(PLAYER, Balance::FrontierPoints).await?, 40);
    assert_eq!(pending(&engine).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_session_failures() -> Result<()> {
    let engine = engine_with(50).await?;
    let session = RecordingSession::new(PLAYER);

    handle_request(&engine, &session, 1, GachaRequest::PlayNormalGacha { gacha_id: 99, roll_type: 0 }).await;
    assert_eq!(session.last(), (1, Ack::Fail(vec![0; 4])));

    handle_request(&engine, &session, 2, GachaRequest::ExchangeFpoint2Item { trade_id: 42, quantity: 1 }).await;
    assert_eq!(session.last(), (2, Ack::Fail(vec![0; 4])));

    // an unknown character degrades to zero balances instead of failing
    let stranger = RecordingSession::new(Player::new(8, 800));
    handle_request(&engine, &stranger, 3, GachaRequest::GetGachaPoint).await;
    assert_eq!(stranger.last(), (3, Ack::Succeed(vec![0; 12])));

    handle_request(&engine, &session, 4, GachaRequest::GetStepupStatus { gacha_id: STEPUP }).await;
    let (_, ack) = session.last();
    assert!(ack.is_success());
    assert_eq!(ack.payload().len(), 5);
    assert_eq!(ack.payload()[0], 0);
    Ok(())
}

#[tokio::test]
async fn test_listing_hides_pool_entries() -> Result<()> {
    let engine = engine_with(0).await?;
    let listing = engine.listing(999, 999).await?;
    assert_eq!(listing.len(), 3);

    let stepup = listing.iter().find(|l| l.gacha.id == STEPUP).unwrap();
    assert_eq!(stepup.entries.len(), 2);
    assert_eq!(stepup.entries[0].items, vec![RewardItem::new(9, 500, 1)]);
    assert!(listing.iter().all(|l| l.entries.iter().all(|e| e.entry_type < 100)));
    Ok(())
}
