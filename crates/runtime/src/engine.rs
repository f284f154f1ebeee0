use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;

use gacha_common::get_adjusted_timestamp;

use crate::box_gacha::{BoxEntryStatus, BoxTracker};
use crate::catalog::{DrawnItem, GachaEntry, GachaListing, RewardCatalog, RewardItem};
use crate::config::EngineConfig;
use crate::exchange::ExchangeLedger;
use crate::inventory::{Drained, InventoryAccumulator};
use crate::ledger::{Balance, CurrencyKind, CurrencyLedger, Debit, GachaPoints};
use crate::sampler::WeightedSampler;
use crate::stepup::StepupTracker;
use crate::store::{Store, UnitOfWork};
use crate::{EntryId, GachaId, GachaResult, Player};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalPlay {
    pub items: Vec<DrawnItem>,
    pub debit: Option<Debit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepupPlay {
    pub guaranteed: Vec<DrawnItem>,
    pub random: Vec<DrawnItem>,
    pub next_step: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlay {
    pub items: Vec<DrawnItem>,
    pub dealt: Vec<EntryId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepStatus {
    pub step: u8,
    pub server_time: u32,
}

/// Reward rows fetched once per entry within a play.
#[derive(Default)]
struct ItemCache {
    items: HashMap<EntryId, Vec<RewardItem>>,
}

impl ItemCache {
    async fn resolve(
        &mut self,
        uow: &mut dyn UnitOfWork,
        entry: &GachaEntry,
        rarity: u8,
        out: &mut Vec<DrawnItem>,
    ) -> GachaResult<()> {
        if !self.items.contains_key(&entry.id) {
            let items = RewardCatalog::items(uow, entry.id).await?;
            self.items.insert(entry.id, items);
        }
        if let Some(items) = self.items.get(&entry.id) {
            out.extend(items.iter().map(|&item| DrawnItem { item, rarity }));
        }
        Ok(())
    }
}

fn plain_items(drawn: &[DrawnItem]) -> Vec<RewardItem> {
    drawn.iter().map(|d| d.item).collect()
}

pub struct GachaEngine<S: Store> {
    store: S,
    config: EngineConfig,
    rng: Mutex<StdRng>,
}

impl<S: Store> GachaEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self { store, config, rng: Mutex::new(rng) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    fn draw_weighted(&self, pool: &[GachaEntry], rolls: u8) -> GachaResult<Vec<GachaEntry>> {
        if rolls == 0 {
            return Ok(Vec::new());
        }
        self.with_rng(|rng| WeightedSampler::draw_with_replacement(pool, usize::from(rolls), rng))
    }

    async fn begin_scoped(&self, player: Player, gacha_id: GachaId) -> GachaResult<Box<dyn UnitOfWork>> {
        let mut uow = self.store.begin().await?;
        uow.lock_scope(player.character_id, gacha_id).await?;
        uow.lock_character(player.character_id).await?;
        Ok(uow)
    }

    /// Pays the roll selector `roll_type` and draws its `rolls` from the weighted pool.
    pub async fn play_normal(&self, player: Player, gacha_id: GachaId, roll_type: u8) -> GachaResult<NormalPlay> {
        let mut uow = self.begin_scoped(player, gacha_id).await?;
        let uow_ref = &mut *uow;

        RewardCatalog::gacha(uow_ref, gacha_id).await?;
        let cost = RewardCatalog::cost_entry(uow_ref, gacha_id, roll_type).await?;
        let debit = CurrencyLedger::pay_entry_cost(uow_ref, player, &cost).await?;

        let pool = RewardCatalog::random_pool(uow_ref, gacha_id).await?;
        let drawn = self.draw_weighted(&pool, cost.rolls)?;

        let mut cache = ItemCache::default();
        let mut items = Vec::new();
        for entry in &drawn {
            cache.resolve(uow_ref, entry, entry.rarity, &mut items).await?;
        }
        InventoryAccumulator::append(uow_ref, player.character_id, &plain_items(&items)).await?;

        uow.commit().await?;
        tracing::info!(
            "[GachaEngine::play_normal] character {} gacha {} roll {}: {} entries, {} items",
            player.character_id, gacha_id, roll_type, drawn.len(), items.len()
        );
        Ok(NormalPlay { items, debit })
    }

    /// Plays step `step`: pays it, credits its frontier-point bonus, advances the
    /// sequence and hands out the step's fixed rewards ahead of the random draws.
    pub async fn play_stepup(&self, player: Player, gacha_id: GachaId, step: u8) -> GachaResult<StepupPlay> {
        let mut uow = self.begin_scoped(player, gacha_id).await?;
        let uow_ref = &mut *uow;

        RewardCatalog::gacha(uow_ref, gacha_id).await?;
        let cost = RewardCatalog::cost_entry(uow_ref, gacha_id, step).await?;
        CurrencyLedger::pay_entry_cost(uow_ref, player, &cost).await?;
        if cost.frontier_points != 0 {
            CurrencyLedger::credit(uow_ref, player, CurrencyKind::FrontierPoints, cost.frontier_points).await?;
        }
        let next_step = StepupTracker::advance(uow_ref, gacha_id, player.character_id, step).await?;

        let pool = RewardCatalog::random_pool(uow_ref, gacha_id).await?;
        let drawn = self.draw_weighted(&pool, cost.rolls)?;

        let mut cache = ItemCache::default();
        let mut random = Vec::new();
        for entry in &drawn {
            cache.resolve(uow_ref, entry, entry.rarity, &mut random).await?;
        }
        let guaranteed: Vec<DrawnItem> = RewardCatalog::guaranteed_items(uow_ref, gacha_id, step)
            .await?
            .into_iter()
            .map(|item| DrawnItem { item, rarity: 0 })
            .collect();

        let mut won = plain_items(&guaranteed);
        won.extend(random.iter().map(|d| d.item));
        InventoryAccumulator::append(uow_ref, player.character_id, &won).await?;

        uow.commit().await?;
        tracing::info!(
            "[GachaEngine::play_stepup] character {} gacha {} step {} -> {}: {} guaranteed, {} random",
            player.character_id, gacha_id, step, next_step, guaranteed.len(), random.len()
        );
        Ok(StepupPlay { guaranteed, random, next_step })
    }

    /// Draws from the entries this character has not been dealt yet, uniformly and
    /// without repeats.
    pub async fn play_box(&self, player: Player, gacha_id: GachaId, roll_type: u8) -> GachaResult<BoxPlay> {
        let mut uow = self.begin_scoped(player, gacha_id).await?;
        let uow_ref = &mut *uow;

        RewardCatalog::gacha(uow_ref, gacha_id).await?;
        let cost = RewardCatalog::cost_entry(uow_ref, gacha_id, roll_type).await?;
        CurrencyLedger::pay_entry_cost(uow_ref, player, &cost).await?;

        let dealt = BoxTracker::dealt_entries(uow_ref, gacha_id, player.character_id).await?;
        let available: Vec<GachaEntry> = RewardCatalog::random_pool(uow_ref, gacha_id)
            .await?
            .into_iter()
            .filter(|entry| !dealt.contains(&entry.id))
            .collect();
        let drawn = self.with_rng(|rng| {
            WeightedSampler::draw_without_replacement(&available, usize::from(cost.rolls), rng)
        })?;

        let mut cache = ItemCache::default();
        let mut items = Vec::new();
        for entry in &drawn {
            BoxTracker::mark_dealt(uow_ref, gacha_id, player.character_id, entry.id).await?;
            cache.resolve(uow_ref, entry, 0, &mut items).await?;
        }
        InventoryAccumulator::append(uow_ref, player.character_id, &plain_items(&items)).await?;

        uow.commit().await?;
        tracing::info!(
            "[GachaEngine::play_box] character {} gacha {}: dealt {} of {} remaining",
            player.character_id, gacha_id, drawn.len(), available.len()
        );
        Ok(BoxPlay { items, dealt: drawn.iter().map(|e| e.id).collect() })
    }

    pub async fn box_status(&self, player: Player, gacha_id: GachaId) -> GachaResult<Vec<BoxEntryStatus>> {
        let mut uow = self.store.begin().await?;
        let status = BoxTracker::status(&mut *uow, gacha_id, player.character_id).await?;
        uow.commit().await?;
        Ok(status)
    }

    pub async fn reset_box(&self, player: Player, gacha_id: GachaId) -> GachaResult<()> {
        let mut uow = self.begin_scoped(player, gacha_id).await?;
        BoxTracker::reset(&mut *uow, gacha_id, player.character_id).await?;
        uow.commit().await
    }

    /// Current step (a stale step is reset here) and the server clock. Steps never
    /// reset on a timer.
    pub async fn step_status(&self, player: Player, gacha_id: GachaId) -> GachaResult<StepStatus> {
        let mut uow = self.begin_scoped(player, gacha_id).await?;
        let step = StepupTracker::current_step(&mut *uow, gacha_id, player.character_id).await?;
        uow.commit().await?;
        Ok(StepStatus {
            step,
            server_time: self.server_time(),
        })
    }

    pub fn server_time(&self) -> u32 {
        get_adjusted_timestamp(self.config.server_time_offset_secs)
    }

    pub async fn receive_items(&self, player: Player, freeze: bool) -> GachaResult<Drained> {
        let mut uow = self.store.begin().await?;
        let drained = InventoryAccumulator::drain(&mut *uow, player.character_id, freeze).await?;
        uow.commit().await?;
        tracing::debug!(
            "[GachaEngine::receive_items] character {}: {} emitted, {} left, freeze {}",
            player.character_id, drained.emitted.len(), drained.remaining.len(), freeze
        );
        Ok(drained)
    }

    pub async fn gacha_points(&self, player: Player) -> GachaResult<GachaPoints> {
        let mut uow = self.store.begin().await?;
        let points = CurrencyLedger::gacha_points(&mut *uow, player).await?;
        uow.commit().await?;
        Ok(points)
    }

    /// Spends coins the client already settled: each amount leaves its own balance.
    pub async fn use_gacha_points(&self, player: Player, trial: u32, premium: u32) -> GachaResult<GachaPoints> {
        let mut uow = self.store.begin().await?;
        let uow_ref = &mut *uow;
        CurrencyLedger::debit_balance(uow_ref, player, Balance::GachaTrial, i64::from(trial)).await?;
        CurrencyLedger::debit_balance(uow_ref, player, Balance::GachaPremium, i64::from(premium)).await?;
        let points = CurrencyLedger::gacha_points(uow_ref, player).await?;
        uow.commit().await?;
        Ok(points)
    }

    pub async fn exchange_fpoint_to_item(&self, player: Player, trade_id: u32, lots: u16) -> GachaResult<i64> {
        let mut uow = self.store.begin().await?;
        let balance = ExchangeLedger::fpoint_to_item(&mut *uow, player, trade_id, lots).await?;
        uow.commit().await?;
        Ok(balance)
    }

    pub async fn exchange_item_to_fpoint(&self, player: Player, trade_id: u32, quantity: u16) -> GachaResult<i64> {
        let mut uow = self.store.begin().await?;
        let balance = ExchangeLedger::item_to_fpoint(&mut *uow, player, trade_id, quantity).await?;
        uow.commit().await?;
        Ok(balance)
    }

    pub async fn acquire_exchange_shop(&self, player: Player, purchases: &[(u32, u32)]) -> GachaResult<usize> {
        let mut uow = self.store.begin().await?;
        let recorded = ExchangeLedger::record_purchases(&mut *uow, player.character_id, purchases).await?;
        uow.commit().await?;
        Ok(recorded)
    }

    pub async fn purchase_count(&self, player: Player, shop_item_id: u32) -> GachaResult<u64> {
        let mut uow = self.store.begin().await?;
        let count = ExchangeLedger::purchase_count(&mut *uow, player.character_id, shop_item_id).await?;
        uow.commit().await?;
        Ok(count)
    }

    pub async fn listing(&self, hr: u32, gr: u32) -> GachaResult<Vec<GachaListing>> {
        let mut uow = self.store.begin().await?;
        let listing = RewardCatalog::listing(&mut *uow, hr, gr).await?;
        uow.commit().await?;
        Ok(listing)
    }
}
