use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, UnitOfWork};
use crate::catalog::{CatalogSeed, Gacha, GachaEntry, RewardItem};
use crate::exchange::FpointItem;
use crate::ledger::{Balance, BalanceScope};
use crate::{AccountId, CharacterId, EntryId, GachaId, GachaResult, Player, StoreError};

/// Write targets that can be made to fail, to exercise rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryTable {
    Balances,
    Inventory,
    Stepup,
    Box,
    ShopPurchases,
}

impl MemoryTable {
    fn name(self) -> &'static str {
        match self {
            MemoryTable::Balances => "balances",
            MemoryTable::Inventory => "inventory",
            MemoryTable::Stepup => "gacha_stepup",
            MemoryTable::Box => "gacha_box",
            MemoryTable::ShopPurchases => "shop_items_bought",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CharacterRecord {
    account_id: AccountId,
    gacha_items: Option<Vec<u8>>,
    balances: HashMap<Balance, i64>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    gachas: BTreeMap<GachaId, Gacha>,
    entries: BTreeMap<EntryId, GachaEntry>,
    reward_items: HashMap<EntryId, Vec<RewardItem>>,
    fpoint_items: BTreeMap<u32, FpointItem>,

    accounts: HashMap<AccountId, HashMap<Balance, i64>>,
    characters: HashMap<CharacterId, CharacterRecord>,

    stepup: Vec<(GachaId, CharacterId, u8)>,
    boxes: Vec<(GachaId, CharacterId, EntryId)>,
    shop_bought: HashMap<(CharacterId, u32), u64>,

    failing: HashSet<MemoryTable>,
}

impl MemoryState {
    fn check_write(&self, table: MemoryTable) -> Result<(), StoreError> {
        if self.failing.contains(&table) {
            return Err(StoreError::Injected(table.name()));
        }
        Ok(())
    }

    fn character(&self, character_id: CharacterId) -> Result<&CharacterRecord, StoreError> {
        self.characters
            .get(&character_id)
            .ok_or(StoreError::UnknownOwner { table: "characters", id: character_id })
    }

    fn character_mut(&mut self, character_id: CharacterId) -> Result<&mut CharacterRecord, StoreError> {
        self.characters
            .get_mut(&character_id)
            .ok_or(StoreError::UnknownOwner { table: "characters", id: character_id })
    }

    fn balances_mut(&mut self, player: Player, balance: Balance) -> Result<&mut HashMap<Balance, i64>, StoreError> {
        match balance.scope() {
            BalanceScope::Account => self
                .accounts
                .get_mut(&player.account_id)
                .ok_or(StoreError::UnknownOwner { table: "users", id: player.account_id }),
            BalanceScope::Character => Ok(&mut self.character_mut(player.character_id)?.balances),
        }
    }

    fn balance(&self, player: Player, balance: Balance) -> Result<i64, StoreError> {
        let balances = match balance.scope() {
            BalanceScope::Account => self
                .accounts
                .get(&player.account_id)
                .ok_or(StoreError::UnknownOwner { table: "users", id: player.account_id })?,
            BalanceScope::Character => &self.character(player.character_id)?.balances,
        };
        Ok(balances.get(&balance).copied().unwrap_or(0))
    }

    fn import(&mut self, seed: CatalogSeed) {
        for gacha in seed.gachas {
            self.gachas.insert(gacha.id, gacha);
        }
        for seeded in seed.entries {
            self.reward_items.insert(seeded.entry.id, seeded.items);
            self.entries.insert(seeded.entry.id, seeded.entry);
        }
        for item in seed.fpoint_items {
            self.fpoint_items.insert(item.id, item);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn import_catalog(&self, seed: CatalogSeed) {
        self.state.lock().await.import(seed);
    }

    /// Creates the account and character rows if missing, all balances at zero.
    pub async fn insert_player(&self, player: Player) {
        let mut state = self.state.lock().await;
        state.accounts.entry(player.account_id).or_default();
        state
            .characters
            .entry(player.character_id)
            .or_insert_with(|| CharacterRecord { account_id: player.account_id, ..Default::default() });
    }

    pub async fn set_balance(&self, player: Player, balance: Balance, value: i64) -> GachaResult<()> {
        let mut state = self.state.lock().await;
        state.balances_mut(player, balance)?.insert(balance, value);
        Ok(())
    }

    pub async fn balance(&self, player: Player, balance: Balance) -> GachaResult<i64> {
        Ok(self.state.lock().await.balance(player, balance)?)
    }

    pub async fn inventory_buffer(&self, character_id: CharacterId) -> GachaResult<Option<Vec<u8>>> {
        Ok(self.state.lock().await.character(character_id)?.gacha_items.clone())
    }

    pub async fn set_inventory_buffer(&self, character_id: CharacterId, buffer: Option<Vec<u8>>) -> GachaResult<()> {
        self.state.lock().await.character_mut(character_id)?.gacha_items = buffer;
        Ok(())
    }

    /// Raw step-up rows of the pair, in insertion order.
    pub async fn stepup_rows(&self, gacha_id: GachaId, character_id: CharacterId) -> Vec<u8> {
        self.state
            .lock()
            .await
            .stepup
            .iter()
            .filter(|(g, c, _)| *g == gacha_id && *c == character_id)
            .map(|(_, _, step)| *step)
            .collect()
    }

    pub async fn box_rows(&self, gacha_id: GachaId, character_id: CharacterId) -> Vec<EntryId> {
        self.state
            .lock()
            .await
            .boxes
            .iter()
            .filter(|(g, c, _)| *g == gacha_id && *c == character_id)
            .map(|(_, _, entry)| *entry)
            .collect()
    }

    pub async fn fail_writes(&self, table: MemoryTable, failing: bool) {
        let mut state = self.state.lock().await;
        if failing {
            state.failing.insert(table);
        } else {
            state.failing.remove(&table);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> GachaResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard: Some(guard), staged }))
    }
}

pub struct MemoryUnitOfWork {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    staged: MemoryState,
}

impl MemoryUnitOfWork {
    fn state(&mut self) -> Result<&mut MemoryState, StoreError> {
        if self.guard.is_none() {
            return Err(StoreError::Finished);
        }
        Ok(&mut self.staged)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_scope(&mut self, _character_id: CharacterId, _gacha_id: GachaId) -> GachaResult<()> {
        // the store mutex is already held
        self.state()?;
        Ok(())
    }

    async fn lock_character(&mut self, _character_id: CharacterId) -> GachaResult<()> {
        self.state()?;
        Ok(())
    }

    async fn commit(&mut self) -> GachaResult<()> {
        let mut guard = self.guard.take().ok_or(StoreError::Finished)?;
        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }

    async fn rollback(&mut self) -> GachaResult<()> {
        self.guard.take().ok_or(StoreError::Finished)?;
        Ok(())
    }

    async fn gacha(&mut self, gacha_id: GachaId) -> GachaResult<Option<Gacha>> {
        Ok(self.state()?.gachas.get(&gacha_id).cloned())
    }

    async fn gachas(&mut self) -> GachaResult<Vec<Gacha>> {
        Ok(self.state()?.gachas.values().cloned().collect())
    }

    async fn entries(&mut self, gacha_id: GachaId) -> GachaResult<Vec<GachaEntry>> {
        let mut entries: Vec<GachaEntry> = self
            .state()?
            .entries
            .values()
            .filter(|e| e.gacha_id == gacha_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.entry_type, e.id));
        Ok(entries)
    }

    async fn entry_by_type(&mut self, gacha_id: GachaId, entry_type: u8) -> GachaResult<Option<GachaEntry>> {
        Ok(self
            .state()?
            .entries
            .values()
            .find(|e| e.gacha_id == gacha_id && e.entry_type == entry_type)
            .cloned())
    }

    async fn random_pool(&mut self, gacha_id: GachaId) -> GachaResult<Vec<GachaEntry>> {
        let mut pool: Vec<GachaEntry> = self
            .state()?
            .entries
            .values()
            .filter(|e| e.gacha_id == gacha_id && e.is_random_pool())
            .cloned()
            .collect();
        pool.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.id.cmp(&b.id)));
        Ok(pool)
    }

    async fn reward_items(&mut self, entry_id: EntryId) -> GachaResult<Vec<RewardItem>> {
        Ok(self.state()?.reward_items.get(&entry_id).cloned().unwrap_or_default())
    }

    async fn fpoint_item(&mut self, trade_id: u32) -> GachaResult<Option<FpointItem>> {
        Ok(self.state()?.fpoint_items.get(&trade_id).cloned())
    }

    async fn balance(&mut self, player: Player, balance: Balance) -> GachaResult<i64> {
        Ok(self.state()?.balance(player, balance)?)
    }

    async fn adjust_balance(&mut self, player: Player, balance: Balance, delta: i64) -> GachaResult<i64> {
        let state = self.state()?;
        state.check_write(MemoryTable::Balances)?;
        let slot = state.balances_mut(player, balance)?.entry(balance).or_insert(0);
        *slot += delta;
        Ok(*slot)
    }

    async fn inventory_buffer(&mut self, character_id: CharacterId) -> GachaResult<Option<Vec<u8>>> {
        Ok(self.state()?.character(character_id)?.gacha_items.clone())
    }

    async fn set_inventory_buffer(&mut self, character_id: CharacterId, buffer: Option<Vec<u8>>) -> GachaResult<()> {
        let state = self.state()?;
        state.check_write(MemoryTable::Inventory)?;
        state.character_mut(character_id)?.gacha_items = buffer;
        Ok(())
    }

    async fn stepup_step(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<Option<u8>> {
        Ok(self
            .state()?
            .stepup
            .iter()
            .find(|(g, c, _)| *g == gacha_id && *c == character_id)
            .map(|(_, _, step)| *step))
    }

    async fn delete_stepup(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<()> {
        let state = self.state()?;
        state.check_write(MemoryTable::Stepup)?;
        state.stepup.retain(|(g, c, _)| !(*g == gacha_id && *c == character_id));
        Ok(())
    }

    async fn insert_stepup(&mut self, gacha_id: GachaId, character_id: CharacterId, step: u8) -> GachaResult<()> {
        let state = self.state()?;
        state.check_write(MemoryTable::Stepup)?;
        state.stepup.push((gacha_id, character_id, step));
        Ok(())
    }

    async fn box_entries(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<Vec<EntryId>> {
        Ok(self
            .state()?
            .boxes
            .iter()
            .filter(|(g, c, _)| *g == gacha_id && *c == character_id)
            .map(|(_, _, entry)| *entry)
            .collect())
    }

    async fn insert_box_entry(&mut self, gacha_id: GachaId, character_id: CharacterId, entry_id: EntryId) -> GachaResult<()> {
        let state = self.state()?;
        state.check_write(MemoryTable::Box)?;
        state.boxes.push((gacha_id, character_id, entry_id));
        Ok(())
    }

    async fn delete_box_entries(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<()> {
        let state = self.state()?;
        state.check_write(MemoryTable::Box)?;
        state.boxes.retain(|(g, c, _)| !(*g == gacha_id && *c == character_id));
        Ok(())
    }

    async fn add_shop_purchase(&mut self, character_id: CharacterId, shop_item_id: u32, count: u32) -> GachaResult<()> {
        let state = self.state()?;
        state.check_write(MemoryTable::ShopPurchases)?;
        *state.shop_bought.entry((character_id, shop_item_id)).or_insert(0) += u64::from(count);
        Ok(())
    }

    async fn shop_purchase_count(&mut self, character_id: CharacterId, shop_item_id: u32) -> GachaResult<u64> {
        Ok(self
            .state()?
            .shop_bought
            .get(&(character_id, shop_item_id))
            .copied()
            .unwrap_or(0))
    }
}
