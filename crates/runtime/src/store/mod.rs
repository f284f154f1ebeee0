mod memory;
mod postgres;

pub use memory::{MemoryStore, MemoryTable};
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::catalog::{Gacha, GachaEntry, RewardItem};
use crate::exchange::FpointItem;
use crate::ledger::Balance;
use crate::{CharacterId, EntryId, GachaId, GachaResult, Player};

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> GachaResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// Serializes concurrent work for one (character, gacha) pair until the unit ends.
    async fn lock_scope(&mut self, character_id: CharacterId, gacha_id: GachaId) -> GachaResult<()>;
    /// Holds the character row until the unit ends. Taken before any balance is touched
    /// so every play acquires row locks in the same order.
    async fn lock_character(&mut self, character_id: CharacterId) -> GachaResult<()>;

    async fn commit(&mut self) -> GachaResult<()>;
    async fn rollback(&mut self) -> GachaResult<()>;

    // catalog
    async fn gacha(&mut self, gacha_id: GachaId) -> GachaResult<Option<Gacha>>;
    async fn gachas(&mut self) -> GachaResult<Vec<Gacha>>;
    /// All entries of a gacha ordered by `entry_type`, then id.
    async fn entries(&mut self, gacha_id: GachaId) -> GachaResult<Vec<GachaEntry>>;
    async fn entry_by_type(&mut self, gacha_id: GachaId, entry_type: u8) -> GachaResult<Option<GachaEntry>>;
    /// Random-pool entries ordered by descending weight, then id.
    async fn random_pool(&mut self, gacha_id: GachaId) -> GachaResult<Vec<GachaEntry>>;
    async fn reward_items(&mut self, entry_id: EntryId) -> GachaResult<Vec<RewardItem>>;
    async fn fpoint_item(&mut self, trade_id: u32) -> GachaResult<Option<FpointItem>>;

    // balances
    async fn balance(&mut self, player: Player, balance: Balance) -> GachaResult<i64>;
    /// Adds `delta` and returns the stored result.
    async fn adjust_balance(&mut self, player: Player, balance: Balance, delta: i64) -> GachaResult<i64>;

    // pending items
    async fn inventory_buffer(&mut self, character_id: CharacterId) -> GachaResult<Option<Vec<u8>>>;
    async fn set_inventory_buffer(&mut self, character_id: CharacterId, buffer: Option<Vec<u8>>) -> GachaResult<()>;

    // step-up
    async fn stepup_step(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<Option<u8>>;
    async fn delete_stepup(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<()>;
    async fn insert_stepup(&mut self, gacha_id: GachaId, character_id: CharacterId, step: u8) -> GachaResult<()>;

    // box
    async fn box_entries(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<Vec<EntryId>>;
    async fn insert_box_entry(&mut self, gacha_id: GachaId, character_id: CharacterId, entry_id: EntryId) -> GachaResult<()>;
    async fn delete_box_entries(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<()>;

    // exchange shop
    async fn add_shop_purchase(&mut self, character_id: CharacterId, shop_item_id: u32, count: u32) -> GachaResult<()>;
    async fn shop_purchase_count(&mut self, character_id: CharacterId, shop_item_id: u32) -> GachaResult<u64>;
}
