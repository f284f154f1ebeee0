mod entry;
mod gacha;
mod reward;

pub use entry::{GachaEntry, NAMED_ENTRY_TYPE_LIMIT, RANDOM_POOL_ENTRY_TYPE};
pub use gacha::{Gacha, GachaKind};
pub use reward::{DrawnItem, RewardItem};

use serde::{Deserialize, Serialize};

use crate::exchange::FpointItem;
use crate::store::UnitOfWork;
use crate::{CatalogRef, EntryId, GachaError, GachaId, GachaResult};

/// A catalog entry bundled with its reward rows, as stored in seed files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeedEntry {
    #[serde(flatten)]
    pub entry: GachaEntry,
    #[serde(default)]
    pub items: Vec<RewardItem>,
}

/// Reference data loaded into a store in one go.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub gachas: Vec<Gacha>,
    #[serde(default)]
    pub entries: Vec<SeedEntry>,
    #[serde(default)]
    pub fpoint_items: Vec<FpointItem>,
}

impl CatalogSeed {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListedEntry {
    pub entry_type: u8,
    pub item_type: u8,
    pub item_number: u16,
    pub item_quantity: u16,
    pub rolls: u8,
    pub frontier_points: i64,
    pub daily_limit: u16,
    pub name: Option<String>,
    pub items: Vec<RewardItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GachaListing {
    pub gacha: Gacha,
    pub entries: Vec<ListedEntry>,
}

pub struct RewardCatalog;

impl RewardCatalog {
    pub async fn gacha(uow: &mut dyn UnitOfWork, gacha_id: GachaId) -> GachaResult<Gacha> {
        uow.gacha(gacha_id)
            .await?
            .ok_or(GachaError::CatalogMissing(CatalogRef::Gacha(gacha_id)))
    }

    /// The roll selector a request pays for.
    pub async fn cost_entry(
        uow: &mut dyn UnitOfWork,
        gacha_id: GachaId,
        roll_type: u8,
    ) -> GachaResult<GachaEntry> {
        uow.entry_by_type(gacha_id, roll_type)
            .await?
            .ok_or(GachaError::CatalogMissing(CatalogRef::CostEntry {
                gacha_id,
                entry_type: roll_type,
            }))
    }

    pub async fn random_pool(uow: &mut dyn UnitOfWork, gacha_id: GachaId) -> GachaResult<Vec<GachaEntry>> {
        uow.random_pool(gacha_id).await
    }

    pub async fn items(uow: &mut dyn UnitOfWork, entry_id: EntryId) -> GachaResult<Vec<RewardItem>> {
        uow.reward_items(entry_id).await
    }

    /// Fixed rewards of the entry whose `entry_type` equals `roll_type`.
    /// A step without such an entry hands out nothing guaranteed.
    pub async fn guaranteed_items(
        uow: &mut dyn UnitOfWork,
        gacha_id: GachaId,
        roll_type: u8,
    ) -> GachaResult<Vec<RewardItem>> {
        match uow.entry_by_type(gacha_id, roll_type).await? {
            Some(entry) => uow.reward_items(entry.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Gachas a hunter of the given ranks may see, with their non-pool entries.
    pub async fn listing(uow: &mut dyn UnitOfWork, hr: u32, gr: u32) -> GachaResult<Vec<GachaListing>> {
        let mut listings = Vec::new();
        for gacha in uow.gachas().await? {
            if !gacha.is_visible_to(hr, gr) {
                continue;
            }

            let mut entries = Vec::new();
            for entry in uow.entries(gacha.id).await? {
                if entry.is_random_pool() {
                    continue;
                }
                let items = uow.reward_items(entry.id).await?;
                entries.push(ListedEntry {
                    entry_type: entry.entry_type,
                    item_type: entry.item_type,
                    item_number: entry.item_number,
                    item_quantity: entry.item_quantity,
                    rolls: entry.rolls,
                    frontier_points: entry.frontier_points,
                    daily_limit: entry.daily_limit,
                    name: entry.display_name().map(str::to_string),
                    items,
                });
            }
            listings.push(GachaListing { gacha, entries });
        }
        Ok(listings)
    }
}
