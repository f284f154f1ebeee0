use serde::{Deserialize, Serialize};

use crate::sampler::Weighted;
use crate::{EntryId, GachaId};

/// `entry_type` of the rows making up a gacha's random draw pool.
pub const RANDOM_POOL_ENTRY_TYPE: u8 = 100;
/// Entries below this type carry a display name in listings.
pub const NAMED_ENTRY_TYPE_LIMIT: u8 = 10;

/// One configured row of a gacha.
///
/// Rows with `entry_type < 100` are roll/step selectors: their `item_type` and
/// `item_number` name the currency and amount a roll costs and `rolls` how many draws
/// it buys. Rows with `entry_type == 100` form the weighted pool.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GachaEntry {
    pub id: EntryId,
    pub gacha_id: GachaId,
    pub entry_type: u8,
    #[serde(default)]
    pub item_type: u8,
    #[serde(default)]
    pub item_number: u16,
    #[serde(default)]
    pub item_quantity: u16,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub rarity: u8,
    #[serde(default)]
    pub rolls: u8,
    #[serde(default)]
    pub frontier_points: i64,
    #[serde(default)]
    pub daily_limit: u16,
    #[serde(default)]
    pub name: Option<String>,
}

impl GachaEntry {
    pub fn is_random_pool(&self) -> bool {
        self.entry_type == RANDOM_POOL_ENTRY_TYPE
    }

    pub fn is_progression(&self) -> bool {
        self.entry_type < RANDOM_POOL_ENTRY_TYPE
    }

    pub fn display_name(&self) -> Option<&str> {
        if self.entry_type < NAMED_ENTRY_TYPE_LIMIT {
            self.name.as_deref()
        } else {
            None
        }
    }
}

impl Weighted for GachaEntry {
    fn weight(&self) -> f64 {
        self.weight
    }
}
