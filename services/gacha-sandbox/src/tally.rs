use std::collections::BTreeMap;

use gacha_runtime::catalog::DrawnItem;

/// Running counts over a simulation.
#[derive(Debug, Default)]
pub struct DrawnItemTally {
    plays: usize,
    by_rarity: BTreeMap<u8, usize>,
}

impl DrawnItemTally {
    pub fn record(&mut self, items: &[DrawnItem]) {
        self.plays += 1;
        for item in items {
            *self.by_rarity.entry(item.rarity).or_insert(0) += 1;
        }
    }

    pub fn plays(&self) -> usize {
        self.plays
    }

    pub fn total(&self) -> usize {
        self.by_rarity.values().sum()
    }

    pub fn by_rarity(&self) -> &BTreeMap<u8, usize> {
        &self.by_rarity
    }
}
