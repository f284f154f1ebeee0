use serde::{Deserialize, Serialize};

use crate::frame::{ByteFrame, ByteReader};

/// The unit a client ultimately receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RewardItem {
    pub item_type: u8,
    pub item_id: u16,
    pub quantity: u16,
}

impl RewardItem {
    pub const ENCODED_LEN: usize = 5;

    pub fn new(item_type: u8, item_id: u16, quantity: u16) -> Self {
        Self { item_type, item_id, quantity }
    }

    pub fn write_to(&self, frame: &mut ByteFrame) {
        frame
            .write_u8(self.item_type)
            .write_u16(self.item_id)
            .write_u16(self.quantity);
    }

    pub fn read_from(reader: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            item_type: reader.read_u8()?,
            item_id: reader.read_u16()?,
            quantity: reader.read_u16()?,
        })
    }
}

/// A reward together with the rarity the client shows for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawnItem {
    pub item: RewardItem,
    pub rarity: u8,
}

impl DrawnItem {
    pub fn write_to(&self, frame: &mut ByteFrame) {
        self.item.write_to(frame);
        frame.write_u8(self.rarity);
    }
}
