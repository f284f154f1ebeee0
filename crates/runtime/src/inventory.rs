use crate::catalog::RewardItem;
use crate::frame::{ByteFrame, ByteReader};
use crate::store::UnitOfWork;
use crate::{CharacterId, GachaError, GachaResult};

pub const MAX_EMITTED_ITEMS: usize = 36;
pub const MAX_EMITTED_BYTES: usize = 1 + MAX_EMITTED_ITEMS * RewardItem::ENCODED_LEN;
/// The count prefix is a single byte.
pub const MAX_PENDING_ITEMS: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingItems {
    items: Vec<RewardItem>,
}

impl PendingItems {
    pub fn new(items: Vec<RewardItem>) -> GachaResult<Self> {
        if items.len() > MAX_PENDING_ITEMS {
            return Err(GachaError::InventoryOverflow { count: items.len() });
        }
        Ok(Self { items })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[RewardItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn encoded_len(&self) -> usize {
        1 + self.items.len() * RewardItem::ENCODED_LEN
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut frame = ByteFrame::with_capacity(self.encoded_len());
        // `new` keeps the count within a byte
        frame.write_u8(self.items.len() as u8);
        for item in &self.items {
            item.write_to(&mut frame);
        }
        frame.into_bytes()
    }

    /// An empty slice decodes to no items. Anything else must be exactly
    /// `1 + 5 * count` bytes long.
    pub fn decode(bytes: &[u8]) -> GachaResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::empty());
        }

        let corrupt = || GachaError::InventoryCorrupt { len: bytes.len() };
        let mut reader = ByteReader::new(bytes);
        let count = usize::from(reader.read_u8().ok_or_else(corrupt)?);
        if reader.remaining() != count * RewardItem::ENCODED_LEN {
            return Err(corrupt());
        }

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(RewardItem::read_from(&mut reader).ok_or_else(corrupt)?);
        }
        Ok(Self { items })
    }

    /// New items go in front of the ones already pending.
    pub fn prepend(&self, new_items: &[RewardItem]) -> GachaResult<Self> {
        let mut merged = Vec::with_capacity(new_items.len() + self.items.len());
        merged.extend_from_slice(new_items);
        merged.extend_from_slice(&self.items);
        Self::new(merged)
    }

    /// `(emitted, remaining)`: the first [`MAX_EMITTED_ITEMS`] and whatever is left.
    pub fn split_for_emission(&self) -> (Self, Self) {
        if self.items.len() <= MAX_EMITTED_ITEMS {
            return (self.clone(), Self::empty());
        }
        let (head, tail) = self.items.split_at(MAX_EMITTED_ITEMS);
        (Self { items: head.to_vec() }, Self { items: tail.to_vec() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    pub emitted: PendingItems,
    pub remaining: PendingItems,
}

pub struct InventoryAccumulator;

impl InventoryAccumulator {
    pub async fn load(uow: &mut dyn UnitOfWork, character_id: CharacterId) -> GachaResult<PendingItems> {
        match uow.inventory_buffer(character_id).await? {
            Some(buffer) => PendingItems::decode(&buffer),
            None => Ok(PendingItems::empty()),
        }
    }

    async fn store(uow: &mut dyn UnitOfWork, character_id: CharacterId, items: &PendingItems) -> GachaResult<()> {
        let buffer = if items.is_empty() { None } else { Some(items.encode()) };
        uow.set_inventory_buffer(character_id, buffer).await
    }

    pub async fn append(
        uow: &mut dyn UnitOfWork,
        character_id: CharacterId,
        new_items: &[RewardItem],
    ) -> GachaResult<PendingItems> {
        let merged = Self::load(uow, character_id).await?.prepend(new_items)?;
        Self::store(uow, character_id, &merged).await?;
        tracing::debug!(
            "[InventoryAccumulator::append] character {}: +{} items, {} pending",
            character_id, new_items.len(), merged.len()
        );
        Ok(merged)
    }

    /// Hands out up to [`MAX_EMITTED_ITEMS`]. A frozen drain leaves the stored buffer
    /// untouched, so it keeps returning the same items.
    pub async fn drain(uow: &mut dyn UnitOfWork, character_id: CharacterId, freeze: bool) -> GachaResult<Drained> {
        let pending = Self::load(uow, character_id).await?;
        let (emitted, remaining) = pending.split_for_emission();
        if !freeze {
            Self::store(uow, character_id, &remaining).await?;
        }
        Ok(Drained { emitted, remaining })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use crate::Player;

    const PLAYER: Player = Player { account_id: 3, character_id: 30 };

    fn items(count: usize) -> Vec<RewardItem> {
        (0..count)
            .map(|i| RewardItem::new((i % 7) as u8, 1000 + i as u16, 1 + (i % 3) as u16))
            .collect()
    }

    #[test]
    fn test_round_trip_sizes() {
        for count in [0, 1, 36, 40] {
            let pending = PendingItems::new(items(count)).unwrap();
            let encoded = pending.encode();
            assert_eq!(encoded.len(), 1 + 5 * count);
            assert_eq!(encoded[0] as usize, count);
            assert_eq!(PendingItems::decode(&encoded).unwrap(), pending);
        }
    }

    #[test]
    fn test_item_layout() {
        let pending = PendingItems::new(vec![RewardItem::new(7, 0x1234, 0x0002)]).unwrap();
        assert_eq!(pending.encode(), vec![1, 7, 0x12, 0x34, 0x00, 0x02]);
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        assert!(matches!(
            PendingItems::decode(&[2, 1, 0, 1, 0, 1]),
            Err(GachaError::InventoryCorrupt { len: 6 })
        ));
        assert!(PendingItems::decode(&[0, 9]).is_err());
        assert!(PendingItems::decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_prepend_puts_new_items_first() {
        let old = PendingItems::new(vec![RewardItem::new(1, 1, 1)]).unwrap();
        let merged = old.prepend(&[RewardItem::new(2, 2, 2), RewardItem::new(3, 3, 3)]).unwrap();
        assert_eq!(
            merged.items(),
            &[RewardItem::new(2, 2, 2), RewardItem::new(3, 3, 3), RewardItem::new(1, 1, 1)]
        );
    }

    #[test]
    fn test_prepend_past_count_byte_fails() {
        let old = PendingItems::new(items(250)).unwrap();
        assert!(matches!(
            old.prepend(&items(6)),
            Err(GachaError::InventoryOverflow { count: 256 })
        ));
    }

    #[test]
    fn test_split_caps_at_181_bytes() {
        let pending = PendingItems::new(items(40)).unwrap();
        let (emitted, remaining) = pending.split_for_emission();
        assert_eq!(emitted.encode().len(), MAX_EMITTED_BYTES);
        assert_eq!(emitted.items(), &pending.items()[..36]);
        assert_eq!(remaining.items(), &pending.items()[36..]);
    }

    #[tokio::test]
    async fn test_overflowing_drain_continues_on_next_retrieval() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.insert_player(PLAYER).await;
        let won = items(40);

        let mut uow = store.begin().await?;
        InventoryAccumulator::append(&mut *uow, PLAYER.character_id, &won).await?;
        uow.commit().await?;
        assert_eq!(store.inventory_buffer(PLAYER.character_id).await?.map(|b| b.len()), Some(201));

        let mut uow = store.begin().await?;
        let first = InventoryAccumulator::drain(&mut *uow, PLAYER.character_id, false).await?;
        uow.commit().await?;
        assert_eq!(first.emitted.encode().len(), 181);
        assert_eq!(first.emitted.items(), &won[..36]);
        let stored = store.inventory_buffer(PLAYER.character_id).await?.unwrap();
        assert_eq!(PendingItems::decode(&stored)?.items(), &won[36..]);

        let mut uow = store.begin().await?;
        let second = InventoryAccumulator::drain(&mut *uow, PLAYER.character_id, false).await?;
        uow.commit().await?;
        assert_eq!(second.emitted.items(), &won[36..]);
        assert!(second.remaining.is_empty());
        assert_eq!(store.inventory_buffer(PLAYER.character_id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_frozen_drain_never_writes() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.insert_player(PLAYER).await;
        let seeded = PendingItems::new(items(40))?.encode();
        store.set_inventory_buffer(PLAYER.character_id, Some(seeded.clone())).await?;

        for _ in 0..2 {
            let mut uow = store.begin().await?;
            let drained = InventoryAccumulator::drain(&mut *uow, PLAYER.character_id, true).await?;
            uow.commit().await?;
            assert_eq!(drained.emitted.len(), 36);
            assert_eq!(store.inventory_buffer(PLAYER.character_id).await?, Some(seeded.clone()));
        }
        Ok(())
    }
}
