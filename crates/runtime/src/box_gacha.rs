use crate::store::UnitOfWork;
use crate::{CharacterId, EntryId, GachaId, GachaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxEntryStatus {
    pub entry_id: EntryId,
    pub exhausted: bool,
}

/// Entries a character has already pulled out of a box gacha.
pub struct BoxTracker;

impl BoxTracker {
    pub async fn dealt_entries(
        uow: &mut dyn UnitOfWork,
        gacha_id: GachaId,
        character_id: CharacterId,
    ) -> GachaResult<Vec<EntryId>> {
        uow.box_entries(gacha_id, character_id).await
    }

    pub async fn mark_dealt(
        uow: &mut dyn UnitOfWork,
        gacha_id: GachaId,
        character_id: CharacterId,
        entry_id: EntryId,
    ) -> GachaResult<()> {
        uow.insert_box_entry(gacha_id, character_id, entry_id).await
    }

    pub async fn reset(uow: &mut dyn UnitOfWork, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<()> {
        uow.delete_box_entries(gacha_id, character_id).await?;
        tracing::debug!("[BoxTracker::reset] gacha {} character {} cleared", gacha_id, character_id);
        Ok(())
    }

    /// Every dealt entry reports as exhausted; partial exhaustion is not tracked.
    pub async fn status(
        uow: &mut dyn UnitOfWork,
        gacha_id: GachaId,
        character_id: CharacterId,
    ) -> GachaResult<Vec<BoxEntryStatus>> {
        Ok(Self::dealt_entries(uow, gacha_id, character_id)
            .await?
            .into_iter()
            .map(|entry_id| BoxEntryStatus { entry_id, exhausted: true })
            .collect())
    }
}
