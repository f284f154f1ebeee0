use crate::store::UnitOfWork;
use crate::{CharacterId, GachaId, GachaResult};

/// Per-character position in a step-up gacha's sequence.
pub struct StepupTracker;

impl StepupTracker {
    /// Stored step, or 0. A step with no matching progression entry means the sequence
    /// ran out: the row is removed and the character starts over.
    pub async fn current_step(
        uow: &mut dyn UnitOfWork,
        gacha_id: GachaId,
        character_id: CharacterId,
    ) -> GachaResult<u8> {
        let step = uow.stepup_step(gacha_id, character_id).await?.unwrap_or(0);

        let has_entry = match uow.entry_by_type(gacha_id, step).await? {
            Some(entry) => entry.is_progression(),
            None => false,
        };
        if has_entry {
            return Ok(step);
        }

        uow.delete_stepup(gacha_id, character_id).await?;
        if step != 0 {
            tracing::debug!(
                "[StepupTracker::current_step] gacha {} character {}: step {} exhausted, restarting",
                gacha_id, character_id, step
            );
        }
        Ok(0)
    }

    /// Replaces the character's row with `played_step + 1`.
    pub async fn advance(
        uow: &mut dyn UnitOfWork,
        gacha_id: GachaId,
        character_id: CharacterId,
        played_step: u8,
    ) -> GachaResult<u8> {
        let next = played_step.saturating_add(1);
        uow.delete_stepup(gacha_id, character_id).await?;
        uow.insert_stepup(gacha_id, character_id, next).await?;
        Ok(next)
    }
}
