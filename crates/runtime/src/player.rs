use serde::{Deserialize, Serialize};

pub type GachaId = u32;
pub type EntryId = u32;
pub type CharacterId = u32;
pub type AccountId = u32;

/// The acting character and the account that owns it.
///
/// Coin and frontier-point balances live on the account, everything else
/// (pending items, step-up and box progress, netcafe points) on the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub account_id: AccountId,
    pub character_id: CharacterId,
}

impl Player {
    pub fn new(account_id: AccountId, character_id: CharacterId) -> Self {
        Self { account_id, character_id }
    }
}
