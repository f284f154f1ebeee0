mod box_gacha;
mod config;
mod engine;
mod error;
mod exchange;
mod frame;
mod inventory;
mod ledger;
mod player;
mod sampler;
mod session;
mod stepup;

pub mod catalog;
pub mod reply;
pub mod store;

pub use box_gacha::{BoxEntryStatus, BoxTracker};
pub use config::EngineConfig;
pub use engine::{BoxPlay, GachaEngine, NormalPlay, StepStatus, StepupPlay};
pub use error::{CatalogRef, GachaError, GachaResult, StoreError};
pub use exchange::{ExchangeLedger, FpointItem};
pub use frame::{ByteFrame, ByteReader};
pub use inventory::{
    Drained, InventoryAccumulator, PendingItems, MAX_EMITTED_BYTES, MAX_EMITTED_ITEMS, MAX_PENDING_ITEMS,
};
pub use ledger::{Balance, BalanceScope, CurrencyKind, CurrencyLedger, Debit, GachaPoints};
pub use player::{AccountId, CharacterId, EntryId, GachaId, Player};
pub use sampler::{Weighted, WeightedSampler};
pub use session::{handle_request, Ack, GachaRequest, Session};
pub use stepup::StepupTracker;
