use std::fmt;

use thiserror::Error;

use crate::{EntryId, GachaId};

/// Catalog row a lookup expected to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRef {
    Gacha(GachaId),
    CostEntry { gacha_id: GachaId, entry_type: u8 },
    Entry(EntryId),
    FpointTrade(u32),
}

impl fmt::Display for CatalogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogRef::Gacha(id) => write!(f, "gacha {}", id),
            CatalogRef::CostEntry { gacha_id, entry_type } => {
                write!(f, "entry type {} of gacha {}", entry_type, gacha_id)
            }
            CatalogRef::Entry(id) => write!(f, "entry {}", id),
            CatalogRef::FpointTrade(id) => write!(f, "frontier point trade {}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("{table} row {id} does not exist")]
    UnknownOwner { table: &'static str, id: u32 },

    #[error("column {column} holds out-of-range value {value}")]
    OutOfRange { column: &'static str, value: i64 },

    #[error("unit of work already finished")]
    Finished,

    #[error("injected failure writing {0}")]
    Injected(&'static str),
}

#[derive(Debug, Error)]
pub enum GachaError {
    #[error("weighted pool is empty or carries no positive weight")]
    EmptyPool,

    #[error("box pool has {available} entries left, {requested} requested")]
    InsufficientPool { requested: usize, available: usize },

    #[error("{0} not found in catalog")]
    CatalogMissing(CatalogRef),

    #[error("pending inventory would hold {count} items, at most 255 fit")]
    InventoryOverflow { count: usize },

    #[error("pending inventory buffer of {len} bytes is malformed")]
    InventoryCorrupt { len: usize },

    #[error("exchange rejected: {0}")]
    InvalidExchange(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for GachaError {
    fn from(e: sqlx::Error) -> Self {
        GachaError::Store(StoreError::Sqlx(e))
    }
}

pub type GachaResult<T> = Result<T, GachaError>;
