use serde::{Deserialize, Serialize};

use crate::ledger::{CurrencyKind, CurrencyLedger};
use crate::store::UnitOfWork;
use crate::{CatalogRef, CharacterId, GachaError, GachaResult, Player};

/// A tradable item priced in frontier points per `quantity` units.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FpointItem {
    pub id: u32,
    pub item_type: u8,
    pub item_id: u16,
    pub quantity: u16,
    pub fpoints: u32,
    #[serde(default)]
    pub buyable: bool,
}

pub struct ExchangeLedger;

impl ExchangeLedger {
    async fn trade(uow: &mut dyn UnitOfWork, trade_id: u32) -> GachaResult<FpointItem> {
        uow.fpoint_item(trade_id)
            .await?
            .ok_or(GachaError::CatalogMissing(CatalogRef::FpointTrade(trade_id)))
    }

    /// Buys `lots` lots of a trade with frontier points; returns the new balance.
    pub async fn fpoint_to_item(
        uow: &mut dyn UnitOfWork,
        player: Player,
        trade_id: u32,
        lots: u16,
    ) -> GachaResult<i64> {
        let trade = Self::trade(uow, trade_id).await?;
        if !trade.buyable {
            return Err(GachaError::InvalidExchange(format!("trade {} cannot be bought", trade_id)));
        }

        let cost = i64::from(lots)
            .checked_mul(i64::from(trade.quantity))
            .and_then(|units| units.checked_mul(i64::from(trade.fpoints)))
            .ok_or_else(|| GachaError::InvalidExchange(format!("trade {} cost overflows", trade_id)))?;
        let debit = CurrencyLedger::debit(uow, player, CurrencyKind::FrontierPoints, cost).await?;
        Ok(debit.new_balance)
    }

    /// Sells `quantity` units back; only whole lots of the trade's quantity pay out.
    pub async fn item_to_fpoint(
        uow: &mut dyn UnitOfWork,
        player: Player,
        trade_id: u32,
        quantity: u16,
    ) -> GachaResult<i64> {
        let trade = Self::trade(uow, trade_id).await?;
        if trade.quantity == 0 {
            return Err(GachaError::InvalidExchange(format!("trade {} has no lot size", trade_id)));
        }

        let lots = i64::from(quantity / trade.quantity);
        let payout = lots * i64::from(trade.fpoints);
        CurrencyLedger::credit(uow, player, CurrencyKind::FrontierPoints, payout).await
    }

    /// Adds to the per-character bought counter. Zero item hashes are padding and skipped.
    pub async fn record_purchases(
        uow: &mut dyn UnitOfWork,
        character_id: CharacterId,
        purchases: &[(u32, u32)],
    ) -> GachaResult<usize> {
        let mut recorded = 0;
        for &(shop_item_id, count) in purchases {
            if shop_item_id == 0 {
                continue;
            }
            uow.add_shop_purchase(character_id, shop_item_id, count).await?;
            recorded += 1;
        }
        Ok(recorded)
    }

    pub async fn purchase_count(
        uow: &mut dyn UnitOfWork,
        character_id: CharacterId,
        shop_item_id: u32,
    ) -> GachaResult<u64> {
        uow.shop_purchase_count(character_id, shop_item_id).await
    }
}
