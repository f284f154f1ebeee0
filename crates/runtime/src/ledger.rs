use serde::{Deserialize, Serialize};

use crate::catalog::GachaEntry;
use crate::store::UnitOfWork;
use crate::{GachaResult, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceScope {
    Account,
    Character,
}

/// A stored balance column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Balance {
    FrontierPoints,
    GachaPremium,
    GachaTrial,
    NetcafePoints,
    GuildPoints,
    BondPoints,
    ImageChangePoints,
}

impl Balance {
    pub const fn scope(self) -> BalanceScope {
        match self {
            Balance::FrontierPoints | Balance::GachaPremium | Balance::GachaTrial => BalanceScope::Account,
            Balance::NetcafePoints
            | Balance::GuildPoints
            | Balance::BondPoints
            | Balance::ImageChangePoints => BalanceScope::Character,
        }
    }

    pub const fn column(self) -> &'static str {
        match self {
            Balance::FrontierPoints => "frontier_points",
            Balance::GachaPremium => "gacha_premium",
            Balance::GachaTrial => "gacha_trial",
            Balance::NetcafePoints => "netcafe_points",
            Balance::GuildPoints => "guild_points",
            Balance::BondPoints => "bond_points",
            Balance::ImageChangePoints => "image_change_points",
        }
    }
}

/// Currency a roll or exchange is priced in, decoded from an entry's item-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyKind {
    NetcafePoints,
    TrialCoin,
    PremiumCoin,
    FrontierPoints,
    GuildPoints,
    BondPoints,
    ImageChangePoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebitRule {
    Direct(Balance),
    /// Whole amount from trial coin when it covers it, otherwise whole amount from premium.
    CoinPreference,
}

impl CurrencyKind {
    /// `None` for item types whose cost the client settles itself.
    pub fn from_item_type(code: u8) -> Option<Self> {
        match code {
            17 => Some(CurrencyKind::NetcafePoints),
            18 => Some(CurrencyKind::GuildPoints),
            19 => Some(CurrencyKind::TrialCoin),
            20 => Some(CurrencyKind::PremiumCoin),
            21 => Some(CurrencyKind::FrontierPoints),
            22 => Some(CurrencyKind::BondPoints),
            23 => Some(CurrencyKind::ImageChangePoints),
            _ => None,
        }
    }

    pub const fn item_type(self) -> u8 {
        match self {
            CurrencyKind::NetcafePoints => 17,
            CurrencyKind::GuildPoints => 18,
            CurrencyKind::TrialCoin => 19,
            CurrencyKind::PremiumCoin => 20,
            CurrencyKind::FrontierPoints => 21,
            CurrencyKind::BondPoints => 22,
            CurrencyKind::ImageChangePoints => 23,
        }
    }

    const fn debit_rule(self) -> DebitRule {
        match self {
            CurrencyKind::TrialCoin | CurrencyKind::PremiumCoin => DebitRule::CoinPreference,
            CurrencyKind::NetcafePoints => DebitRule::Direct(Balance::NetcafePoints),
            CurrencyKind::FrontierPoints => DebitRule::Direct(Balance::FrontierPoints),
            CurrencyKind::GuildPoints => DebitRule::Direct(Balance::GuildPoints),
            CurrencyKind::BondPoints => DebitRule::Direct(Balance::BondPoints),
            CurrencyKind::ImageChangePoints => DebitRule::Direct(Balance::ImageChangePoints),
        }
    }

    /// Balance a credit in this currency lands on.
    pub const fn credit_target(self) -> Balance {
        match self {
            CurrencyKind::TrialCoin => Balance::GachaTrial,
            CurrencyKind::PremiumCoin => Balance::GachaPremium,
            CurrencyKind::NetcafePoints => Balance::NetcafePoints,
            CurrencyKind::FrontierPoints => Balance::FrontierPoints,
            CurrencyKind::GuildPoints => Balance::GuildPoints,
            CurrencyKind::BondPoints => Balance::BondPoints,
            CurrencyKind::ImageChangePoints => Balance::ImageChangePoints,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debit {
    pub balance: Balance,
    pub amount: i64,
    pub new_balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GachaPoints {
    pub frontier_points: i64,
    pub premium: i64,
    pub trial: i64,
}

pub struct CurrencyLedger;

impl CurrencyLedger {
    /// Debits `amount` of `kind`. Balances may go negative; no floor is checked.
    pub async fn debit(
        uow: &mut dyn UnitOfWork,
        player: Player,
        kind: CurrencyKind,
        amount: i64,
    ) -> GachaResult<Debit> {
        let balance = match kind.debit_rule() {
            DebitRule::Direct(balance) => balance,
            DebitRule::CoinPreference => {
                let trial = uow.balance(player, Balance::GachaTrial).await?;
                if trial >= amount {
                    Balance::GachaTrial
                } else {
                    Balance::GachaPremium
                }
            }
        };
        Self::debit_balance(uow, player, balance, amount).await
    }

    /// Debits one balance column directly, bypassing the coin preference.
    pub async fn debit_balance(
        uow: &mut dyn UnitOfWork,
        player: Player,
        balance: Balance,
        amount: i64,
    ) -> GachaResult<Debit> {
        let new_balance = uow.adjust_balance(player, balance, -amount).await?;
        tracing::debug!(
            "[CurrencyLedger::debit] account {} character {}: -{} {} -> {}",
            player.account_id, player.character_id, amount, balance.column(), new_balance
        );
        Ok(Debit { balance, amount, new_balance })
    }

    pub async fn credit(
        uow: &mut dyn UnitOfWork,
        player: Player,
        kind: CurrencyKind,
        amount: i64,
    ) -> GachaResult<i64> {
        let balance = kind.credit_target();
        let new_balance = uow.adjust_balance(player, balance, amount).await?;
        tracing::debug!(
            "[CurrencyLedger::credit] account {} character {}: +{} {} -> {}",
            player.account_id, player.character_id, amount, balance.column(), new_balance
        );
        Ok(new_balance)
    }

    /// Charges the price of a roll selector. Entries priced in a client-settled item
    /// type charge nothing here.
    pub async fn pay_entry_cost(
        uow: &mut dyn UnitOfWork,
        player: Player,
        entry: &GachaEntry,
    ) -> GachaResult<Option<Debit>> {
        match CurrencyKind::from_item_type(entry.item_type) {
            Some(kind) => Self::debit(uow, player, kind, i64::from(entry.item_number))
                .await
                .map(Some),
            None => {
                tracing::debug!(
                    "[CurrencyLedger::pay_entry_cost] item type {} of entry {} is settled by the client",
                    entry.item_type, entry.id
                );
                Ok(None)
            }
        }
    }

    pub async fn gacha_points(uow: &mut dyn UnitOfWork, player: Player) -> GachaResult<GachaPoints> {
        Ok(GachaPoints {
            frontier_points: uow.balance(player, Balance::FrontierPoints).await?,
            premium: uow.balance(player, Balance::GachaPremium).await?,
            trial: uow.balance(player, Balance::GachaTrial).await?,
        })
    }
}
