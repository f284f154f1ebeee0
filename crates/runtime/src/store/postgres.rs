use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{Store, UnitOfWork};
use crate::catalog::{CatalogSeed, Gacha, GachaEntry, RewardItem};
use crate::exchange::FpointItem;
use crate::ledger::{Balance, BalanceScope};
use crate::{CharacterId, EntryId, GachaId, GachaResult, Player, StoreError};

fn narrow<T: TryFrom<i64>>(column: &'static str, value: i64) -> Result<T, StoreError> {
    T::try_from(value).map_err(|_| StoreError::OutOfRange { column, value })
}

fn int<T: TryFrom<i64>>(row: &PgRow, column: &'static str) -> Result<T, StoreError> {
    let value: i32 = row.try_get(column)?;
    narrow(column, i64::from(value))
}

fn bigint<T: TryFrom<i64>>(row: &PgRow, column: &'static str) -> Result<T, StoreError> {
    let value: i64 = row.try_get(column)?;
    narrow(column, value)
}

fn gacha_from_row(row: &PgRow) -> Result<Gacha, StoreError> {
    Ok(Gacha {
        id: bigint(row, "id")?,
        min_gr: int(row, "min_gr")?,
        min_hr: int(row, "min_hr")?,
        name: row.try_get("name")?,
        url_banner: row.try_get("url_banner")?,
        url_feature: row.try_get("url_feature")?,
        url_thumbnail: row.try_get("url_thumbnail")?,
        wide: row.try_get("wide")?,
        recommended: row.try_get("recommended")?,
        gacha_type: int(row, "gacha_type")?,
        hidden: row.try_get("hidden")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<GachaEntry, StoreError> {
    Ok(GachaEntry {
        id: bigint(row, "id")?,
        gacha_id: bigint(row, "gacha_id")?,
        entry_type: int(row, "entry_type")?,
        item_type: int(row, "item_type")?,
        item_number: int(row, "item_number")?,
        item_quantity: int(row, "item_quantity")?,
        weight: row.try_get("weight")?,
        rarity: int(row, "rarity")?,
        rolls: int(row, "rolls")?,
        frontier_points: row.try_get("frontier_points")?,
        daily_limit: int(row, "daily_limit")?,
        name: row.try_get("name")?,
    })
}

const GACHA_COLUMNS: &str =
    "id, min_gr, min_hr, name, url_banner, url_feature, url_thumbnail, wide, recommended, gacha_type, hidden";
const ENTRY_COLUMNS: &str = "id, gacha_id, entry_type, item_type, item_number, item_quantity, weight, \
    rarity, rolls, frontier_points, daily_limit, name";

fn balance_owner(player: Player, balance: Balance) -> (&'static str, u32) {
    match balance.scope() {
        BalanceScope::Account => ("users", player.account_id),
        BalanceScope::Character => ("characters", player.character_id),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Upserts catalog rows. Reward rows of every seeded entry are replaced.
    pub async fn import_catalog(&self, seed: &CatalogSeed) -> GachaResult<()> {
        let mut tx = self.pool.begin().await?;

        for gacha in &seed.gachas {
            sqlx::query(r#"
                INSERT INTO gacha_shop (id, min_gr, min_hr, name, url_banner, url_feature, url_thumbnail,
                    wide, recommended, gacha_type, hidden)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (id) DO UPDATE SET
                    min_gr = EXCLUDED.min_gr, min_hr = EXCLUDED.min_hr, name = EXCLUDED.name,
                    url_banner = EXCLUDED.url_banner, url_feature = EXCLUDED.url_feature,
                    url_thumbnail = EXCLUDED.url_thumbnail, wide = EXCLUDED.wide,
                    recommended = EXCLUDED.recommended, gacha_type = EXCLUDED.gacha_type,
                    hidden = EXCLUDED.hidden
            "#)
            .bind(i64::from(gacha.id))
            .bind(narrow::<i32>("min_gr", i64::from(gacha.min_gr))?)
            .bind(narrow::<i32>("min_hr", i64::from(gacha.min_hr))?)
            .bind(&gacha.name)
            .bind(&gacha.url_banner)
            .bind(&gacha.url_feature)
            .bind(&gacha.url_thumbnail)
            .bind(gacha.wide)
            .bind(gacha.recommended)
            .bind(i32::from(gacha.gacha_type))
            .bind(gacha.hidden)
            .execute(&mut *tx)
            .await?;
        }

        for seeded in &seed.entries {
            let entry = &seeded.entry;
            sqlx::query(r#"
                INSERT INTO gacha_entries (id, gacha_id, entry_type, item_type, item_number, item_quantity,
                    weight, rarity, rolls, frontier_points, daily_limit, name)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (id) DO UPDATE SET
                    gacha_id = EXCLUDED.gacha_id, entry_type = EXCLUDED.entry_type,
                    item_type = EXCLUDED.item_type, item_number = EXCLUDED.item_number,
                    item_quantity = EXCLUDED.item_quantity, weight = EXCLUDED.weight,
                    rarity = EXCLUDED.rarity, rolls = EXCLUDED.rolls,
                    frontier_points = EXCLUDED.frontier_points, daily_limit = EXCLUDED.daily_limit,
                    name = EXCLUDED.name
            "#)
            .bind(i64::from(entry.id))
            .bind(i64::from(entry.gacha_id))
            .bind(i32::from(entry.entry_type))
            .bind(i32::from(entry.item_type))
            .bind(i32::from(entry.item_number))
            .bind(i32::from(entry.item_quantity))
            .bind(entry.weight)
            .bind(i32::from(entry.rarity))
            .bind(i32::from(entry.rolls))
            .bind(entry.frontier_points)
            .bind(i32::from(entry.daily_limit))
            .bind(&entry.name)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM gacha_items WHERE entry_id = $1")
                .bind(i64::from(entry.id))
                .execute(&mut *tx)
                .await?;
            for item in &seeded.items {
                sqlx::query("INSERT INTO gacha_items (entry_id, item_type, item_id, quantity) VALUES ($1, $2, $3, $4)")
                    .bind(i64::from(entry.id))
                    .bind(i32::from(item.item_type))
                    .bind(i32::from(item.item_id))
                    .bind(i32::from(item.quantity))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for trade in &seed.fpoint_items {
            sqlx::query(r#"
                INSERT INTO fpoint_items (id, item_type, item_id, quantity, fpoints, buyable)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE SET
                    item_type = EXCLUDED.item_type, item_id = EXCLUDED.item_id,
                    quantity = EXCLUDED.quantity, fpoints = EXCLUDED.fpoints, buyable = EXCLUDED.buyable
            "#)
            .bind(i64::from(trade.id))
            .bind(i32::from(trade.item_type))
            .bind(i32::from(trade.item_id))
            .bind(i32::from(trade.quantity))
            .bind(narrow::<i32>("fpoints", i64::from(trade.fpoints))?)
            .bind(trade.buyable)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            "[PgStore::import_catalog] {} gachas, {} entries, {} trades",
            seed.gachas.len(), seed.entries.len(), seed.fpoint_items.len()
        );
        Ok(())
    }

    /// Creates the account and character rows if they do not exist yet.
    pub async fn seed_player(&self, player: Player) -> GachaResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(i64::from(player.account_id))
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO characters (id, user_id) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(i64::from(player.character_id))
            .bind(i64::from(player.account_id))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_balance(&self, player: Player, balance: Balance, value: i64) -> GachaResult<()> {
        let (table, id) = balance_owner(player, balance);
        let sql = format!("UPDATE {} SET {} = $1 WHERE id = $2", table, balance.column());
        let result = sqlx::query(&sql).bind(value).bind(i64::from(id)).execute(&*self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownOwner { table, id }.into());
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> GachaResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

pub struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::Finished)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_scope(&mut self, character_id: CharacterId, gacha_id: GachaId) -> GachaResult<()> {
        let key = ((u64::from(character_id) << 32) | u64::from(gacha_id)) as i64;
        let tx = self.tx()?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn lock_character(&mut self, character_id: CharacterId) -> GachaResult<()> {
        let tx = self.tx()?;
        sqlx::query("SELECT id FROM characters WHERE id = $1 FOR UPDATE")
            .bind(i64::from(character_id))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> GachaResult<()> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> GachaResult<()> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.rollback().await?;
        Ok(())
    }

    async fn gacha(&mut self, gacha_id: GachaId) -> GachaResult<Option<Gacha>> {
        let sql = format!("SELECT {} FROM gacha_shop WHERE id = $1", GACHA_COLUMNS);
        let tx = self.tx()?;
        let row = sqlx::query(&sql)
            .bind(i64::from(gacha_id))
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.as_ref().map(gacha_from_row).transpose()?)
    }

    async fn gachas(&mut self) -> GachaResult<Vec<Gacha>> {
        let sql = format!("SELECT {} FROM gacha_shop ORDER BY id", GACHA_COLUMNS);
        let tx = self.tx()?;
        let rows = sqlx::query(&sql).fetch_all(&mut **tx).await?;
        Ok(rows.iter().map(gacha_from_row).collect::<Result<_, _>>()?)
    }

    async fn entries(&mut self, gacha_id: GachaId) -> GachaResult<Vec<GachaEntry>> {
        let sql = format!(
            "SELECT {} FROM gacha_entries WHERE gacha_id = $1 ORDER BY entry_type, id",
            ENTRY_COLUMNS
        );
        let tx = self.tx()?;
        let rows = sqlx::query(&sql)
            .bind(i64::from(gacha_id))
            .fetch_all(&mut **tx)
            .await?;
        Ok(rows.iter().map(entry_from_row).collect::<Result<_, _>>()?)
    }

    async fn entry_by_type(&mut self, gacha_id: GachaId, entry_type: u8) -> GachaResult<Option<GachaEntry>> {
        let sql = format!(
            "SELECT {} FROM gacha_entries WHERE gacha_id = $1 AND entry_type = $2 ORDER BY id LIMIT 1",
            ENTRY_COLUMNS
        );
        let tx = self.tx()?;
        let row = sqlx::query(&sql)
            .bind(i64::from(gacha_id))
            .bind(i32::from(entry_type))
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.as_ref().map(entry_from_row).transpose()?)
    }

    async fn random_pool(&mut self, gacha_id: GachaId) -> GachaResult<Vec<GachaEntry>> {
        let sql = format!(
            "SELECT {} FROM gacha_entries WHERE gacha_id = $1 AND entry_type = $2 ORDER BY weight DESC, id",
            ENTRY_COLUMNS
        );
        let tx = self.tx()?;
        let rows = sqlx::query(&sql)
            .bind(i64::from(gacha_id))
            .bind(i32::from(crate::catalog::RANDOM_POOL_ENTRY_TYPE))
            .fetch_all(&mut **tx)
            .await?;
        Ok(rows.iter().map(entry_from_row).collect::<Result<_, _>>()?)
    }

    async fn reward_items(&mut self, entry_id: EntryId) -> GachaResult<Vec<RewardItem>> {
        let tx = self.tx()?;
        let rows = sqlx::query("SELECT item_type, item_id, quantity FROM gacha_items WHERE entry_id = $1 ORDER BY id")
            .bind(i64::from(entry_id))
            .fetch_all(&mut **tx)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(RewardItem {
                item_type: int(row, "item_type")?,
                item_id: int(row, "item_id")?,
                quantity: int(row, "quantity")?,
            });
        }
        Ok(items)
    }

    async fn fpoint_item(&mut self, trade_id: u32) -> GachaResult<Option<FpointItem>> {
        let tx = self.tx()?;
        let row = sqlx::query(
            "SELECT id, item_type, item_id, quantity, fpoints, buyable FROM fpoint_items WHERE id = $1",
        )
        .bind(i64::from(trade_id))
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(FpointItem {
            id: bigint(&row, "id")?,
            item_type: int(&row, "item_type")?,
            item_id: int(&row, "item_id")?,
            quantity: int(&row, "quantity")?,
            fpoints: int(&row, "fpoints")?,
            buyable: row.try_get("buyable").map_err(StoreError::from)?,
        }))
    }

    async fn balance(&mut self, player: Player, balance: Balance) -> GachaResult<i64> {
        let (table, id) = balance_owner(player, balance);
        let sql = format!("SELECT {} FROM {} WHERE id = $1", balance.column(), table);
        let tx = self.tx()?;
        let value: Option<i64> = sqlx::query_scalar(&sql)
            .bind(i64::from(id))
            .fetch_optional(&mut **tx)
            .await?;
        match value {
            Some(value) => Ok(value),
            None => Err(StoreError::UnknownOwner { table, id }.into()),
        }
    }

    async fn adjust_balance(&mut self, player: Player, balance: Balance, delta: i64) -> GachaResult<i64> {
        let (table, id) = balance_owner(player, balance);
        let column = balance.column();
        let sql = format!(
            "UPDATE {table} SET {column} = {column} + $1 WHERE id = $2 RETURNING {column}",
            table = table,
            column = column
        );
        let tx = self.tx()?;
        let value: Option<i64> = sqlx::query_scalar(&sql)
            .bind(delta)
            .bind(i64::from(id))
            .fetch_optional(&mut **tx)
            .await?;
        match value {
            Some(value) => Ok(value),
            None => Err(StoreError::UnknownOwner { table, id }.into()),
        }
    }

    async fn inventory_buffer(&mut self, character_id: CharacterId) -> GachaResult<Option<Vec<u8>>> {
        // row lock: plays on different gachas still share this buffer
        let tx = self.tx()?;
        let row: Option<Option<Vec<u8>>> = sqlx::query_scalar("SELECT gacha_items FROM characters WHERE id = $1 FOR UPDATE")
            .bind(i64::from(character_id))
            .fetch_optional(&mut **tx)
            .await?;
        row.ok_or_else(|| StoreError::UnknownOwner { table: "characters", id: character_id }.into())
    }

    async fn set_inventory_buffer(&mut self, character_id: CharacterId, buffer: Option<Vec<u8>>) -> GachaResult<()> {
        let tx = self.tx()?;
        let result = sqlx::query("UPDATE characters SET gacha_items = $1 WHERE id = $2")
            .bind(buffer)
            .bind(i64::from(character_id))
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownOwner { table: "characters", id: character_id }.into());
        }
        Ok(())
    }

    async fn stepup_step(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<Option<u8>> {
        let tx = self.tx()?;
        let step: Option<i32> = sqlx::query_scalar(
            "SELECT step FROM gacha_stepup WHERE gacha_id = $1 AND character_id = $2",
        )
        .bind(i64::from(gacha_id))
        .bind(i64::from(character_id))
        .fetch_optional(&mut **tx)
        .await?;
        Ok(step.map(|s| narrow("step", i64::from(s))).transpose()?)
    }

    async fn delete_stepup(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<()> {
        let tx = self.tx()?;
        sqlx::query("DELETE FROM gacha_stepup WHERE gacha_id = $1 AND character_id = $2")
            .bind(i64::from(gacha_id))
            .bind(i64::from(character_id))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_stepup(&mut self, gacha_id: GachaId, character_id: CharacterId, step: u8) -> GachaResult<()> {
        let tx = self.tx()?;
        sqlx::query("INSERT INTO gacha_stepup (gacha_id, character_id, step) VALUES ($1, $2, $3)")
            .bind(i64::from(gacha_id))
            .bind(i64::from(character_id))
            .bind(i32::from(step))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn box_entries(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<Vec<EntryId>> {
        let tx = self.tx()?;
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT entry_id FROM gacha_box WHERE gacha_id = $1 AND character_id = $2 ORDER BY id",
        )
        .bind(i64::from(gacha_id))
        .bind(i64::from(character_id))
        .fetch_all(&mut **tx)
        .await?;
        Ok(ids
            .into_iter()
            .map(|id| narrow("entry_id", id))
            .collect::<Result<_, _>>()?)
    }

    async fn insert_box_entry(&mut self, gacha_id: GachaId, character_id: CharacterId, entry_id: EntryId) -> GachaResult<()> {
        let tx = self.tx()?;
        sqlx::query("INSERT INTO gacha_box (gacha_id, entry_id, character_id) VALUES ($1, $2, $3)")
            .bind(i64::from(gacha_id))
            .bind(i64::from(entry_id))
            .bind(i64::from(character_id))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn delete_box_entries(&mut self, gacha_id: GachaId, character_id: CharacterId) -> GachaResult<()> {
        let tx = self.tx()?;
        sqlx::query("DELETE FROM gacha_box WHERE gacha_id = $1 AND character_id = $2")
            .bind(i64::from(gacha_id))
            .bind(i64::from(character_id))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn add_shop_purchase(&mut self, character_id: CharacterId, shop_item_id: u32, count: u32) -> GachaResult<()> {
        let tx = self.tx()?;
        sqlx::query(r#"
            INSERT INTO shop_items_bought (character_id, shop_item_id, bought)
            VALUES ($1, $2, $3)
            ON CONFLICT (character_id, shop_item_id)
            DO UPDATE SET bought = shop_items_bought.bought + EXCLUDED.bought
        "#)
        .bind(i64::from(character_id))
        .bind(i64::from(shop_item_id))
        .bind(i64::from(count))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn shop_purchase_count(&mut self, character_id: CharacterId, shop_item_id: u32) -> GachaResult<u64> {
        let tx = self.tx()?;
        let bought: Option<i64> = sqlx::query_scalar(
            "SELECT bought FROM shop_items_bought WHERE character_id = $1 AND shop_item_id = $2",
        )
        .bind(i64::from(character_id))
        .bind(i64::from(shop_item_id))
        .fetch_optional(&mut **tx)
        .await?;
        Ok(narrow("bought", bought.unwrap_or(0))?)
    }
}
