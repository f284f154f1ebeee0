use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;

use gacha_common::EnvVars;

use crate::{DatabaseEnv, INDEXES_SQL, TABLES};

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Connects the process-wide pool from `DATABASE_URL`, optionally rebuilding the schema.
///
/// The first caller decides the flags; later calls return the already initialized pool.
pub async fn connect(drop_existing: bool, create_missing: bool) -> Result<&'static PgPool> {
    POOL.get_or_try_init(|| async {
        let env = DatabaseEnv::load()?;
        connect_with(&env, drop_existing, create_missing).await
    })
    .await
}

/// Builds a fresh pool for `env` without touching the process-wide one.
pub async fn connect_with(
    env: &DatabaseEnv,
    drop_existing: bool,
    create_missing: bool,
) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(env.max_connections)
        .connect(&env.database_url)
        .await
        .context("failed to connect to postgres")?;

    if drop_existing {
        drop_tables(&pool).await?;
    }
    if create_missing {
        create_tables(&pool).await?;
    }

    Ok(pool)
}

pub async fn create_tables(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for (name, create_sql) in TABLES {
        sqlx::query(create_sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to create table '{}'", name))?;
    }
    for index_sql in INDEXES_SQL {
        sqlx::query(index_sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to create index: {}", index_sql))?;
    }
    tx.commit().await?;

    tracing::info!("[database::create_tables] {} tables ready", TABLES.len());
    Ok(())
}

pub async fn drop_tables(pool: &PgPool) -> Result<()> {
    for (name, _) in TABLES.iter().rev() {
        let drop_sql = format!("DROP TABLE IF EXISTS \"{}\" CASCADE", name);
        if let Err(e) = sqlx::query(&drop_sql).execute(pool).await {
            tracing::warn!("[database::drop_tables] failed to drop '{}': {:?}", name, e);
        }
    }
    Ok(())
}
