/// `(table name, CREATE statement)` in dependency order. Dropping walks the list backwards.
pub const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT PRIMARY KEY,
            frontier_points BIGINT NOT NULL DEFAULT 0,
            gacha_premium BIGINT NOT NULL DEFAULT 0,
            gacha_trial BIGINT NOT NULL DEFAULT 0
        )
        "#,
    ),
    (
        "characters",
        r#"
        CREATE TABLE IF NOT EXISTS characters (
            id BIGINT PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            gacha_items BYTEA,
            netcafe_points BIGINT NOT NULL DEFAULT 0,
            guild_points BIGINT NOT NULL DEFAULT 0,
            bond_points BIGINT NOT NULL DEFAULT 0,
            image_change_points BIGINT NOT NULL DEFAULT 0
        )
        "#,
    ),
    (
        "gacha_shop",
        r#"
        CREATE TABLE IF NOT EXISTS gacha_shop (
            id BIGINT PRIMARY KEY,
            min_gr INTEGER NOT NULL DEFAULT 0,
            min_hr INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL DEFAULT '',
            url_banner TEXT NOT NULL DEFAULT '',
            url_feature TEXT NOT NULL DEFAULT '',
            url_thumbnail TEXT NOT NULL DEFAULT '',
            wide BOOLEAN NOT NULL DEFAULT FALSE,
            recommended BOOLEAN NOT NULL DEFAULT FALSE,
            gacha_type INTEGER NOT NULL DEFAULT 0,
            hidden BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    ),
    (
        "gacha_entries",
        r#"
        CREATE TABLE IF NOT EXISTS gacha_entries (
            id BIGINT PRIMARY KEY,
            gacha_id BIGINT NOT NULL REFERENCES gacha_shop(id) ON DELETE CASCADE,
            entry_type INTEGER NOT NULL,
            item_type INTEGER NOT NULL DEFAULT 0,
            item_number INTEGER NOT NULL DEFAULT 0,
            item_quantity INTEGER NOT NULL DEFAULT 0,
            weight DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (weight >= 0),
            rarity INTEGER NOT NULL DEFAULT 0,
            rolls INTEGER NOT NULL DEFAULT 0,
            frontier_points BIGINT NOT NULL DEFAULT 0,
            daily_limit INTEGER NOT NULL DEFAULT 0,
            name TEXT
        )
        "#,
    ),
    (
        "gacha_items",
        r#"
        CREATE TABLE IF NOT EXISTS gacha_items (
            id BIGSERIAL PRIMARY KEY,
            entry_id BIGINT NOT NULL REFERENCES gacha_entries(id) ON DELETE CASCADE,
            item_type INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL
        )
        "#,
    ),
    (
        "gacha_stepup",
        r#"
        CREATE TABLE IF NOT EXISTS gacha_stepup (
            gacha_id BIGINT NOT NULL,
            character_id BIGINT NOT NULL,
            step INTEGER NOT NULL,
            UNIQUE (gacha_id, character_id)
        )
        "#,
    ),
    (
        "gacha_box",
        r#"
        CREATE TABLE IF NOT EXISTS gacha_box (
            id BIGSERIAL PRIMARY KEY,
            gacha_id BIGINT NOT NULL,
            entry_id BIGINT NOT NULL,
            character_id BIGINT NOT NULL
        )
        "#,
    ),
    (
        "fpoint_items",
        r#"
        CREATE TABLE IF NOT EXISTS fpoint_items (
            id BIGINT PRIMARY KEY,
            item_type INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            fpoints INTEGER NOT NULL,
            buyable BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    ),
    (
        "shop_items_bought",
        r#"
        CREATE TABLE IF NOT EXISTS shop_items_bought (
            character_id BIGINT NOT NULL,
            shop_item_id BIGINT NOT NULL,
            bought BIGINT NOT NULL DEFAULT 0,
            UNIQUE (character_id, shop_item_id)
        )
        "#,
    ),
];

pub const INDEXES_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS gacha_entries_gacha_type_idx ON gacha_entries (gacha_id, entry_type)",
    "CREATE INDEX IF NOT EXISTS gacha_items_entry_idx ON gacha_items (entry_id)",
    "CREATE INDEX IF NOT EXISTS gacha_box_owner_idx ON gacha_box (gacha_id, character_id)",
    "CREATE INDEX IF NOT EXISTS characters_user_idx ON characters (user_id)",
];
