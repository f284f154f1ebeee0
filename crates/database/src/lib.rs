mod env;
mod postgres_connect;
mod schema;

pub use env::DatabaseEnv;
pub use postgres_connect::{connect, connect_with, create_tables, drop_tables};
pub use schema::{INDEXES_SQL, TABLES};
