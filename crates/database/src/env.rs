use anyhow::Result;

use gacha_common::{env_or, env_required, EnvVars};

pub struct DatabaseEnv {
    pub database_url: String,
    pub max_connections: u32,
}

impl EnvVars for DatabaseEnv {
    fn load() -> Result<Self> {
        Ok(Self {
            database_url: env_required("DATABASE_URL")?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "DATABASE_URL" => Some(self.database_url.clone()),
            "DATABASE_MAX_CONNECTIONS" => Some(self.max_connections.to_string()),
            _ => None,
        }
    }
}
