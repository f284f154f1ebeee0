use anyhow::Result;

use gacha_common::{env_optional, env_or, EnvVars};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Seconds added to the wall clock when reporting server time.
    pub server_time_offset_secs: i64,
    /// Fixed RNG seed; draws are reproducible across restarts when set.
    pub rng_seed: Option<u64>,
}

impl EngineConfig {
    pub fn seeded(seed: u64) -> Self {
        Self { rng_seed: Some(seed), ..Default::default() }
    }
}

impl EnvVars for EngineConfig {
    fn load() -> Result<Self> {
        Ok(Self {
            server_time_offset_secs: env_or("GACHA_SERVER_TIME_OFFSET", 0)?,
            rng_seed: env_optional("GACHA_RNG_SEED")?,
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "GACHA_SERVER_TIME_OFFSET" => Some(self.server_time_offset_secs.to_string()),
            "GACHA_RNG_SEED" => self.rng_seed.map(|s| s.to_string()),
            _ => None,
        }
    }
}
