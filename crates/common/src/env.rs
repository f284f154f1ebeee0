use std::str::FromStr;

use anyhow::{anyhow, Result};

pub trait EnvVars: Sized {
    fn load() -> Result<Self>;
    fn get_env_var(&self, key: &str) -> Option<String>;
}

/// Reads `key` from the environment, falling back to `default` when unset.
/// A value that is present but does not parse is an error.
pub fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

pub fn env_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("{} environment variable not set", key))
}

pub fn env_optional<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: i64 = env_or("GACHA_COMMON_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_env_or_rejects_garbage() {
        std::env::set_var("GACHA_COMMON_TEST_GARBAGE", "not-a-number");
        let value: Result<i64> = env_or("GACHA_COMMON_TEST_GARBAGE", 0);
        assert!(value.is_err());
    }

    #[test]
    fn test_env_optional() {
        std::env::set_var("GACHA_COMMON_TEST_SEED", " 7 ");
        assert_eq!(env_optional::<u64>("GACHA_COMMON_TEST_SEED").unwrap(), Some(7));
        assert_eq!(env_optional::<u64>("GACHA_COMMON_TEST_MISSING").unwrap(), None);
    }
}
