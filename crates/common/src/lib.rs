mod env;

pub use env::{env_optional, env_or, env_required, EnvVars};

pub fn get_current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Wall clock shifted by `offset_secs`, truncated to the 32-bit epoch seconds the
/// client displays reset countdowns against.
pub fn get_adjusted_timestamp(offset_secs: i64) -> u32 {
    let adjusted = get_current_timestamp().saturating_add(offset_secs);
    adjusted.clamp(0, u32::MAX as i64) as u32
}
