use clap::Parser;
use std::time::Duration;

pub const POSTGRES_DSN_ENV: &str = "MAYFLY_SWEEPER_POSTGRES_DSN";
pub const REDIS_URL_ENV: &str = "MAYFLY_SWEEPER_REDIS_URL";
pub const TICK_INTERVAL_SECS_ENV: &str = "MAYFLY_SWEEPER_TICK_INTERVAL_SECS";
pub const AUDIT_EVERY_TICKS_ENV: &str = "MAYFLY_SWEEPER_AUDIT_EVERY_TICKS";
pub const KEY_PREFIX_ENV: &str = "MAYFLY_SWEEPER_KEY_PREFIX";

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KEY_PREFIX: &str = "mf:exp:";

#[derive(Debug, Parser)]
#[command(name = "mayfly-sweeper", about = "Deletes expired links from the store")]
pub struct Cli {
    #[arg(long, env = POSTGRES_DSN_ENV)]
    pub postgres_dsn: String,

    #[arg(long, env = REDIS_URL_ENV, default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    /// Seconds between sweep ticks.
    #[arg(long, env = TICK_INTERVAL_SECS_ENV, default_value_t = 60)]
    pub tick_interval_secs: u64,

    /// Run the store-side audit sweep every N ticks (0 disables).
    #[arg(long, env = AUDIT_EVERY_TICKS_ENV, default_value_t = 10)]
    pub audit_every_ticks: u32,

    /// Redis key prefix for deadline entries.
    #[arg(long, env = KEY_PREFIX_ENV, default_value = DEFAULT_KEY_PREFIX)]
    pub key_prefix: String,
}

impl Cli {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}
