use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Gateway settings, read from flags or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "gateway", about = "HTTP gateway for the vending ledger", version)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "VENDING_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// HMAC secret for session tokens.
    #[arg(long, env = "TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: String,

    /// Session lifetime in seconds.
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 86_400)]
    pub session_ttl_secs: u32,

    /// Journal directory. Without it, state lives in memory only.
    #[arg(long, env = "VENDING_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Interval between sweeps of expired sessions.
    #[arg(long, env = "SESSION_SWEEP_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Mark the session cookie `Secure`.
    #[arg(long, env = "COOKIE_SECURE", default_value_t = false)]
    pub cookie_secure: bool,
}
