//! Server configuration.
//!
//! Everything is read from environment variables with sensible defaults, so the server can be started with nothing
//! more than a `.env` file. The variables are:
//! * `BRG_HOST` and `BRG_PORT`: the bind address. Defaults to `127.0.0.1:8360`.
//! * `BRG_DATABASE_URL`: the sqlite database URL.
//! * `BRG_CAL_WEBHOOK_SECRET`: the shared secret the scheduling provider signs its webhook bodies with. If unset,
//!   signature checks on `/webhook/cal` are disabled and a warning is logged at startup.
//! * `BRG_STRIPE_SECRET_KEY`, `BRG_STRIPE_WEBHOOK_SECRET`, `BRG_STRIPE_API_URL`: see
//!   [`StripeConfig`](stripe_tools::StripeConfig).

use std::env;

use brg_common::Secret;
use log::*;
use stripe_tools::StripeConfig;

const DEFAULT_BRG_HOST: &str = "127.0.0.1";
const DEFAULT_BRG_PORT: u16 = 8360;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret for the scheduling provider's webhook signatures. Empty means "do not check signatures".
    pub cal_webhook_secret: Secret<String>,
    /// Payment provider configuration (API key, webhook signing secret).
    pub stripe_config: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BRG_HOST.to_string(),
            port: DEFAULT_BRG_PORT,
            database_url: String::default(),
            cal_webhook_secret: Secret::new(String::default()),
            stripe_config: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BRG_HOST").ok().unwrap_or_else(|| DEFAULT_BRG_HOST.into());
        let port = env::var("BRG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BRG_PORT. {e} Using the default, {DEFAULT_BRG_PORT}, instead."
                    );
                    DEFAULT_BRG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BRG_PORT);
        let database_url = env::var("BRG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BRG_DATABASE_URL is not set. Please set it to the URL for the booking database.");
            String::default()
        });
        let cal_webhook_secret = env::var("BRG_CAL_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ BRG_CAL_WEBHOOK_SECRET is not set. Signature checks on the scheduling webhook are DISABLED. \
                 Anyone who can reach this server can inject booking events."
            );
            String::default()
        });
        let stripe_config = StripeConfig::new_from_env_or_default();
        Self { host, port, database_url, cal_webhook_secret: Secret::new(cal_webhook_secret), stripe_config }
    }
}
