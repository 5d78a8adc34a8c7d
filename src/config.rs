//! Connection settings, resolved once at startup from flags or environment.

use std::{path::PathBuf, time::Duration};

use clap::Args;

use crate::client::{Auth, DEFAULT_TIMEOUT};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:18443";
pub const DEFAULT_RPC_USER: &str = "bitcoinrpc";
pub const DEFAULT_RPC_PASSWORD: &str = "bitcoinrpcpassword";

/// Where the node lives and how to authenticate against it.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the node's JSON-RPC server
    #[arg(long, global = true, env = "BITCOIN_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// RPC username
    #[arg(long, global = true, env = "BITCOIN_RPC_USER", default_value = DEFAULT_RPC_USER)]
    pub rpc_user: String,

    /// RPC password
    #[arg(
        long,
        global = true,
        env = "BITCOIN_RPC_PASS",
        default_value = DEFAULT_RPC_PASSWORD,
        hide_env_values = true
    )]
    pub rpc_password: String,

    /// Path to the node's `.cookie` file; overrides user and password
    #[arg(long, global = true, env = "BITCOIN_RPC_COOKIE")]
    pub rpc_cookie_file: Option<PathBuf>,

    /// Transport deadline for a single RPC call, in seconds
    #[arg(
        long,
        global = true,
        env = "BITCOIN_RPC_TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            rpc_user: DEFAULT_RPC_USER.to_string(),
            rpc_password: DEFAULT_RPC_PASSWORD.to_string(),
            rpc_cookie_file: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Credentials to present to the node. A cookie file wins over user/password.
    pub fn auth(&self) -> Auth {
        match &self.rpc_cookie_file {
            Some(path) => Auth::CookieFile(path.clone()),
            None => Auth::UserPass(self.rpc_user.clone(), self.rpc_password.clone()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
