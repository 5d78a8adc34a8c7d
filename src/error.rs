//! Error types for the regtest RPC client.

use std::{fmt, io};

use corepc_types::bitcoin::hex::HexToArrayError;
use jsonrpc::error::RpcError;
use jsonrpc::serde_json;

/// Bitcoin Core `RPC_WALLET_ERROR`, returned among others when a wallet
/// database already exists on disk.
pub const RPC_WALLET_ERROR: i32 = -4;

/// Bitcoin Core `RPC_WALLET_ALREADY_LOADED`.
pub const RPC_WALLET_ALREADY_LOADED: i32 = -35;

/// Result type alias for the RPC client.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the node.
#[derive(Debug)]
pub enum Error {
    /// Missing authentication credentials.
    MissingAuthentication,

    /// Invalid or corrupted cookie file.
    InvalidCookieFile,

    /// The configured RPC URL was rejected by the HTTP transport.
    InvalidUrl(String),

    /// Invalid response from the RPC server.
    InvalidResponse(String),

    /// The node could not be reached at all.
    Connection {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Non-success HTTP status without a JSON-RPC body (e.g. bad credentials).
    Http { status: i32, body: String },

    /// The node answered with a JSON-RPC error object.
    Rpc(RpcError),

    /// Any other JSON-RPC client error.
    JsonRpc(jsonrpc::Error),

    /// Hash parsing error.
    HexToArray(HexToArrayError),

    /// JSON serialization/deserialization error.
    Json(serde_json::Error),

    /// I/O error (e.g., reading cookie file, writing output).
    Io(io::Error),
}

impl Error {
    /// The node refused `createwallet` because the wallet already exists.
    pub fn is_wallet_already_exists(&self) -> bool {
        match self {
            Error::Rpc(e) => e.code == RPC_WALLET_ERROR && e.message.contains("already exists"),
            _ => false,
        }
    }

    /// The node refused `loadwallet` because the wallet is loaded already.
    pub fn is_wallet_already_loaded(&self) -> bool {
        matches!(self, Error::Rpc(e) if e.code == RPC_WALLET_ALREADY_LOADED)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingAuthentication => {
                write!(f, "authentication is required but none was provided")
            }
            Error::InvalidCookieFile => write!(f, "invalid cookie file"),
            Error::InvalidUrl(e) => write!(f, "invalid RPC URL: {e}"),
            Error::InvalidResponse(e) => write!(f, "invalid response: {e}"),
            Error::Connection { url, source } => {
                write!(f, "could not connect to {url}: {source}")
            }
            Error::Http { status, .. } => write!(f, "HTTP {status}"),
            Error::Rpc(e) => write!(f, "{} (code {})", e.message, e.code),
            Error::JsonRpc(e) => write!(f, "JSON-RPC error: {e}"),
            Error::HexToArray(e) => write!(f, "Hash parsing error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => Some(source.as_ref()),
            Error::JsonRpc(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::HexToArray(e) => Some(e),
            _ => None,
        }
    }
}

// Conversions from other error types
impl From<jsonrpc::Error> for Error {
    fn from(e: jsonrpc::Error) -> Self {
        match e {
            jsonrpc::Error::Rpc(e) => Error::Rpc(e),
            jsonrpc::Error::Json(e) => Error::Json(e),
            e => Error::JsonRpc(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<HexToArrayError> for Error {
    fn from(e: HexToArrayError) -> Self {
        Error::HexToArray(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
