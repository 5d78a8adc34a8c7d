//! Command-line controller for a Bitcoin Core node in regtest mode.
//!
//! This crate wraps Bitcoin Core's JSON-RPC interface with a small set of
//! operator commands: inspect the chain, create or load wallets, mine blocks
//! and send funds. Calls can target the node itself or a wallet-scoped
//! endpoint (`/wallet/<name>`).

mod client;
pub mod commands;
mod config;
mod error;

pub use client::{Auth, Client, JSONRPC_VERSION, REQUEST_ID, RpcApi};
pub use commands::{Command, run};
pub use config::Config;
pub use error::{Error, RPC_WALLET_ALREADY_LOADED, RPC_WALLET_ERROR, Result};

pub use jsonrpc;
