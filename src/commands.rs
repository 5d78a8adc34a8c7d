//! Subcommands and their mapping onto node RPC calls.

use std::io::Write;

use clap::Subcommand;
use corepc_types::bitcoin::{Amount, BlockHash, Denomination, Txid};
use jsonrpc::serde_json::{self, Value, json};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::client::RpcApi;
use crate::error::{Error, Result};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show blockchain info
    #[command(name = "getinfo")]
    GetInfo,

    /// Create or load a wallet
    #[command(name = "createwallet")]
    CreateWallet {
        /// Name of the wallet
        name: String,
    },

    /// Generate a new address
    #[command(name = "getnewaddress")]
    GetNewAddress {
        /// Wallet to generate the address for
        wallet_name: String,
    },

    /// Mine blocks
    #[command(name = "mine")]
    Mine {
        /// Number of blocks
        #[arg(allow_negative_numbers = true)]
        blocks: u64,

        /// Address to receive the rewards
        address: String,
    },

    /// Get wallet balance
    #[command(name = "getbalance")]
    GetBalance {
        /// Wallet to check
        wallet_name: String,
    },

    /// Send BTC to an address
    #[command(name = "send")]
    Send {
        /// Amount of BTC to send
        #[arg(value_parser = parse_btc_amount, allow_negative_numbers = true)]
        amount: Amount,

        /// Recipient address
        address: String,

        /// Wallet to send from
        wallet_name: String,
    },

    /// Test the connection to the node
    #[command(name = "check")]
    Check,
}

/// The subset of `getblockchaininfo` this tool prints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BlockchainInfo {
    pub chain: String,
    pub blocks: u64,
}

/// Parses a BTC-denominated amount (at most 8 decimals, non-negative).
pub fn parse_btc_amount(s: &str) -> std::result::Result<Amount, String> {
    Amount::from_str_in(s, Denomination::Bitcoin).map_err(|e| format!("invalid BTC amount: {e}"))
}

/// Plain decimal with at least one fractional digit (`5000.0`, `0.00001`).
fn format_btc(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn call<T, R>(rpc: &R, method: &str, args: &[Value], wallet: Option<&str>) -> Result<T>
where
    T: DeserializeOwned,
    R: RpcApi + ?Sized,
{
    let value = rpc.call_raw(method, args, wallet)?;
    Ok(serde_json::from_value(value)?)
}

/// Runs `command` against the node, writing human-readable output to `out`.
///
/// Calls are issued in order and the first failure is returned as-is; no
/// call is attempted after it.
pub fn run<R, W>(rpc: &R, command: &Command, out: &mut W) -> Result<()>
where
    R: RpcApi + ?Sized,
    W: Write,
{
    match command {
        Command::GetInfo => {
            let info: BlockchainInfo = call(rpc, "getblockchaininfo", &[], None)?;
            writeln!(out, "Chain: {}", info.chain)?;
            writeln!(out, "Blocks: {}", info.blocks)?;
        }

        Command::CreateWallet { name } => create_wallet(rpc, name, out)?,

        Command::GetNewAddress { wallet_name } => {
            let address: String = call(rpc, "getnewaddress", &[], Some(wallet_name.as_str()))?;
            writeln!(out, "New Address ({wallet_name}): {address}")?;
        }

        Command::Mine { blocks, address } => {
            writeln!(out, "Mining {blocks} blocks...")?;
            let hashes: Vec<String> = call(
                rpc,
                "generatetoaddress",
                &[json!(blocks), json!(address)],
                None,
            )?;
            let hashes = hashes
                .iter()
                .map(|h| h.parse::<BlockHash>())
                .collect::<std::result::Result<Vec<_>, _>>()?;

            writeln!(out, "Mined {} blocks.", hashes.len())?;
            if let Some(last) = hashes.last() {
                writeln!(out, "   Last Hash: {last}")?;
            }
        }

        Command::GetBalance { wallet_name } => {
            let balance: f64 = call(rpc, "getbalance", &[], Some(wallet_name.as_str()))?;
            writeln!(out, "Balance ({wallet_name}): {} BTC", format_btc(balance))?;
        }

        Command::Send {
            amount,
            address,
            wallet_name,
        } => {
            let btc = amount.to_btc();
            writeln!(
                out,
                "Sending {} BTC from '{wallet_name}' to {address}...",
                format_btc(btc)
            )?;
            let txid: String = call(
                rpc,
                "sendtoaddress",
                &[json!(address), json!(btc)],
                Some(wallet_name.as_str()),
            )?;
            let txid: Txid = txid.parse()?;

            writeln!(out, "Sent! Transaction ID: {txid}")?;
            writeln!(out, "Don't forget to mine a block to confirm this!")?;
        }

        Command::Check => {
            writeln!(out, "Attempting to connect to Bitcoin Regtest node...")?;
            let info: BlockchainInfo = call(rpc, "getblockchaininfo", &[], None)?;
            writeln!(out, "Connection Successful!")?;
            writeln!(out, "Current Block Height: {}", info.blocks)?;
            writeln!(out, "Chain: {}", info.chain)?;
        }
    }

    Ok(())
}

fn create_wallet<R, W>(rpc: &R, name: &str, out: &mut W) -> Result<()>
where
    R: RpcApi + ?Sized,
    W: Write,
{
    writeln!(out, "Attempting to create wallet '{name}'...")?;

    match call::<Value, _>(rpc, "createwallet", &[json!(name)], None) {
        Ok(_) => {
            writeln!(out, "Wallet '{name}' created!")?;
            return Ok(());
        }
        Err(e) if e.is_wallet_already_exists() => {
            warn!(wallet = name, error = %e, "wallet exists, falling back to loadwallet");
            writeln!(out, "Wallet already exists. Loading...")?;
        }
        Err(e) => return Err(e),
    }

    match call::<Value, _>(rpc, "loadwallet", &[json!(name)], None) {
        Ok(_) => writeln!(out, "Wallet '{name}' loaded.")?,
        Err(e) if e.is_wallet_already_loaded() => {
            writeln!(out, "Wallet '{name}' is already loaded.")?
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

/// Writes the user-facing diagnostic for a failed command.
pub fn report_failure<W: Write>(err: &Error, out: &mut W) -> std::io::Result<()> {
    match err {
        Error::Http { status, body } => {
            writeln!(out, "RPC Error: HTTP {status}")?;
            writeln!(out, "   Server said: {body}")
        }
        Error::Rpc(e) => {
            writeln!(out, "RPC Error: {} (code {})", e.message, e.code)?;
            let error = json!({"code": e.code, "message": e.message});
            writeln!(out, "   Server said: {error}")
        }
        Error::Connection { url, .. } => {
            writeln!(out, "CRITICAL: Could not connect to Bitcoin node at {url}.")?;
            writeln!(out, "   -> Is bitcoind (or its Docker container) running?")
        }
        e => writeln!(out, "Error: {e}"),
    }
}
