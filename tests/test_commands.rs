//! Dispatcher tests against a scripted node.
//!
//! `ScriptedNode` answers calls from a queue of canned replies and records
//! every call it receives, so each test can assert the exact RPC sequence a
//! command produces.

use std::cell::RefCell;
use std::collections::VecDeque;

use btc_regtest_cli::jsonrpc::error::RpcError;
use btc_regtest_cli::jsonrpc::serde_json::{Value, json};
use btc_regtest_cli::{Command, Error, RpcApi, commands};
use corepc_types::bitcoin::Amount;

const HASH_A: &str = "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206";
const HASH_B: &str = "3ad0b7b6f4c0d5e8f8c3a9ad6e8e7c3c2a1b0f9e8d7c6b5a4f3e2d1c0b0a0908";
const TXID: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[derive(Debug, Clone, PartialEq)]
struct RecordedCall {
    method: String,
    params: Vec<Value>,
    wallet: Option<String>,
}

#[derive(Default)]
struct ScriptedNode {
    replies: RefCell<VecDeque<Result<Value, Error>>>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl ScriptedNode {
    fn new(replies: Vec<Result<Value, Error>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::default(),
        }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }
}

impl RpcApi for ScriptedNode {
    fn call_raw(&self, method: &str, args: &[Value], wallet: Option<&str>) -> Result<Value, Error> {
        self.calls.borrow_mut().push(RecordedCall {
            method: method.to_string(),
            params: args.to_vec(),
            wallet: wallet.map(str::to_string),
        });
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected RPC call: {method}"))
    }
}

fn call(method: &str, params: Vec<Value>, wallet: Option<&str>) -> RecordedCall {
    RecordedCall {
        method: method.to_string(),
        params,
        wallet: wallet.map(str::to_string),
    }
}

fn rpc_error(code: i32, message: &str) -> Error {
    Error::Rpc(RpcError {
        code,
        message: message.to_string(),
        data: None,
    })
}

/// Runs `command` and returns the node's call log and the printed output.
fn run(node: &ScriptedNode, command: Command) -> (Result<(), Error>, String) {
    let mut out = Vec::new();
    let result = commands::run(node, &command, &mut out);
    (result, String::from_utf8(out).expect("output is utf-8"))
}

#[test]
fn test_getinfo_prints_chain_and_height() {
    let node = ScriptedNode::new(vec![Ok(json!({
        "chain": "regtest",
        "blocks": 101,
        "headers": 101,
        "bestblockhash": HASH_A,
    }))]);

    let (result, out) = run(&node, Command::GetInfo);

    result.expect("getinfo should succeed");
    assert_eq!(node.calls(), vec![call("getblockchaininfo", vec![], None)]);
    assert!(out.contains("Chain: regtest"));
    assert!(out.contains("Blocks: 101"));
}

#[test]
fn test_check_reports_successful_connection() {
    let node = ScriptedNode::new(vec![Ok(json!({"chain": "regtest", "blocks": 7}))]);

    let (result, out) = run(&node, Command::Check);

    result.expect("check should succeed");
    assert_eq!(node.calls(), vec![call("getblockchaininfo", vec![], None)]);
    assert!(out.contains("Connection Successful!"));
    assert!(out.contains("Current Block Height: 7"));
}

#[test]
fn test_createwallet_creates_new_wallet() {
    let node = ScriptedNode::new(vec![Ok(json!({"name": "test", "warning": ""}))]);

    let (result, out) = run(
        &node,
        Command::CreateWallet {
            name: "test".to_string(),
        },
    );

    result.expect("createwallet should succeed");
    assert_eq!(node.calls(), vec![call("createwallet", vec![json!("test")], None)]);
    assert!(out.contains("Wallet 'test' created!"));
}

#[test]
fn test_createwallet_falls_back_to_loadwallet_when_wallet_exists() {
    let node = ScriptedNode::new(vec![
        Err(rpc_error(
            -4,
            "Wallet file verification failed. Failed to create database path '/data/regtest/wallets/test'. Database already exists.",
        )),
        Ok(json!({"name": "test", "warning": ""})),
    ]);

    let (result, out) = run(
        &node,
        Command::CreateWallet {
            name: "test".to_string(),
        },
    );

    result.expect("createwallet should fall back to loading");
    assert_eq!(
        node.calls(),
        vec![
            call("createwallet", vec![json!("test")], None),
            call("loadwallet", vec![json!("test")], None),
        ]
    );
    assert!(out.contains("Wallet 'test' loaded."));
}

#[test]
fn test_createwallet_accepts_wallet_already_loaded() {
    let node = ScriptedNode::new(vec![
        Err(rpc_error(-4, "Database already exists.")),
        Err(rpc_error(-35, "Wallet \"test\" is already loaded.")),
    ]);

    let (result, out) = run(
        &node,
        Command::CreateWallet {
            name: "test".to_string(),
        },
    );

    result.expect("an already loaded wallet is not a failure");
    assert_eq!(node.calls().len(), 2);
    assert!(out.contains("Wallet 'test' is already loaded."));
}

#[test]
fn test_createwallet_does_not_load_on_unrelated_failure() {
    let node = ScriptedNode::new(vec![Err(Error::Http {
        status: 401,
        body: String::new(),
    })]);

    let (result, _) = run(
        &node,
        Command::CreateWallet {
            name: "test".to_string(),
        },
    );

    assert!(matches!(result, Err(Error::Http { status: 401, .. })));
    assert_eq!(node.calls(), vec![call("createwallet", vec![json!("test")], None)]);
}

#[test]
fn test_getnewaddress_is_routed_to_wallet() {
    let node = ScriptedNode::new(vec![Ok(json!("bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080"))]);

    let (result, out) = run(
        &node,
        Command::GetNewAddress {
            wallet_name: "alice".to_string(),
        },
    );

    result.expect("getnewaddress should succeed");
    assert_eq!(node.calls(), vec![call("getnewaddress", vec![], Some("alice"))]);
    assert!(out.contains("New Address (alice): bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080"));
}

#[test]
fn test_mine_reports_last_hash() {
    let node = ScriptedNode::new(vec![Ok(json!([HASH_A, HASH_B]))]);

    let (result, out) = run(
        &node,
        Command::Mine {
            blocks: 2,
            address: "bcrt1qminer".to_string(),
        },
    );

    result.expect("mine should succeed");
    assert_eq!(
        node.calls(),
        vec![call(
            "generatetoaddress",
            vec![json!(2), json!("bcrt1qminer")],
            None
        )]
    );
    assert!(out.contains("Mining 2 blocks..."));
    assert!(out.contains("Mined 2 blocks."));
    assert!(out.contains(&format!("Last Hash: {HASH_B}")));
    assert!(!out.contains(&format!("Last Hash: {HASH_A}")));
}

#[test]
fn test_mine_zero_blocks_omits_last_hash() {
    let node = ScriptedNode::new(vec![Ok(json!([]))]);

    let (result, out) = run(
        &node,
        Command::Mine {
            blocks: 0,
            address: "bcrt1qminer".to_string(),
        },
    );

    result.expect("mining zero blocks is not an error");
    assert!(out.contains("Mined 0 blocks."));
    assert!(!out.contains("Last Hash"));
}

#[test]
fn test_mine_rejects_malformed_hash() {
    let node = ScriptedNode::new(vec![Ok(json!(["not-a-hash"]))]);

    let (result, _) = run(
        &node,
        Command::Mine {
            blocks: 1,
            address: "bcrt1qminer".to_string(),
        },
    );

    assert!(matches!(result, Err(Error::HexToArray(_))));
}

#[test]
fn test_getbalance_prints_wallet_and_value() {
    let node = ScriptedNode::new(vec![Ok(json!(0.5))]);

    let (result, out) = run(
        &node,
        Command::GetBalance {
            wallet_name: "mywallet".to_string(),
        },
    );

    result.expect("getbalance should succeed");
    assert_eq!(node.calls(), vec![call("getbalance", vec![], Some("mywallet"))]);
    let line = out
        .lines()
        .find(|l| l.contains("0.5"))
        .expect("balance line");
    assert!(line.contains("mywallet"));
}

#[test]
fn test_getbalance_prints_whole_amounts_with_a_fraction() {
    let node = ScriptedNode::new(vec![Ok(json!(5000))]);

    let (result, out) = run(
        &node,
        Command::GetBalance {
            wallet_name: "miner".to_string(),
        },
    );

    result.expect("getbalance should succeed");
    assert!(out.contains("Balance (miner): 5000.0 BTC"));
}

#[test]
fn test_send_orders_address_before_amount() {
    let node = ScriptedNode::new(vec![Ok(json!(TXID))]);

    let (result, out) = run(
        &node,
        Command::Send {
            amount: Amount::from_sat(50_000_000),
            address: "bcrt1qbob".to_string(),
            wallet_name: "alice".to_string(),
        },
    );

    result.expect("send should succeed");
    assert_eq!(
        node.calls(),
        vec![call(
            "sendtoaddress",
            vec![json!("bcrt1qbob"), json!(0.5)],
            Some("alice")
        )]
    );
    assert!(out.contains("Sending 0.5 BTC from 'alice' to bcrt1qbob..."));
    assert!(out.contains(&format!("Sent! Transaction ID: {TXID}")));
    assert!(out.contains("mine a block"));
}

#[test]
fn test_failure_stops_further_calls() {
    let node = ScriptedNode::new(vec![Err(Error::Http {
        status: 500,
        body: "work queue depth exceeded".to_string(),
    })]);

    let (result, out) = run(
        &node,
        Command::Send {
            amount: Amount::ONE_BTC,
            address: "bcrt1qbob".to_string(),
            wallet_name: "alice".to_string(),
        },
    );

    assert!(matches!(result, Err(Error::Http { status: 500, .. })));
    assert_eq!(node.calls().len(), 1);
    assert!(!out.contains("Sent!"));
}

#[test]
fn test_report_failure_for_rpc_error() {
    let mut out = Vec::new();
    commands::report_failure(&rpc_error(-18, "Requested wallet does not exist or is not loaded"), &mut out)
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Requested wallet does not exist or is not loaded"));
    assert!(text.contains("-18"));
    assert!(text.contains("Server said:"));
}
