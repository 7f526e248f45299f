#![allow(dead_code)]

use std::{fs, path::Path, time::Duration};

use alloy::providers::RootProvider;
use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use apus_market_core::{AddressBook, ArtifactLoader, KeyRing, MarketClient, RoleBook, RoleResolver};
use apus_rpc::{configure_provider, testing::FakeNode, TransactionSubmitter};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const CHAIN_ID: u64 = 167_007;
pub const GAS_LIMIT: u64 = 3_000_000;
pub const OWNER_KEY: &str = "0x91c6c377cc072cd187fed1caaa6527896f58f10cb20667235c87b07c64b33955";
pub const PROVIDER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const MARKET: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const PROOF_TASK: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";
pub const PROVER: &str = "0x9fE46736679d2D9a65F0992F58272dC2d6eE3000";

pub fn owner() -> PrivateKeySigner {
    OWNER_KEY.parse().unwrap()
}

pub fn provider_signer() -> PrivateKeySigner {
    PROVIDER_KEY.parse().unwrap()
}

fn function(name: &str, inputs: Value, outputs: Value, mutability: &str) -> Value {
    json!({
        "type": "function",
        "name": name,
        "inputs": inputs,
        "outputs": outputs,
        "stateMutability": mutability,
    })
}

fn owner_and_id() -> Value {
    json!([
        { "name": "owner", "type": "address", "internalType": "address" },
        { "name": "id", "type": "uint256", "internalType": "uint256" },
    ])
}

pub fn client_config_param() -> Value {
    json!({
        "name": "config",
        "type": "tuple",
        "internalType": "struct Market.ClientConfig",
        "components": [
            { "name": "owner", "type": "address", "internalType": "address" },
            { "name": "id", "type": "uint256", "internalType": "uint256" },
            { "name": "url", "type": "string", "internalType": "string" },
            { "name": "minFee", "type": "uint256", "internalType": "uint256" },
            { "name": "maxZkEvmInstance", "type": "uint32", "internalType": "uint32" },
            { "name": "curInstance", "type": "uint32", "internalType": "uint32" },
        ],
    })
}

pub fn market_abi() -> Value {
    Value::Array(vec![
        function("get", json!([]), json!([{ "name": "", "type": "uint256" }]), "view"),
        function(
            "getLowestN",
            json!([]),
            json!([{ "name": "", "type": "uint256[]" }]),
            "view",
        ),
        function(
            "getProverConfig",
            owner_and_id(),
            json!([client_config_param()]),
            "view",
        ),
        function("joinMarket", json!([client_config_param()]), json!([]), "nonpayable"),
        function("dispatchTaskToClient", owner_and_id(), json!([]), "nonpayable"),
        function("releaseTaskToClient", owner_and_id(), json!([]), "nonpayable"),
        json!({
            "type": "event",
            "name": "ClientJoined",
            "inputs": [{ "name": "owner", "type": "address", "indexed": true }],
            "anonymous": false,
        }),
    ])
}

pub fn prover_abi() -> Value {
    json!([function(
        "setProofTaskContract",
        json!([{ "name": "proofTask", "type": "address", "internalType": "address" }]),
        json!([]),
        "nonpayable",
    )])
}

pub fn proof_task_abi() -> Value {
    json!([function("owner", json!([]), json!([{ "name": "", "type": "address" }]), "view")])
}

fn write_artifact(root: &Path, name: &str, address: &str, abi: &Value) {
    for dir in ["contract_address", "contracts"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(
        root.join("contract_address").join(name),
        json!({ "address": address }).to_string(),
    )
    .unwrap();
    fs::write(
        root.join("contracts").join(name),
        json!({ "contractName": name.trim_end_matches(".json"), "abi": abi }).to_string(),
    )
    .unwrap();
}

/// Writes the three contract artifacts into a fresh build directory.
pub fn build_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "Market.json", MARKET, &market_abi());
    write_artifact(dir.path(), "ApusProofTask.json", PROOF_TASK, &proof_task_abi());
    write_artifact(dir.path(), "ApusIProver.json", PROVER, &prover_abi());
    dir
}

pub fn address_book(dir: &TempDir) -> AddressBook {
    let loader = ArtifactLoader::new(dir.path());
    AddressBook {
        market: loader.load("Market.json").unwrap(),
        proof_task: loader.load("ApusProofTask.json").unwrap(),
        prover: loader.load("ApusIProver.json").unwrap(),
    }
}

/// A client acting as the accounts in `book`, signing with `keys`.
pub fn client(node: &FakeNode, book: RoleBook, keys: KeyRing) -> MarketClient<RootProvider> {
    let dir = build_dir();
    let provider = configure_provider(node.url()).unwrap();
    let submitter = TransactionSubmitter::new(CHAIN_ID, GAS_LIMIT, Duration::from_secs(5));
    MarketClient::new(provider, &address_book(&dir), RoleResolver::new(book, keys), submitter)
}

/// A client where every role maps to the owner key.
pub fn owner_client(node: &FakeNode) -> MarketClient<RootProvider> {
    client(node, RoleBook::single(owner().address()), KeyRing::from_hex_keys([OWNER_KEY]).unwrap())
}

pub fn parse(address: &str) -> Address {
    address.parse().unwrap()
}
