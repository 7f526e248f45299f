//! A local JSON-RPC node for tests.
//!
//! Answers the handful of methods the client uses with canned values and records the method of
//! every request it receives, so tests can assert exactly what crossed the network.

use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::{keccak256, Address, Bytes};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

/// Gas price returned by `eth_gasPrice`.
pub const FAKE_GAS_PRICE: u64 = 1_000_000_000;

#[derive(Debug, Default)]
struct NodeState {
    chain_id: u64,
    call_result: Mutex<Bytes>,
    receipt_status: Mutex<Option<bool>>,
    requests: Mutex<Vec<String>>,
    raw_transactions: Mutex<Vec<Bytes>>,
}

/// A running fake node bound to an ephemeral local port.
#[derive(Debug)]
pub struct FakeNode {
    url: String,
    state: Arc<NodeState>,
}

impl FakeNode {
    /// Starts a node reporting `chain_id`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn(chain_id: u64) -> Self {
        let state = Arc::new(NodeState { chain_id, ..Default::default() });
        let app = Router::new().route("/", post(handle)).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake node");
        let url = format!("http://{}", listener.local_addr().expect("fake node address"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { url, state }
    }

    /// The HTTP endpoint of the node.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sets the raw return data answered to every `eth_call`.
    pub fn set_call_result(&self, data: impl Into<Bytes>) {
        *self.state.call_result.lock().unwrap_or_else(PoisonError::into_inner) = data.into();
    }

    /// Makes `eth_getTransactionReceipt` answer a mined receipt with `status`, or `null` for
    /// `None`.
    pub fn set_receipt_status(&self, status: Option<bool>) {
        *self.state.receipt_status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// The methods of all requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The raw signed transactions received through `eth_sendRawTransaction`.
    #[must_use]
    pub fn raw_transactions(&self) -> Vec<Bytes> {
        self.state.raw_transactions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

async fn handle(State(state): State<Arc<NodeState>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    state.requests.lock().unwrap_or_else(PoisonError::into_inner).push(method.clone());

    let result = match method.as_str() {
        "eth_chainId" => json!(format!("{:#x}", state.chain_id)),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_gasPrice" => json!(format!("{FAKE_GAS_PRICE:#x}")),
        "eth_getTransactionReceipt" => {
            let status = *state.receipt_status.lock().unwrap_or_else(PoisonError::into_inner);
            match status {
                Some(status) => receipt(&request["params"][0], status),
                None => Value::Null,
            }
        }
        "eth_call" => {
            let data = state.call_result.lock().unwrap_or_else(PoisonError::into_inner).clone();
            json!(data)
        }
        "eth_sendRawTransaction" => {
            let raw: Option<Bytes> = serde_json::from_value(request["params"][0].clone()).ok();
            match raw {
                Some(raw) => {
                    let hash = keccak256(&raw);
                    state.raw_transactions.lock().unwrap_or_else(PoisonError::into_inner).push(raw);
                    json!(hash)
                }
                None => return rpc_error(id, -32602, "invalid raw transaction"),
            }
        }
        _ => return rpc_error(id, -32601, "method not found"),
    };

    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn receipt(hash: &Value, status: bool) -> Value {
    json!({
        "type": "0x0",
        "status": if status { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x5208",
        "logs": [],
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": format!("0x{}", "11".repeat(32)),
        "blockNumber": "0x10",
        "gasUsed": "0x5208",
        "effectiveGasPrice": format!("{FAKE_GAS_PRICE:#x}"),
        "from": Address::ZERO,
        "to": Address::ZERO,
        "contractAddress": null,
    })
}

fn rpc_error(id: Value, code: i64, message: &str) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } }))
}
