//! API Server Module
//!
//! This module implements a JSON-RPC server over the ledger sequencer.
//! It provides an HTTP endpoint that accepts calls vouched for by the
//! external signing layer, submits them to the sequencer, and serves
//! read-only queries over committed state.
//!
//! # Methods
//! - Mutating: `registerBatch`, `transferOwnership`, `createAuction`, `bid`,
//!   `withdraw`, `endAuction` (all take `from`)
//! - Reads: `getBatch`, `batchCount`, `auctions`, `pendingReturns`,
//!   `activeAuctions`, `getEvents`

use crate::{Call, LedgerError, config::ApiConfig, sequencer::Sequencer};
use axum::{Json, Router, extract::State, routing::post};
use ethers::types::Address;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{error, info, warn};

/// Standard JSON-RPC error codes, plus the application range for ledger rejections
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
const LEDGER_REJECTED: i32 = -32000;

/// Shared application state that is accessible across all request handlers
#[derive(Clone)]
pub struct AppState {
    sequencer: Sequencer,
}

/// The main API server struct
///
/// Encapsulates the server configuration and the sequencer handle.
pub struct Server {
    config: ApiConfig,
    state: AppState,
}

impl Server {
    /// Creates a new API server instance
    ///
    /// # Arguments
    /// * `config` - Listen address settings
    /// * `sequencer` - Handle to the ledger sequencer
    pub fn new(config: ApiConfig, sequencer: Sequencer) -> Self {
        Self {
            config,
            state: AppState { sequencer },
        }
    }

    /// Starts the API server and begins listening for incoming requests
    ///
    /// # Returns
    /// `Ok(())` when the server shuts down, or an error if binding fails
    pub async fn start(self) -> anyhow::Result<()> {
        let app = router(self.state.sequencer);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the router with a single POST endpoint that handles JSON-RPC requests
pub fn router(sequencer: Sequencer) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .with_state(AppState { sequencer })
}

/// JSON-RPC 2.0 request structure
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Value,
}

/// JSON-RPC 2.0 response structure
///
/// Either `result` or `error` will be populated, but not both.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

/// JSON-RPC error object
///
/// - `code`: Error code (e.g., -32601 for method not found, -32000 for ledger rejections)
/// - `message`: Human-readable error description
/// - `data`: For ledger rejections, `{"kind": "<error kind>"}`
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }

    fn rejected(id: Value, e: LedgerError) -> Self {
        let code = match e {
            LedgerError::Halted(_) | LedgerError::Journal(_) => INTERNAL_ERROR,
            _ => LEDGER_REJECTED,
        };
        Self::failure(id, code, e.to_string(), Some(json!({ "kind": e.kind() })))
    }
}

/// Failure inside a handler, turned into a JSON-RPC error by `handle_rpc`
enum RpcFailure {
    InvalidParams(String),
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for RpcFailure {
    fn from(e: LedgerError) -> Self {
        RpcFailure::Ledger(e)
    }
}

/// Main RPC request handler
///
/// Routes the request to the appropriate handler based on the method name.
async fn handle_rpc(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    info!("Received RPC request: {}", request.method);
    let id = request.id.clone();

    let result = match request.method.as_str() {
        "registerBatch" | "transferOwnership" | "createAuction" | "bid" | "withdraw"
        | "endAuction" => handle_submit(&state, &request.method, request.params).await,
        "getBatch" => handle_get_batch(&state, request.params).await,
        "batchCount" => Ok(json!(state.sequencer.batch_count().await)),
        "auctions" => handle_auctions(&state, request.params).await,
        "pendingReturns" => handle_pending_returns(&state, request.params).await,
        "activeAuctions" => to_value(state.sequencer.active_auctions().await),
        "getEvents" => handle_get_events(&state, request.params).await,
        _ => {
            return Json(JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                "Method not found".to_string(),
                None,
            ));
        }
    };

    Json(match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(RpcFailure::InvalidParams(message)) => JsonRpcResponse::failure(
            id,
            INVALID_PARAMS,
            format!("Invalid params: {}", message),
            None,
        ),
        Err(RpcFailure::Ledger(e)) => JsonRpcResponse::rejected(id, e),
        Err(RpcFailure::Internal(message)) => {
            error!("Internal error: {}", message);
            JsonRpcResponse::failure(id, INTERNAL_ERROR, message, None)
        }
    })
}

/// Handles every mutating method
///
/// 1. Reads the caller identity from `from`
/// 2. Decodes the remaining params into a ledger `Call`
/// 3. Submits it to the sequencer and returns the receipt
async fn handle_submit(state: &AppState, method: &str, params: Value) -> Result<Value, RpcFailure> {
    let (from, call) = parse_submission(method, params).map_err(|e| {
        error!("Failed to decode {} params: {}", method, e);
        RpcFailure::InvalidParams(e)
    })?;

    match state.sequencer.submit(from, call).await {
        Ok(receipt) => {
            info!("Call #{} ({}) from {:?} committed", receipt.seq, method, from);
            to_value(receipt)
        }
        Err(e) => {
            warn!("Call {} from {:?} rejected: {}", method, from, e);
            Err(e.into())
        }
    }
}

/// Split submission params into the caller and the ledger call
fn parse_submission(method: &str, params: Value) -> Result<(Address, Call), String> {
    #[derive(Deserialize)]
    struct Caller {
        from: Address,
    }

    let Caller { from } = serde_json::from_value(params.clone()).map_err(|e| e.to_string())?;

    let mut args = params;
    if let Value::Object(map) = &mut args {
        map.remove("from");
    }

    let envelope = match method {
        "withdraw" => json!({ "method": method }),
        _ => json!({ "method": method, "params": args }),
    };

    let call = serde_json::from_value(envelope).map_err(|e| e.to_string())?;
    Ok((from, call))
}

async fn handle_get_batch(state: &AppState, params: Value) -> Result<Value, RpcFailure> {
    #[derive(Deserialize)]
    struct Params {
        id: u64,
    }

    let Params { id } = decode(params)?;
    to_value(state.sequencer.get_batch(id).await?)
}

async fn handle_auctions(state: &AppState, params: Value) -> Result<Value, RpcFailure> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        batch_id: u64,
    }

    let Params { batch_id } = decode(params)?;
    to_value(state.sequencer.auction(batch_id).await)
}

async fn handle_pending_returns(state: &AppState, params: Value) -> Result<Value, RpcFailure> {
    #[derive(Deserialize)]
    struct Params {
        account: Address,
    }

    let Params { account } = decode(params)?;
    to_value(state.sequencer.pending_returns(account).await)
}

async fn handle_get_events(state: &AppState, params: Value) -> Result<Value, RpcFailure> {
    #[derive(Deserialize)]
    struct Params {
        #[serde(default)]
        since: u64,
    }

    let Params { since } = decode(params)?;
    to_value(state.sequencer.events_since(since).await?)
}

fn decode<T: DeserializeOwned>(params: Value) -> Result<T, RpcFailure> {
    serde_json::from_value(params).map_err(|e| RpcFailure::InvalidParams(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcFailure> {
    serde_json::to_value(value).map_err(|e| RpcFailure::Internal(format!("encoding failed: {}", e)))
}
