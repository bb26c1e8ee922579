use actix_web::{web, HttpResponse, Responder};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Amount, Block, Ledger, LedgerError, ProofSearch, Transaction};

/// Sender used for the reward paid to the mining node
pub const REWARD_SENDER: &str = "0";

/// State shared by every handler
pub struct NodeState {
    /// The ledger this node serves
    pub ledger: Ledger,

    /// How mining requests search for a proof
    pub search: ProofSearch,

    /// Identifier the mining reward is paid to
    pub node_id: String,

    /// Amount paid for every mined block
    pub mining_reward: Amount,
}

/// Data structure for the node state
pub type NodeData = web::Data<NodeState>;

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    #[schema(value_type = f64)]
    pub amount: Amount,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block that will include this transaction
    pub block_index: u64,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: Block,
}

fn error_response(err: &LedgerError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });

    match err {
        LedgerError::EmptyChain => HttpResponse::Conflict().json(body),
        LedgerError::Serialization(_) | LedgerError::InvalidChain { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        LedgerError::ProofOfWork(_) => HttpResponse::ServiceUnavailable().json(body),
    }
}

/// Get the full blockchain
///
/// Returns the entire blockchain and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(node: NodeData) -> impl Responder {
    let chain = node.ledger.chain();
    let is_valid = node.ledger.is_valid();

    let response = ChainResponse {
        length: chain.len(),
        chain,
        is_valid,
    };

    HttpResponse::Ok().json(response)
}

/// Get the last block
#[utoipa::path(
    get,
    path = "/api/v1/chain/tip",
    responses(
        (status = 200, description = "Last block retrieved successfully", body = Block),
        (status = 409, description = "The chain has no blocks yet")
    )
)]
pub async fn get_tip(node: NodeData) -> impl Responder {
    match node.ledger.tip() {
        Ok(block) => HttpResponse::Ok().json(block),
        Err(err) => error_response(&err),
    }
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.ledger.pending_transactions())
}

/// Create a new transaction
///
/// Adds a new transaction to the pending batch
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = TransactionResponse),
        (status = 400, description = "Invalid transaction data"),
        (status = 409, description = "The chain has no blocks yet")
    )
)]
pub async fn new_transaction(
    node: NodeData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let TransactionRequest {
        sender,
        recipient,
        amount,
    } = transaction_req.into_inner();

    match node.ledger.submit_transaction(sender, recipient, amount) {
        Ok(block_index) => {
            let response = TransactionResponse {
                message: format!("Transaction will be added to Block {}", block_index),
                block_index,
            };

            HttpResponse::Created().json(response)
        }
        Err(err) => {
            warn!("Rejected transaction: {}", err);
            error_response(&err)
        }
    }
}

/// Mine a new block
///
/// Searches a proof for the next block and seals the pending transactions,
/// plus a reward for this node, into it
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 409, description = "The chain has no blocks yet"),
        (status = 503, description = "No proof found within the configured attempts")
    )
)]
pub async fn mine_block(node: NodeData) -> impl Responder {
    let worker = node.clone();
    let mined = web::block(move || {
        let reward = Transaction::new(REWARD_SENDER, worker.node_id.clone(), worker.mining_reward);
        worker.ledger.mine_block(&worker.search, Some(reward))
    })
    .await;

    match mined {
        Ok(Ok(block)) => {
            info!("Node {} mined block {}", node.node_id, block.index);
            let response = MineResponse {
                message: "New Block Forged".to_string(),
                block,
            };

            HttpResponse::Ok().json(response)
        }
        Ok(Err(err)) => {
            warn!("Mining failed: {}", err);
            error_response(&err)
        }
        Err(err) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Mining worker failed: {}", err)
        })),
    }
}

/// Check if the blockchain is valid
///
/// Validates the entire blockchain
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.ledger.is_valid())
}
