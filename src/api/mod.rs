// API module
//
// This module contains the HTTP surface of the ledger node

pub mod handlers;
pub mod routes;

use utoipa::OpenApi;

// Re-export main components for easier access
pub use handlers::{NodeData, NodeState};
pub use routes::configure_routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_chain,
        handlers::get_tip,
        handlers::get_pending_transactions,
        handlers::new_transaction,
        handlers::mine_block,
        handlers::validate_chain
    ),
    components(
        schemas(
            crate::blockchain::Block,
            crate::blockchain::Transaction,
            handlers::ChainResponse,
            handlers::TransactionRequest,
            handlers::TransactionResponse,
            handlers::MineResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node API endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "1.0.0",
        description = "Submit transactions, mine blocks and read the chain",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
