use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use pow_ledger::api::{self, ApiDoc, NodeState};
use pow_ledger::blockchain::Ledger;
use pow_ledger::config::{self, NodeConfig};

// Create the ledger and seal its genesis block
fn initialize_ledger(config: &NodeConfig) -> anyhow::Result<Ledger> {
    let ledger = Ledger::new();
    let genesis = ledger
        .create_block(config.genesis.proof, Some(config.genesis.previous_hash.clone()))
        .context("failed to create the genesis block")?;

    info!(
        "Created genesis block with proof {} and hash {}",
        genesis.proof,
        genesis.canonical_hash()?
    );

    Ok(ledger)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::load_config().context("failed to load configuration")?;
    let ledger = initialize_ledger(&config)?;

    // Unique address for this node, used as the mining reward recipient
    let node_id = Uuid::new_v4().simple().to_string();
    info!("Node identifier: {}", node_id);

    let node = web::Data::new(NodeState {
        ledger,
        search: config.miner.proof_search(),
        node_id,
        mining_reward: config.miner.reward,
    });

    let host = config.server.host.clone();
    let port = config.server.port;
    info!("Starting HTTP server at http://{}:{}", host, port);

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(node.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi())
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
