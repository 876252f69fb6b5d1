use std::sync::Arc;

use axum::Router;
use stockflow_core::{
    HttpStockClient, InMemoryOrderRepository, OrderOrchestrator, ReqwestHttpClient,
    ResiliencePipeline, ResilientStockClient, StockVerifier,
};
use stockflow_web::orders::{self, OrdersState};

use crate::cli::OrdersServeArgs;
use crate::error::CliError;

pub async fn serve(args: OrdersServeArgs) -> Result<(), CliError> {
    let app = build_router(&args)?;
    tracing::info!(
        products_url = %args.products_url,
        verification = ?args.verification,
        "starting orders service"
    );
    stockflow_web::serve(app, args.bind).await?;
    Ok(())
}

/// Builds the process-wide singletons once and shares them across requests.
fn build_router(args: &OrdersServeArgs) -> Result<Router, CliError> {
    let products_url = args.products_url.trim();
    if !(products_url.starts_with("http://") || products_url.starts_with("https://")) {
        return Err(CliError::ProductsUrl(args.products_url.clone()));
    }

    let config = args.pipeline.to_config();
    let client = HttpStockClient::new(Arc::new(ReqwestHttpClient::new()), products_url)
        .with_request_timeout(config.attempt_timeout);
    let pipeline = Arc::new(ResiliencePipeline::new(config));
    let stock = Arc::new(ResilientStockClient::new(client, pipeline));

    let orchestrator = OrderOrchestrator::new(
        stock,
        StockVerifier::new(args.verification.into()),
        Arc::new(InMemoryOrderRepository::new()),
    );
    Ok(orders::router(OrdersState::new(Arc::new(orchestrator))))
}
