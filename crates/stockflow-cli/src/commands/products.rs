use std::path::Path;
use std::sync::Arc;

use axum::Router;
use stockflow_core::{
    InMemoryProductStore, InMemorySharedCache, Product, ProductStore, ProductViews, TieredCache,
};
use stockflow_web::products::{self, ProductsState};

use crate::cli::ProductsServeArgs;
use crate::error::CliError;

pub async fn serve(args: ProductsServeArgs) -> Result<(), CliError> {
    let seed = match &args.seed {
        Some(path) => load_seed(path)?,
        None => Vec::new(),
    };
    tracing::info!(products = seed.len(), "starting products service");
    let app = build_router(&args, seed);
    stockflow_web::serve(app, args.bind).await?;
    Ok(())
}

fn build_router(args: &ProductsServeArgs, seed: Vec<Product>) -> Router {
    let store: Arc<dyn ProductStore> = Arc::new(InMemoryProductStore::with_products(seed));
    let cache = TieredCache::new(
        args.cache.local_config(),
        Arc::new(InMemorySharedCache::new()),
        args.cache.tier_policy(),
    );
    let views = Arc::new(ProductViews::new(
        Arc::clone(&store),
        cache,
        args.thresholds(),
    ));
    products::router(ProductsState::new(store, views))
}

/// Reads and validates a JSON array of products.
fn load_seed(path: &Path) -> Result<Vec<Product>, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::SeedRead {
        path: path.to_path_buf(),
        source,
    })?;
    let products: Vec<Product> =
        serde_json::from_str(&raw).map_err(|source| CliError::SeedFormat {
            path: path.to_path_buf(),
            source,
        })?;
    products.iter().try_for_each(Product::validate)?;
    Ok(products)
}
