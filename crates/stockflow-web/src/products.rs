//! Products service routes.
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `GET /api/products[?categoryId=]` | catalogue listing |
//! | `POST /api/products` | create, `201` with `Location` |
//! | `GET/PUT/DELETE/HEAD /api/products/:id` | single product |
//! | `POST /api/products/stocks` | batch stock query used by the Orders service |
//! | `GET /api/products/limitedstock` | cached view, stock at or below 30 |
//! | `GET /api/products/overstocked` | cached view, stock above 100 |
//!
//! Catalogue writes invalidate both cached views in this instance.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use stockflow_core::stock_client::{StockQuery, StockQueryResponse, STOCK_QUERY_PATH};
use stockflow_core::{
    NewProduct, Product, ProductId, ProductStore, ProductViews, ValidationError,
};
use tower_http::trace::TraceLayer;

use crate::problem::ApiError;

const LIMITED_STOCK_CACHE_CONTROL: &str = "public, max-age=5";

#[derive(Clone)]
pub struct ProductsState {
    store: Arc<dyn ProductStore>,
    views: Arc<ProductViews>,
}

impl ProductsState {
    pub fn new(store: Arc<dyn ProductStore>, views: Arc<ProductViews>) -> Self {
        Self { store, views }
    }
}

/// Product as returned by catalogue reads, with the VAT-inclusive price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductModel {
    #[serde(flatten)]
    pub product: Product,
    pub full_price: f64,
}

impl From<Product> for ProductModel {
    fn from(product: Product) -> Self {
        Self {
            full_price: product.full_price(),
            product,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    category_id: Option<u32>,
}

pub fn router(state: ProductsState) -> Router {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(STOCK_QUERY_PATH, post(product_stocks))
        .route("/api/products/limitedstock", get(limited_stock))
        .route("/api/products/overstocked", get(overstocked))
        .route(
            "/api/products/:id",
            get(get_product)
                .put(update_product)
                .delete(delete_product)
                .head(product_exists),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_products(
    State(state): State<ProductsState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProductModel>>, ApiError> {
    let products = match query.category_id {
        Some(category_id) => state.store.list_by_category(category_id).await?,
        None => state.store.list_products().await?,
    };
    Ok(Json(products.into_iter().map(ProductModel::from).collect()))
}

async fn create_product(
    State(state): State<ProductsState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(product) = payload?;
    product.validate()?;

    let created = state.store.add_product(product).await?;
    state.views.invalidate_all().await;
    tracing::info!(product_id = created.id, "product created");

    let location = format!("/api/products/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ProductModel::from(created)),
    ))
}

async fn get_product(
    State(state): State<ProductsState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductModel>, ApiError> {
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id}")))?;
    Ok(Json(product.into()))
}

async fn update_product(
    State(state): State<ProductsState>,
    Path(id): Path<ProductId>,
    payload: Result<Json<Product>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(product) = payload?;
    if product.id != id {
        return Err(ValidationError::IdMismatch {
            path_id: id,
            body_id: product.id,
        }
        .into());
    }
    if !state.store.product_exists(id).await? {
        return Err(ApiError::NotFound(format!("product {id}")));
    }
    product.validate()?;

    let updated = state.store.update_product(product).await?;
    state.views.invalidate_all().await;
    tracing::info!(product_id = id, "product updated");
    Ok(Json(updated))
}

async fn delete_product(
    State(state): State<ProductsState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_product(id).await? {
        return Err(ApiError::NotFound(format!("product {id}")));
    }
    state.views.invalidate_all().await;
    tracing::info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn product_exists(
    State(state): State<ProductsState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    if state.store.product_exists(id).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::NotFound(format!("product {id}")))
    }
}

async fn product_stocks(
    State(state): State<ProductsState>,
    payload: Result<Json<StockQuery>, JsonRejection>,
) -> Result<Json<StockQueryResponse>, ApiError> {
    let Json(query) = payload?;
    let stocks = state.store.product_stocks(&query.product_ids).await?;
    Ok(Json(
        stocks
            .into_iter()
            .map(|stock| (stock.product_id, stock.stock))
            .collect(),
    ))
}

async fn limited_stock(State(state): State<ProductsState>) -> Result<impl IntoResponse, ApiError> {
    let products = state.views.limited_stock().await?;
    Ok((
        [
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static(LIMITED_STOCK_CACHE_CONTROL),
            ),
            (header::VARY, HeaderValue::from_static("User-Agent")),
        ],
        Json(products.as_ref().clone()),
    ))
}

async fn overstocked(State(state): State<ProductsState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.views.overstocked().await?;
    Ok(Json(products.as_ref().clone()))
}
