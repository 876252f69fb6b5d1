//! # Stockflow Web
//!
//! axum routers for the Orders and Products services.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`orders`] | Order creation with stock verification, order reads |
//! | [`products`] | Catalogue CRUD, batch stock query, cached views |
//! | [`problem`] | Validation-problem error bodies |
//! | [`deadline`] | Caller deadline header |

pub mod deadline;
pub mod orders;
pub mod problem;
pub mod products;

use std::net::SocketAddr;

use axum::Router;

pub use deadline::{deadline_from_headers, REQUEST_TIMEOUT_HEADER};
pub use orders::OrdersState;
pub use problem::{ApiError, ProblemDetails};
pub use products::{ProductModel, ProductsState};

/// Binds `addr` and serves `app` until the task is cancelled or the server fails.
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await
}
