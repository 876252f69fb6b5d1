//! Persistence collaborators.
//!
//! Orders and products are owned by these stores; the rest of the crate only
//! sees the traits. The in-memory implementations back the services and tests.

mod orders;
mod products;

pub use orders::{InMemoryOrderRepository, OrderRepository};
pub use products::{InMemoryProductStore, ProductStore};
