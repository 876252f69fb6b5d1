//! Domain models shared by the Orders and Products services.

mod order;
mod product;

pub use order::{Order, OrderId, OrderItemRequest, OrderRequest};
pub use product::{NewProduct, Product, ProductId, ProductStock, StockMap};
