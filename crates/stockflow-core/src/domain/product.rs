use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Catalogue identifier of a product.
pub type ProductId = u32;

/// Snapshot of stock levels keyed by product, produced once per verification call.
pub type StockMap = HashMap<ProductId, ProductStock>;

const VAT_MULTIPLIER: f64 = 1.19;
const MIN_NAME_LEN: usize = 2;
const MAX_DESCRIPTION_LEN: usize = 100;

/// Authoritative product record owned by the Products service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    /// Quantity left in stock.
    pub stock: u32,
    #[serde(default)]
    pub category_id: u32,
}

impl Product {
    /// Price including VAT.
    pub fn full_price(&self) -> f64 {
        self.price * VAT_MULTIPLIER
    }

    pub fn stock_snapshot(&self) -> ProductStock {
        ProductStock::new(self.id, self.stock)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id == 0 {
            return Err(ValidationError::InvalidProductId);
        }
        validate_fields(&self.name, &self.description, self.price)
    }
}

/// Product payload before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: u32,
    #[serde(default)]
    pub category_id: u32,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, &self.description, self.price)
    }

    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
        }
    }
}

fn validate_fields(name: &str, description: &str, price: f64) -> Result<(), ValidationError> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN });
    }
    let description_len = description.chars().count();
    if description_len > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong {
            len: description_len,
            max: MAX_DESCRIPTION_LEN,
        });
    }
    if !price.is_finite() {
        return Err(ValidationError::NonFiniteValue { field: "Price" });
    }
    if price < 0.0 {
        return Err(ValidationError::NegativeValue { field: "Price" });
    }
    Ok(())
}

/// Current stock count for a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub product_id: ProductId,
    pub stock: u32,
}

impl ProductStock {
    pub const fn new(product_id: ProductId, stock: u32) -> Self {
        Self { product_id, stock }
    }
}
