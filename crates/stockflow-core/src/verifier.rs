//! Pure stock sufficiency checks for order lines.

use std::collections::BTreeMap;

use crate::domain::{OrderItemRequest, ProductId, StockMap};

/// How repeated product lines within one order are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerificationMode {
    /// Every line is checked on its own against the full stock count.
    #[default]
    PerLine,
    /// Quantities for the same product are added up before checking.
    Summed,
}

/// First order line the fetched stock cannot satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub product_id: ProductId,
    pub requested: u64,
    /// `None` when the product is unknown to the stock service.
    pub available: Option<u32>,
}

/// Returns `true` when every line is covered by `stocks`.
pub fn verify(items: &[OrderItemRequest], stocks: &StockMap) -> bool {
    StockVerifier::default().verify(items, stocks)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockVerifier {
    mode: VerificationMode,
}

impl StockVerifier {
    pub const fn new(mode: VerificationMode) -> Self {
        Self { mode }
    }

    pub const fn mode(&self) -> VerificationMode {
        self.mode
    }

    pub fn verify(&self, items: &[OrderItemRequest], stocks: &StockMap) -> bool {
        self.first_shortfall(items, stocks).is_none()
    }

    pub fn first_shortfall(
        &self,
        items: &[OrderItemRequest],
        stocks: &StockMap,
    ) -> Option<Shortfall> {
        match self.mode {
            VerificationMode::PerLine => items
                .iter()
                .find_map(|item| shortfall(item.product_id, u64::from(item.quantity), stocks)),
            VerificationMode::Summed => {
                let mut totals: BTreeMap<ProductId, u64> = BTreeMap::new();
                for item in items {
                    *totals.entry(item.product_id).or_default() += u64::from(item.quantity);
                }
                totals
                    .into_iter()
                    .find_map(|(product_id, requested)| shortfall(product_id, requested, stocks))
            }
        }
    }
}

fn shortfall(product_id: ProductId, requested: u64, stocks: &StockMap) -> Option<Shortfall> {
    let available = stocks.get(&product_id).map(|stock| stock.stock);
    match available {
        Some(stock) if u64::from(stock) >= requested => None,
        _ => Some(Shortfall {
            product_id,
            requested,
            available,
        }),
    }
}
