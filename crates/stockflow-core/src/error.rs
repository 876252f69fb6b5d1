use thiserror::Error;

/// Validation and contract errors exposed by `stockflow-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("order must contain at least one item")]
    EmptyOrder,
    #[error("product id must be greater than zero")]
    InvalidProductId,
    #[error("quantity for product {product_id} must be greater than zero")]
    ZeroQuantity { product_id: u32 },

    #[error("product name must be at least {min} characters")]
    NameTooShort { min: usize },
    #[error("product description length {len} exceeds max {max}")]
    DescriptionTooLong { len: usize, max: usize },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("route id {path_id} does not match payload id {body_id}")]
    IdMismatch { path_id: u32, body_id: u32 },
}

impl ValidationError {
    /// Payload field the error is keyed under in validation problem responses.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyOrder => "OrderItems",
            Self::InvalidProductId | Self::IdMismatch { .. } => "ProductId",
            Self::ZeroQuantity { .. } => "Quantity",
            Self::NameTooShort { .. } => "Name",
            Self::DescriptionTooLong { .. } => "Description",
            Self::NonFiniteValue { field } | Self::NegativeValue { field } => field,
        }
    }
}

/// Failure reported by a persistence collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}
