use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::ProductVariant,
    validation::require_non_blank,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VariantFields {
    pub name: String,
    pub size: String,
    pub scent: String,
    pub stock: i32,
    pub price: i64,
}

impl VariantFields {
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_blank("name", &self.name)?;
        require_non_blank("size", &self.size)?;
        require_non_blank("scent", &self.scent)?;
        if self.stock < 0 {
            return Err(AppError::BadRequest("stock must not be negative".into()));
        }
        if self.price <= 0 {
            return Err(AppError::BadRequest("price must be greater than 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariantRequest {
    pub product_id: Uuid,
    #[serde(flatten)]
    pub variant: VariantFields,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariantList {
    pub items: Vec<ProductVariant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(stock: i32, price: i64) -> VariantFields {
        VariantFields {
            name: "Eau de Parfum".into(),
            size: "100ml".into(),
            scent: "Amber".into(),
            stock,
            price,
        }
    }

    #[test]
    fn stock_may_be_zero_but_price_must_be_positive() {
        assert!(fields(0, 1).validate().is_ok());
        assert!(fields(-1, 1).validate().is_err());
        assert!(fields(5, 0).validate().is_err());
    }

    #[test]
    fn blank_scent_is_rejected() {
        let mut f = fields(1, 100);
        f.scent = " ".into();
        assert!(f.validate().is_err());
    }
}
