use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, models::Address, validation::require_non_blank};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddressRequest {
    pub house_number: String,
    pub street_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

impl AddressRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_blank("house_number", &self.house_number)?;
        require_non_blank("street_name", &self.street_name)?;
        require_non_blank("city", &self.city)?;
        require_non_blank("state", &self.state)?;
        require_non_blank("country", &self.country)?;
        require_non_blank("postal_code", &self.postal_code)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminCreateAddressRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub address: AddressRequest,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressList {
    pub items: Vec<Address>,
}
