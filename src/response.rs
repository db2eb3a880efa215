use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
    pub total_pages: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            total_pages: Some(total_pages),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            total_pages: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Acknowledges a delete by echoing the removed id.
    pub fn deleted(message: impl Into<String>, id: Uuid) -> Self {
        Self::success(message, serde_json::json!({ "id": id }), Some(Meta::empty()))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{ApiResponse, Meta};

    #[test]
    fn deleted_echoes_the_id() {
        let id = Uuid::new_v4();
        let resp = ApiResponse::deleted("Brand deleted", id);
        assert_eq!(resp.message, "Brand deleted");
        assert_eq!(resp.data, Some(serde_json::json!({ "id": id })));
        assert!(resp.meta.is_some_and(|m| m.total.is_none()));
    }

    #[test]
    fn total_pages_rounds_up() {
        let meta = Meta::new(1, 20, 41);
        assert_eq!(meta.total_pages, Some(3));

        let exact = Meta::new(2, 10, 20);
        assert_eq!(exact.total_pages, Some(2));

        let none = Meta::new(1, 20, 0);
        assert_eq!(none.total_pages, Some(0));
    }
}
