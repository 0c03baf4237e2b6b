//! Response envelope handed to the HTTP layer.

use serde::Serialize;

use crate::{CrosslistError, Result, utils};

/// `{ success, data | error, timestamp }` as the dashboard client expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    #[serde(skip)]
    status: u16,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: utils::time::rfc3339_now(),
            status: 200,
        }
    }

    /// Success for an operation that created a resource.
    pub fn created(data: T) -> Self {
        Self {
            status: 201,
            ..Self::ok(data)
        }
    }

    pub fn error(err: &CrosslistError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            timestamp: utils::time::rfc3339_now(),
            status: err.status_code(),
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::error(&err),
        }
    }

    /// HTTP status code for this response.
    pub fn status(&self) -> u16 {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::from_result(Ok(json!({"id": "p1"})));
        assert_eq!(response.status(), 200);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["data"]["id"], json!("p1"));
        assert!(value.get("error").is_none());
        assert!(value.get("status").is_none());
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_created_status() {
        assert_eq!(ApiResponse::created("p1").status(), 201);
    }

    #[test]
    fn test_error_envelope() {
        let response: ApiResponse<()> = ApiResponse::from_result(Err(CrosslistError::validation("Item name is required")));
        assert_eq!(response.status(), 400);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Item name is required"));

        let response: ApiResponse<()> = ApiResponse::from_result(Err(CrosslistError::NotFound("Project p1 not found".into())));
        assert_eq!(response.status(), 404);
        assert!(serde_json::to_value(&response).unwrap().get("data").is_none());
    }
}
