//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::CommerceError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed path or query input.
    #[error("{0}")]
    BadRequest(String),
    /// Error returned by a checkout service.
    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, violations) = match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, Vec::new()),
            ApiError::Commerce(err) => match err {
                CommerceError::Validation(_) => (StatusCode::BAD_REQUEST, Vec::new()),
                CommerceError::NotFound { .. } => (StatusCode::NOT_FOUND, Vec::new()),
                CommerceError::Forbidden(_) => (StatusCode::FORBIDDEN, Vec::new()),
                CommerceError::Conflict { violations, .. } => (StatusCode::CONFLICT, violations),
                CommerceError::Dependency { .. } => {
                    tracing::error!(error = %message, "dependency failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
                }
            },
        };

        let body = if violations.is_empty() {
            serde_json::json!({ "error": message })
        } else {
            serde_json::json!({ "error": message, "violations": violations })
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ProductId, Violation};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::from(CommerceError::Validation("bad".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(CommerceError::not_found("Cart", "x")),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(CommerceError::Forbidden("no".to_string())),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::from(CommerceError::conflict("expired")),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(CommerceError::dependency(
                    "load cart",
                    std::io::Error::other("down"),
                )),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::BadRequest("bad id".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_conflict_body_lists_violations() {
        let error = ApiError::from(CommerceError::Conflict {
            message: "1 line(s) could not be reserved".to_string(),
            violations: vec![Violation {
                cart_item_id: None,
                product_id: ProductId::new(),
                code: "insufficient_inventory".to_string(),
                message: "insufficient inventory for 3 unit(s)".to_string(),
            }],
        });

        let response = error.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["violations"][0]["code"], "insufficient_inventory");
    }
}
