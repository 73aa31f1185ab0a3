//! Admin API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{DirectoryError, RoutingError};

/// A routing error rendered as `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub RoutingError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RoutingError::GroupNotFound(_) | RoutingError::QueryNotFound(_) => StatusCode::NOT_FOUND,
            RoutingError::Directory(DirectoryError::BackendNotFound(_)) => StatusCode::NOT_FOUND,
            RoutingError::DuplicateGroup(_)
            | RoutingError::Directory(DirectoryError::DuplicateBackend(_)) => StatusCode::CONFLICT,
            RoutingError::UnknownBackendAddress(_)
            | RoutingError::Directory(DirectoryError::InvalidAddress(_)) => StatusCode::BAD_REQUEST,
            RoutingError::NoBackendsAvailable(_) | RoutingError::GroupPaused(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RoutingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Admin request failed");
        } else {
            tracing::debug!(status = %status, error = %self.0, "Admin request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RoutingError::GroupNotFound("g".into()), StatusCode::NOT_FOUND),
            (RoutingError::QueryNotFound("q".into()), StatusCode::NOT_FOUND),
            (RoutingError::DuplicateGroup("g".into()), StatusCode::CONFLICT),
            (RoutingError::NoBackendsAvailable("adhoc".into()), StatusCode::SERVICE_UNAVAILABLE),
            (RoutingError::GroupPaused("adhoc".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                RoutingError::Directory(DirectoryError::BackendNotFound("b".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                RoutingError::Directory(DirectoryError::DuplicateBackend("b".into())),
                StatusCode::CONFLICT,
            ),
            (
                RoutingError::Directory(DirectoryError::InvalidAddress("nope".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                RoutingError::UnknownBackendAddress("http://elsewhere:1".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RoutingError::Store(StoreError::Io(std::io::Error::other("disk"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
