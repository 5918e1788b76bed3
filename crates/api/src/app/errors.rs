use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use roster_core::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::InvalidInput(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_input", msg)
        }
        ServiceError::BackendUnavailable(msg) => {
            tracing::error!(error = %msg, "backend unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable", msg)
        }
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_input", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::EntityKind;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::NotFound(EntityKind::Team), StatusCode::NOT_FOUND),
            (ServiceError::conflict("dup"), StatusCode::CONFLICT),
            (ServiceError::invalid_input("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::unavailable("down"), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
