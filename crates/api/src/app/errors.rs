use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use loomworks_auth::AuthzError;
use loomworks_core::DomainError;
use loomworks_infra::command_dispatcher::DispatchError;
use loomworks_infra::dropdowns::DropdownStoreError;
use loomworks_pricing::PricingError;
use loomworks_reporting::ExportError;

/// Handlers answer with a JSON body either way.
pub type ApiResult = Result<Response, Response>;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn not_found(what: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

pub fn invalid_id(what: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

pub fn bad_request(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn forbidden(err: AuthzError) -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn dispatch_error_to_response(err: DispatchError) -> Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::TenantIsolation(msg) => json_error(StatusCode::FORBIDDEN, "tenant_isolation", msg),
        DispatchError::Deserialize(msg) => {
            tracing::error!(error = %msg, "stored event no longer deserializes");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => {
            tracing::error!(error = %e, "event store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    dispatch_error_to_response(DispatchError::from(err))
}

pub fn dropdown_error_to_response(err: DropdownStoreError) -> Response {
    match err {
        DropdownStoreError::Domain(e) => domain_error_to_response(e),
        e @ DropdownStoreError::Duplicate { .. } => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
        DropdownStoreError::NotFound => not_found("dropdown option"),
        DropdownStoreError::Backend(msg) => {
            tracing::error!(error = %msg, "dropdown store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn pricing_error_to_response(err: PricingError) -> Response {
    bad_request(err.to_string())
}

pub fn export_error_to_response(err: ExportError) -> Response {
    match err {
        e @ ExportError::UnknownFormat(_) => bad_request(e.to_string()),
        e => json_error(StatusCode::INTERNAL_SERVER_ERROR, "export_error", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (DispatchError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DispatchError::InvariantViolation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (DispatchError::Conflict("x".into()), StatusCode::CONFLICT),
            (DispatchError::Concurrency("x".into()), StatusCode::CONFLICT),
            (DispatchError::NotFound, StatusCode::NOT_FOUND),
            (DispatchError::TenantIsolation("x".into()), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(dispatch_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn duplicate_dropdown_is_a_conflict() {
        let err = DropdownStoreError::Duplicate {
            category: loomworks_masterdata::DropdownCategory::Color,
            value: "Red".into(),
        };
        assert_eq!(dropdown_error_to_response(err).status(), StatusCode::CONFLICT);
    }
}
