// HTTP error responses for service failures
use crate::application::error::ServiceError;
use crate::application::evaluator::EvalError;
use crate::application::tag_store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl ServiceError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::Syntax(_) => (StatusCode::BAD_REQUEST, "syntax_error"),
            ServiceError::InvalidTagId(_)
            | ServiceError::Eval(EvalError::InvalidTagId(_))
            | ServiceError::Store(StoreError::InvalidTagId(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_tag_id")
            }
            ServiceError::Eval(EvalError::UnknownTag(_))
            | ServiceError::Store(StoreError::UnknownTag(_)) => (StatusCode::NOT_FOUND, "unknown_tag"),
            ServiceError::Eval(EvalError::Function(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "function_error")
            }
            ServiceError::Eval(EvalError::Misaligned(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "misaligned_series")
            }
            ServiceError::Window(_) => (StatusCode::BAD_REQUEST, "invalid_window"),
            ServiceError::NotASeries(_) => (StatusCode::UNPROCESSABLE_ENTITY, "not_a_series"),
            ServiceError::TagExists(_) => (StatusCode::CONFLICT, "tag_exists"),
            ServiceError::NoData => (StatusCode::CONFLICT, "no_data"),
            ServiceError::Eval(EvalError::Store(_)) | ServiceError::Store(StoreError::Backend(_)) => {
                (StatusCode::BAD_GATEWAY, "store_error")
            }
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let position = match &self {
            ServiceError::Syntax(e) => Some(e.position),
            _ => None,
        };
        let body = ErrorBody {
            error: kind,
            message: self.to_string(),
            position,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::formula::parse;

    #[test]
    fn test_status_mapping() {
        let syntax = ServiceError::from(parse("PI001 +").unwrap_err());
        assert_eq!(syntax.status_and_kind(), (StatusCode::BAD_REQUEST, "syntax_error"));

        let unknown = ServiceError::Eval(EvalError::UnknownTag("ZZ001".into()));
        assert_eq!(unknown.status_and_kind().0, StatusCode::NOT_FOUND);

        let backend = ServiceError::Store(StoreError::Backend(anyhow::anyhow!("down")));
        assert_eq!(backend.status_and_kind().0, StatusCode::BAD_GATEWAY);

        assert_eq!(ServiceError::NoData.into_response().status(), StatusCode::CONFLICT);

        let exists = ServiceError::TagExists(crate::domain::tag::TagId::parse("PI001").unwrap());
        assert_eq!(exists.status_and_kind(), (StatusCode::CONFLICT, "tag_exists"));
    }
}
