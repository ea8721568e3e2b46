// crates.io
use axum::{
	Json,
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde_json::json;
// self
use crate::_prelude::*;

/// Error responses of the data API. Bodies are `{"message": ...}`.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// Missing or rejected bearer token.
	#[error("Not authenticated")]
	Unauthorized,
	/// Request body failed validation.
	#[error("{0}")]
	Validation(String),
	/// Unknown data item.
	#[error("Data item not found")]
	NotFound,
	/// The request conflicts with the collection's state.
	#[error("{0}")]
	Conflict(String),
	/// Anything else.
	#[error("Internal error")]
	Internal,
}
impl ApiError {
	/// Status code of the response.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Unauthorized => StatusCode::UNAUTHORIZED,
			Self::Validation(_) => StatusCode::BAD_REQUEST,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::Conflict(_) => StatusCode::CONFLICT,
			Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status(), Json(json!({ "message": self.to_string() }))).into_response()
	}
}
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		match e {
			Error::ValidationFailed { reason } => Self::Validation(reason),
			Error::NotFound { .. } => Self::NotFound,
			Error::EmptyCollection => Self::Conflict(e.to_string()),
			e => {
				tracing::error!(error = %e, "data API internal error");

				Self::Internal
			},
		}
	}
}
// Extractor rejections keep axum's status-free wording but use the API's JSON body and a 400.
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::Validation(rejection.body_text())
	}
}
impl From<PathRejection> for ApiError {
	fn from(rejection: PathRejection) -> Self {
		Self::Validation(rejection.body_text())
	}
}
impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		Self::Validation(rejection.body_text())
	}
}
