// crates.io
use axum::{
	Json,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, PathRejection, QueryRejection},
	},
	http::{StatusCode, header::LOCATION},
	response::IntoResponse,
};
// self
use crate::{
	_prelude::*,
	api::{ProfileClaim, TokenValidation, UserProfile},
	catalog::{DataItem, NewDataItem},
	server::{ApiError, AppState, Caller},
};

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
	search: Option<String>,
}

pub(super) async fn list_items(
	State(state): State<AppState>,
	Caller(caller): Caller,
	query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<DataItem>>, ApiError> {
	let Query(params) = query?;

	tracing::info!(user = caller.email().unwrap_or("unknown"), "data requested");

	Ok(Json(state.store.search(params.search.as_deref())))
}

pub(super) async fn get_item(
	State(state): State<AppState>,
	_caller: Caller,
	path: Result<Path<u64>, PathRejection>,
) -> Result<Json<DataItem>, ApiError> {
	let Path(id) = path?;

	Ok(Json(state.store.get(id)?))
}

pub(super) async fn create_item(
	State(state): State<AppState>,
	Caller(caller): Caller,
	body: Result<Json<NewDataItem>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
	let Json(request) = body?;
	let item = state.store.create(request, caller.email())?;
	let location = format!("/api/data/{}", item.id);

	tracing::info!(id = item.id, title = %item.title, "data item created");

	Ok((StatusCode::CREATED, [(LOCATION, location)], Json(item)))
}

pub(super) async fn delete_item(
	State(state): State<AppState>,
	_caller: Caller,
	path: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
	let Path(id) = path?;
	let item = state.store.delete(id)?;

	tracing::info!(id, title = %item.title, "data item deleted");

	Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn profile(Caller(caller): Caller) -> Json<UserProfile> {
	tracing::info!(user = caller.email().unwrap_or("unknown"), "profile requested");

	Json(UserProfile {
		id: caller.subject().map(str::to_owned),
		email: caller.email().map(str::to_owned),
		name: caller.name().map(str::to_owned),
		authenticated: true,
		claims: caller
			.iter()
			.map(|(kind, value)| ProfileClaim { kind: kind.to_owned(), value: value.to_owned() })
			.collect(),
	})
}

pub(super) async fn validate(_caller: Caller) -> Json<TokenValidation> {
	Json(TokenValidation { authenticated: true, timestamp: OffsetDateTime::now_utc() })
}
