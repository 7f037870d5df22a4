use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{Paginated, UserProfile};
use crate::AppState;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<UserProfile>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let (users, total) = state.auth.list_users(limit, offset).await?;

    Ok(Json(Paginated {
        items: users.into_iter().map(UserProfile::from).collect(),
        total,
        limit,
        offset,
    }))
}
