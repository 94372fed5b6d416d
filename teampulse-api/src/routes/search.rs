/// Global search
///
/// `GET /v1/search?q=term` returns up to five projects, tasks, teams and team
/// members. Without a current team only the caller's teams are searched.

use crate::{app::AppState, error::ApiResult, middleware::team_context::optional_team_context};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use teampulse_shared::{
    auth::middleware::AuthContext,
    search::{self, SearchResults},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResults>> {
    let ctx = optional_team_context(&state, auth.user_id).await?;

    let results = search::search(&state.db, auth.user_id, ctx.map(|c| c.team_id), &query.q).await?;

    Ok(Json(results))
}
