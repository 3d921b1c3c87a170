//! Billet handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use core_kernel::BilletId;
use domain_remittance::NewBillet;

use super::parse_id;
use crate::auth::permissions;
use crate::context::RequestContext;
use crate::dto::billet::{BilletListParams, BilletResponse, CreateBilletRequest};
use crate::{error::ApiError, AppState};

/// Issues a billet for an installment under a configuration
pub async fn create_billet(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreateBilletRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BilletResponse>), ApiError> {
    let metadata = ctx.require(permissions::BILLET_WRITE)?;
    let Json(request) = payload?;

    let billet = state
        .service
        .create_billet(NewBillet::try_from(request)?, metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(billet.into())))
}

/// Lists billets, optionally by configuration, remittance or unbatched only
pub async fn list_billets(
    State(state): State<AppState>,
    ctx: RequestContext,
    query: Result<Query<BilletListParams>, QueryRejection>,
) -> Result<Json<Vec<BilletResponse>>, ApiError> {
    let metadata = ctx.require(permissions::BILLET_READ)?;
    let Query(params) = query?;
    let billets = state.service.list_billets(params.to_query(), metadata).await?;
    Ok(Json(billets.into_iter().map(Into::into).collect()))
}

pub async fn get_billet(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<BilletResponse>, ApiError> {
    let metadata = ctx.require(permissions::BILLET_READ)?;
    let id: BilletId = parse_id(&id, "billet")?;
    let billet = state.service.get_billet(id, metadata).await?;
    Ok(Json(billet.into()))
}

pub async fn delete_billet(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let metadata = ctx.require(permissions::BILLET_WRITE)?;
    let id: BilletId = parse_id(&id, "billet")?;
    state.service.delete_billet(id, metadata).await?;
    Ok(StatusCode::NO_CONTENT)
}
