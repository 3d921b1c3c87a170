//! Billet configuration handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use core_kernel::ConfigurationId;
use domain_remittance::{ConfigurationChanges, NewBilletConfiguration};

use super::parse_id;
use crate::auth::permissions;
use crate::context::RequestContext;
use crate::dto::configuration::ConfigurationResponse;
use crate::dto::PageParams;
use crate::{error::ApiError, AppState};

/// Creates a configuration; counters start at the given seeds
pub async fn create_configuration(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<NewBilletConfiguration>, JsonRejection>,
) -> Result<(StatusCode, Json<ConfigurationResponse>), ApiError> {
    let metadata = ctx.require(permissions::CONFIGURATION_WRITE)?;
    let Json(request) = payload?;

    let configuration = state.service.create_configuration(request, metadata).await?;
    Ok((StatusCode::CREATED, Json(configuration.into())))
}

pub async fn list_configurations(
    State(state): State<AppState>,
    ctx: RequestContext,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<ConfigurationResponse>>, ApiError> {
    let metadata = ctx.require(permissions::CONFIGURATION_READ)?;
    let Query(params) = query?;
    let configurations = state
        .service
        .list_configurations(params.to_page(), metadata)
        .await?;
    Ok(Json(configurations.into_iter().map(Into::into).collect()))
}

pub async fn get_configuration(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<ConfigurationResponse>, ApiError> {
    let metadata = ctx.require(permissions::CONFIGURATION_READ)?;
    let id: ConfigurationId = parse_id(&id, "configuration")?;
    let configuration = state.service.get_configuration(id, metadata).await?;
    Ok(Json(configuration.into()))
}

/// Partial update; counters never move backwards
pub async fn update_configuration(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<ConfigurationChanges>, JsonRejection>,
) -> Result<Json<ConfigurationResponse>, ApiError> {
    let metadata = ctx.require(permissions::CONFIGURATION_WRITE)?;
    let id: ConfigurationId = parse_id(&id, "configuration")?;
    let Json(changes) = payload?;

    let configuration = state
        .service
        .update_configuration(id, changes, metadata)
        .await?;
    Ok(Json(configuration.into()))
}

pub async fn delete_configuration(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let metadata = ctx.require(permissions::CONFIGURATION_WRITE)?;
    let id: ConfigurationId = parse_id(&id, "configuration")?;
    state.service.delete_configuration(id, metadata).await?;
    Ok(StatusCode::NO_CONTENT)
}
