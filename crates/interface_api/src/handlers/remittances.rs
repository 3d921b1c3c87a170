//! Remittance handlers
//!
//! Batch membership, submission and the CNAB400 file itself. Generated files
//! are returned as `text/plain` attachments named after the bank's scheme.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use core_kernel::{BilletId, RemittanceId};
use tracing::info;
use validator::Validate;

use super::parse_id;
use crate::auth::permissions;
use crate::context::RequestContext;
use crate::dto::remittance::{AddBilletsRequest, RemittanceResponse};
use crate::dto::PageParams;
use crate::{error::ApiError, AppState};

/// Line count of the generated file
pub const LINE_COUNT_HEADER: &str = "x-remittance-lines";
/// Number of fields cut to fit their width
pub const TRUNCATIONS_HEADER: &str = "x-remittance-truncations";

/// Opens an empty batch; bank and configuration follow its first billet
pub async fn create_remittance(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<(StatusCode, Json<RemittanceResponse>), ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_WRITE)?;
    let remittance = state.service.create_remittance(metadata).await?;
    Ok((StatusCode::CREATED, Json(remittance.into())))
}

pub async fn list_remittances(
    State(state): State<AppState>,
    ctx: RequestContext,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<RemittanceResponse>>, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_READ)?;
    let Query(params) = query?;
    let remittances = state
        .service
        .list_remittances(params.to_page(), metadata)
        .await?;
    Ok(Json(remittances.into_iter().map(Into::into).collect()))
}

pub async fn get_remittance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<RemittanceResponse>, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_READ)?;
    let id: RemittanceId = parse_id(&id, "remittance")?;
    let remittance = state.service.get_remittance(id, metadata).await?;
    Ok(Json(remittance.into()))
}

/// Deletes an unsubmitted batch and frees its billets
pub async fn delete_remittance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_WRITE)?;
    let id: RemittanceId = parse_id(&id, "remittance")?;
    state.service.delete_remittance(id, metadata).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Adds a set of billets; any conflict rejects the whole set
pub async fn add_billets(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<AddBilletsRequest>, JsonRejection>,
) -> Result<Json<RemittanceResponse>, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_WRITE)?;
    let id: RemittanceId = parse_id(&id, "remittance")?;
    let Json(request) = payload?;
    request.validate()?;

    let remittance = state
        .service
        .add_billets(id, &request.billet_ids, metadata)
        .await?;
    Ok(Json(remittance.into()))
}

pub async fn remove_billet(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((id, billet_id)): Path<(String, String)>,
) -> Result<Json<RemittanceResponse>, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_WRITE)?;
    let id: RemittanceId = parse_id(&id, "remittance")?;
    let billet_id: BilletId = parse_id(&billet_id, "billet")?;

    let remittance = state.service.remove_billet(id, billet_id, metadata).await?;
    Ok(Json(remittance.into()))
}

/// Marks the batch as sent to the bank; membership is frozen afterwards
pub async fn submit_remittance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<RemittanceResponse>, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_SUBMIT)?;
    let id: RemittanceId = parse_id(&id, "remittance")?;
    let remittance = state.service.submit_remittance(id, metadata).await?;
    Ok(Json(remittance.into()))
}

/// Generates (or regenerates) the CNAB400 file
pub async fn generate_file(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_SUBMIT)?;
    let id: RemittanceId = parse_id(&id, "remittance")?;

    let file = state.service.generate_file(id, metadata).await?;
    info!(
        remittance_id = %id,
        file_name = %file.file_name,
        lines = file.line_count,
        truncations = file.truncations.len(),
        "Remittance file served"
    );

    let mut response = attachment(&file.file_name, file.bytes)?;
    let headers = response.headers_mut();
    headers.insert(LINE_COUNT_HEADER, HeaderValue::from(file.line_count));
    headers.insert(TRUNCATIONS_HEADER, HeaderValue::from(file.truncations.len()));
    Ok(response)
}

/// Returns the last generated file
pub async fn download_file(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let metadata = ctx.require(permissions::REMITTANCE_READ)?;
    let id: RemittanceId = parse_id(&id, "remittance")?;

    let file = state.service.download_file(id, metadata).await?;
    attachment(&file.file_name, file.bytes)
}

fn attachment(file_name: &str, bytes: Vec<u8>) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| ApiError::Internal(format!("invalid file name '{}': {}", file_name, e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=us-ascii")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
