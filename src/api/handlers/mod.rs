use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use super::middleware::AuthorizationContext;
use super::AppState;
use crate::error::{DomainsError, Result};
use crate::models::*;

/// Parses an optional JSON properties body. An empty body or a JSON `null`
/// means no properties were sent.
fn parse_properties(body: &Bytes) -> Result<Option<DomainProperties>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map_err(|e| DomainsError::invalid_argument(format!("Invalid domain properties: {}", e)))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Domains
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDomainsQuery {
    /// Only list domains with this external id.
    pub external_id: Option<String>,
}

pub async fn list_domains(
    State(service): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Query(query): Query<ListDomainsQuery>,
) -> Result<Json<Resources>> {
    service
        .list_domains(context.granted(), query.external_id.as_deref())
        .map(Json)
}

pub async fn create_domain(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Link>)> {
    let props = parse_properties(&body)?;
    service
        .create_domain(props)
        .map(|link| (StatusCode::CREATED, Json(link)))
}

pub async fn get_domain(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DomainView>> {
    service
        .get_domain(&id)?
        .view()?
        .map(Json)
        .ok_or(DomainsError::NotFound)
}

pub async fn delete_domain(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if service.get_domain(&id)?.delete()? {
        tracing::info!("Deleted domain {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DomainsError::NotFound)
    }
}

// ============================================================
// Domain properties
// ============================================================

pub async fn get_domain_properties(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DomainProperties>> {
    service
        .get_domain(&id)?
        .properties()?
        .map(Json)
        .ok_or(DomainsError::NotFound)
}

pub async fn update_domain_properties(
    State(service): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<DomainView>> {
    let props = parse_properties(&body)?
        .ok_or_else(|| DomainsError::invalid_argument("Missing domain properties"))?;

    service
        .get_domain(&id)?
        .update_properties(&props)?
        .map(Json)
        .ok_or(DomainsError::NotFound)
}
