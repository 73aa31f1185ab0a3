use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::error::ApiError;
use crate::backend::BackendDescriptor;
use crate::gateway::Gateway;
use crate::groups::RoutingGroupRecord;
use crate::routing::queue_length::QueueLengthMap;

pub type AdminState = Arc<Gateway>;
type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

/// Selected backend address.
#[derive(Debug, Serialize, Deserialize)]
pub struct RouteTarget {
    pub backend: String,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

pub async fn get_all_backends(State(gateway): State<AdminState>) -> ApiResult<Json<Vec<BackendDescriptor>>> {
    Ok(Json(gateway.list_backends().await?))
}

pub async fn get_active_backends(
    State(gateway): State<AdminState>,
) -> ApiResult<Json<Vec<BackendDescriptor>>> {
    Ok(Json(gateway.list_active_backends().await?))
}

pub async fn activate_backend(
    State(gateway): State<AdminState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    gateway.activate_backend(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deactivate_backend(
    State(gateway): State<AdminState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    gateway.deactivate_backend(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_backend(
    State(gateway): State<AdminState>,
    Json(backend): Json<BackendDescriptor>,
) -> ApiResult<Json<BackendDescriptor>> {
    Ok(Json(gateway.add_backend(backend)?))
}

pub async fn update_backend(
    State(gateway): State<AdminState>,
    Json(backend): Json<BackendDescriptor>,
) -> ApiResult<Json<BackendDescriptor>> {
    Ok(Json(gateway.update_backend(backend)?))
}

/// The request body is the bare backend name.
pub async fn delete_backend(State(gateway): State<AdminState>, name: String) -> ApiResult<StatusCode> {
    gateway.remove_backend(name.trim())?;
    Ok(StatusCode::OK)
}

pub async fn list_routing_groups(
    State(gateway): State<AdminState>,
) -> ApiResult<Json<Vec<RoutingGroupRecord>>> {
    Ok(Json(gateway.list_routing_groups().await?))
}

pub async fn add_routing_group(
    State(gateway): State<AdminState>,
    Json(group): Json<RoutingGroupRecord>,
) -> ApiResult<StatusCode> {
    gateway.add_routing_group(&group).await?;
    Ok(StatusCode::CREATED)
}

pub async fn upsert_routing_group(
    State(gateway): State<AdminState>,
    Path(name): Path<String>,
    Json(mut group): Json<RoutingGroupRecord>,
) -> ApiResult<StatusCode> {
    group.name = name;
    gateway.upsert_routing_group(&group).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_routing_group(
    State(gateway): State<AdminState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    gateway.delete_routing_group(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pause_routing_group(
    State(gateway): State<AdminState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    gateway.pause_group(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resume_routing_group(
    State(gateway): State<AdminState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    gateway.resume_group(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn route_adhoc(State(gateway): State<AdminState>) -> ApiResult<Json<RouteTarget>> {
    let backend = gateway.select_adhoc_backend().await?;
    Ok(Json(RouteTarget { backend }))
}

pub async fn route_group(
    State(gateway): State<AdminState>,
    Path(name): Path<String>,
) -> ApiResult<Json<RouteTarget>> {
    let backend = gateway.select_backend_for_group(&name).await?;
    Ok(Json(RouteTarget { backend }))
}

pub async fn route_query(
    State(gateway): State<AdminState>,
    Path(query_id): Path<String>,
) -> ApiResult<Json<RouteTarget>> {
    let backend = gateway.resolve_backend_for_query(&query_id).await?;
    Ok(Json(RouteTarget { backend }))
}

/// Pin a query id to the backend it was submitted to.
pub async fn record_query(
    State(gateway): State<AdminState>,
    Path(query_id): Path<String>,
    Json(target): Json<RouteTarget>,
) -> ApiResult<StatusCode> {
    gateway.record_query_backend(&query_id, &target.backend)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_queue_lengths(State(gateway): State<AdminState>) -> Json<QueueLengthMap> {
    Json((*gateway.queue_lengths()).clone())
}
