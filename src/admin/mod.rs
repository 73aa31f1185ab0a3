//! Admin API.
//!
//! JSON over HTTP on top of `Gateway`: backend and routing-group management,
//! selection lookups and the queue-length table.

pub mod error;
pub mod handlers;

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use self::handlers::*;

pub use self::error::ApiError;
pub use self::handlers::AdminState;

/// Build the admin router with its middleware stack.
#[allow(deprecated)]
pub fn setup_admin_router(state: AdminState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/gateway", get(get_status))
        .route("/gateway/backend/all", get(get_all_backends))
        .route("/gateway/backend/active", get(get_active_backends))
        .route("/gateway/backend/activate/{name}", post(activate_backend))
        .route("/gateway/backend/deactivate/{name}", post(deactivate_backend))
        .route("/gateway/backend/modify/add", post(add_backend))
        .route("/gateway/backend/modify/update", post(update_backend))
        .route("/gateway/backend/modify/delete", post(delete_backend))
        .route(
            "/gateway/routingGroups",
            get(list_routing_groups).post(add_routing_group),
        )
        .route(
            "/gateway/routingGroups/{name}",
            put(upsert_routing_group).delete(delete_routing_group),
        )
        .route(
            "/gateway/routingGroups/pauseRoutingGroup/{name}",
            post(pause_routing_group),
        )
        .route(
            "/gateway/routingGroups/resumeRoutingGroup/{name}",
            post(resume_routing_group),
        )
        .route("/gateway/route/adhoc", get(route_adhoc))
        .route("/gateway/route/group/{name}", get(route_group))
        .route("/gateway/route/query/{id}", get(route_query).post(record_query))
        .route("/gateway/queueLengths", get(get_queue_lengths))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}
