//! # API REST
//!
//! HTTP/JSON surface for the ward/lab add-on request service.
//!
//! Handlers authenticate the caller from headers, check the caller's role against the
//! capability each route needs, and hand off to [`wardlab_core::LifecycleService`]. No
//! business rules live here.
//!
//! The router is built by [`router`] and served by the workspace's `wardlab-run` binary.

mod caller;
mod convert;
pub mod error;
mod extract;
mod handlers;

use api_shared::wire;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use wardlab_core::{CoreConfig, LifecycleService};

pub use caller::AuthenticatedCaller;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    lifecycle: LifecycleService,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, lifecycle: LifecycleService) -> Self {
        Self { cfg, lifecycle }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_request,
        handlers::list_requests,
        handlers::get_request,
        handlers::approve_request,
        handlers::reject_request,
        handlers::complete_request,
        handlers::list_wards,
        handlers::create_ward,
        handlers::list_rooms,
        handlers::update_rooms,
        handlers::addon_stats,
        handlers::addon_trends,
        handlers::suggestions,
    ),
    components(schemas(
        wire::HealthRes,
        wire::ErrorRes,
        wire::StaffRef,
        wire::CreateAddOnRequestReq,
        wire::ApproveAddOnRequestReq,
        wire::RejectAddOnRequestReq,
        wire::AuditEntryRes,
        wire::AddOnRequestRes,
        wire::ListAddOnRequestsRes,
        wire::WardRes,
        wire::CreateWardReq,
        wire::ListWardsRes,
        wire::NurseContactRes,
        wire::RoomRes,
        wire::RoomEditReq,
        wire::BulkRoomsReq,
        wire::ListRoomsRes,
        wire::ShiftStatsRes,
        wire::StatusBreakdownRes,
        wire::AddOnStatsRes,
        wire::AddOnTrendsRes,
        wire::SuggestionsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST router: API routes, Swagger UI, CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/addon-requests",
            get(handlers::list_requests).post(handlers::create_request),
        )
        .route("/addon-requests/:id", get(handlers::get_request))
        .route(
            "/addon-requests/:id/approve",
            post(handlers::approve_request),
        )
        .route("/addon-requests/:id/reject", post(handlers::reject_request))
        .route(
            "/addon-requests/:id/complete",
            post(handlers::complete_request),
        )
        .route(
            "/wards",
            get(handlers::list_wards).post(handlers::create_ward),
        )
        .route("/rooms", get(handlers::list_rooms))
        .route("/rooms/bulk", post(handlers::update_rooms))
        .route("/analytics/addon-stats", get(handlers::addon_stats))
        .route("/analytics/addon-trends", get(handlers::addon_trends))
        .route("/suggestions", get(handlers::suggestions))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
