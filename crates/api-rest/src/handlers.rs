use crate::caller::AuthenticatedCaller;
use crate::convert::{self, DayBound};
use crate::error::{lifecycle_error, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use api_shared::{wire, HealthService};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use wardlab_core::analytics::{self, DateRange};
use wardlab_core::constants::{
    DEFAULT_TREND_DAYS, SUGGESTED_REJECTION_REASONS, SUGGESTED_TESTS,
};
use wardlab_core::{Capability, ListFilter, RequestId, StatusFilter, WardId};

fn parse_id(id: &str) -> ApiResult<RequestId> {
    RequestId::parse(id).map_err(lifecycle_error)
}

fn request_res(state: &AppState, request: &wardlab_core::AddOnRequest) -> wire::AddOnRequestRes {
    convert::request_res(request, state.lifecycle.directory())
}

// ============================================================================
// Health
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = wire::HealthRes)
    )
)]
/// Liveness check. Needs no credentials.
#[axum::debug_handler(state = AppState)]
pub(crate) async fn health() -> Json<wire::HealthRes> {
    Json(HealthService::check_health())
}

// ============================================================================
// Add-on requests
// ============================================================================

#[utoipa::path(
    post,
    path = "/addon-requests",
    request_body = wire::CreateAddOnRequestReq,
    responses(
        (status = 201, description = "Request created as pending", body = wire::AddOnRequestRes),
        (status = 400, description = "Missing or invalid fields", body = wire::ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = wire::ErrorRes),
        (status = 403, description = "Role may not submit requests", body = wire::ErrorRes)
    )
)]
/// Submits a new add-on request on behalf of the calling nurse.
///
/// # Returns
/// * `201` with the stored request, status `pending`
///
/// # Errors
/// * `400` if a required field is blank, the ward is unknown, or the room is not in the ward
#[axum::debug_handler(state = AppState)]
pub(crate) async fn create_request(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiJson(req): ApiJson<wire::CreateAddOnRequestReq>,
) -> ApiResult<(StatusCode, Json<wire::AddOnRequestRes>)> {
    caller
        .require(Capability::SubmitAddon)
        .map_err(lifecycle_error)?;

    let created = state
        .lifecycle
        .create(&caller, convert::draft_from_wire(req))
        .map_err(lifecycle_error)?;

    Ok((StatusCode::CREATED, Json(request_res(&state, &created))))
}

#[utoipa::path(
    get,
    path = "/addon-requests",
    params(wire::ListAddOnRequestsQuery),
    responses(
        (status = 200, description = "Matching requests, newest first", body = wire::ListAddOnRequestsRes),
        (status = 400, description = "Unknown status filter", body = wire::ErrorRes)
    )
)]
/// Lists requests, optionally filtered by status and ward.
#[axum::debug_handler(state = AppState)]
pub(crate) async fn list_requests(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiQuery(query): ApiQuery<wire::ListAddOnRequestsQuery>,
) -> ApiResult<Json<wire::ListAddOnRequestsRes>> {
    caller
        .require(Capability::ViewRequests)
        .map_err(lifecycle_error)?;

    let status: StatusFilter = query
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(lifecycle_error)?;
    let filter = ListFilter {
        status,
        ward_id: query.ward_id.map(WardId),
    };

    let list = state.lifecycle.list(&filter).map_err(lifecycle_error)?;
    Ok(Json(wire::ListAddOnRequestsRes {
        requests: list.iter().map(|r| request_res(&state, r)).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/addon-requests/{id}",
    params(("id" = String, Path, description = "Request id (32 lowercase hex characters)")),
    responses(
        (status = 200, description = "The request", body = wire::AddOnRequestRes),
        (status = 404, description = "No such request", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub(crate) async fn get_request(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<wire::AddOnRequestRes>> {
    caller
        .require(Capability::ViewRequests)
        .map_err(lifecycle_error)?;
    let id = parse_id(&id)?;

    let request = state.lifecycle.get(id).map_err(lifecycle_error)?;
    Ok(Json(request_res(&state, &request)))
}

#[utoipa::path(
    post,
    path = "/addon-requests/{id}/approve",
    params(("id" = String, Path, description = "Request id")),
    request_body = wire::ApproveAddOnRequestReq,
    responses(
        (status = 200, description = "Request approved", body = wire::AddOnRequestRes),
        (status = 400, description = "Unknown approval action", body = wire::ErrorRes),
        (status = 404, description = "No such request", body = wire::ErrorRes),
        (status = 409, description = "Request is not pending, or a concurrent review won", body = wire::ErrorRes)
    )
)]
/// Approves a pending request with a sample-handling action.
#[axum::debug_handler(state = AppState)]
pub(crate) async fn approve_request(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<wire::ApproveAddOnRequestReq>,
) -> ApiResult<Json<wire::AddOnRequestRes>> {
    caller
        .require(Capability::ReviewAddon)
        .map_err(lifecycle_error)?;
    let id = parse_id(&id)?;

    let approved = state
        .lifecycle
        .approve(id, &req.action, &caller)
        .map_err(lifecycle_error)?;
    Ok(Json(request_res(&state, &approved)))
}

#[utoipa::path(
    post,
    path = "/addon-requests/{id}/reject",
    params(("id" = String, Path, description = "Request id")),
    request_body = wire::RejectAddOnRequestReq,
    responses(
        (status = 200, description = "Request rejected", body = wire::AddOnRequestRes),
        (status = 400, description = "Blank rejection reason", body = wire::ErrorRes),
        (status = 404, description = "No such request", body = wire::ErrorRes),
        (status = 409, description = "Request is not pending, or a concurrent review won", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub(crate) async fn reject_request(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<wire::RejectAddOnRequestReq>,
) -> ApiResult<Json<wire::AddOnRequestRes>> {
    caller
        .require(Capability::ReviewAddon)
        .map_err(lifecycle_error)?;
    let id = parse_id(&id)?;

    let rejected = state
        .lifecycle
        .reject(id, &req.reason, &caller)
        .map_err(lifecycle_error)?;
    Ok(Json(request_res(&state, &rejected)))
}

#[utoipa::path(
    post,
    path = "/addon-requests/{id}/complete",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request completed", body = wire::AddOnRequestRes),
        (status = 404, description = "No such request", body = wire::ErrorRes),
        (status = 409, description = "Request is not approved", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub(crate) async fn complete_request(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<wire::AddOnRequestRes>> {
    caller
        .require(Capability::ReviewAddon)
        .map_err(lifecycle_error)?;
    let id = parse_id(&id)?;

    let completed = state
        .lifecycle
        .complete(id, &caller)
        .map_err(lifecycle_error)?;
    Ok(Json(request_res(&state, &completed)))
}

// ============================================================================
// Ward directory
// ============================================================================

#[utoipa::path(
    get,
    path = "/wards",
    responses(
        (status = 200, description = "All wards", body = wire::ListWardsRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub(crate) async fn list_wards(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> ApiResult<Json<wire::ListWardsRes>> {
    caller
        .require(Capability::ViewDirectory)
        .map_err(lifecycle_error)?;
    let wards = state.lifecycle.directory().wards();
    Ok(Json(wire::ListWardsRes {
        wards: wards.into_iter().map(convert::ward_res).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/wards",
    request_body = wire::CreateWardReq,
    responses(
        (status = 201, description = "Ward created", body = wire::WardRes),
        (status = 400, description = "Blank or duplicate name", body = wire::ErrorRes),
        (status = 403, description = "Caller is not an administrator", body = wire::ErrorRes)
    )
)]
/// Adds a ward under the next free id.
#[axum::debug_handler(state = AppState)]
pub(crate) async fn create_ward(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiJson(req): ApiJson<wire::CreateWardReq>,
) -> ApiResult<(StatusCode, Json<wire::WardRes>)> {
    caller
        .require(Capability::ManageDirectory)
        .map_err(lifecycle_error)?;
    let ward = state.lifecycle.create_ward(&req.name).map_err(lifecycle_error)?;
    Ok((StatusCode::CREATED, Json(convert::ward_res(ward))))
}

#[utoipa::path(
    get,
    path = "/rooms",
    params(wire::ListRoomsQuery),
    responses(
        (status = 200, description = "Rooms, optionally limited to one ward", body = wire::ListRoomsRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub(crate) async fn list_rooms(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiQuery(query): ApiQuery<wire::ListRoomsQuery>,
) -> ApiResult<Json<wire::ListRoomsRes>> {
    caller
        .require(Capability::ViewDirectory)
        .map_err(lifecycle_error)?;
    let rooms = state.lifecycle.directory().rooms(query.ward_id.map(WardId));
    Ok(Json(wire::ListRoomsRes {
        rooms: rooms.into_iter().map(convert::room_res).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/rooms/bulk",
    request_body = wire::BulkRoomsReq,
    responses(
        (status = 200, description = "The stored rooms, in request order", body = wire::ListRoomsRes),
        (status = 400, description = "An edit is invalid; nothing was stored", body = wire::ErrorRes),
        (status = 403, description = "Caller is not an administrator", body = wire::ErrorRes)
    )
)]
/// Creates rooms without an `id` and replaces rooms with one, all or nothing.
#[axum::debug_handler(state = AppState)]
pub(crate) async fn update_rooms(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiJson(req): ApiJson<wire::BulkRoomsReq>,
) -> ApiResult<Json<wire::ListRoomsRes>> {
    caller
        .require(Capability::ManageDirectory)
        .map_err(lifecycle_error)?;
    let edits = req.rooms.into_iter().map(convert::room_edit_from_wire).collect();
    let rooms = state
        .lifecycle
        .update_rooms(&caller, edits)
        .map_err(lifecycle_error)?;
    Ok(Json(wire::ListRoomsRes {
        rooms: rooms.into_iter().map(convert::room_res).collect(),
    }))
}

// ============================================================================
// Analytics
// ============================================================================

#[utoipa::path(
    get,
    path = "/analytics/addon-stats",
    params(wire::AddOnStatsQuery),
    responses(
        (status = 200, description = "Aggregated counts for the range", body = wire::AddOnStatsRes),
        (status = 400, description = "Unparseable date", body = wire::ErrorRes),
        (status = 403, description = "Role may not view analytics", body = wire::ErrorRes)
    )
)]
/// Aggregates requests created within an optional inclusive date range.
#[axum::debug_handler(state = AppState)]
pub(crate) async fn addon_stats(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiQuery(query): ApiQuery<wire::AddOnStatsQuery>,
) -> ApiResult<Json<wire::AddOnStatsRes>> {
    caller
        .require(Capability::ViewAnalytics)
        .map_err(lifecycle_error)?;

    let range = DateRange {
        start: convert::parse_date_bound(
            "start_date",
            query.start_date.as_deref(),
            DayBound::Start,
        )
        .map_err(lifecycle_error)?,
        end: convert::parse_date_bound("end_date", query.end_date.as_deref(), DayBound::End)
            .map_err(lifecycle_error)?,
    };

    let list = state
        .lifecycle
        .list(&ListFilter::default())
        .map_err(lifecycle_error)?;
    let stats = analytics::addon_stats(&list, state.lifecycle.directory(), range);
    Ok(Json(convert::stats_res(stats)))
}

#[utoipa::path(
    get,
    path = "/analytics/addon-trends",
    params(wire::AddOnTrendsQuery),
    responses(
        (status = 200, description = "Requests per day over the window", body = wire::AddOnTrendsRes),
        (status = 400, description = "Zero-day window", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub(crate) async fn addon_trends(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiQuery(query): ApiQuery<wire::AddOnTrendsQuery>,
) -> ApiResult<Json<wire::AddOnTrendsRes>> {
    caller
        .require(Capability::ViewAnalytics)
        .map_err(lifecycle_error)?;

    let list = state
        .lifecycle
        .list(&ListFilter::default())
        .map_err(lifecycle_error)?;
    let trends = analytics::addon_trends(
        &list,
        query.days.unwrap_or(DEFAULT_TREND_DAYS),
        Utc::now(),
    )
    .map_err(lifecycle_error)?;
    Ok(Json(convert::trends_res(trends)))
}

// ============================================================================
// Suggestions
// ============================================================================

#[utoipa::path(
    get,
    path = "/suggestions",
    responses(
        (status = 200, description = "Advisory pick-lists", body = wire::SuggestionsRes)
    )
)]
/// Advisory test names and rejection reasons. Free text outside these lists is accepted.
#[axum::debug_handler(state = AppState)]
pub(crate) async fn suggestions(
    AuthenticatedCaller(_caller): AuthenticatedCaller,
) -> Json<wire::SuggestionsRes> {
    Json(wire::SuggestionsRes {
        tests: SUGGESTED_TESTS.iter().map(|s| s.to_string()).collect(),
        rejection_reasons: SUGGESTED_REJECTION_REASONS
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}
