//! JSON wire types.
//!
//! These are the exact shapes exchanged over HTTP. Free-text and enum-like inputs arrive as
//! plain strings and every field defaults, so that a missing or unknown value reaches core
//! validation and comes back as a `validation_error` instead of a body-parse failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

// ============================================================================
// Common
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Error body returned by every failing endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Stable error kind, e.g. `validation_error`, `invalid_transition`, `not_found`.
    pub error: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StaffRef {
    pub user_id: String,
    pub name: String,
    pub role: String,
}

// ============================================================================
// Add-on requests
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateAddOnRequestReq {
    pub ward_id: Option<u32>,
    pub room_id: Option<u32>,
    pub room_number: String,
    pub patient_id: String,
    pub requested_test: String,
    pub reason: String,
    pub is_urgent: bool,
    pub has_previous_sample: bool,
    pub previous_sample_id: Option<String>,
    pub additional_comment: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ApproveAddOnRequestReq {
    /// `add_to_same_sample` or `need_new_sample`.
    pub action: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RejectAddOnRequestReq {
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryRes {
    pub action: String,
    pub performed_by: StaffRef,
    pub at: String,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddOnRequestRes {
    pub id: String,
    pub ward_id: u32,
    pub ward_name: Option<String>,
    pub room_id: Option<u32>,
    pub room_number: String,
    pub patient_id: String,
    pub requested_test: String,
    pub reason: String,
    pub is_urgent: bool,
    pub has_previous_sample: bool,
    pub previous_sample_id: Option<String>,
    pub additional_comment: Option<String>,
    pub status: String,
    pub approval_action: Option<String>,
    pub rejection_reason: Option<String>,
    pub requested_by: StaffRef,
    pub created_at: String,
    pub reviewed_by: Option<StaffRef>,
    pub reviewed_at: Option<String>,
    pub completed_by: Option<StaffRef>,
    pub completed_at: Option<String>,
    pub history: Vec<AuditEntryRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListAddOnRequestsRes {
    pub requests: Vec<AddOnRequestRes>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAddOnRequestsQuery {
    /// Exact status, or empty/`all` for every status.
    pub status: Option<String>,
    pub ward_id: Option<u32>,
}

// ============================================================================
// Ward directory
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WardRes {
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateWardReq {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListWardsRes {
    pub wards: Vec<WardRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NurseContactRes {
    pub name: String,
    pub extension: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoomRes {
    pub id: u32,
    pub ward_id: u32,
    pub ward_name: String,
    pub room_number: String,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub primary_nurse: NurseContactRes,
    pub backup_nurse: Option<NurseContactRes>,
    pub charge_nurse_name: Option<String>,
    pub shift_type: String,
    pub notes: Option<String>,
    /// User id of the last editor.
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
}

/// One room in a bulk update. Without `id` a new room is created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RoomEditReq {
    pub id: Option<u32>,
    pub ward_id: Option<u32>,
    pub room_number: String,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub primary_nurse_name: String,
    pub primary_nurse_extension: String,
    pub backup_nurse_name: Option<String>,
    pub backup_nurse_extension: Option<String>,
    pub charge_nurse_name: Option<String>,
    /// `day` (default) or `night`.
    pub shift_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct BulkRoomsReq {
    pub rooms: Vec<RoomEditReq>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListRoomsRes {
    pub rooms: Vec<RoomRes>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRoomsQuery {
    pub ward_id: Option<u32>,
}

// ============================================================================
// Analytics
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddOnStatsQuery {
    /// RFC 3339 timestamp or `YYYY-MM-DD` (start of day, UTC). Inclusive.
    pub start_date: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD` (end of day, UTC). Inclusive.
    pub end_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShiftStatsRes {
    pub day: u64,
    pub night: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusBreakdownRes {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub completed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddOnStatsRes {
    pub total_requests: u64,
    pub ward_stats: BTreeMap<String, u64>,
    pub test_stats: BTreeMap<String, u64>,
    pub reason_stats: BTreeMap<String, u64>,
    pub shift_stats: ShiftStatsRes,
    pub user_stats: BTreeMap<String, u64>,
    pub preventable_count: u64,
    pub preventable_percentage: f64,
    pub status_breakdown: StatusBreakdownRes,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddOnTrendsQuery {
    /// Look-back window in days (default 30).
    pub days: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddOnTrendsRes {
    /// ISO date (`YYYY-MM-DD`) → number of requests created that day.
    pub daily_stats: BTreeMap<String, u64>,
    pub period_days: u32,
}

// ============================================================================
// Suggestions
// ============================================================================

/// Advisory pick-lists for form inputs. Values outside these lists are still accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuggestionsRes {
    pub tests: Vec<String>,
    pub rejection_reasons: Vec<String>,
}
