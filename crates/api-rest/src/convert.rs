//! Translation from core domain values to wire types.

use api_shared::wire;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use wardlab_core::analytics::{AddOnStats, AddOnTrends};
use wardlab_core::{
    AddOnRequest, AuditAction, Caller, LifecycleError, LifecycleResult, NurseContact,
    RequestDraft, Room, RoomEdit, RoomId, Ward, WardDirectory, WardId,
};

pub(crate) fn draft_from_wire(req: wire::CreateAddOnRequestReq) -> RequestDraft {
    RequestDraft {
        ward_id: req.ward_id.map(WardId),
        room_id: req.room_id.map(RoomId),
        room_number: req.room_number,
        patient_id: req.patient_id,
        requested_test: req.requested_test,
        reason: req.reason,
        is_urgent: req.is_urgent,
        has_previous_sample: req.has_previous_sample,
        previous_sample_id: req.previous_sample_id,
        additional_comment: req.additional_comment,
    }
}

fn staff_ref(caller: &Caller) -> wire::StaffRef {
    wire::StaffRef {
        user_id: caller.user_id.to_string(),
        name: caller.name.to_string(),
        role: caller.role.to_string(),
    }
}

fn audit_action_name(action: AuditAction) -> &'static str {
    match action {
        AuditAction::Created => "created",
        AuditAction::Approved => "approved",
        AuditAction::Rejected => "rejected",
        AuditAction::Completed => "completed",
    }
}

pub(crate) fn request_res(
    request: &AddOnRequest,
    directory: &dyn WardDirectory,
) -> wire::AddOnRequestRes {
    wire::AddOnRequestRes {
        id: request.id().to_string(),
        ward_id: request.ward_id().0,
        ward_name: directory.ward(request.ward_id()).map(|ward| ward.name),
        room_id: request.room_id().map(|id| id.0),
        room_number: request.room_number().to_owned(),
        patient_id: request.patient_id().to_owned(),
        requested_test: request.requested_test().to_owned(),
        reason: request.reason().to_owned(),
        is_urgent: request.is_urgent(),
        has_previous_sample: request.has_previous_sample(),
        previous_sample_id: request.previous_sample_id().map(str::to_owned),
        additional_comment: request.additional_comment().map(str::to_owned),
        status: request.status().to_string(),
        approval_action: request.approval_action().map(|a| a.to_string()),
        rejection_reason: request.rejection_reason().map(str::to_owned),
        requested_by: staff_ref(request.requested_by()),
        created_at: request.created_at().to_rfc3339(),
        reviewed_by: request.reviewed_by().map(staff_ref),
        reviewed_at: request.reviewed_at().map(|t| t.to_rfc3339()),
        completed_by: request.completed_by().map(staff_ref),
        completed_at: request.completed_at().map(|t| t.to_rfc3339()),
        history: request
            .history()
            .iter()
            .map(|entry| wire::AuditEntryRes {
                action: audit_action_name(entry.action).into(),
                performed_by: staff_ref(&entry.performed_by),
                at: entry.at.to_rfc3339(),
                notes: entry.notes.clone(),
            })
            .collect(),
    }
}

pub(crate) fn ward_res(ward: Ward) -> wire::WardRes {
    wire::WardRes {
        id: ward.id.0,
        name: ward.name,
    }
}

fn nurse_res(nurse: NurseContact) -> wire::NurseContactRes {
    wire::NurseContactRes {
        name: nurse.name,
        extension: nurse.extension,
    }
}

pub(crate) fn room_res(room: Room) -> wire::RoomRes {
    wire::RoomRes {
        id: room.id.0,
        ward_id: room.ward_id.0,
        ward_name: room.ward_name,
        room_number: room.room_number,
        patient_id: room.patient_id,
        patient_name: room.patient_name,
        primary_nurse: nurse_res(room.primary_nurse),
        backup_nurse: room.backup_nurse.map(nurse_res),
        charge_nurse_name: room.charge_nurse_name,
        shift_type: room.shift_type.as_str().into(),
        notes: room.notes,
        updated_by: room.updated_by,
        updated_at: room.updated_at.map(|t| t.to_rfc3339()),
    }
}

pub(crate) fn room_edit_from_wire(req: wire::RoomEditReq) -> RoomEdit {
    RoomEdit {
        id: req.id.map(RoomId),
        ward_id: req.ward_id.map(WardId),
        room_number: req.room_number,
        patient_id: req.patient_id,
        patient_name: req.patient_name,
        primary_nurse_name: req.primary_nurse_name,
        primary_nurse_extension: req.primary_nurse_extension,
        backup_nurse_name: req.backup_nurse_name,
        backup_nurse_extension: req.backup_nurse_extension,
        charge_nurse_name: req.charge_nurse_name,
        shift_type: req.shift_type,
        notes: req.notes,
    }
}

pub(crate) fn stats_res(stats: AddOnStats) -> wire::AddOnStatsRes {
    wire::AddOnStatsRes {
        total_requests: stats.total_requests,
        ward_stats: stats.ward_stats,
        test_stats: stats.test_stats,
        reason_stats: stats.reason_stats,
        shift_stats: wire::ShiftStatsRes {
            day: stats.shift_stats.day,
            night: stats.shift_stats.night,
        },
        user_stats: stats.user_stats,
        preventable_count: stats.preventable_count,
        preventable_percentage: stats.preventable_percentage,
        status_breakdown: wire::StatusBreakdownRes {
            pending: stats.status_breakdown.pending,
            approved: stats.status_breakdown.approved,
            rejected: stats.status_breakdown.rejected,
            completed: stats.status_breakdown.completed,
        },
    }
}

pub(crate) fn trends_res(trends: AddOnTrends) -> wire::AddOnTrendsRes {
    wire::AddOnTrendsRes {
        daily_stats: trends
            .daily_stats
            .into_iter()
            .map(|(date, count)| (date.to_string(), count))
            .collect(),
        period_days: trends.period_days,
    }
}

/// Where a bare date falls within its day when used as a range bound.
#[derive(Clone, Copy)]
pub(crate) enum DayBound {
    Start,
    End,
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub(crate) fn parse_date_bound(
    field: &str,
    value: Option<&str>,
    bound: DayBound,
) -> LifecycleResult<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(at.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        LifecycleError::Validation(format!(
            "{field} must be an RFC 3339 timestamp or YYYY-MM-DD date, got '{value}'"
        ))
    })?;
    let time = match bound {
        DayBound::Start => NaiveTime::MIN,
        DayBound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap_or(NaiveTime::MIN),
    };
    Ok(Some(date.and_time(time).and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bare_dates_cover_the_whole_day() {
        let start = parse_date_bound("start_date", Some("2026-02-03"), DayBound::Start)
            .unwrap()
            .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 3, 0, 0, 0).unwrap());

        let end = parse_date_bound("end_date", Some("2026-02-03"), DayBound::End)
            .unwrap()
            .unwrap();
        assert!(end > Utc.with_ymd_and_hms(2026, 2, 3, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2026, 2, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn accepts_rfc3339_and_blank() {
        let at = parse_date_bound("start_date", Some("2026-02-03T10:00:00+01:00"), DayBound::Start)
            .unwrap()
            .unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap());
        assert_eq!(
            parse_date_bound("start_date", Some(" "), DayBound::Start).unwrap(),
            None
        );
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(matches!(
            parse_date_bound("end_date", Some("yesterday"), DayBound::End),
            Err(LifecycleError::Validation(_))
        ));
    }
}
