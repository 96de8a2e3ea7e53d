//! Add-on request model and its state machine.
//!
//! ```text
//!   create ──► pending ──approve──► approved ──complete──► completed
//!                 │
//!                 └────reject────► rejected
//! ```
//!
//! `rejected` and `completed` are terminal. Transitions are pure: each takes the current
//! record by reference and returns the next record, leaving the input untouched. Persisting
//! the result atomically is the job of [`crate::lifecycle::LifecycleService`].

use crate::access::Caller;
use crate::error::{LifecycleError, LifecycleResult};
use crate::ids::{RequestId, RoomId, WardId};
use crate::validation::{optional_text, NonEmptyText};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STATUS AND ACTIONS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Completed => "completed",
        }
    }

    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LifecycleError::Validation(format!("unknown status '{s}'")))
    }
}

/// How the lab will obtain material for an approved add-on test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    AddToSameSample,
    NeedNewSample,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::AddToSameSample => "add_to_same_sample",
            ApprovalAction::NeedNewSample => "need_new_sample",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalAction {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "add_to_same_sample" => Ok(ApprovalAction::AddToSameSample),
            "need_new_sample" => Ok(ApprovalAction::NeedNewSample),
            other => Err(LifecycleError::Validation(format!(
                "approval action must be add_to_same_sample or need_new_sample, got '{other}'"
            ))),
        }
    }
}

/// Kind of entry in a request's audit trail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Approved,
    Rejected,
    Completed,
}

/// One line of the append-only audit trail carried by every request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub performed_by: Caller,
    pub at: DateTime<Utc>,
    pub notes: String,
}

// ============================================================================
// DRAFT
// ============================================================================

/// Unvalidated input for creating a request, as submitted by a charge nurse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestDraft {
    pub ward_id: Option<WardId>,
    pub room_id: Option<RoomId>,
    pub room_number: String,
    pub patient_id: String,
    pub requested_test: String,
    pub reason: String,
    pub is_urgent: bool,
    pub has_previous_sample: bool,
    pub previous_sample_id: Option<String>,
    pub additional_comment: Option<String>,
}

/// A draft whose fields have passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedDraft {
    pub ward_id: WardId,
    pub room_id: Option<RoomId>,
    pub room_number: NonEmptyText,
    pub patient_id: NonEmptyText,
    pub requested_test: NonEmptyText,
    pub reason: NonEmptyText,
    pub is_urgent: bool,
    pub has_previous_sample: bool,
    pub previous_sample_id: Option<String>,
    pub additional_comment: Option<String>,
}

impl RequestDraft {
    /// Checks required fields and normalises optional ones.
    ///
    /// `previous_sample_id` is dropped unless `has_previous_sample` is set.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] naming the first missing or invalid field.
    pub fn validate(self) -> LifecycleResult<ValidatedDraft> {
        let ward_id = self
            .ward_id
            .ok_or_else(|| LifecycleError::Validation("ward_id is required".into()))?;
        let room_number = NonEmptyText::new("room_number", &self.room_number)?;
        let patient_id = NonEmptyText::new("patient_id", &self.patient_id)?;
        let requested_test = NonEmptyText::new("requested_test", &self.requested_test)?;
        let reason = NonEmptyText::new("reason", &self.reason)?;

        let previous_sample_id = if self.has_previous_sample {
            optional_text("previous_sample_id", self.previous_sample_id)?
        } else {
            None
        };
        let additional_comment = optional_text("additional_comment", self.additional_comment)?;

        Ok(ValidatedDraft {
            ward_id,
            room_id: self.room_id,
            room_number,
            patient_id,
            requested_test,
            reason,
            is_urgent: self.is_urgent,
            has_previous_sample: self.has_previous_sample,
            previous_sample_id,
            additional_comment,
        })
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A persisted add-on test request.
///
/// Fields are private so that status-dependent fields (`approval_action`,
/// `rejection_reason`, review and completion stamps) can only be set by the transitions
/// below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddOnRequest {
    id: RequestId,
    ward_id: WardId,
    room_id: Option<RoomId>,
    room_number: NonEmptyText,
    patient_id: NonEmptyText,
    requested_test: NonEmptyText,
    reason: NonEmptyText,
    is_urgent: bool,
    has_previous_sample: bool,
    previous_sample_id: Option<String>,
    additional_comment: Option<String>,
    status: RequestStatus,
    approval_action: Option<ApprovalAction>,
    rejection_reason: Option<NonEmptyText>,
    requested_by: Caller,
    created_at: DateTime<Utc>,
    reviewed_by: Option<Caller>,
    reviewed_at: Option<DateTime<Utc>>,
    completed_by: Option<Caller>,
    completed_at: Option<DateTime<Utc>>,
    history: Vec<AuditEntry>,
}

impl AddOnRequest {
    /// Opens a new request in `pending`, stamped with its requester and creation time.
    pub fn open(
        id: RequestId,
        draft: ValidatedDraft,
        requester: Caller,
        now: DateTime<Utc>,
    ) -> Self {
        let history = vec![AuditEntry {
            action: AuditAction::Created,
            performed_by: requester.clone(),
            at: now,
            notes: "Add-on request created".into(),
        }];

        Self {
            id,
            ward_id: draft.ward_id,
            room_id: draft.room_id,
            room_number: draft.room_number,
            patient_id: draft.patient_id,
            requested_test: draft.requested_test,
            reason: draft.reason,
            is_urgent: draft.is_urgent,
            has_previous_sample: draft.has_previous_sample,
            previous_sample_id: draft.previous_sample_id,
            additional_comment: draft.additional_comment,
            status: RequestStatus::Pending,
            approval_action: None,
            rejection_reason: None,
            requested_by: requester,
            created_at: now,
            reviewed_by: None,
            reviewed_at: None,
            completed_by: None,
            completed_at: None,
            history,
        }
    }

    /// `pending → approved`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidTransition`] unless the request is pending.
    /// - [`LifecycleError::Validation`] if `action` is not a known [`ApprovalAction`].
    pub fn approve(
        &self,
        action: &str,
        reviewer: &Caller,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Self> {
        self.expect_status(RequestStatus::Pending, "approve")?;
        let action: ApprovalAction = action.parse()?;

        let mut next = self.clone();
        next.status = RequestStatus::Approved;
        next.approval_action = Some(action);
        next.reviewed_by = Some(reviewer.clone());
        next.reviewed_at = Some(now);
        next.history.push(AuditEntry {
            action: AuditAction::Approved,
            performed_by: reviewer.clone(),
            at: now,
            notes: format!("Approved with action: {action}"),
        });
        Ok(next)
    }

    /// `pending → rejected` (terminal).
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidTransition`] unless the request is pending.
    /// - [`LifecycleError::Validation`] if `reason` is blank.
    pub fn reject(
        &self,
        reason: &str,
        reviewer: &Caller,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Self> {
        self.expect_status(RequestStatus::Pending, "reject")?;
        let reason = NonEmptyText::new("rejection reason", reason)?;

        let mut next = self.clone();
        next.status = RequestStatus::Rejected;
        next.history.push(AuditEntry {
            action: AuditAction::Rejected,
            performed_by: reviewer.clone(),
            at: now,
            notes: format!("Rejected: {reason}"),
        });
        next.rejection_reason = Some(reason);
        next.reviewed_by = Some(reviewer.clone());
        next.reviewed_at = Some(now);
        Ok(next)
    }

    /// `approved → completed` (terminal).
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the request is approved.
    pub fn complete(&self, actor: &Caller, now: DateTime<Utc>) -> LifecycleResult<Self> {
        self.expect_status(RequestStatus::Approved, "complete")?;

        let mut next = self.clone();
        next.status = RequestStatus::Completed;
        next.completed_by = Some(actor.clone());
        next.completed_at = Some(now);
        next.history.push(AuditEntry {
            action: AuditAction::Completed,
            performed_by: actor.clone(),
            at: now,
            notes: "Add-on test completed".into(),
        });
        Ok(next)
    }

    fn expect_status(&self, expected: RequestStatus, action: &'static str) -> LifecycleResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                id: self.id,
                from: self.status,
                action,
            })
        }
    }

    /// Checks that status-dependent fields agree with the status.
    ///
    /// Used when loading records written outside this process.
    pub fn check_consistency(&self) -> Result<(), String> {
        let approved_like = matches!(
            self.status,
            RequestStatus::Approved | RequestStatus::Completed
        );
        if approved_like != self.approval_action.is_some() {
            return Err(format!(
                "approval_action does not match status {}",
                self.status
            ));
        }
        if (self.status == RequestStatus::Rejected) != self.rejection_reason.is_some() {
            return Err(format!(
                "rejection_reason does not match status {}",
                self.status
            ));
        }
        if (self.status == RequestStatus::Completed) != self.completed_at.is_some() {
            return Err(format!(
                "completed_at does not match status {}",
                self.status
            ));
        }
        if !self.has_previous_sample && self.previous_sample_id.is_some() {
            return Err("previous_sample_id set without has_previous_sample".into());
        }
        Ok(())
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn ward_id(&self) -> WardId {
        self.ward_id
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn room_number(&self) -> &str {
        self.room_number.as_str()
    }

    pub fn patient_id(&self) -> &str {
        self.patient_id.as_str()
    }

    pub fn requested_test(&self) -> &str {
        self.requested_test.as_str()
    }

    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }

    pub fn is_urgent(&self) -> bool {
        self.is_urgent
    }

    pub fn has_previous_sample(&self) -> bool {
        self.has_previous_sample
    }

    pub fn previous_sample_id(&self) -> Option<&str> {
        self.previous_sample_id.as_deref()
    }

    pub fn additional_comment(&self) -> Option<&str> {
        self.additional_comment.as_deref()
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn approval_action(&self) -> Option<ApprovalAction> {
        self.approval_action
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_ref().map(NonEmptyText::as_str)
    }

    pub fn requested_by(&self) -> &Caller {
        &self.requested_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn reviewed_by(&self) -> Option<&Caller> {
        self.reviewed_by.as_ref()
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn completed_by(&self) -> Option<&Caller> {
        self.completed_by.as_ref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn history(&self) -> &[AuditEntry] {
        &self.history
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn nurse() -> Caller {
        Caller::new("n-1", "Nurse Ratched", "charge_nurse").unwrap()
    }

    pub(crate) fn lab() -> Caller {
        Caller::new("l-1", "Lab Tech", "lab_staff").unwrap()
    }

    pub(crate) fn draft() -> RequestDraft {
        RequestDraft {
            ward_id: Some(WardId(1)),
            room_id: Some(RoomId(101)),
            room_number: "101".into(),
            patient_id: "P1".into(),
            requested_test: "CBC".into(),
            reason: "stat".into(),
            ..RequestDraft::default()
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, hour, 0, 0).unwrap()
    }

    fn pending() -> AddOnRequest {
        AddOnRequest::open(
            RequestId::generate(),
            draft().validate().unwrap(),
            nurse(),
            at(9),
        )
    }

    #[test]
    fn opened_request_is_pending_with_creation_audit() {
        let request = pending();
        assert_eq!(request.status(), RequestStatus::Pending);
        assert_eq!(request.created_at(), at(9));
        assert_eq!(request.requested_by(), &nurse());
        assert_eq!(request.history().len(), 1);
        assert_eq!(request.history()[0].action, AuditAction::Created);
        assert!(request.check_consistency().is_ok());
    }

    #[test]
    fn draft_requires_identifying_fields() {
        let missing_ward = RequestDraft {
            ward_id: None,
            ..draft()
        };
        assert!(matches!(
            missing_ward.validate(),
            Err(LifecycleError::Validation(_))
        ));

        for blank in [
            RequestDraft {
                room_number: " ".into(),
                ..draft()
            },
            RequestDraft {
                patient_id: "".into(),
                ..draft()
            },
            RequestDraft {
                requested_test: "".into(),
                ..draft()
            },
            RequestDraft {
                reason: "   ".into(),
                ..draft()
            },
        ] {
            assert!(matches!(blank.validate(), Err(LifecycleError::Validation(_))));
        }
    }

    #[test]
    fn previous_sample_id_is_cleared_without_previous_sample() {
        let validated = RequestDraft {
            has_previous_sample: false,
            previous_sample_id: Some("S-77".into()),
            ..draft()
        }
        .validate()
        .unwrap();
        assert_eq!(validated.previous_sample_id, None);

        let validated = RequestDraft {
            has_previous_sample: true,
            previous_sample_id: Some("S-77".into()),
            ..draft()
        }
        .validate()
        .unwrap();
        assert_eq!(validated.previous_sample_id.as_deref(), Some("S-77"));
    }

    #[test]
    fn approve_then_complete() {
        let approved = pending().approve("add_to_same_sample", &lab(), at(10)).unwrap();
        assert_eq!(approved.status(), RequestStatus::Approved);
        assert_eq!(
            approved.approval_action(),
            Some(ApprovalAction::AddToSameSample)
        );
        assert_eq!(approved.reviewed_at(), Some(at(10)));

        let completed = approved.complete(&lab(), at(11)).unwrap();
        assert_eq!(completed.status(), RequestStatus::Completed);
        assert_eq!(completed.completed_at(), Some(at(11)));
        assert_eq!(completed.history().len(), 3);
        assert!(completed.check_consistency().is_ok());
    }

    #[test]
    fn reject_stores_reason_and_is_terminal() {
        let rejected = pending().reject("Old sample", &lab(), at(10)).unwrap();
        assert_eq!(rejected.status(), RequestStatus::Rejected);
        assert_eq!(rejected.rejection_reason(), Some("Old sample"));
        assert!(rejected.status().is_terminal());

        let err = rejected
            .approve("need_new_sample", &lab(), at(11))
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: RequestStatus::Rejected,
                ..
            }
        ));
        assert!(rejected.complete(&lab(), at(11)).is_err());
        assert!(rejected.reject("again", &lab(), at(11)).is_err());
    }

    #[test]
    fn complete_requires_approval() {
        let err = pending().complete(&lab(), at(10)).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: RequestStatus::Pending,
                action: "complete",
                ..
            }
        ));
    }

    #[test]
    fn unknown_approval_action_is_a_validation_error() {
        let request = pending();
        let err = request.approve("discard", &lab(), at(10)).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
        assert_eq!(request.status(), RequestStatus::Pending);
    }

    #[test]
    fn blank_rejection_reason_is_a_validation_error() {
        let err = pending().reject("  ", &lab(), at(10)).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
    }

    #[test]
    fn state_is_checked_before_arguments() {
        let completed = pending()
            .approve("need_new_sample", &lab(), at(10))
            .unwrap()
            .complete(&lab(), at(11))
            .unwrap();
        assert!(matches!(
            completed.reject("", &lab(), at(12)),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn status_parses_only_exact_names() {
        assert_eq!(
            "completed".parse::<RequestStatus>().unwrap(),
            RequestStatus::Completed
        );
        assert!("Completed".parse::<RequestStatus>().is_err());
        assert!("all".parse::<RequestStatus>().is_err());
    }
}
