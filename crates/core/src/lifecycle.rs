//! Add-on request lifecycle service.
//!
//! Ties the pure state machine in [`crate::request`] to a [`RequestStore`] and a
//! [`WardDirectory`]. Every transition is read → compute → compare-and-swap on the status
//! that was read, so two racing transitions on the same request cannot both succeed.
//!
//! Capability checks are the caller's job: boundaries call [`Caller::require`] before
//! invoking anything here.

use crate::access::Caller;
use crate::directory::{Room, RoomEdit, Ward, WardDirectory};
use crate::error::{LifecycleError, LifecycleResult, StoreError};
use crate::ids::{RequestId, WardId};
use crate::request::{AddOnRequest, RequestDraft, RequestStatus};
use crate::store::RequestStore;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::sync::Arc;

const ID_ALLOCATION_ATTEMPTS: usize = 5;

/// Source of "now" for stamping records.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ============================================================================
// LISTING
// ============================================================================

/// Status part of a list filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(RequestStatus),
}

impl FromStr for StatusFilter {
    type Err = LifecycleError;

    /// Empty input and `all` mean unfiltered; anything else must be an exact status name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(StatusFilter::All),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: StatusFilter,
    pub ward_id: Option<WardId>,
}

impl ListFilter {
    fn matches(&self, request: &AddOnRequest) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => request.status() == status,
        };
        status_ok && self.ward_id.map_or(true, |id| request.ward_id() == id)
    }
}

/// An immutable, newest-first snapshot of requests.
///
/// Cloning is cheap and each call to [`RequestList::iter`] starts again from the newest
/// request.
#[derive(Clone, Debug)]
pub struct RequestList {
    items: Arc<[AddOnRequest]>,
}

impl RequestList {
    fn new(mut items: Vec<AddOnRequest>) -> Self {
        items.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Self {
            items: items.into(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AddOnRequest> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[AddOnRequest] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a RequestList {
    type Item = &'a AddOnRequest;
    type IntoIter = std::slice::Iter<'a, AddOnRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// SERVICE
// ============================================================================

#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn RequestStore>,
    directory: Arc<dyn WardDirectory>,
    clock: Clock,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn RequestStore>, directory: Arc<dyn WardDirectory>) -> Self {
        Self {
            store,
            directory,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the wall clock, for deterministic timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn directory(&self) -> &dyn WardDirectory {
        self.directory.as_ref()
    }

    /// Validates `draft` and stores a new `pending` request stamped with `requester`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] if a required field is blank or missing, the ward is
    ///   unknown, or the room does not belong to the ward. Nothing is stored.
    /// - [`LifecycleError::Storage`] if the store fails.
    pub fn create(&self, requester: &Caller, draft: RequestDraft) -> LifecycleResult<AddOnRequest> {
        let draft = draft.validate()?;

        if self.directory.ward(draft.ward_id).is_none() {
            return Err(LifecycleError::Validation(format!(
                "unknown ward {}",
                draft.ward_id
            )));
        }
        if let Some(room_id) = draft.room_id {
            match self.directory.room(room_id) {
                Some(room) if room.ward_id == draft.ward_id => {}
                Some(_) => {
                    return Err(LifecycleError::Validation(format!(
                        "room {room_id} does not belong to ward {}",
                        draft.ward_id
                    )))
                }
                None => {
                    return Err(LifecycleError::Validation(format!("unknown room {room_id}")))
                }
            }
        }

        let now = (self.clock)();
        // Guard against the (practically impossible) id collision with a bounded retry.
        let mut last_collision = None;
        for _attempt in 0..ID_ALLOCATION_ATTEMPTS {
            let request =
                AddOnRequest::open(RequestId::generate(), draft.clone(), requester.clone(), now);
            match self.store.insert(&request) {
                Ok(()) => {
                    tracing::info!(
                        request_id = %request.id(),
                        ward = %request.ward_id(),
                        urgent = request.is_urgent(),
                        "add-on request created"
                    );
                    return Ok(request);
                }
                Err(StoreError::AlreadyExists(id)) => last_collision = Some(id),
                Err(e) => {
                    tracing::error!("failed to store new add-on request: {}", e);
                    return Err(e.into());
                }
            }
        }

        let id = last_collision.unwrap_or_else(RequestId::generate);
        tracing::error!(
            "gave up allocating a request id after {} collisions",
            ID_ALLOCATION_ATTEMPTS
        );
        Err(StoreError::AlreadyExists(id).into())
    }

    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown ids.
    pub fn get(&self, id: RequestId) -> LifecycleResult<AddOnRequest> {
        self.store.get(id)?.ok_or(LifecycleError::NotFound(id))
    }

    /// `pending → approved` with the given sample-handling action.
    ///
    /// # Errors
    ///
    /// `NotFound`, then `InvalidTransition` (not pending), then `Validation` (unknown
    /// action), or `ConcurrencyConflict` if another writer won a race that left the request
    /// still approvable.
    pub fn approve(
        &self,
        id: RequestId,
        action: &str,
        reviewer: &Caller,
    ) -> LifecycleResult<AddOnRequest> {
        let now = (self.clock)();
        self.transition(id, |current| current.approve(action, reviewer, now))
    }

    /// `pending → rejected` with a non-empty reason.
    ///
    /// # Errors
    ///
    /// `NotFound`, then `InvalidTransition` (not pending), then `Validation` (blank reason),
    /// or `ConcurrencyConflict`.
    pub fn reject(
        &self,
        id: RequestId,
        reason: &str,
        reviewer: &Caller,
    ) -> LifecycleResult<AddOnRequest> {
        let now = (self.clock)();
        self.transition(id, |current| current.reject(reason, reviewer, now))
    }

    /// `approved → completed`.
    ///
    /// # Errors
    ///
    /// `NotFound`, then `InvalidTransition` (not approved), or `ConcurrencyConflict`.
    pub fn complete(&self, id: RequestId, actor: &Caller) -> LifecycleResult<AddOnRequest> {
        let now = (self.clock)();
        self.transition(id, |current| current.complete(actor, now))
    }

    /// Adds a ward to the directory.
    ///
    /// # Errors
    ///
    /// See [`WardDirectory::create_ward`].
    pub fn create_ward(&self, name: &str) -> LifecycleResult<Ward> {
        let ward = self.directory.create_ward(name).inspect_err(|e| {
            tracing::warn!("ward not created: {}", e);
        })?;
        tracing::info!(ward = %ward.id, "ward created");
        Ok(ward)
    }

    /// Creates or replaces rooms in one batch, stamped with `editor` and the current time.
    ///
    /// # Errors
    ///
    /// See [`WardDirectory::upsert_rooms`].
    pub fn update_rooms(&self, editor: &Caller, edits: Vec<RoomEdit>) -> LifecycleResult<Vec<Room>> {
        let now = (self.clock)();
        let rooms = self
            .directory
            .upsert_rooms(edits, editor, now)
            .inspect_err(|e| {
                tracing::warn!(user = %editor.user_id, "room update refused: {}", e);
            })?;
        tracing::info!(user = %editor.user_id, rooms = rooms.len(), "rooms updated");
        Ok(rooms)
    }

    /// Newest-first snapshot of the requests matching `filter`.
    pub fn list(&self, filter: &ListFilter) -> LifecycleResult<RequestList> {
        let requests = self
            .store
            .list()?
            .into_iter()
            .filter(|request| filter.matches(request))
            .collect();
        Ok(RequestList::new(requests))
    }

    fn transition<F>(&self, id: RequestId, step: F) -> LifecycleResult<AddOnRequest>
    where
        F: Fn(&AddOnRequest) -> LifecycleResult<AddOnRequest>,
    {
        let current = self.get(id)?;
        let next = step(&current).inspect_err(|e| {
            tracing::warn!(request_id = %id, "transition refused: {}", e);
        })?;

        match self.store.compare_and_swap(current.status(), &next) {
            Ok(()) => {
                tracing::info!(
                    request_id = %id,
                    from = %current.status(),
                    to = %next.status(),
                    "add-on request transitioned"
                );
                Ok(next)
            }
            Err(StoreError::Conflict { current: stored, .. }) => {
                // Someone else moved the request first. Judge the action against what is
                // stored now so the caller gets the same answer a later call would give.
                // Every edge leaves its source state, so with the built-in stores `step`
                // fails here; `ConcurrencyConflict` covers a store whose swap fails while
                // the record still reads as movable.
                let fresh = self.get(id)?;
                tracing::warn!(request_id = %id, stored = %stored, "lost transition race");
                match step(&fresh) {
                    Err(e) => Err(e),
                    Ok(_) => Err(LifecycleError::ConcurrencyConflict(id)),
                }
            }
            Err(e) => {
                tracing::error!(request_id = %id, "failed to persist transition: {}", e);
                Err(e.into())
            }
        }
    }
}
