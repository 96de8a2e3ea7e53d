use super::RequestStore;
use crate::error::{StoreError, StoreResult};
use crate::ids::RequestId;
use crate::request::{AddOnRequest, RequestStatus};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local store used when no data directory is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryRequestStore {
    records: RwLock<HashMap<RequestId, AddOnRequest>>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for MemoryRequestStore {
    fn insert(&self, request: &AddOnRequest) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        if records.contains_key(&request.id()) {
            return Err(StoreError::AlreadyExists(request.id()));
        }
        records.insert(request.id(), request.clone());
        Ok(())
    }

    fn get(&self, id: RequestId) -> StoreResult<Option<AddOnRequest>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(&id).cloned())
    }

    fn compare_and_swap(&self, expected: RequestStatus, next: &AddOnRequest) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let current = records
            .get_mut(&next.id())
            .ok_or(StoreError::Missing(next.id()))?;
        if current.status() != expected {
            return Err(StoreError::Conflict {
                expected,
                current: current.status(),
            });
        }
        *current = next.clone();
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<AddOnRequest>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::{draft, lab, nurse};
    use chrono::Utc;

    fn stored(store: &MemoryRequestStore) -> AddOnRequest {
        let request = AddOnRequest::open(
            RequestId::generate(),
            draft().validate().unwrap(),
            nurse(),
            Utc::now(),
        );
        store.insert(&request).unwrap();
        request
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let store = MemoryRequestStore::new();
        let request = stored(&store);
        assert!(matches!(
            store.insert(&request),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn compare_and_swap_applies_when_status_matches() {
        let store = MemoryRequestStore::new();
        let request = stored(&store);
        let approved = request
            .approve("need_new_sample", &lab(), Utc::now())
            .unwrap();

        store
            .compare_and_swap(RequestStatus::Pending, &approved)
            .unwrap();
        assert_eq!(store.get(request.id()).unwrap(), Some(approved));
    }

    #[test]
    fn compare_and_swap_rejects_stale_expectation() {
        let store = MemoryRequestStore::new();
        let request = stored(&store);
        let rejected = request.reject("Old sample", &lab(), Utc::now()).unwrap();
        store
            .compare_and_swap(RequestStatus::Pending, &rejected)
            .unwrap();

        let approved = request
            .approve("need_new_sample", &lab(), Utc::now())
            .unwrap();
        let err = store
            .compare_and_swap(RequestStatus::Pending, &approved)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                current: RequestStatus::Rejected,
                ..
            }
        ));
        assert_eq!(store.get(request.id()).unwrap(), Some(rejected));
    }

    #[test]
    fn compare_and_swap_on_unknown_id_is_missing() {
        let store = MemoryRequestStore::new();
        let orphan = AddOnRequest::open(
            RequestId::generate(),
            draft().validate().unwrap(),
            nurse(),
            Utc::now(),
        );
        assert!(matches!(
            store.compare_and_swap(RequestStatus::Pending, &orphan),
            Err(StoreError::Missing(_))
        ));
    }
}
