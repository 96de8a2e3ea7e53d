//! File-backed request store.
//!
//! Each request lives in its own sharded directory:
//! `<data_dir>/requests/<s1>/<s2>/<id>/request.yaml`
//!
//! Writes go to a temporary sibling file which is then renamed over `request.yaml`, so a
//! reader sees either the old or the new document, never a torn one. Writers take an
//! exclusive OS lock on `request.lock` in the record directory, which serialises
//! compare-and-swap across threads and across processes sharing the data directory (the
//! server and the CLI, for example).

use super::RequestStore;
use crate::constants::{REQUESTS_DIR_NAME, REQUEST_FILENAME, REQUEST_LOCK_FILENAME};
use crate::error::{StoreError, StoreResult};
use crate::ids::RequestId;
use crate::request::{AddOnRequest, RequestStatus};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileRequestStore {
    root: PathBuf,
}

/// Exclusive lock on one record directory, released on drop.
struct RecordLock(File);

impl RecordLock {
    /// Blocks until the lock is held. Returns `None` if the record directory does not exist.
    fn acquire(record_dir: &Path) -> StoreResult<Option<Self>> {
        let file = match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(record_dir.join(REQUEST_LOCK_FILENAME))
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Lock(e)),
        };
        file.lock_exclusive().map_err(StoreError::Lock)?;
        Ok(Some(Self(file)))
    }
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.0) {
            tracing::warn!("failed to release request lock: {}", e);
        }
    }
}

impl FileRequestStore {
    /// Creates a store rooted at `data_dir/requests`, creating that directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DirCreation`] if the requests directory cannot be created.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let root = data_dir.join(REQUESTS_DIR_NAME);
        fs::create_dir_all(&root).map_err(StoreError::DirCreation)?;
        Ok(Self { root })
    }

    fn request_path(&self, id: RequestId) -> PathBuf {
        id.sharded_dir(&self.root).join(REQUEST_FILENAME)
    }

    fn read_file(path: &Path) -> StoreResult<Option<AddOnRequest>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::FileRead(e)),
        };
        let request: AddOnRequest =
            serde_yaml::from_str(&contents).map_err(StoreError::YamlDeserialization)?;
        request.check_consistency().map_err(StoreError::Corrupt)?;
        Ok(Some(request))
    }

    fn write_file(path: &Path, request: &AddOnRequest) -> StoreResult<()> {
        let yaml = serde_yaml::to_string(request).map_err(StoreError::YamlSerialization)?;
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(StoreError::FileWrite)?;
        fs::rename(&tmp, path).map_err(StoreError::FileWrite)
    }
}

impl RequestStore for FileRequestStore {
    fn insert(&self, request: &AddOnRequest) -> StoreResult<()> {
        let dir = request.id().sharded_dir(&self.root);
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent).map_err(StoreError::DirCreation)?;
        }
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(request.id()))
            }
            Err(e) => return Err(StoreError::DirCreation(e)),
        }

        let path = dir.join(REQUEST_FILENAME);
        let written = RecordLock::acquire(&dir).and_then(|lock| {
            let _lock = lock.ok_or(StoreError::Missing(request.id()))?;
            Self::write_file(&path, request)
        });
        if let Err(e) = written {
            // Leave no empty directory behind for a request that was never stored.
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::warn!("failed to clean up {}: {}", dir.display(), cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, id: RequestId) -> StoreResult<Option<AddOnRequest>> {
        Self::read_file(&self.request_path(id))
    }

    fn compare_and_swap(&self, expected: RequestStatus, next: &AddOnRequest) -> StoreResult<()> {
        let dir = next.id().sharded_dir(&self.root);
        let Some(_lock) = RecordLock::acquire(&dir)? else {
            return Err(StoreError::Missing(next.id()));
        };

        let path = dir.join(REQUEST_FILENAME);
        let current = Self::read_file(&path)?.ok_or(StoreError::Missing(next.id()))?;
        if current.status() != expected {
            return Err(StoreError::Conflict {
                expected,
                current: current.status(),
            });
        }
        Self::write_file(&path, next)
    }

    /// Walks `requests/<s1>/<s2>/<id>/request.yaml`.
    ///
    /// Entries that cannot be parsed are logged and skipped so one damaged file does not
    /// hide the rest of the worklist.
    fn list(&self) -> StoreResult<Vec<AddOnRequest>> {
        let mut requests = Vec::new();

        let s1_iter = match fs::read_dir(&self.root) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(requests),
            Err(e) => return Err(StoreError::FileRead(e)),
        };

        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }
            let Ok(s2_iter) = fs::read_dir(&s1_path) else {
                continue;
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }
                let Ok(id_iter) = fs::read_dir(&s2_path) else {
                    continue;
                };

                for id_ent in id_iter.flatten() {
                    let request_path = id_ent.path().join(REQUEST_FILENAME);
                    if !request_path.is_file() {
                        continue;
                    }
                    match Self::read_file(&request_path) {
                        Ok(Some(request)) => requests.push(request),
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(
                                "skipping unreadable request {}: {}",
                                request_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::{draft, lab, nurse};
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileRequestStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRequestStore::open(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    fn new_request() -> AddOnRequest {
        AddOnRequest::open(
            RequestId::generate(),
            draft().validate().unwrap(),
            nurse(),
            Utc::now(),
        )
    }

    #[test]
    fn insert_writes_sharded_yaml() {
        let (temp_dir, store) = setup();
        let request = new_request();
        store.insert(&request).unwrap();

        let expected = request
            .id()
            .sharded_dir(&temp_dir.path().join(REQUESTS_DIR_NAME))
            .join(REQUEST_FILENAME);
        assert!(expected.is_file());
        assert_eq!(store.get(request.id()).unwrap(), Some(request));
    }

    #[test]
    fn get_unknown_id_is_none() {
        let (_temp, store) = setup();
        assert_eq!(store.get(RequestId::generate()).unwrap(), None);
    }

    #[test]
    fn compare_and_swap_persists_and_detects_conflicts() {
        let (_temp, store) = setup();
        let request = new_request();
        store.insert(&request).unwrap();

        let approved = request
            .approve("add_to_same_sample", &lab(), Utc::now())
            .unwrap();
        store
            .compare_and_swap(RequestStatus::Pending, &approved)
            .unwrap();

        let rejected = request.reject("Old sample", &lab(), Utc::now()).unwrap();
        let err = store
            .compare_and_swap(RequestStatus::Pending, &rejected)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                current: RequestStatus::Approved,
                ..
            }
        ));
        assert_eq!(store.get(request.id()).unwrap(), Some(approved));
    }

    #[test]
    fn separately_opened_stores_serialise_compare_and_swap() {
        let (temp_dir, first) = setup();
        let second = FileRequestStore::open(temp_dir.path()).unwrap();

        for _ in 0..50 {
            let request = new_request();
            first.insert(&request).unwrap();
            let approved = request
                .approve("add_to_same_sample", &lab(), Utc::now())
                .unwrap();
            let rejected = request.reject("Old sample", &lab(), Utc::now()).unwrap();
            let barrier = std::sync::Barrier::new(2);

            let (a, b) = std::thread::scope(|scope| {
                let a = scope.spawn(|| {
                    barrier.wait();
                    first.compare_and_swap(RequestStatus::Pending, &approved)
                });
                let b = scope.spawn(|| {
                    barrier.wait();
                    second.compare_and_swap(RequestStatus::Pending, &rejected)
                });
                (a.join().unwrap(), b.join().unwrap())
            });

            assert!(a.is_ok() != b.is_ok(), "exactly one swap must win");
            let stored = first.get(request.id()).unwrap().unwrap();
            let winner = if a.is_ok() { &approved } else { &rejected };
            assert_eq!(&stored, winner);
        }
    }

    #[test]
    fn compare_and_swap_on_missing_record_is_missing() {
        let (_temp, store) = setup();
        let request = new_request();
        let approved = request
            .approve("need_new_sample", &lab(), Utc::now())
            .unwrap();
        assert!(matches!(
            store.compare_and_swap(RequestStatus::Pending, &approved),
            Err(StoreError::Missing(_))
        ));
    }

    #[test]
    fn list_reopens_existing_data_and_skips_damaged_files() {
        let (temp_dir, store) = setup();
        let first = new_request();
        let second = new_request();
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        let damaged = RequestId::generate()
            .sharded_dir(&temp_dir.path().join(REQUESTS_DIR_NAME));
        fs::create_dir_all(&damaged).unwrap();
        fs::write(damaged.join(REQUEST_FILENAME), "status: [not a request").unwrap();

        let reopened = FileRequestStore::open(temp_dir.path()).unwrap();
        let mut ids: Vec<RequestId> = reopened.list().unwrap().iter().map(|r| r.id()).collect();
        ids.sort();
        let mut expected = vec![first.id(), second.id()];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn inconsistent_document_is_reported_as_corrupt() {
        let (_temp, store) = setup();
        let request = new_request();
        store.insert(&request).unwrap();

        let path = store.request_path(request.id());
        let yaml = fs::read_to_string(&path).unwrap();
        fs::write(&path, yaml.replace("status: pending", "status: completed")).unwrap();

        assert!(matches!(
            store.get(request.id()),
            Err(StoreError::Corrupt(_))
        ));
    }
}
