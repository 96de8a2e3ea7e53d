//! Ward and room directory.
//!
//! Lifecycle operations use the directory to confirm that a submitted ward exists and that a
//! submitted room belongs to that ward. Administrators maintain it: wards can be added and
//! rooms created or edited in batches.
//!
//! [`YamlWardDirectory`] loads a YAML document of the form:
//!
//! ```yaml
//! wards:
//!   - id: 1
//!     name: Ward A
//!     rooms:
//!       - id: 101
//!         room_number: "101"
//!         patient_id: P1
//!         primary_nurse: { name: Sam, extension: "4411" }
//!         shift_type: day
//! ```
//!
//! When the directory was loaded from a file, every accepted edit rewrites that file (temp
//! file then rename) before it becomes visible. The running server is the only writer; other
//! processes read the file at startup.

use crate::access::Caller;
use crate::error::{DirectoryError, LifecycleError, LifecycleResult};
use crate::ids::{RoomId, WardId};
use crate::validation::{optional_text, NonEmptyText};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// Public domain-level types
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ward {
    pub id: WardId,
    pub name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    #[default]
    Day,
    Night,
}

impl ShiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Day => "day",
            ShiftType::Night => "night",
        }
    }
}

impl FromStr for ShiftType {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(ShiftType::Day),
            "night" => Ok(ShiftType::Night),
            other => Err(LifecycleError::Validation(format!(
                "unknown shift type '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NurseContact {
    pub name: String,
    pub extension: String,
}

/// A room and the staff to call about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub ward_id: WardId,
    pub ward_name: String,
    pub room_number: String,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub primary_nurse: NurseContact,
    pub backup_nurse: Option<NurseContact>,
    pub charge_nurse_name: Option<String>,
    pub shift_type: ShiftType,
    pub notes: Option<String>,
    /// User id of the last editor; `None` for rooms that came from the file unedited.
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Raw room edit from a boundary. `id: None` creates a room; `Some` replaces that room.
///
/// Required fields are plain strings so that missing and blank input is reported by
/// the directory as a validation error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomEdit {
    pub id: Option<RoomId>,
    pub ward_id: Option<WardId>,
    pub room_number: String,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub primary_nurse_name: String,
    pub primary_nurse_extension: String,
    pub backup_nurse_name: Option<String>,
    pub backup_nurse_extension: Option<String>,
    pub charge_nurse_name: Option<String>,
    /// `day` or `night`; blank means `day`.
    pub shift_type: Option<String>,
    pub notes: Option<String>,
}

/// Lookup over wards and rooms, plus administrator maintenance.
pub trait WardDirectory: Send + Sync {
    fn wards(&self) -> Vec<Ward>;

    fn ward(&self, id: WardId) -> Option<Ward>;

    /// Rooms of one ward, or of every ward when `ward_id` is `None`.
    fn rooms(&self, ward_id: Option<WardId>) -> Vec<Room>;

    fn room(&self, id: RoomId) -> Option<Room>;

    /// Adds a ward under the next free id.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] if the name is blank or already used.
    /// - [`LifecycleError::Directory`] if the change cannot be persisted.
    fn create_ward(&self, name: &str) -> LifecycleResult<Ward>;

    /// Applies `edits` as one batch: either every edit is stored or none is.
    ///
    /// Returns the stored rooms in the order of `edits`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] if any edit names an unknown ward or room, leaves a
    ///   required field blank, gives a backup nurse without both name and extension, or
    ///   repeats a room id within the batch.
    /// - [`LifecycleError::Directory`] if the change cannot be persisted.
    fn upsert_rooms(
        &self,
        edits: Vec<RoomEdit>,
        editor: &Caller,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Vec<Room>>;
}

// ============================================================================
// YAML-backed directory
// ============================================================================

#[derive(Clone, Debug, Default)]
struct DirectoryData {
    wards: BTreeMap<WardId, Ward>,
    rooms: BTreeMap<RoomId, Room>,
}

#[derive(Debug, Default)]
pub struct YamlWardDirectory {
    data: RwLock<DirectoryData>,
    /// Backing file; `None` keeps edits in memory only.
    path: Option<PathBuf>,
}

impl YamlWardDirectory {
    /// An empty, memory-only directory.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a directory from a YAML file. Later edits are written back to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the file cannot be read or fails [`Self::parse`].
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let text = std::fs::read_to_string(path).map_err(DirectoryError::FileRead)?;
        let mut directory = Self::parse(&text)?;
        directory.path = Some(path.to_path_buf());
        Ok(directory)
    }

    /// Parses a memory-only directory from YAML text.
    ///
    /// Unknown keys are rejected, and schema errors carry the path to the failing field
    /// (for example `wards[0].rooms[2].primary_nurse`).
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if:
    /// - the YAML does not match the schema,
    /// - a ward or room id appears twice,
    /// - a ward name or room number is blank.
    pub fn parse(yaml_text: &str) -> Result<Self, DirectoryError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire: DirectoryWire = serde_path_to_error::deserialize(deserializer).map_err(|err| {
            let path = err.path().to_string();
            let path = if path.is_empty() { "<root>".into() } else { path };
            DirectoryError::Schema {
                path,
                message: err.into_inner().to_string(),
            }
        })?;

        let mut data = DirectoryData::default();
        let mut seen_rooms = HashSet::new();

        for ward in wire.wards {
            let ward_id = WardId(ward.id);
            if ward.name.trim().is_empty() {
                return Err(DirectoryError::InvalidEntry(format!(
                    "ward {} has a blank name",
                    ward.id
                )));
            }
            if data.wards.contains_key(&ward_id) {
                return Err(DirectoryError::DuplicateWard(ward.id));
            }

            for room in ward.rooms {
                if !seen_rooms.insert(room.id) {
                    return Err(DirectoryError::DuplicateRoom(room.id));
                }
                if room.room_number.trim().is_empty() {
                    return Err(DirectoryError::InvalidEntry(format!(
                        "room {} has a blank room number",
                        room.id
                    )));
                }
                data.rooms.insert(
                    RoomId(room.id),
                    Room {
                        id: RoomId(room.id),
                        ward_id,
                        ward_name: ward.name.clone(),
                        room_number: room.room_number,
                        patient_id: room.patient_id,
                        patient_name: room.patient_name,
                        primary_nurse: room.primary_nurse,
                        backup_nurse: room.backup_nurse,
                        charge_nurse_name: room.charge_nurse_name,
                        shift_type: room.shift_type,
                        notes: room.notes,
                        updated_by: room.updated_by,
                        updated_at: room.updated_at,
                    },
                );
            }

            data.wards.insert(
                ward_id,
                Ward {
                    id: ward_id,
                    name: ward.name,
                },
            );
        }

        Ok(Self {
            data: RwLock::new(data),
            path: None,
        })
    }

    // Edits swap in a fully built copy only after it is persisted, so the data behind a
    // poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, DirectoryData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, data: &DirectoryData) -> Result<(), DirectoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let yaml = serde_yaml::to_string(&DirectoryWire::from(data))
            .map_err(DirectoryError::YamlSerialization)?;
        let tmp = path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(DirectoryError::FileWrite)?;
        std::fs::rename(&tmp, path).map_err(DirectoryError::FileWrite)
    }

    /// Persists `next` and makes it current while `guard` is still held.
    fn commit(
        &self,
        mut guard: RwLockWriteGuard<'_, DirectoryData>,
        next: DirectoryData,
    ) -> LifecycleResult<()> {
        self.persist(&next).inspect_err(|e| {
            tracing::error!("failed to persist ward directory: {}", e);
        })?;
        *guard = next;
        Ok(())
    }
}

impl RoomEdit {
    /// Validates the edit against `data` and builds the room it describes.
    fn into_room(
        self,
        index: usize,
        data: &DirectoryData,
        editor: &Caller,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Room> {
        let field = |name: &str| format!("rooms[{index}].{name}");

        let id = match self.id {
            Some(id) if data.rooms.contains_key(&id) => id,
            Some(id) => {
                return Err(LifecycleError::Validation(format!(
                    "{}: unknown room {id}",
                    field("id")
                )))
            }
            None => next_room_id(data)?,
        };

        let ward_id = self
            .ward_id
            .ok_or_else(|| LifecycleError::Validation(format!("{} is required", field("ward_id"))))?;
        let ward = data.wards.get(&ward_id).ok_or_else(|| {
            LifecycleError::Validation(format!("{}: unknown ward {ward_id}", field("ward_id")))
        })?;

        let primary_nurse = NurseContact {
            name: NonEmptyText::new(&field("primary_nurse_name"), &self.primary_nurse_name)?
                .to_string(),
            extension: NonEmptyText::new(
                &field("primary_nurse_extension"),
                &self.primary_nurse_extension,
            )?
            .to_string(),
        };

        let backup_nurse = match (
            optional_text(&field("backup_nurse_name"), self.backup_nurse_name)?,
            optional_text(&field("backup_nurse_extension"), self.backup_nurse_extension)?,
        ) {
            (Some(name), Some(extension)) => Some(NurseContact { name, extension }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(LifecycleError::Validation(format!(
                    "{} is required when a backup nurse is named",
                    field("backup_nurse_extension")
                )))
            }
            (None, Some(_)) => {
                return Err(LifecycleError::Validation(format!(
                    "{} is required when a backup extension is given",
                    field("backup_nurse_name")
                )))
            }
        };

        let shift_type = match self.shift_type.as_deref().map(str::trim) {
            None | Some("") => ShiftType::Day,
            Some(value) => value.parse().map_err(|_| {
                LifecycleError::Validation(format!(
                    "{} must be 'day' or 'night', got '{value}'",
                    field("shift_type")
                ))
            })?,
        };

        Ok(Room {
            id,
            ward_id,
            ward_name: ward.name.clone(),
            room_number: NonEmptyText::new(&field("room_number"), &self.room_number)?.to_string(),
            patient_id: optional_text(&field("patient_id"), self.patient_id)?,
            patient_name: optional_text(&field("patient_name"), self.patient_name)?,
            primary_nurse,
            backup_nurse,
            charge_nurse_name: optional_text(&field("charge_nurse_name"), self.charge_nurse_name)?,
            shift_type,
            notes: optional_text(&field("notes"), self.notes)?,
            updated_by: Some(editor.user_id.to_string()),
            updated_at: Some(now),
        })
    }
}

fn next_room_id(data: &DirectoryData) -> LifecycleResult<RoomId> {
    match data.rooms.keys().next_back() {
        None => Ok(RoomId(1)),
        Some(last) => last
            .0
            .checked_add(1)
            .map(RoomId)
            .ok_or_else(|| LifecycleError::Validation("room ids are exhausted".into())),
    }
}

impl WardDirectory for YamlWardDirectory {
    fn wards(&self) -> Vec<Ward> {
        self.read().wards.values().cloned().collect()
    }

    fn ward(&self, id: WardId) -> Option<Ward> {
        self.read().wards.get(&id).cloned()
    }

    fn rooms(&self, ward_id: Option<WardId>) -> Vec<Room> {
        self.read()
            .rooms
            .values()
            .filter(|room| ward_id.map_or(true, |id| room.ward_id == id))
            .cloned()
            .collect()
    }

    fn room(&self, id: RoomId) -> Option<Room> {
        self.read().rooms.get(&id).cloned()
    }

    fn create_ward(&self, name: &str) -> LifecycleResult<Ward> {
        let name = NonEmptyText::new("name", name)?;
        let guard = self.write();

        if guard.wards.values().any(|ward| ward.name == name.as_str()) {
            return Err(LifecycleError::Validation(format!(
                "ward '{name}' already exists"
            )));
        }
        let id = match guard.wards.keys().next_back() {
            None => WardId(1),
            Some(last) => last
                .0
                .checked_add(1)
                .map(WardId)
                .ok_or_else(|| LifecycleError::Validation("ward ids are exhausted".into()))?,
        };

        let ward = Ward {
            id,
            name: name.to_string(),
        };
        let mut next = guard.clone();
        next.wards.insert(id, ward.clone());
        self.commit(guard, next)?;
        Ok(ward)
    }

    fn upsert_rooms(
        &self,
        edits: Vec<RoomEdit>,
        editor: &Caller,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Vec<Room>> {
        let guard = self.write();
        let mut next = guard.clone();
        let mut touched = HashSet::new();
        let mut saved = Vec::with_capacity(edits.len());

        for (index, edit) in edits.into_iter().enumerate() {
            let room = edit.into_room(index, &next, editor, now)?;
            if !touched.insert(room.id) {
                return Err(LifecycleError::Validation(format!(
                    "rooms[{index}]: room {} appears twice in one update",
                    room.id
                )));
            }
            next.rooms.insert(room.id, room.clone());
            saved.push(room);
        }

        if saved.is_empty() {
            return Ok(saved);
        }
        self.commit(guard, next)?;
        Ok(saved)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectoryWire {
    #[serde(default)]
    wards: Vec<WardWire>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WardWire {
    id: u32,
    name: String,
    #[serde(default)]
    rooms: Vec<RoomWire>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoomWire {
    id: u32,
    room_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patient_name: Option<String>,
    primary_nurse: NurseContact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backup_nurse: Option<NurseContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    charge_nurse_name: Option<String>,
    #[serde(default)]
    shift_type: ShiftType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<&DirectoryData> for DirectoryWire {
    fn from(data: &DirectoryData) -> Self {
        let wards = data
            .wards
            .values()
            .map(|ward| WardWire {
                id: ward.id.0,
                name: ward.name.clone(),
                rooms: data
                    .rooms
                    .values()
                    .filter(|room| room.ward_id == ward.id)
                    .map(|room| RoomWire {
                        id: room.id.0,
                        room_number: room.room_number.clone(),
                        patient_id: room.patient_id.clone(),
                        patient_name: room.patient_name.clone(),
                        primary_nurse: room.primary_nurse.clone(),
                        backup_nurse: room.backup_nurse.clone(),
                        charge_nurse_name: room.charge_nurse_name.clone(),
                        shift_type: room.shift_type,
                        notes: room.notes.clone(),
                        updated_by: room.updated_by.clone(),
                        updated_at: room.updated_at,
                    })
                    .collect(),
            })
            .collect();
        DirectoryWire { wards }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    pub(crate) const SAMPLE: &str = r#"wards:
  - id: 1
    name: Ward A
    rooms:
      - id: 101
        room_number: "101"
        patient_id: P1
        patient_name: Pat One
        primary_nurse: { name: Sam, extension: "4411" }
        backup_nurse: { name: Alex, extension: "4412" }
        charge_nurse_name: Jo
        shift_type: night
      - id: 102
        room_number: "102"
        primary_nurse: { name: Kim, extension: "4413" }
  - id: 2
    name: Ward B
    rooms:
      - id: 201
        room_number: "201"
        primary_nurse: { name: Lee, extension: "5511" }
"#;

    pub(crate) fn sample_directory() -> YamlWardDirectory {
        YamlWardDirectory::parse(SAMPLE).expect("parse sample directory")
    }

    fn admin() -> Caller {
        Caller::new("a-1", "Admin One", "admin").unwrap()
    }

    fn edited_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    fn new_room(ward: u32, number: &str) -> RoomEdit {
        RoomEdit {
            ward_id: Some(WardId(ward)),
            room_number: number.into(),
            primary_nurse_name: "Robin".into(),
            primary_nurse_extension: "6611".into(),
            ..RoomEdit::default()
        }
    }

    #[test]
    fn parses_wards_and_rooms() {
        let directory = sample_directory();
        assert_eq!(directory.wards().len(), 2);
        assert_eq!(directory.ward(WardId(2)).unwrap().name, "Ward B");

        let room = directory.room(RoomId(101)).unwrap();
        assert_eq!(room.ward_id, WardId(1));
        assert_eq!(room.ward_name, "Ward A");
        assert_eq!(room.shift_type, ShiftType::Night);
        assert_eq!(room.backup_nurse.unwrap().extension, "4412");
        assert_eq!(room.updated_by, None);

        assert_eq!(directory.room(RoomId(102)).unwrap().shift_type, ShiftType::Day);
    }

    #[test]
    fn rooms_filter_by_ward() {
        let directory = sample_directory();
        assert_eq!(directory.rooms(None).len(), 3);
        assert_eq!(directory.rooms(Some(WardId(1))).len(), 2);
        assert!(directory.rooms(Some(WardId(9))).is_empty());
    }

    #[test]
    fn schema_errors_name_the_failing_path() {
        let input = r#"wards:
  - id: 1
    name: Ward A
    rooms:
      - id: 101
        room_number: "101"
        primary_nurse: { name: Sam }
"#;
        let err = YamlWardDirectory::parse(input).unwrap_err();
        match err {
            DirectoryError::Schema { path, .. } => assert!(path.contains("primary_nurse")),
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        let input = "wards: []\nextra: true\n";
        assert!(matches!(
            YamlWardDirectory::parse(input),
            Err(DirectoryError::Schema { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let dup_ward = "wards:\n  - { id: 1, name: A }\n  - { id: 1, name: B }\n";
        assert!(matches!(
            YamlWardDirectory::parse(dup_ward),
            Err(DirectoryError::DuplicateWard(1))
        ));

        let dup_room = r#"wards:
  - id: 1
    name: A
    rooms:
      - { id: 5, room_number: "5", primary_nurse: { name: X, extension: "1" } }
  - id: 2
    name: B
    rooms:
      - { id: 5, room_number: "6", primary_nurse: { name: Y, extension: "2" } }
"#;
        assert!(matches!(
            YamlWardDirectory::parse(dup_room),
            Err(DirectoryError::DuplicateRoom(5))
        ));
    }

    #[test]
    fn empty_document_is_an_empty_directory() {
        let directory = YamlWardDirectory::parse("wards: []\n").unwrap();
        assert!(directory.wards().is_empty());
        assert!(YamlWardDirectory::empty().ward(WardId(1)).is_none());
    }

    #[test]
    fn create_ward_takes_next_id_and_refuses_blank_or_taken_names() {
        let directory = sample_directory();
        let ward = directory.create_ward("  Ward C ").unwrap();
        assert_eq!(ward, Ward { id: WardId(3), name: "Ward C".into() });
        assert_eq!(directory.ward(WardId(3)), Some(ward));

        assert!(matches!(
            directory.create_ward("   "),
            Err(LifecycleError::Validation(_))
        ));
        assert!(matches!(
            directory.create_ward("Ward A"),
            Err(LifecycleError::Validation(_))
        ));
        assert_eq!(directory.wards().len(), 3);

        let first = YamlWardDirectory::empty().create_ward("ICU").unwrap();
        assert_eq!(first.id, WardId(1));
    }

    #[test]
    fn upsert_creates_and_replaces_rooms() {
        let directory = sample_directory();
        let update = RoomEdit {
            id: Some(RoomId(102)),
            ward_id: Some(WardId(2)),
            room_number: "102B".into(),
            primary_nurse_name: "Kim".into(),
            primary_nurse_extension: "4413".into(),
            backup_nurse_name: Some("Ash".into()),
            backup_nurse_extension: Some("4499".into()),
            shift_type: Some("night".into()),
            notes: Some("  ".into()),
            ..RoomEdit::default()
        };

        let saved = directory
            .upsert_rooms(vec![new_room(1, "103"), update, new_room(2, "202")], &admin(), edited_at())
            .unwrap();

        let ids: Vec<RoomId> = saved.iter().map(|room| room.id).collect();
        assert_eq!(ids, vec![RoomId(202), RoomId(102), RoomId(203)]);

        let moved = directory.room(RoomId(102)).unwrap();
        assert_eq!(moved.ward_id, WardId(2));
        assert_eq!(moved.ward_name, "Ward B");
        assert_eq!(moved.room_number, "102B");
        assert_eq!(moved.shift_type, ShiftType::Night);
        assert_eq!(moved.notes, None);
        assert_eq!(moved.backup_nurse.unwrap().name, "Ash");
        assert_eq!(moved.updated_by.as_deref(), Some("a-1"));
        assert_eq!(moved.updated_at, Some(edited_at()));

        assert_eq!(directory.rooms(Some(WardId(1))).len(), 2);
        assert_eq!(directory.rooms(Some(WardId(2))).len(), 3);
    }

    #[test]
    fn one_bad_edit_rejects_the_whole_batch() {
        let directory = sample_directory();
        let before = directory.rooms(None);

        let cases = [
            RoomEdit { id: Some(RoomId(999)), ..new_room(1, "9") },
            RoomEdit { ward_id: Some(WardId(9)), ..new_room(1, "9") },
            RoomEdit { ward_id: None, ..new_room(1, "9") },
            RoomEdit { room_number: " ".into(), ..new_room(1, "9") },
            RoomEdit { primary_nurse_extension: "".into(), ..new_room(1, "9") },
            RoomEdit { backup_nurse_name: Some("Ash".into()), ..new_room(1, "9") },
            RoomEdit { backup_nurse_extension: Some("4499".into()), ..new_room(1, "9") },
            RoomEdit { shift_type: Some("evening".into()), ..new_room(1, "9") },
        ];
        for bad in cases {
            let err = directory
                .upsert_rooms(vec![new_room(1, "104"), bad], &admin(), edited_at())
                .unwrap_err();
            match err {
                LifecycleError::Validation(msg) => assert!(msg.starts_with("rooms[1]"), "{msg}"),
                other => panic!("expected Validation error, got {other:?}"),
            }
        }

        let twice = RoomEdit { id: Some(RoomId(101)), ..new_room(1, "101") };
        assert!(directory
            .upsert_rooms(vec![twice.clone(), twice], &admin(), edited_at())
            .is_err());

        assert_eq!(directory.rooms(None), before);
    }

    #[test]
    fn edits_are_written_back_to_the_loaded_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wards.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let directory = YamlWardDirectory::load(&path).unwrap();
        let ward = directory.create_ward("Ward C").unwrap();
        directory
            .upsert_rooms(vec![new_room(ward.id.0, "301")], &admin(), edited_at())
            .unwrap();

        let reloaded = YamlWardDirectory::load(&path).unwrap();
        assert_eq!(reloaded.wards(), directory.wards());
        assert_eq!(reloaded.rooms(None), directory.rooms(None));
        let room = reloaded.rooms(Some(ward.id)).pop().unwrap();
        assert_eq!(room.ward_name, "Ward C");
        assert_eq!(room.updated_at, Some(edited_at()));
    }

    #[test]
    fn failed_write_leaves_directory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wards.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let directory = YamlWardDirectory::load(&path).unwrap();

        std::fs::remove_dir_all(temp_dir.path()).unwrap();

        assert!(matches!(
            directory.create_ward("Ward C"),
            Err(LifecycleError::Directory(DirectoryError::FileWrite(_)))
        ));
        assert!(matches!(
            directory.upsert_rooms(vec![new_room(1, "104")], &admin(), edited_at()),
            Err(LifecycleError::Directory(_))
        ));
        assert_eq!(directory.wards().len(), 2);
        assert_eq!(directory.rooms(None).len(), 3);
    }

    #[test]
    fn shift_type_names_are_exact() {
        assert_eq!("night".parse::<ShiftType>().unwrap(), ShiftType::Night);
        assert_eq!(ShiftType::Day.as_str(), "day");
        assert!("Night".parse::<ShiftType>().is_err());
    }
}
