//! Departments, rooms and patients.

use super::common::{Address, Person, TimeStamps};
use super::medical::Discipline;
use crate::constants::{
    DEPARTMENTS_DIR_NAME, DEPARTMENT_NAME_MAX_LEN, DEPARTMENT_QUALIFICATIONS_DIR_NAME,
    PATIENTS_DIR_NAME, ROOMS_DIR_NAME, ROOM_NAME_MAX_LEN,
};
use crate::error::{HisError, HisResult};
use his_types::NonEmptyText;
use his_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: ShardableUuid,
    pub name: NonEmptyText,
    #[serde(flatten)]
    pub stamps: TimeStamps,
}

impl Department {
    pub fn new(name: &str) -> HisResult<Self> {
        Ok(Self {
            id: ShardableUuid::new(),
            name: NonEmptyText::bounded(name, DEPARTMENT_NAME_MAX_LEN)?,
            stamps: TimeStamps::now(),
        })
    }
}

impl_record!(Department, "department", DEPARTMENTS_DIR_NAME);

/// A discipline a department needs on its staff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentQualification {
    pub id: ShardableUuid,
    pub department_id: ShardableUuid,
    pub discipline: Discipline,
    #[serde(flatten)]
    pub stamps: TimeStamps,
}

impl DepartmentQualification {
    pub fn new(department_id: ShardableUuid, discipline: Discipline) -> Self {
        Self {
            id: ShardableUuid::new(),
            department_id,
            discipline,
            stamps: TimeStamps::now(),
        }
    }
}

impl_record!(
    DepartmentQualification,
    "department_qualification",
    DEPARTMENT_QUALIFICATIONS_DIR_NAME
);

/// A room with a fixed number of places.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: ShardableUuid,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<ShardableUuid>,
    pub capacity: u32,
    #[serde(default)]
    pub usage: u32,
    #[serde(flatten)]
    pub stamps: TimeStamps,
}

impl Room {
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` for a zero capacity.
    pub fn new(name: &str, department_id: Option<ShardableUuid>, capacity: u32) -> HisResult<Self> {
        if capacity == 0 {
            return Err(HisError::InvalidInput(
                "room capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            id: ShardableUuid::new(),
            name: NonEmptyText::bounded(name, ROOM_NAME_MAX_LEN)?,
            department_id,
            capacity,
            usage: 0,
            stamps: TimeStamps::now(),
        })
    }

    pub fn is_capacity_available(&self) -> bool {
        self.usage < self.capacity
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.usage)
    }

    /// Takes one place.
    ///
    /// # Errors
    ///
    /// Returns `HisError::RoomFull` if every place is taken.
    pub fn occupy(&mut self) -> HisResult<()> {
        if !self.is_capacity_available() {
            return Err(HisError::RoomFull(self.name.to_string()));
        }
        self.usage += 1;
        self.stamps.touch();
        Ok(())
    }

    /// Frees one place.
    ///
    /// # Errors
    ///
    /// Returns `HisError::RoomEmpty` if the room is not in use.
    pub fn release(&mut self) -> HisResult<()> {
        if self.usage == 0 {
            return Err(HisError::RoomEmpty(self.name.to_string()));
        }
        self.usage -= 1;
        self.stamps.touch();
        Ok(())
    }
}

impl_record!(Room, "room", ROOMS_DIR_NAME);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: ShardableUuid,
    pub person: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(flatten)]
    pub stamps: TimeStamps,
}

impl Patient {
    pub fn new(person: Person, address: Option<Address>) -> Self {
        Self {
            id: ShardableUuid::new(),
            person,
            address,
            stamps: TimeStamps::now(),
        }
    }
}

impl_record!(Patient, "patient", PATIENTS_DIR_NAME);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_capacity_is_tracked() {
        let mut room = Room::new("OP-Raum 1", None, 1).unwrap();
        assert!(room.is_capacity_available());
        assert_eq!(room.free_capacity(), 1);

        room.occupy().unwrap();
        assert!(!room.is_capacity_available());
        assert_eq!(room.free_capacity(), 0);
        assert!(matches!(room.occupy(), Err(HisError::RoomFull(_))));

        room.release().unwrap();
        assert!(matches!(room.release(), Err(HisError::RoomEmpty(_))));
    }

    #[test]
    fn room_needs_capacity_and_short_name() {
        assert!(Room::new("Raum 1", None, 0).is_err());
        assert!(Room::new(&"r".repeat(ROOM_NAME_MAX_LEN + 1), None, 4).is_err());
    }

    #[test]
    fn room_usage_defaults_to_zero_when_missing() {
        let room = Room::new("Pausenraum", None, 10).unwrap();
        let yaml = serde_yaml::to_string(&room).unwrap().replace("usage: 0\n", "");
        let parsed: Room = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.usage, 0);
        assert_eq!(parsed, room);
    }

    #[test]
    fn department_name_is_validated() {
        assert!(Department::new("").is_err());
        assert!(Department::new(&"d".repeat(DEPARTMENT_NAME_MAX_LEN + 1)).is_err());
    }
}
