//! Building blocks shared by several record kinds: timestamps, the open/closed lifecycle, and
//! personal data (name, gender, address).

use crate::constants::{ADDRESS_FIELD_MAX_LEN, NAME_MAX_LEN, ZIP_CODE_MAX_LEN};
use crate::error::{HisError, HisResult};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use his_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Creation and last-modification time of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeStamps {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Timestamps plus an optional closing time, for records that can be closed and reopened
/// (cases, acts, orders).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    #[serde(flatten)]
    pub stamps: TimeStamps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            stamps: TimeStamps::now(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Sets `closed_at` to now.
    ///
    /// # Errors
    ///
    /// Returns `HisError::AlreadyClosed` if the record is already closed.
    pub fn close(&mut self, kind: &'static str) -> HisResult<()> {
        if self.is_closed() {
            return Err(HisError::AlreadyClosed { kind });
        }
        let now = Utc::now();
        self.closed_at = Some(now);
        self.stamps.updated_at = now;
        Ok(())
    }

    /// Clears `closed_at`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::NotClosed` if the record is open.
    pub fn reopen(&mut self, kind: &'static str) -> HisResult<()> {
        if self.is_open() {
            return Err(HisError::NotClosed { kind });
        }
        self.closed_at = None;
        self.stamps.touch();
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Gender as recorded on a person. Stored as the single-letter codes `m`, `w` and `d`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "w")]
    Female,
    #[default]
    #[serde(rename = "d")]
    Diverse,
}

impl Gender {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "m",
            Self::Female => "w",
            Self::Diverse => "d",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "männlich",
            Self::Female => "weiblich",
            Self::Diverse => "divers",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Gender {
    type Err = HisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "m" => Ok(Self::Male),
            "w" => Ok(Self::Female),
            "d" | "" => Ok(Self::Diverse),
            other => Err(HisError::InvalidInput(format!(
                "gender must be one of m, w, d; got '{other}'"
            ))),
        }
    }
}

/// Personal data shared by patients and employees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<NonEmptyText>,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl Person {
    /// Builds a person, validating name lengths. A blank title counts as no title.
    pub fn new(
        gender: Gender,
        title: Option<&str>,
        first_name: &str,
        last_name: &str,
        date_of_birth: Option<NaiveDate>,
    ) -> HisResult<Self> {
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => Some(NonEmptyText::bounded(t, NAME_MAX_LEN)?),
            None => None,
        };
        Ok(Self {
            gender,
            title,
            first_name: NonEmptyText::bounded(first_name, NAME_MAX_LEN)?,
            last_name: NonEmptyText::bounded(last_name, NAME_MAX_LEN)?,
            date_of_birth,
        })
    }

    /// `"{title} {first} {last}"`, without the title when there is none.
    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) => format!("{} {} {}", title, self.first_name, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Letter salutation for this person's gender.
    pub fn salutation(&self) -> &'static str {
        match self.gender {
            Gender::Diverse => "Hallo",
            Gender::Male => "Sehr geehrter",
            Gender::Female => "Sehr geehrte",
        }
    }

    /// Full years of age on `date`. `None` without a date of birth or for dates before it.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let born = self.date_of_birth?;
        let mut years = date.year() - born.year();
        if (date.month(), date.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Postal address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: NonEmptyText,
    pub street_number: u32,
    pub zip_code: NonEmptyText,
    pub city: NonEmptyText,
}

impl Address {
    /// Builds an address. The zip code must be at most five digits.
    pub fn new(street: &str, street_number: u32, zip_code: &str, city: &str) -> HisResult<Self> {
        let zip_code = NonEmptyText::bounded(zip_code, ZIP_CODE_MAX_LEN)?;
        if !zip_code.as_str().bytes().all(|b| b.is_ascii_digit()) {
            return Err(HisError::InvalidInput(format!(
                "zip code must contain digits only, got '{zip_code}'"
            )));
        }
        Ok(Self {
            street: NonEmptyText::bounded(street, ADDRESS_FIELD_MAX_LEN)?,
            street_number,
            zip_code,
            city: NonEmptyText::bounded(city, ADDRESS_FIELD_MAX_LEN)?,
        })
    }

    /// Two address lines without the name: `"{street} {number}\n{zip} {city}"`.
    pub fn lines(&self) -> String {
        format!(
            "{} {}\n{} {}",
            self.street, self.street_number, self.zip_code, self.city
        )
    }

    /// Name line followed by the address lines.
    pub fn postal_address(&self, person: &Person) -> String {
        format!("{}\n{}", person.display_name(), self.lines())
    }
}
