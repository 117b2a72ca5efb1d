//! Structured payloads carried by reports: TNM tumour staging, resection metadata and the
//! header of an imaging study.

use crate::error::{HisError, HisResult};
use chrono::NaiveDate;
use his_types::NonEmptyText;
use his_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extent of the primary tumour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tumor {
    TX,
    T0,
    Tis,
    T1,
    T2,
    T3,
    T4,
}

impl Tumor {
    // Longest codes first so prefix matching never stops early.
    const PARSE_ORDER: [Tumor; 7] = [
        Self::Tis,
        Self::TX,
        Self::T0,
        Self::T1,
        Self::T2,
        Self::T3,
        Self::T4,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::TX => "TX",
            Self::T0 => "T0",
            Self::Tis => "Tis",
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
            Self::T4 => "T4",
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Self::TX => "primary tumor cannot be assessed",
            Self::T0 => "no evidence of primary tumor",
            Self::Tis => "carcinoma in situ",
            Self::T1 => "site/tumor specific, generally small",
            Self::T2 => "site/tumor specific",
            Self::T3 => "site/tumor specific, generally large",
            Self::T4 => {
                "site/tumor specific, generally direct extension into adjacent organs/tissues"
            }
        }
    }
}

/// Regional lymph node involvement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Nodes {
    NX,
    N0,
    N1,
    N2,
    N3,
}

impl Nodes {
    const PARSE_ORDER: [Nodes; 5] = [Self::NX, Self::N0, Self::N1, Self::N2, Self::N3];

    pub const fn code(self) -> &'static str {
        match self {
            Self::NX => "NX",
            Self::N0 => "N0",
            Self::N1 => "N1",
            Self::N2 => "N2",
            Self::N3 => "N3",
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Self::NX => "nodes cannot be assessed",
            Self::N0 => "no regional nodal metastasis",
            Self::N1 | Self::N2 | Self::N3 => "site/tumor specific",
        }
    }
}

/// Distant metastasis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metastases {
    M0,
    M1,
}

impl Metastases {
    const PARSE_ORDER: [Metastases; 2] = [Self::M0, Self::M1];

    pub const fn code(self) -> &'static str {
        match self {
            Self::M0 => "M0",
            Self::M1 => "M1",
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Self::M0 => "no distant metastasis",
            Self::M1 => "distant metastasis present",
        }
    }
}

/// A TNM classification such as `T2N1M0`.
///
/// Stored and displayed in the compact form. Parsing is case sensitive and accepts nothing
/// but the three codes (surrounding whitespace aside).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TnmStaging {
    pub tumor: Tumor,
    pub nodes: Nodes,
    pub metastases: Metastases,
}

impl TnmStaging {
    /// Parses the compact form.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidStaging` if `input` is not exactly a tumour, a nodes and a
    /// metastases code in that order.
    pub fn parse(input: &str) -> HisResult<Self> {
        let invalid = || HisError::InvalidStaging(input.trim().to_string());
        let rest = input.trim();

        let (tumor, rest) = take_code(rest, &Tumor::PARSE_ORDER, |t| t.code()).ok_or_else(invalid)?;
        let (nodes, rest) = take_code(rest, &Nodes::PARSE_ORDER, |n| n.code()).ok_or_else(invalid)?;
        let (metastases, rest) =
            take_code(rest, &Metastases::PARSE_ORDER, |m| m.code()).ok_or_else(invalid)?;

        if !rest.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            tumor,
            nodes,
            metastases,
        })
    }

    /// One `code: description` line per component.
    pub fn describe(&self) -> String {
        format!(
            "{}: {}\n{}: {}\n{}: {}\n",
            self.tumor.code(),
            self.tumor.describe(),
            self.nodes.code(),
            self.nodes.describe(),
            self.metastases.code(),
            self.metastases.describe()
        )
    }
}

fn take_code<'a, T: Copy>(
    input: &'a str,
    candidates: &[T],
    code: impl Fn(T) -> &'static str,
) -> Option<(T, &'a str)> {
    candidates
        .iter()
        .copied()
        .find_map(|c| input.strip_prefix(code(c)).map(|rest| (c, rest)))
}

impl fmt::Display for TnmStaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.tumor.code(),
            self.nodes.code(),
            self.metastases.code()
        )
    }
}

impl FromStr for TnmStaging {
    type Err = HisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TnmStaging {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TnmStaging {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TnmStaging::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Tissue removed during surgery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resection {
    pub organ: NonEmptyText,
    pub resected_on: NaiveDate,
}

impl fmt::Display for Resection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tissue from {} was removed on {}",
            self.organ, self.resected_on
        )
    }
}

coded_enum! {
    /// Acquisition modality, stored by its DICOM code.
    Modality ("modality") {
        Ct => "CT", "Computertomographie",
        Mr => "MR", "Magnetresonanztomographie",
        Cr => "CR", "Röntgen",
        Us => "US", "Sonographie",
        Mg => "MG", "Mammographie",
        Pt => "PT", "Positronen-Emissions-Tomographie",
    }
}

/// Header of the image series an examination report describes.
///
/// `patient_id` is the patient the images were acquired for. A report is only filed when it
/// matches the patient of the report's case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagingStudy {
    pub modality: Modality,
    pub body_part: NonEmptyText,
    pub study_date: NaiveDate,
    pub patient_id: ShardableUuid,
}

impl fmt::Display for ImagingStudy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} acquired on {}",
            self.modality.code(),
            self.body_part,
            self.study_date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_carcinoma_in_situ() {
        let staging = TnmStaging::parse("TisN3M1").unwrap();
        assert_eq!(staging.tumor, Tumor::Tis);
        assert_eq!(staging.nodes, Nodes::N3);
        assert_eq!(staging.metastases, Metastases::M1);
        assert_eq!(staging.to_string(), "TisN3M1");
    }

    #[test]
    fn parse_ignores_surrounding_whitespace() {
        let staging = TnmStaging::parse("  TXNXM0\n").unwrap();
        assert_eq!(staging.to_string(), "TXNXM0");
    }

    #[test]
    fn parse_rejects_invalid_strings() {
        for input in ["", "T1N0", "t1n0m0", "T5N0M0", "T1N4M0", "T1N0M2", "T1N0M0x", "N0T1M0"] {
            assert!(
                matches!(TnmStaging::parse(input), Err(HisError::InvalidStaging(_))),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn describe_lists_each_component() {
        let staging = TnmStaging::parse("T2N0M0").unwrap();
        assert_eq!(
            staging.describe(),
            "T2: site/tumor specific\nN0: no regional nodal metastasis\nM0: no distant metastasis\n"
        );
    }

    #[test]
    fn staging_is_stored_in_compact_form() {
        let staging = TnmStaging::parse("T4N2M1").unwrap();
        let yaml = serde_yaml::to_string(&staging).unwrap();
        assert_eq!(yaml.trim(), "T4N2M1");

        let bad: Result<TnmStaging, _> = serde_yaml::from_str("T9N0M0");
        assert!(bad.is_err());
    }

    #[test]
    fn resection_display() {
        let resection = Resection {
            organ: NonEmptyText::new("liver").unwrap(),
            resected_on: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        };
        assert_eq!(resection.to_string(), "Tissue from liver was removed on 2024-05-17");
    }

    #[test]
    fn imaging_study_is_stored_with_dicom_codes() {
        let study = ImagingStudy {
            modality: Modality::Ct,
            body_part: NonEmptyText::new("Pankreas").unwrap(),
            study_date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            patient_id: ShardableUuid::new(),
        };
        assert_eq!(study.to_string(), "CT of Pankreas acquired on 2024-05-17");

        let yaml = serde_yaml::to_string(&study).unwrap();
        assert!(yaml.contains("modality: CT"));
        assert_eq!(serde_yaml::from_str::<ImagingStudy>(&yaml).unwrap(), study);

        assert_eq!("MR".parse::<Modality>().unwrap(), Modality::Mr);
        assert!(matches!("mri".parse::<Modality>(), Err(HisError::InvalidInput(_))));
    }
}
