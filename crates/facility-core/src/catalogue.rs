//! The fixed catalogue of bookable facilities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of bookable facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    LectureTheatre,
    TennisCourt,
    BadmintonCourt,
    SoftwareLab,
}

impl FacilityKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LectureTheatre => "Lecture Theatre",
            Self::TennisCourt => "Tennis Court",
            Self::BadmintonCourt => "Badminton Court",
            Self::SoftwareLab => "Software Lab",
        }
    }
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub name: &'static str,
    pub kind: FacilityKind,
}

/// Facilities created at server start. Never extended at runtime.
pub const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        name: "LT1",
        kind: FacilityKind::LectureTheatre,
    },
    CatalogueEntry {
        name: "LT2",
        kind: FacilityKind::LectureTheatre,
    },
    CatalogueEntry {
        name: "TC1",
        kind: FacilityKind::TennisCourt,
    },
    CatalogueEntry {
        name: "BTC1",
        kind: FacilityKind::BadmintonCourt,
    },
    CatalogueEntry {
        name: "BTC2",
        kind: FacilityKind::BadmintonCourt,
    },
    CatalogueEntry {
        name: "SWLAB1",
        kind: FacilityKind::SoftwareLab,
    },
];
