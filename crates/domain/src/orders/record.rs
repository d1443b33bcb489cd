use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MAX_AGE: u32 = 120;
pub const MAX_MEDICINE_LINES: usize = 5;
pub const MAX_QUANTITY: i64 = 50;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Accepted prescription upload types.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionKind {
    Pdf,
    Png,
    Jpg,
    Jpeg,
}

impl PrescriptionKind {
    /// Resolves the kind from the declared content type, falling back to the
    /// file extension when the content type is absent or generic.
    pub fn from_declared(content_type: Option<&str>, file_name: &str) -> Option<Self> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let from_extension = match extension.as_deref() {
            Some("pdf") => Some(Self::Pdf),
            Some("png") => Some(Self::Png),
            Some("jpg") => Some(Self::Jpg),
            Some("jpeg") => Some(Self::Jpeg),
            _ => None,
        };

        let mime = content_type.map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });
        match mime.as_deref() {
            Some("application/pdf") => Some(Self::Pdf),
            Some("image/png") => Some(Self::Png),
            Some("image/jpeg") | Some("image/jpg") => match from_extension {
                Some(Self::Jpg) => Some(Self::Jpg),
                _ => Some(Self::Jpeg),
            },
            _ => from_extension,
        }
    }
}

/// An uploaded prescription, kept as an opaque attachment.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PrescriptionFile {
    pub file_name: String,
    pub kind: PrescriptionKind,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct MedicineLine {
    pub name: String,
    pub quantity: u32,
}

impl MedicineLine {
    /// A line is orderable only with a name and a positive quantity.
    pub fn is_orderable(&self) -> bool {
        !self.name.trim().is_empty() && self.quantity > 0
    }
}

/// Frozen snapshot of a submitted order.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderRecord {
    pub patient_name: String,
    pub age: u32,
    pub gender: Gender,
    pub address: String,
    pub doctor_name: String,
    pub prescription_date: NaiveDate,
    pub email: String,
    pub prescription: Option<PrescriptionFile>,
    pub medicines: Vec<MedicineLine>,
}

impl OrderRecord {
    pub fn has_prescription(&self) -> bool {
        self.prescription.is_some()
    }

    pub fn formatted_date(&self) -> String {
        self.prescription_date.format("%Y-%m-%d").to_string()
    }
}
