use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::Gender;

/// Draft form fields as entered, before validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct OrderForm {
    pub patient_name: String,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub address: String,
    pub doctor_name: String,
    pub prescription_date: Option<NaiveDate>,
    pub email: String,
    pub medicines: Vec<MedicineInput>,
}

/// One manual medicine slot. Empty slots are allowed and skipped.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct MedicineInput {
    pub name: String,
    pub quantity: i64,
}

impl MedicineInput {
    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfirmPaymentInput {
    pub confirmed: bool,
}
