//! Order intake: turns a draft form into a frozen [`OrderRecord`].

use chrono::NaiveDate;
use thiserror::Error;

use super::inputs::OrderForm;
use super::record::{
    MedicineLine, OrderRecord, PrescriptionFile, MAX_AGE, MAX_MEDICINE_LINES, MAX_QUANTITY,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill all required fields: {}.", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Please either upload a prescription or enter medicine details.")]
    NoMedicineSource,

    #[error("Age must be between 1 and {max}, got {0}.", max = MAX_AGE)]
    AgeOutOfRange(u32),

    #[error("At most {max} medicines can be entered, got {0}.", max = MAX_MEDICINE_LINES)]
    TooManyMedicineLines(usize),

    #[error("Quantity for {name} must be between 1 and {max}, got {quantity}.", max = MAX_QUANTITY)]
    QuantityOutOfRange { name: String, quantity: i64 },
}

fn required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Validates the draft and freezes it.
///
/// `today` fills an unset prescription date. A zero age is treated as unset,
/// matching the form's number input which starts at zero.
pub fn validate(
    form: &OrderForm,
    prescription: Option<PrescriptionFile>,
    today: NaiveDate,
) -> Result<OrderRecord, ValidationError> {
    let mut missing = Vec::new();

    let patient_name = required(&form.patient_name);
    if patient_name.is_none() {
        missing.push("patient name");
    }
    let age = form.age.filter(|age| *age > 0);
    if age.is_none() {
        missing.push("age");
    }
    if form.gender.is_none() {
        missing.push("gender");
    }
    let address = required(&form.address);
    if address.is_none() {
        missing.push("address");
    }
    let doctor_name = required(&form.doctor_name);
    if doctor_name.is_none() {
        missing.push("doctor name");
    }
    let email = required(&form.email);
    if email.is_none() {
        missing.push("email");
    }

    let (
        Some(patient_name),
        Some(age),
        Some(gender),
        Some(address),
        Some(doctor_name),
        Some(email),
    ) = (patient_name, age, form.gender, address, doctor_name, email)
    else {
        return Err(ValidationError::MissingFields(missing));
    };

    if age > MAX_AGE {
        return Err(ValidationError::AgeOutOfRange(age));
    }

    let medicines = medicine_lines(form)?;
    if medicines.is_empty() && prescription.is_none() {
        return Err(ValidationError::NoMedicineSource);
    }

    Ok(OrderRecord {
        patient_name,
        age,
        gender,
        address,
        doctor_name,
        prescription_date: form.prescription_date.unwrap_or(today),
        email,
        prescription,
        medicines,
    })
}

/// Keeps the slots with a name and a positive quantity, in entry order.
fn medicine_lines(form: &OrderForm) -> Result<Vec<MedicineLine>, ValidationError> {
    if form.medicines.len() > MAX_MEDICINE_LINES {
        return Err(ValidationError::TooManyMedicineLines(form.medicines.len()));
    }

    let mut lines = Vec::new();
    for slot in &form.medicines {
        let name = slot.name.trim();
        if name.is_empty() || slot.quantity <= 0 {
            continue;
        }
        if slot.quantity > MAX_QUANTITY {
            return Err(ValidationError::QuantityOutOfRange {
                name: name.to_string(),
                quantity: slot.quantity,
            });
        }
        lines.push(MedicineLine {
            name: name.to_string(),
            quantity: slot.quantity as u32,
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::inputs::MedicineInput;
    use crate::orders::record::{Gender, PrescriptionKind};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn complete_form() -> OrderForm {
        OrderForm {
            patient_name: "Asha Rao".into(),
            age: Some(34),
            gender: Some(Gender::Female),
            address: "12 MG Road".into(),
            doctor_name: "Dr. Iyer".into(),
            prescription_date: None,
            email: "asha@example.com".into(),
            medicines: vec![
                MedicineInput::new("Paracetamol", 2),
                MedicineInput::new("Cough Syrup", 1),
            ],
        }
    }

    fn upload() -> PrescriptionFile {
        PrescriptionFile {
            file_name: "rx.pdf".into(),
            kind: PrescriptionKind::Pdf,
            bytes: b"%PDF-1.4".to_vec(),
        }
    }

    #[test]
    fn complete_form_freezes_into_record() {
        let record = validate(&complete_form(), None, today()).unwrap();

        assert_eq!(record.patient_name, "Asha Rao");
        assert_eq!(record.age, 34);
        assert_eq!(record.prescription_date, today());
        assert_eq!(record.medicines.len(), 2);
        assert_eq!(record.medicines[0].name, "Paracetamol");
        assert_eq!(record.medicines[1].quantity, 1);
    }

    #[test]
    fn explicit_date_is_kept() {
        let mut form = complete_form();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        form.prescription_date = Some(date);

        let record = validate(&form, None, today()).unwrap();
        assert_eq!(record.formatted_date(), "2024-01-02");
    }

    #[test]
    fn each_missing_field_is_rejected() {
        let blankers: Vec<(&str, fn(&mut OrderForm))> = vec![
            ("patient name", |f| f.patient_name.clear()),
            ("age", |f| f.age = None),
            ("gender", |f| f.gender = None),
            ("address", |f| f.address = "   ".into()),
            ("doctor name", |f| f.doctor_name.clear()),
            ("email", |f| f.email.clear()),
        ];

        for (field, blank) in blankers {
            let mut form = complete_form();
            blank(&mut form);
            assert_eq!(
                validate(&form, None, today()),
                Err(ValidationError::MissingFields(vec![field])),
                "{field} should be required"
            );
        }
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let form = OrderForm::default();
        let err = validate(&form, Some(upload()), today()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Please fill all required fields: patient name, age, gender, address, doctor name, email."
        );
    }

    #[test]
    fn zero_age_counts_as_missing() {
        let mut form = complete_form();
        form.age = Some(0);

        assert_eq!(
            validate(&form, None, today()),
            Err(ValidationError::MissingFields(vec!["age"]))
        );
    }

    #[test]
    fn age_above_limit_is_rejected() {
        let mut form = complete_form();
        form.age = Some(121);

        assert_eq!(
            validate(&form, None, today()),
            Err(ValidationError::AgeOutOfRange(121))
        );
    }

    #[test]
    fn no_medicines_and_no_upload_is_rejected() {
        let mut form = complete_form();
        form.medicines.clear();

        assert_eq!(
            validate(&form, None, today()),
            Err(ValidationError::NoMedicineSource)
        );
    }

    #[test]
    fn only_blank_slots_count_as_no_medicines() {
        let mut form = complete_form();
        form.medicines = vec![MedicineInput::new("", 3), MedicineInput::new("Zinc", 0)];

        assert_eq!(
            validate(&form, None, today()),
            Err(ValidationError::NoMedicineSource)
        );
    }

    #[test]
    fn upload_alone_is_a_medicine_source() {
        let mut form = complete_form();
        form.medicines.clear();

        let record = validate(&form, Some(upload()), today()).unwrap();
        assert!(record.has_prescription());
        assert!(record.medicines.is_empty());
    }

    #[test]
    fn incomplete_slots_are_dropped() {
        let mut form = complete_form();
        form.medicines = vec![
            MedicineInput::new("Paracetamol", 2),
            MedicineInput::new("", 4),
            MedicineInput::new("Vitamin C", 0),
            MedicineInput::new("Antacid", -1),
            MedicineInput::new(" Cough Syrup ", 1),
        ];

        let record = validate(&form, None, today()).unwrap();
        let names: Vec<_> = record.medicines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Paracetamol", "Cough Syrup"]);
    }

    #[test]
    fn too_many_slots_are_rejected() {
        let mut form = complete_form();
        form.medicines = (0..6).map(|i| MedicineInput::new(format!("M{i}"), 1)).collect();

        assert_eq!(
            validate(&form, None, today()),
            Err(ValidationError::TooManyMedicineLines(6))
        );
    }

    #[test]
    fn quantity_above_limit_is_rejected() {
        let mut form = complete_form();
        form.medicines = vec![MedicineInput::new("Paracetamol", 51)];

        assert_eq!(
            validate(&form, None, today()),
            Err(ValidationError::QuantityOutOfRange {
                name: "Paracetamol".into(),
                quantity: 51,
            })
        );
    }
}
