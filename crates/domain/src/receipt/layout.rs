use crate::orders::record::{Gender, MedicineLine, OrderRecord};

pub const TITLE: &str = "Medicine Order Receipt";
pub const MEDICINES_HEADER: &str = "Medicines:";
pub const UPLOAD_NOTE: &str = "Prescription uploaded separately.";

const ADDRESS_WRAP_CHARS: usize = 90;
const SECTION_GAP_MM: f32 = 5.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReceiptLine {
    pub text: String,
    pub style: TextStyle,
    pub size: f32,
    pub align: Align,
    /// Extra vertical space above the line, in millimetres.
    pub space_before: f32,
}

impl ReceiptLine {
    fn regular(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::Regular,
            size: 12.0,
            align: Align::Left,
            space_before: 0.0,
        }
    }

    fn styled(mut self, style: TextStyle, size: f32) -> Self {
        self.style = style;
        self.size = size;
        self
    }

    fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    fn after_gap(mut self, gap: f32) -> Self {
        self.space_before = gap;
        self
    }
}

/// The values printed on a receipt.
#[derive(Clone, Debug)]
pub struct ReceiptFields<'a> {
    pub name: &'a str,
    pub age: u32,
    pub gender: Gender,
    pub doctor: &'a str,
    pub date: String,
    pub address: &'a str,
    pub medicines: &'a [MedicineLine],
    pub has_prescription: bool,
}

impl<'a> From<&'a OrderRecord> for ReceiptFields<'a> {
    fn from(order: &'a OrderRecord) -> Self {
        Self {
            name: &order.patient_name,
            age: order.age,
            gender: order.gender,
            doctor: &order.doctor_name,
            date: order.formatted_date(),
            address: &order.address,
            medicines: &order.medicines,
            has_prescription: order.has_prescription(),
        }
    }
}

/// Ordered, styled lines of a receipt, independent of the output format.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiptLayout {
    lines: Vec<ReceiptLine>,
}

impl ReceiptLayout {
    pub fn compose(fields: &ReceiptFields<'_>) -> Self {
        let mut lines = vec![
            ReceiptLine::regular(TITLE).centered(),
            ReceiptLine::regular(format!(
                "Patient: {}, Age: {}, Gender: {}",
                fields.name, fields.age, fields.gender
            )),
            ReceiptLine::regular(format!("Doctor: {}, Date: {}", fields.doctor, fields.date)),
        ];

        lines.extend(
            wrap_text(&format!("Address: {}", fields.address), ADDRESS_WRAP_CHARS)
                .into_iter()
                .map(ReceiptLine::regular),
        );

        let orderable: Vec<_> = fields
            .medicines
            .iter()
            .filter(|m| m.is_orderable())
            .collect();
        if !orderable.is_empty() {
            lines.push(
                ReceiptLine::regular(MEDICINES_HEADER)
                    .styled(TextStyle::Bold, 12.0)
                    .after_gap(SECTION_GAP_MM),
            );
            for medicine in orderable {
                lines.push(
                    ReceiptLine::regular(format!("- {} x {}", medicine.name, medicine.quantity))
                        .styled(TextStyle::Regular, 11.0),
                );
            }
        }

        if fields.has_prescription {
            lines.push(
                ReceiptLine::regular(UPLOAD_NOTE)
                    .styled(TextStyle::Italic, 10.0)
                    .after_gap(SECTION_GAP_MM),
            );
        }

        Self { lines }
    }

    pub fn for_order(order: &OrderRecord) -> Self {
        Self::compose(&ReceiptFields::from(order))
    }

    pub fn lines(&self) -> &[ReceiptLine] {
        &self.lines
    }

    pub fn text_lines(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }
}

/// Wraps each line of `text` on word boundaries. Explicit line breaks are kept.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.chars().count() + word.chars().count() + 1 > max_chars
                && !current.is_empty()
            {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
