use serde::{Deserialize, Serialize};

use super::inputs::OrderForm;
use super::record::PrescriptionFile;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Open a new intake session
    StartSession {
        id: String,
    },

    /// Replace the draft form fields
    UpdateForm {
        form: OrderForm,
    },

    /// Attach the uploaded prescription file
    AttachPrescription {
        file: PrescriptionFile,
    },

    /// Validate the draft and freeze it into an order
    SubmitOrder,

    /// Simulated payment acknowledgement
    ConfirmPayment {
        confirmed: bool,
    },

    /// Email the rendered receipt to the requester
    EmailReceipt,

    /// End the session
    CloseSession,
}
