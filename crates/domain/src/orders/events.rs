use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use super::aggregate::DeliveryAttempt;
use super::inputs::OrderForm;
use super::record::{OrderRecord, PrescriptionFile};
use crate::receipt::ReceiptSummary;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        id: String,
        created_at: DateTime<Utc>,
    },

    FormUpdated {
        id: String,
        form: OrderForm,
        updated_at: DateTime<Utc>,
    },

    PrescriptionAttached {
        id: String,
        file: PrescriptionFile,
        updated_at: DateTime<Utc>,
    },

    OrderSubmitted {
        id: String,
        updated_at: DateTime<Utc>,
    },

    OrderValidated {
        id: String,
        order: OrderRecord,
        updated_at: DateTime<Utc>,
    },

    PaymentConfirmed {
        id: String,
        amount: String,
        updated_at: DateTime<Utc>,
    },

    ReceiptRendered {
        id: String,
        receipt: ReceiptSummary,
        updated_at: DateTime<Utc>,
    },

    ReceiptDispatched {
        id: String,
        attempt: DeliveryAttempt,
        updated_at: DateTime<Utc>,
    },

    SessionClosed {
        id: String,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::SessionStarted { .. } => "OrderSession:Started".to_string(),
            Event::FormUpdated { .. } => "OrderSession:FormUpdated".to_string(),
            Event::PrescriptionAttached { .. } => "OrderSession:PrescriptionAttached".to_string(),
            Event::OrderSubmitted { .. } => "OrderSession:OrderSubmitted".to_string(),
            Event::OrderValidated { .. } => "OrderSession:OrderValidated".to_string(),
            Event::PaymentConfirmed { .. } => "OrderSession:PaymentConfirmed".to_string(),
            Event::ReceiptRendered { .. } => "OrderSession:ReceiptRendered".to_string(),
            Event::ReceiptDispatched { .. } => "OrderSession:ReceiptDispatched".to_string(),
            Event::SessionClosed { .. } => "OrderSession:Closed".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
