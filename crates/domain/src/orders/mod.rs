/// Order session aggregate
pub mod aggregate;

/// Commands
pub mod commands;

/// Events
pub mod events;

/// Input DTOs
pub mod inputs;

/// Form validation
pub mod intake;

/// Simulated payment
pub mod payment;

/// Frozen order data
pub mod record;

/// View (read model)
pub mod view;

/// CQRS setup
pub mod cqrs;

pub use aggregate::{
    DeliveryAttempt, Notice, NoticeLevel, OrderSession, Services, SessionStatus, AGGREGATE_TYPE,
};
pub use commands::Command;
pub use events::Event;
pub use inputs::{MedicineInput, OrderForm};
pub use intake::ValidationError;
pub use payment::{PaymentQuote, PaymentStep};
pub use record::{Gender, MedicineLine, OrderRecord, PrescriptionFile, PrescriptionKind};
pub use view::{MemViewRepository, Query, View};
