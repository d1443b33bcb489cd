use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

use crate::delivery::{self, DeliveryOutcome, Mailer, OutgoingMail};
use crate::errors::Error;
use crate::receipt::{ReceiptFiles, ReceiptRenderer, ReceiptSummary};

use super::inputs::OrderForm;
use super::intake;
use super::payment::PaymentStep;
use super::record::{OrderRecord, PrescriptionFile};
use super::{Command, Event};

pub const ORDER_SAVED: &str = "Order Details Saved! Proceed to Payment.";
pub const PAYMENT_SUCCESSFUL: &str = "Payment Successful!";
pub const EMAIL_SENT: &str = "Email sent successfully to your inbox.";

/// Session workflow status. Strictly linear; there is no way back.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Collecting form input
    #[default]
    Editing,
    /// Order submitted, checks running
    Validating,
    /// Order frozen, waiting for the payment acknowledgement
    AwaitingPayment,
    /// Payment acknowledged, receipt being drawn
    Rendering,
    /// Receipt ready for download or email
    AwaitingDelivery,
    /// At least one email attempt made
    Done,
    /// Session ended; nothing more is accepted
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Editing => "Editing",
            SessionStatus::Validating => "Validating",
            SessionStatus::AwaitingPayment => "AwaitingPayment",
            SessionStatus::Rendering => "Rendering",
            SessionStatus::AwaitingDelivery => "AwaitingDelivery",
            SessionStatus::Done => "Done",
            SessionStatus::Closed => "Closed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Inline message shown after the last action.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct DeliveryAttempt {
    pub recipient: String,
    pub outcome: DeliveryOutcome,
    pub attempted_at: DateTime<Utc>,
}

/// Order session aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SessionStatus,

    // Intake
    pub draft: OrderForm,
    pub prescription: Option<PrescriptionFile>,
    pub order: Option<OrderRecord>,

    // Fulfilment
    pub amount_paid: Option<String>,
    pub receipt: Option<ReceiptSummary>,
    pub deliveries: Vec<DeliveryAttempt>,

    pub notice: Option<Notice>,
}

pub const AGGREGATE_TYPE: &str = "OrderSession";

/// Collaborators the session calls out to while handling commands.
#[derive(Clone)]
pub struct Services {
    pub payment: PaymentStep,
    pub renderer: Arc<dyn ReceiptRenderer>,
    pub mailer: Arc<dyn Mailer>,
    pub receipts: ReceiptFiles,
}

impl Services {
    pub fn new(
        payment: PaymentStep,
        renderer: Arc<dyn ReceiptRenderer>,
        mailer: Arc<dyn Mailer>,
        receipts: ReceiptFiles,
    ) -> Self {
        Self {
            payment,
            renderer,
            mailer,
            receipts,
        }
    }
}

#[async_trait]
impl Aggregate for OrderSession {
    type Command = Command;
    type Event = Event;
    type Error = Error;
    type Services = Services;

    fn aggregate_type() -> String {
        AGGREGATE_TYPE.to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            Command::StartSession { id } => {
                self.validate_new()?;

                Ok(vec![Event::SessionStarted {
                    id,
                    created_at: Utc::now(),
                }])
            }

            Command::UpdateForm { form } => {
                self.validate_existing()?;
                self.require(&[SessionStatus::Editing], SessionStatus::Editing)?;

                Ok(vec![Event::FormUpdated {
                    id: self.id.clone(),
                    form,
                    updated_at: Utc::now(),
                }])
            }

            Command::AttachPrescription { file } => {
                self.validate_existing()?;
                self.require(&[SessionStatus::Editing], SessionStatus::Editing)?;

                Ok(vec![Event::PrescriptionAttached {
                    id: self.id.clone(),
                    file,
                    updated_at: Utc::now(),
                }])
            }

            Command::SubmitOrder => {
                self.validate_existing()?;
                self.require(&[SessionStatus::Editing], SessionStatus::Validating)?;

                let today = Local::now().date_naive();
                let order = intake::validate(&self.draft, self.prescription.clone(), today)?;
                let now = Utc::now();

                Ok(vec![
                    Event::OrderSubmitted {
                        id: self.id.clone(),
                        updated_at: now,
                    },
                    Event::OrderValidated {
                        id: self.id.clone(),
                        order,
                        updated_at: now,
                    },
                ])
            }

            Command::ConfirmPayment { confirmed } => {
                self.validate_existing()?;
                self.require(&[SessionStatus::AwaitingPayment], SessionStatus::Rendering)?;

                if !services.payment.confirm(confirmed) {
                    return Err(Error::PaymentNotConfirmed);
                }

                let order = self.frozen_order()?;
                let rendered = services.renderer.render(order)?;
                let receipt = rendered.summary();
                // Held by file name, so only the committed summary ever resolves to it.
                services.receipts.store(&self.id, rendered.file);
                let now = Utc::now();

                Ok(vec![
                    Event::PaymentConfirmed {
                        id: self.id.clone(),
                        amount: services.payment.quote().display_amount.clone(),
                        updated_at: now,
                    },
                    Event::ReceiptRendered {
                        id: self.id.clone(),
                        receipt,
                        updated_at: now,
                    },
                ])
            }

            Command::EmailReceipt => {
                self.validate_existing()?;
                self.require(
                    &[SessionStatus::AwaitingDelivery, SessionStatus::Done],
                    SessionStatus::Done,
                )?;

                let order = self.frozen_order()?;
                let attachment = self
                    .receipt
                    .as_ref()
                    .and_then(|receipt| services.receipts.path(&receipt.file_name))
                    .ok_or(Error::ReceiptUnavailable)?;
                let mail = OutgoingMail::receipt(&order.email, attachment);
                let outcome = delivery::dispatch(services.mailer.as_ref(), &mail).await;
                let now = Utc::now();

                Ok(vec![Event::ReceiptDispatched {
                    id: self.id.clone(),
                    attempt: DeliveryAttempt {
                        recipient: mail.recipient,
                        outcome,
                        attempted_at: now,
                    },
                    updated_at: now,
                }])
            }

            Command::CloseSession => {
                self.validate_existing()?;

                Ok(vec![Event::SessionClosed {
                    id: self.id.clone(),
                    updated_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::SessionStarted { id, created_at } => {
                self.id = id;
                self.created_at = created_at;
                self.updated_at = created_at;
                self.status = SessionStatus::Editing;
            }

            Event::FormUpdated {
                form, updated_at, ..
            } => {
                self.draft = form;
                self.notice = None;
                self.updated_at = updated_at;
            }

            Event::PrescriptionAttached {
                file, updated_at, ..
            } => {
                self.prescription = Some(file);
                self.updated_at = updated_at;
            }

            Event::OrderSubmitted { updated_at, .. } => {
                self.status = SessionStatus::Validating;
                self.updated_at = updated_at;
            }

            Event::OrderValidated {
                order, updated_at, ..
            } => {
                self.order = Some(order);
                self.status = SessionStatus::AwaitingPayment;
                self.notice = Some(Notice::success(ORDER_SAVED));
                self.updated_at = updated_at;
            }

            Event::PaymentConfirmed {
                amount, updated_at, ..
            } => {
                self.amount_paid = Some(amount);
                self.status = SessionStatus::Rendering;
                self.notice = Some(Notice::success(PAYMENT_SUCCESSFUL));
                self.updated_at = updated_at;
            }

            Event::ReceiptRendered {
                receipt,
                updated_at,
                ..
            } => {
                self.receipt = Some(receipt);
                self.status = SessionStatus::AwaitingDelivery;
                self.updated_at = updated_at;
            }

            Event::ReceiptDispatched {
                attempt,
                updated_at,
                ..
            } => {
                self.notice = Some(match &attempt.outcome {
                    DeliveryOutcome::Delivered => Notice::success(EMAIL_SENT),
                    DeliveryOutcome::Failed { message, .. } => {
                        Notice::error(format!("Email failed: {message}"))
                    }
                });
                self.deliveries.push(attempt);
                self.status = SessionStatus::Done;
                self.updated_at = updated_at;
            }

            Event::SessionClosed { updated_at, .. } => {
                self.status = SessionStatus::Closed;
                self.draft = OrderForm::default();
                self.prescription = None;
                self.order = None;
                self.notice = None;
                self.updated_at = updated_at;
            }
        }
    }
}

impl OrderSession {
    fn validate_new(&self) -> Result<(), Error> {
        if !self.id.is_empty() {
            return Err(Error::Uniqueness {
                field: "id".to_string(),
            });
        }
        Ok(())
    }

    fn validate_existing(&self) -> Result<(), Error> {
        if self.id.is_empty() || self.status == SessionStatus::Closed {
            return Err(Error::NotFound {
                entity: AGGREGATE_TYPE.to_string(),
            });
        }
        Ok(())
    }

    fn require(&self, allowed: &[SessionStatus], to: SessionStatus) -> Result<(), Error> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(Error::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        })
    }

    fn frozen_order(&self) -> Result<&OrderRecord, Error> {
        self.order.as_ref().ok_or_else(|| Error::NotFound {
            entity: "OrderRecord".to_string(),
        })
    }

    /// Whether the receipt can be downloaded.
    pub fn receipt_ready(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::AwaitingDelivery | SessionStatus::Done
        ) && self.receipt.is_some()
    }
}
