//! HTTP surface of the medicine order portal.
//!
//! Each route triggers one session command and answers with the updated
//! session view.

pub mod error;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use cqrs_es::persist::ViewRepository;
use order_domain::{
    delivery::Mailer,
    orders::{
        self, cqrs::OrderCqrs, inputs::ConfirmPaymentInput, MemViewRepository, OrderForm,
        PaymentStep, PrescriptionFile, PrescriptionKind, Services, View,
    },
    receipt::{ReceiptFiles, ReceiptRenderer, DOWNLOAD_FILE_NAME},
    Error,
};
use serde_json::json;
use ulid::Ulid;

pub use error::ApiError;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    sessions_repo: Arc<MemViewRepository>,
    sessions_cqrs: Arc<OrderCqrs>,
    receipts: ReceiptFiles,
    payment: PaymentStep,
}

impl AppState {
    pub fn new(renderer: Arc<dyn ReceiptRenderer>, mailer: Arc<dyn Mailer>) -> Self {
        let receipts = ReceiptFiles::default();
        let payment = PaymentStep::default();
        let services = Services::new(payment.clone(), renderer, mailer, receipts.clone());

        let sessions_repo = orders::cqrs::init_repo();
        let sessions_cqrs = orders::cqrs::init(sessions_repo.clone(), services);

        Self {
            sessions_repo,
            sessions_cqrs,
            receipts,
            payment,
        }
    }

    async fn execute(&self, id: &str, command: orders::Command) -> Result<(), ApiError> {
        let mut metadata = HashMap::new();
        metadata.insert("command_id".to_string(), Ulid::new().to_string());

        self.sessions_cqrs
            .execute_with_metadata(id, command, metadata)
            .await
            .map_err(ApiError::from)
    }

    async fn load(&self, id: &str) -> Result<View, ApiError> {
        self.sessions_repo
            .load(id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Session {id} not found")))
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(close_session))
        .route("/sessions/:id/form", put(update_form))
        .route("/sessions/:id/prescription", post(upload_prescription))
        .route("/sessions/:id/submit", post(submit_order))
        .route(
            "/sessions/:id/payment",
            get(payment_quote).post(confirm_payment),
        )
        .route("/sessions/:id/receipt", get(download_receipt))
        .route("/sessions/:id/receipt/email", post(email_receipt))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// Start session
async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let id = Ulid::new().to_string();

    state
        .execute(&id, orders::Command::StartSession { id: id.clone() })
        .await?;
    let view = state.load(&id).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

// Get session
async fn get_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.load(&id).await?))
}

// End session: drop its receipt files and view
async fn close_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.execute(&id, orders::Command::CloseSession).await?;

    let released = state.receipts.release(&id);
    state.sessions_repo.remove(&id).await;
    tracing::info!("Session {} closed (receipt released: {})", id, released);

    Ok(Json(json!({
        "message": "Session closed",
        "receipt_released": released,
    })))
}

// Replace draft form
async fn update_form(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(form): Json<OrderForm>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .execute(&id, orders::Command::UpdateForm { form })
        .await?;

    Ok(Json(state.load(&id).await?))
}

// Attach prescription file (multipart field `file`)
async fn upload_prescription(
    Path(id): Path<String>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("prescription").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {e}")))?;
        upload = Some((file_name, content_type, bytes));
        break;
    }

    let Some((file_name, content_type, bytes)) = upload else {
        return Err(ApiError::BadRequest("Missing `file` field".to_string()));
    };
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    let kind = PrescriptionKind::from_declared(content_type.as_deref(), &file_name)
        .ok_or_else(|| Error::UnsupportedPrescription {
            file_name: file_name.clone(),
        })?;

    tracing::info!("Prescription {} ({:?}) uploaded for {}", file_name, kind, id);
    let file = PrescriptionFile {
        file_name,
        kind,
        bytes: bytes.to_vec(),
    };
    state
        .execute(&id, orders::Command::AttachPrescription { file })
        .await?;

    Ok(Json(state.load(&id).await?))
}

// Place order
async fn submit_order(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.execute(&id, orders::Command::SubmitOrder).await?;

    Ok(Json(state.load(&id).await?))
}

// Payment screen
async fn payment_quote(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.load(&id).await?;

    Ok(Json(json!({
        "status": view.session.status,
        "quote": state.payment.quote(),
    })))
}

// Simulate payment success
async fn confirm_payment(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<ConfirmPaymentInput>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .execute(
            &id,
            orders::Command::ConfirmPayment {
                confirmed: input.confirmed,
            },
        )
        .await?;

    Ok(Json(state.load(&id).await?))
}

// Download receipt PDF
async fn download_receipt(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.load(&id).await?;
    let receipt = match &view.session.receipt {
        Some(receipt) if view.session.receipt_ready() => receipt,
        _ => {
            return Err(ApiError::Conflict(format!(
                "Receipt is not ready while session is {}",
                view.session.status
            )))
        }
    };

    let bytes = state
        .receipts
        .read(&receipt.file_name)
        .await?
        .ok_or(Error::ReceiptUnavailable)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILE_NAME}\""),
            ),
        ],
        bytes,
    ))
}

// Email receipt
async fn email_receipt(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.execute(&id, orders::Command::EmailReceipt).await?;
    let view = state.load(&id).await?;

    let delivered = view
        .session
        .deliveries
        .last()
        .is_some_and(|attempt| attempt.outcome.is_delivered());

    Ok(Json(json!({
        "delivered": delivered,
        "notice": view.session.notice,
        "session": view,
    })))
}
