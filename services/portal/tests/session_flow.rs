use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use order_domain::{
    delivery::{DeliveryError, Mailer, OutgoingMail},
    receipt::PdfReceiptRenderer,
};
use portal::{app, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Default)]
struct FakeMailer {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Attachment(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "relay unreachable",
            )));
        }
        self.sent.lock().unwrap().push(mail.recipient.clone());
        Ok(())
    }
}

struct Portal {
    router: Router,
    mailer: Arc<FakeMailer>,
    dir: TempDir,
}

impl Portal {
    fn new(fail_mail: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(FakeMailer {
            fail: fail_mail,
            ..Default::default()
        });
        let renderer = Arc::new(PdfReceiptRenderer::new(Some(dir.path().to_path_buf())));
        let router = app(AppState::new(renderer, mailer.clone()));
        Self {
            router,
            mailer,
            dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec(), headers)
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes, _) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn receipt_files(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }

    async fn start(&self) -> String {
        let (status, view) = self.json(Method::POST, "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        view["id"].as_str().unwrap().to_string()
    }

    async fn upload(
        &self,
        id: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let boundary = "portal-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/sessions/{id}/prescription"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, bytes, _) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

fn asha_form() -> Value {
    json!({
        "patient_name": "Asha Rao",
        "age": 34,
        "gender": "Female",
        "address": "12 MG Road",
        "doctor_name": "Dr. Iyer",
        "prescription_date": "2024-05-01",
        "email": "asha@example.com",
        "medicines": [
            { "name": "Paracetamol", "quantity": 2 },
            { "name": "Cough Syrup", "quantity": 1 }
        ]
    })
}

async fn paid_session(portal: &Portal) -> String {
    let id = portal.start().await;
    let uri = format!("/sessions/{id}");

    let (status, _) = portal
        .json(Method::PUT, &format!("{uri}/form"), Some(asha_form()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, view) = portal.json(Method::POST, &format!("{uri}/submit"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["session"]["status"], "awaiting_payment");

    let (status, view) = portal
        .json(
            Method::POST,
            &format!("{uri}/payment"),
            Some(json!({ "confirmed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["session"]["status"], "awaiting_delivery");

    id
}

#[tokio::test]
async fn order_flow_ends_with_emailed_receipt() {
    let portal = Portal::new(false);
    let id = paid_session(&portal).await;

    let (status, view) = portal.json(Method::GET, &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["session"]["amount_paid"], "₹149.00");
    assert_eq!(view["session"]["notice"]["message"], "Payment Successful!");

    let lines: Vec<&str> = view["session"]["receipt"]["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line.as_str().unwrap())
        .collect();
    for expected in [
        "Patient: Asha Rao, Age: 34, Gender: Female",
        "Doctor: Dr. Iyer, Date: 2024-05-01",
        "- Paracetamol x 2",
        "- Cough Syrup x 1",
    ] {
        assert!(lines.contains(&expected), "missing receipt line {expected:?}");
    }

    let (status, body) = portal
        .json(Method::POST, &format!("/sessions/{id}/receipt/email"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);
    assert_eq!(body["notice"]["message"], "Email sent successfully to your inbox.");
    assert_eq!(body["session"]["session"]["status"], "done");
    assert_eq!(
        *portal.mailer.sent.lock().unwrap(),
        vec!["asha@example.com".to_string()]
    );
}

#[tokio::test]
async fn receipt_downloads_as_pdf_attachment() {
    let portal = Portal::new(false);
    let id = paid_session(&portal).await;

    let request = Request::builder()
        .uri(format!("/sessions/{id}/receipt"))
        .body(Body::empty())
        .unwrap();
    let (status, bytes, headers) = portal.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"medicine_order.pdf\""
    );
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn failed_email_still_finishes_session() {
    let portal = Portal::new(true);
    let id = paid_session(&portal).await;

    let (status, body) = portal
        .json(Method::POST, &format!("/sessions/{id}/receipt/email"), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], false);
    assert_eq!(body["notice"]["level"], "error");
    assert_eq!(body["session"]["session"]["status"], "done");
}

#[tokio::test]
async fn missing_fields_answer_with_warning() {
    let portal = Portal::new(false);
    let id = portal.start().await;

    let mut form = asha_form();
    form["patient_name"] = json!("   ");
    portal
        .json(Method::PUT, &format!("/sessions/{id}/form"), Some(form))
        .await;

    let (status, body) = portal
        .json(Method::POST, &format!("/sessions/{id}/submit"), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["warning"]
        .as_str()
        .unwrap()
        .starts_with("Please fill all required fields"));

    let (_, view) = portal.json(Method::GET, &format!("/sessions/{id}"), None).await;
    assert_eq!(view["session"]["status"], "editing");
}

#[tokio::test]
async fn prescription_upload_replaces_medicine_lines() {
    let portal = Portal::new(false);
    let id = portal.start().await;

    let mut form = asha_form();
    form["medicines"] = json!([]);
    portal
        .json(Method::PUT, &format!("/sessions/{id}/form"), Some(form))
        .await;

    let (status, view) = portal
        .upload(&id, "rx.png", "image/png", b"\x89PNG\r\n\x1a\nfake")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["session"]["prescription"]["kind"], "png");

    let (status, view) = portal
        .json(Method::POST, &format!("/sessions/{id}/submit"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["session"]["status"], "awaiting_payment");
}

#[tokio::test]
async fn unsupported_upload_is_rejected() {
    let portal = Portal::new(false);
    let id = portal.start().await;

    let (status, _) = portal
        .upload(&id, "notes.txt", "text/plain", b"take twice daily")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_order_steps_conflict() {
    let portal = Portal::new(false);
    let id = portal.start().await;

    let (status, _) = portal
        .json(
            Method::POST,
            &format!("/sessions/{id}/payment"),
            Some(json!({ "confirmed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = portal
        .json(Method::GET, &format!("/sessions/{id}/receipt"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = portal
        .json(Method::POST, &format!("/sessions/{id}/receipt/email"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn declined_payment_is_bad_request() {
    let portal = Portal::new(false);
    let id = portal.start().await;
    portal
        .json(Method::PUT, &format!("/sessions/{id}/form"), Some(asha_form()))
        .await;
    portal
        .json(Method::POST, &format!("/sessions/{id}/submit"), None)
        .await;

    let (status, _) = portal
        .json(
            Method::POST,
            &format!("/sessions/{id}/payment"),
            Some(json!({ "confirmed": false })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, quote) = portal
        .json(Method::GET, &format!("/sessions/{id}/payment"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["status"], "awaiting_payment");
    assert_eq!(quote["quote"]["display_amount"], "₹149.00");
}

#[tokio::test]
async fn closed_session_is_forgotten() {
    let portal = Portal::new(false);
    let id = paid_session(&portal).await;
    assert_eq!(portal.receipt_files(), 1);

    let (status, body) = portal
        .json(Method::DELETE, &format!("/sessions/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt_released"], true);
    assert_eq!(portal.receipt_files(), 0);

    let (status, _) = portal.json(Method::GET, &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = portal
        .json(Method::GET, &format!("/sessions/{id}/receipt"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = portal
        .json(Method::PUT, &format!("/sessions/{id}/form"), Some(asha_form()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = portal
        .json(Method::DELETE, &format!("/sessions/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let portal = Portal::new(false);

    let (status, _) = portal.json(Method::GET, "/sessions/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = portal
        .json(Method::POST, "/sessions/nope/submit", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
