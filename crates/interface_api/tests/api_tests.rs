//! HTTP API Tests
//!
//! The router over the in-memory store: authentication, status mapping and
//! the generated file served as an attachment.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use core_kernel::{ClientId, InstallmentId, Money};
use domain_remittance::ports::mock::InMemoryStore;
use domain_remittance::{
    InstallmentData, PayerAddress, PayerData, RemittancePorts, RemittanceService,
    ServiceSettings,
};
use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;
use interface_api::create_router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

// ============================================================================
// TEST FIXTURES
// ============================================================================

const SECRET: &str = "api-test-secret";

struct TestApp {
    router: Router,
    store: InMemoryStore,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let service = RemittanceService::new(
            RemittancePorts::in_memory(store.clone()),
            ServiceSettings {
                business_date: NaiveDate::from_ymd_opt(2025, 3, 1),
                ..Default::default()
            },
        );
        let config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            ..ApiConfig::default()
        };
        Self {
            router: create_router(Arc::new(service), config),
            store,
            token: token_with(&["admin"]),
        }
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), headers)
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes, _) = self.send(method, uri, Some(&self.token), body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn configuration(&self, bank_code: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/configurations",
                Some(json!({
                    "company_code": "4567",
                    "company_name": "Acme Cobrancas",
                    "company_tax_id": "12345678000199",
                    "wallet_number": if bank_code == "756" { "01" } else { "109" },
                    "agency_number": "00001",
                    "account_number": "0000001",
                    "account_digit": "0",
                    "bank_code": bank_code,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// A billet whose installment and payer are known to the store
    async fn billet(&self, configuration_id: &str) -> String {
        let installment_id = InstallmentId::new();
        let client_id = ClientId::new();
        self.store
            .insert_installments([InstallmentData {
                installment_id,
                amount: Some(Money::brl(dec!(1000.00))),
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                issue_date: NaiveDate::from_ymd_opt(2025, 2, 20),
            }])
            .await;
        self.store
            .insert_payers([PayerData {
                client_id,
                tax_id: "98765432000110".to_string(),
                legal_name: "Comercio Exemplo".to_string(),
                address: PayerAddress {
                    street: "Rua das Flores".to_string(),
                    number: "12".to_string(),
                    city: "Curitiba".to_string(),
                    state: "PR".to_string(),
                    zip: "80000-000".to_string(),
                },
            }])
            .await;

        let (status, body) = self
            .call(
                "POST",
                "/api/v1/billets",
                Some(json!({
                    "installment_id": installment_id,
                    "configuration_id": configuration_id,
                    "client_id": client_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn remittance(&self) -> String {
        let (status, body) = self.call("POST", "/api/v1/remittances", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

fn token_with(roles: &[&str]) -> String {
    create_token(
        "operator",
        roles.iter().map(|r| r.to_string()).collect(),
        SECRET,
        600,
    )
    .unwrap()
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new();
        let (status, _, _) = app.send("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body, _) = app.send("GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["adapters"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = TestApp::new();
        let (status, _, _) = app.send("GET", "/api/v1/remittances", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_read_only_caller_cannot_create() {
        let app = TestApp::new();
        let reader = token_with(&[permissions::REMITTANCE_READ]);

        let (status, _, _) = app
            .send("GET", "/api/v1/remittances", Some(&reader), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body, _) = app
            .send("POST", "/api/v1/remittances", Some(&reader), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let app = TestApp::new();
        let (_, _, headers) = app
            .send("GET", "/api/v1/remittances", Some(&app.token), None)
            .await;
        assert!(headers.contains_key("x-request-id"));
    }
}

mod configuration_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_reports_counters_and_actor() {
        let app = TestApp::new();
        let id = app.configuration("237").await;

        let (status, body) = app.call("GET", &format!("/api/v1/configurations/{id}"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bank_code"], "237");
        assert_eq!(body["next_file_sequence"], 1);
        assert_eq!(body["next_our_number"], 1);
        assert_eq!(body["created_by"], "operator");
    }

    #[tokio::test]
    async fn test_invalid_configuration_is_unprocessable() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                "POST",
                "/api/v1/configurations",
                Some(json!({
                    "company_code": "4567",
                    "company_name": "Acme",
                    "company_tax_id": "12345678000199",
                    "wallet_number": "109",
                    "agency_number": "00001",
                    "account_number": "0000001",
                    "account_digit": "0",
                    "bank_code": "999",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/api/v1/configurations/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }
}

mod remittance_tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_file_is_served_as_attachment() {
        let app = TestApp::new();
        let configuration = app.configuration("237").await;
        let billet = app.billet(&configuration).await;
        let remittance = app.remittance().await;

        let (status, body) = app
            .call(
                "POST",
                &format!("/api/v1/remittances/{remittance}/billets"),
                Some(json!({ "billet_ids": [billet] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["bank_code"], "237");

        let (status, bytes, headers) = app
            .send(
                "POST",
                &format!("/api/v1/remittances/{remittance}/file"),
                Some(&app.token),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"CB010301.REM\""
        );
        assert_eq!(headers["x-remittance-lines"], "3");
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.len() == 400));

        let (status, downloaded, _) = app
            .send(
                "GET",
                &format!("/api/v1/remittances/{remittance}/file"),
                Some(&app.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(downloaded).unwrap(), text);
    }

    #[tokio::test]
    async fn test_mixed_bank_add_is_conflict() {
        let app = TestApp::new();
        let bradesco = app.billet(&app.configuration("237").await).await;
        let sicoob = app.billet(&app.configuration("756").await).await;
        let remittance = app.remittance().await;

        let (status, body) = app
            .call(
                "POST",
                &format!("/api/v1/remittances/{remittance}/billets"),
                Some(json!({ "billet_ids": [bradesco, sicoob] })),
            )
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "batch_conflict");

        let (_, body) = app
            .call("GET", &format!("/api/v1/remittances/{remittance}"), None)
            .await;
        assert_eq!(body["billet_ids"].as_array().unwrap().len(), 0);
        assert_eq!(body["bank_code"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_billet_list_is_rejected() {
        let app = TestApp::new();
        let remittance = app.remittance().await;

        let (status, body) = app
            .call(
                "POST",
                &format!("/api/v1/remittances/{remittance}/billets"),
                Some(json!({ "billet_ids": [] })),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_generating_empty_remittance_is_unprocessable() {
        let app = TestApp::new();
        let remittance = app.remittance().await;

        let (status, body) = app
            .call("POST", &format!("/api/v1/remittances/{remittance}/file"), None)
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "empty_remittance");
    }

    #[tokio::test]
    async fn test_submitted_remittance_rejects_changes() {
        let app = TestApp::new();
        let configuration = app.configuration("237").await;
        let billet = app.billet(&configuration).await;
        let remittance = app.remittance().await;
        app.call(
            "POST",
            &format!("/api/v1/remittances/{remittance}/billets"),
            Some(json!({ "billet_ids": [billet] })),
        )
        .await;

        let (status, body) = app
            .call("POST", &format!("/api/v1/remittances/{remittance}/submit"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_submitted"], true);

        let (status, body) = app
            .call(
                "DELETE",
                &format!("/api/v1/remittances/{remittance}/billets/{billet}"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_submitted");
    }

    #[tokio::test]
    async fn test_unknown_remittance_is_not_found() {
        let app = TestApp::new();
        let missing = core_kernel::RemittanceId::new();

        let (status, body) = app
            .call("GET", &format!("/api/v1/remittances/{missing}"), None)
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_batched_billet_cannot_be_deleted() {
        let app = TestApp::new();
        let billet = app.billet(&app.configuration("237").await).await;
        let remittance = app.remittance().await;
        app.call(
            "POST",
            &format!("/api/v1/remittances/{remittance}/billets"),
            Some(json!({ "billet_ids": [billet] })),
        )
        .await;

        let (status, _) = app.call("DELETE", &format!("/api/v1/billets/{billet}"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app
            .call("DELETE", &format!("/api/v1/remittances/{remittance}"), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.call("DELETE", &format!("/api/v1/billets/{billet}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
