use serde_json::json;
use wiremock::matchers::body_string_contains;
use wiremock::{MockServer, ResponseTemplate};

use zerossl_http_issuer::core::error::{ApiError, IssuanceError};
use zerossl_http_issuer::core::types::CertificateRequest;
use zerossl_http_issuer::issuance::csr::validate_csr;
use zerossl_http_issuer::issuance::workflow::{
    download_certificate, request_certificate, trigger_verification, wait_for_validation,
};

use super::test_utils::{
    CERTIFICATE_ID, CSR_PEM, api, certificate_record, client_for, error_payload, fast_poll,
    mount_challenge, mount_csr_validation, mount_download, mount_issuance, mount_status,
};

fn request() -> CertificateRequest {
    CertificateRequest {
        domain: "example.com".to_string(),
        csr_pem: CSR_PEM.to_string(),
    }
}

#[tokio::test]
async fn csr_validation_posts_csr_field() {
    let server = MockServer::start().await;
    api("POST", "/validation/csr")
        .and(body_string_contains("name=\"csr\""))
        .and(body_string_contains("BEGIN CERTIFICATE REQUEST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": true })))
        .expect(1)
        .mount(&server)
        .await;

    let valid = validate_csr(&client_for(&server), CSR_PEM).await.unwrap();
    assert!(valid);
}

#[tokio::test]
async fn request_certificate_sends_domain_csr_and_validity() {
    let server = MockServer::start().await;
    mount_csr_validation(&server, true, 1).await;
    api("POST", "/certificates")
        .and(body_string_contains("name=\"certificate_domain\""))
        .and(body_string_contains("example.com"))
        .and(body_string_contains("name=\"certificate_csr\""))
        .and(body_string_contains("name=\"certificate_validity_days\""))
        .and(body_string_contains("90"))
        .respond_with(ResponseTemplate::new(200).set_body_json(certificate_record(
            "http://example.com/.well-known/pki-validation/xyz.txt",
            &["line1", "line2"],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let record = request_certificate(&client_for(&server), &request())
        .await
        .unwrap();

    assert_eq!(record.id, CERTIFICATE_ID);
    assert_eq!(record.status, "draft");
    assert_eq!(record.validation.other_methods.len(), 1);
}

#[tokio::test]
async fn invalid_csr_never_requests_issuance() {
    let server = MockServer::start().await;
    mount_csr_validation(&server, false, 1).await;
    mount_issuance(&server, json!({}), 0).await;

    let err = request_certificate(&client_for(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, IssuanceError::InvalidCsr(_)));
}

#[tokio::test]
async fn csr_validation_failure_is_surfaced_not_treated_as_valid() {
    let server = MockServer::start().await;
    api("POST", "/validation/csr")
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;
    mount_issuance(&server, json!({}), 0).await;

    let err = request_certificate(&client_for(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, IssuanceError::Api(ApiError::Status { .. })));
}

#[tokio::test]
async fn rejected_issuance_is_issuance_error() {
    let server = MockServer::start().await;
    mount_csr_validation(&server, true, 1).await;
    mount_issuance(&server, error_payload(2817, "certificate_limit_reached"), 1).await;

    let err = request_certificate(&client_for(&server), &request())
        .await
        .unwrap_err();

    match err {
        IssuanceError::Issuance(api) => {
            assert_eq!(api.payload().and_then(|p| p.code), Some(2817));
        }
        other => panic!("expected issuance error, got {other:?}"),
    }
}

#[tokio::test]
async fn bad_access_key_maps_to_unauthorized() {
    let server = MockServer::start().await;
    api("POST", "/validation/csr")
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = request_certificate(&client_for(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, IssuanceError::Api(ApiError::Unauthorized { .. })));
}

#[tokio::test]
async fn trigger_verification_uses_http_csr_hash() {
    let server = MockServer::start().await;
    api("POST", &format!("/certificates/{CERTIFICATE_ID}/challenges"))
        .and(body_string_contains("name=\"validation_method\""))
        .and(body_string_contains("HTTP_CSR_HASH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": CERTIFICATE_ID,
            "status": "pending_validation"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = trigger_verification(&client_for(&server), CERTIFICATE_ID)
        .await
        .unwrap();
    assert_eq!(status, "pending_validation");
}

#[tokio::test]
async fn trigger_verification_error_payload_carries_upstream_message() {
    let server = MockServer::start().await;
    mount_challenge(
        &server,
        error_payload(0, "domain_control_validation_failed"),
        1,
    )
    .await;

    let err = trigger_verification(&client_for(&server), CERTIFICATE_ID)
        .await
        .unwrap_err();

    match err {
        IssuanceError::Verification(message) => {
            assert!(message.contains("domain_control_validation_failed"));
        }
        other => panic!("expected verification error, got {other:?}"),
    }
}

#[tokio::test]
async fn trigger_verification_without_id_fails() {
    let server = MockServer::start().await;
    mount_challenge(&server, json!({ "status": "draft" }), 1).await;

    let err = trigger_verification(&client_for(&server), CERTIFICATE_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, IssuanceError::Verification(_)));
}

#[tokio::test]
async fn poll_stops_on_first_complete_read() {
    let server = MockServer::start().await;
    mount_status(&server, 1, 1).await;

    let checks = wait_for_validation(&client_for(&server), CERTIFICATE_ID, fast_poll())
        .await
        .unwrap();
    assert_eq!(checks, 1);
}

#[tokio::test]
async fn poll_retries_until_complete() {
    let server = MockServer::start().await;
    api("GET", &format!("/certificates/{CERTIFICATE_ID}/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "validation_completed": 0 })),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_status(&server, 1, 1).await;

    let checks = wait_for_validation(&client_for(&server), CERTIFICATE_ID, fast_poll())
        .await
        .unwrap();
    assert_eq!(checks, 3);
}

#[tokio::test]
async fn poll_gives_up_after_four_reads() {
    let server = MockServer::start().await;
    mount_status(&server, 0, 4).await;

    let err = wait_for_validation(&client_for(&server), CERTIFICATE_ID, fast_poll())
        .await
        .unwrap_err();
    assert!(matches!(err, IssuanceError::ValidationTimeout { attempts: 4 }));
}

#[tokio::test]
async fn download_returns_both_pem_fields() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        json!({ "certificate.crt": "LEAF", "ca_bundle.crt": "BUNDLE" }),
        1,
    )
    .await;

    let downloaded = download_certificate(&client_for(&server), CERTIFICATE_ID)
        .await
        .unwrap();
    assert_eq!(downloaded.certificate_pem, "LEAF");
    assert_eq!(downloaded.ca_bundle_pem, "BUNDLE");
}

#[tokio::test]
async fn download_missing_bundle_is_download_error() {
    let server = MockServer::start().await;
    mount_download(&server, json!({ "certificate.crt": "LEAF" }), 1).await;

    let err = download_certificate(&client_for(&server), CERTIFICATE_ID)
        .await
        .unwrap_err();
    match err {
        IssuanceError::Download(message) => assert!(message.contains("ca_bundle.crt")),
        other => panic!("expected download error, got {other:?}"),
    }
}
