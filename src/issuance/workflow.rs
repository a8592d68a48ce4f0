use log::{info, warn};
use serde::Deserialize;

use crate::core::error::{IssuanceError, IssuanceResult};
use crate::core::types::{
    CertificateRecord, CertificateRequest, DownloadedCertificate, ValidationStatus,
};
use crate::issuance::csr::validate_csr;
use crate::issuance::http::ZeroSslClient;
use crate::issuance::retry::{PollPolicy, poll_until};

pub const VALIDITY_DAYS: u32 = 90;
pub const HTTP_VALIDATION_METHOD: &str = "HTTP_CSR_HASH";

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    #[serde(default, rename = "certificate.crt")]
    certificate: Option<String>,
    #[serde(default, rename = "ca_bundle.crt")]
    ca_bundle: Option<String>,
}

/// Validates the CSR with ZeroSSL, then requests a 90 day certificate for the domain.
/// Issuance is never attempted with a CSR ZeroSSL has not accepted.
pub async fn request_certificate(
    client: &ZeroSslClient,
    request: &CertificateRequest,
) -> IssuanceResult<CertificateRecord> {
    if !validate_csr(client, &request.csr_pem).await? {
        return Err(IssuanceError::InvalidCsr(format!(
            "ZeroSSL reported the CSR for {} as invalid",
            request.domain
        )));
    }

    let record: CertificateRecord = client
        .post_form(
            "/certificates",
            &[
                ("certificate_domain", request.domain.clone()),
                ("certificate_csr", request.csr_pem.clone()),
                ("certificate_validity_days", VALIDITY_DAYS.to_string()),
            ],
        )
        .await
        .map_err(IssuanceError::Issuance)?;

    info!(
        "[issuance] certificate {} created for {} (status {})",
        record.id, record.common_name, record.status
    );
    Ok(record)
}

/// Asks ZeroSSL to fetch the HTTP challenge file. Returns the certificate status.
pub async fn trigger_verification(
    client: &ZeroSslClient,
    certificate_id: &str,
) -> IssuanceResult<String> {
    let response: ChallengeResponse = client
        .post_form(
            &format!("/certificates/{certificate_id}/challenges"),
            &[("validation_method", HTTP_VALIDATION_METHOD.to_string())],
        )
        .await
        .map_err(|err| match err.payload() {
            Some(payload) => IssuanceError::Verification(payload.to_string()),
            None => IssuanceError::Verification(err.to_string()),
        })?;

    match response.id {
        Some(_) => Ok(response.status.unwrap_or_default()),
        None => Err(IssuanceError::Verification(format!(
            "verification of certificate {certificate_id} returned no certificate"
        ))),
    }
}

pub async fn fetch_status(
    client: &ZeroSslClient,
    certificate_id: &str,
) -> IssuanceResult<ValidationStatus> {
    let status = client
        .get::<ValidationStatus>(&format!("/certificates/{certificate_id}/status"))
        .await?;
    Ok(status)
}

/// Polls the status endpoint under `policy`. Returns the number of reads made.
pub async fn wait_for_validation(
    client: &ZeroSslClient,
    certificate_id: &str,
    policy: PollPolicy,
) -> IssuanceResult<u32> {
    poll_until("domain validation", policy, move || async move {
        let status = fetch_status(client, certificate_id).await?;
        if !status.is_complete()
            && let Some(details) = &status.details
        {
            info!("[poll] certificate {certificate_id} pending: {details}");
        }
        Ok(status.is_complete())
    })
    .await
}

/// Fetches the issued certificate and CA bundle inline. Both fields must be present.
pub async fn download_certificate(
    client: &ZeroSslClient,
    certificate_id: &str,
) -> IssuanceResult<DownloadedCertificate> {
    let response: DownloadResponse = client
        .get(&format!("/certificates/{certificate_id}/download/return"))
        .await
        .map_err(|err| IssuanceError::Download(err.to_string()))?;

    let certificate_pem = non_empty(response.certificate, "certificate.crt")?;
    let ca_bundle_pem = non_empty(response.ca_bundle, "ca_bundle.crt")?;
    Ok(DownloadedCertificate {
        certificate_pem,
        ca_bundle_pem,
    })
}

fn non_empty(field: Option<String>, name: &str) -> IssuanceResult<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            warn!("[issuance] download response is missing {name}");
            Err(IssuanceError::Download(format!("response is missing {name}")))
        }
    }
}
