use log::{debug, warn};
use serde::Deserialize;

use crate::core::error::{ApiError, ErrorPayload, IssuanceError, IssuanceResult};
use crate::issuance::http::ZeroSslClient;

const CSR_TAGS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

#[derive(Debug, Deserialize)]
struct CsrValidationResponse {
    valid: bool,
    #[serde(default)]
    error: Option<ErrorPayload>,
}

/// Local sanity check before anything is sent: the text must hold a CSR PEM block.
pub fn check_csr_pem(csr_pem: &str) -> IssuanceResult<()> {
    let blocks = pem::parse_many(csr_pem)
        .map_err(|err| IssuanceError::InvalidCsr(format!("failed to parse CSR PEM: {err}")))?;
    if blocks
        .iter()
        .any(|block| CSR_TAGS.iter().any(|tag| *tag == block.tag()))
    {
        Ok(())
    } else {
        Err(IssuanceError::InvalidCsr(
            "no CERTIFICATE REQUEST PEM block found".to_string(),
        ))
    }
}

/// Asks ZeroSSL whether the CSR is syntactically acceptable.
///
/// An API failure is returned as an error; it is never read as "valid".
pub async fn validate_csr(client: &ZeroSslClient, csr_pem: &str) -> Result<bool, ApiError> {
    let response: CsrValidationResponse = client
        .post_form("/validation/csr", &[("csr", csr_pem.to_string())])
        .await?;
    if let Some(error) = response.error.as_ref().filter(|_| !response.valid) {
        warn!("[csr] ZeroSSL rejected CSR: {error}");
    }
    debug!("[csr] validation result: valid={}", response.valid);
    Ok(response.valid)
}
