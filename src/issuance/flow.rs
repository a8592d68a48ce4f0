use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::core::error::{IssuanceError, IssuanceResult};
use crate::core::types::{CertificateRequest, ExportedFile};
use crate::distribution::export::{persist_certificate, summarize_certificate};
use crate::domain::normalize_domain;
use crate::issuance::challenge::write_challenge_file;
use crate::issuance::csr::check_csr_pem;
use crate::issuance::http::ZeroSslClient;
use crate::issuance::retry::PollPolicy;
use crate::issuance::workflow::{
    download_certificate, request_certificate, trigger_verification, wait_for_validation,
};

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStep {
    ReadInputs,
    RequestCertificate,
    WriteChallengeFile,
    TriggerVerification,
    PollUntilComplete,
    DownloadArtifacts,
    PersistFiles,
    Done,
}

impl fmt::Display for IssuanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssuanceStep::ReadInputs => "read inputs",
            IssuanceStep::RequestCertificate => "request certificate",
            IssuanceStep::WriteChallengeFile => "write challenge file",
            IssuanceStep::TriggerVerification => "trigger verification",
            IssuanceStep::PollUntilComplete => "poll validation status",
            IssuanceStep::DownloadArtifacts => "download certificate",
            IssuanceStep::PersistFiles => "persist certificate files",
            IssuanceStep::Done => "done",
        };
        f.write_str(name)
    }
}

/// The step that failed and why. Files written before it are left in place.
#[derive(Debug, Error)]
#[error("{step} failed: {error}")]
pub struct FlowError {
    pub step: IssuanceStep,
    pub error: IssuanceError,
}

#[derive(Debug, Clone)]
pub struct IssuanceOptions {
    pub domain: String,
    pub csr_path: PathBuf,
    /// Web root that receives `.well-known/pki-validation/<file>`
    pub project_dir: PathBuf,
    /// Where `certificate.crt` and `ca_bundle.crt` are written
    pub output_dir: PathBuf,
    pub poll: PollPolicy,
}

#[derive(Debug, Clone)]
pub struct IssuanceOutcome {
    pub certificate_id: String,
    pub challenge_path: PathBuf,
    pub status_checks: u32,
    pub files: Vec<ExportedFile>,
}

/// Runs the whole pipeline once. The first failing step aborts the run.
pub async fn run_issuance(
    client: &ZeroSslClient,
    options: &IssuanceOptions,
) -> Result<IssuanceOutcome, FlowError> {
    let request = step(
        IssuanceStep::ReadInputs,
        read_inputs(&options.domain, &options.csr_path),
    )
    .await?;

    let record = step(
        IssuanceStep::RequestCertificate,
        request_certificate(client, &request),
    )
    .await?;

    let challenge_path = step(
        IssuanceStep::WriteChallengeFile,
        write_challenge_file(&record, &request.domain, &options.project_dir),
    )
    .await?;

    let status = step(
        IssuanceStep::TriggerVerification,
        trigger_verification(client, &record.id),
    )
    .await?;
    info!("[issuance] verification triggered for {} (status {status})", record.id);

    let status_checks = step(
        IssuanceStep::PollUntilComplete,
        wait_for_validation(client, &record.id, options.poll),
    )
    .await?;
    info!("[issuance] domain validated after {status_checks} status check(s)");

    let downloaded = step(
        IssuanceStep::DownloadArtifacts,
        download_certificate(client, &record.id),
    )
    .await?;

    let files = step(
        IssuanceStep::PersistFiles,
        persist_certificate(&downloaded, &options.output_dir),
    )
    .await?;

    match summarize_certificate(&downloaded) {
        Ok(summary) => info!(
            "[issuance] issued {} by {} (serial {}, valid {} to {}, sha256 {}, {} CA certificate(s))",
            summary.subject,
            summary.issuer,
            summary.serial,
            summary.not_before.to_rfc3339(),
            summary.not_after.to_rfc3339(),
            summary.fingerprint,
            summary.bundle_certificates
        ),
        Err(err) => warn!("[issuance] could not summarize issued certificate: {err:#}"),
    }

    info!("[issuance] {}", IssuanceStep::Done);
    Ok(IssuanceOutcome {
        certificate_id: record.id,
        challenge_path,
        status_checks,
        files,
    })
}

async fn step<T>(
    step: IssuanceStep,
    operation: impl Future<Output = IssuanceResult<T>>,
) -> Result<T, FlowError> {
    info!("[issuance] {step}");
    operation.await.map_err(|error| FlowError { step, error })
}

async fn read_inputs(domain: &str, csr_path: &Path) -> IssuanceResult<CertificateRequest> {
    let domain = normalize_domain(domain)?;
    let csr_pem = tokio::fs::read_to_string(csr_path)
        .await
        .map_err(IssuanceError::filesystem(csr_path))?;
    check_csr_pem(&csr_pem)?;
    Ok(CertificateRequest { domain, csr_pem })
}
