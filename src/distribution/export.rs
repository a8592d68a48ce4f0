use std::path::Path;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use sha2::{Digest, Sha256};
use tokio::fs;
use x509_parser::pem::parse_x509_pem;

use crate::core::error::{IssuanceError, IssuanceResult};
use crate::core::types::{DownloadedCertificate, ExportedFile};

pub const CERTIFICATE_FILENAME: &str = "certificate.crt";
pub const CA_BUNDLE_FILENAME: &str = "ca_bundle.crt";

/// Writes `certificate.crt` and `ca_bundle.crt` into `output_dir`, replacing existing files.
pub async fn persist_certificate(
    downloaded: &DownloadedCertificate,
    output_dir: &Path,
) -> IssuanceResult<Vec<ExportedFile>> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(IssuanceError::filesystem(output_dir))?;

    let targets = [
        ("certificate", CERTIFICATE_FILENAME, &downloaded.certificate_pem),
        ("ca_bundle", CA_BUNDLE_FILENAME, &downloaded.ca_bundle_pem),
    ];

    let mut files = Vec::with_capacity(targets.len());
    for (label, file_name, content) in targets {
        let path = output_dir.join(file_name);
        fs::write(&path, content.as_bytes())
            .await
            .map_err(IssuanceError::filesystem(&path))?;
        info!("[export] wrote {}", path.display());
        files.push(ExportedFile {
            label: label.to_string(),
            path: path.display().to_string(),
        });
    }
    Ok(files)
}

/// Facts about the issued leaf certificate, for the run log.
#[derive(Debug, Clone)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// SHA-256 of the DER encoding, lower-case hex
    pub fingerprint: String,
    pub bundle_certificates: usize,
}

pub fn summarize_certificate(downloaded: &DownloadedCertificate) -> Result<CertificateSummary> {
    let (_, pem_block) = parse_x509_pem(downloaded.certificate_pem.as_bytes())
        .map_err(|e| anyhow!("failed to parse issued certificate PEM: {e}"))?;
    let cert = pem_block.parse_x509().map_err(|e| anyhow!(e.to_string()))?;

    let not_before = timestamp(cert.validity().not_before.timestamp())?;
    let not_after = timestamp(cert.validity().not_after.timestamp())?;
    let fingerprint = {
        let mut hasher = Sha256::new();
        hasher.update(&pem_block.contents);
        hex::encode(hasher.finalize())
    };

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial: cert.raw_serial_as_string(),
        not_before,
        not_after,
        fingerprint,
        bundle_certificates: count_certificates(&downloaded.ca_bundle_pem)?,
    })
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| anyhow!("certificate validity timestamp out of range: {secs}"))
}

fn count_certificates(bundle_pem: &str) -> Result<usize> {
    let blocks = pem::parse_many(bundle_pem)
        .map_err(|err| anyhow!("failed to parse CA bundle PEM: {err}"))?;
    Ok(blocks
        .iter()
        .filter(|block| block.tag() == "CERTIFICATE")
        .count())
}
