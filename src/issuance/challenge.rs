//! HTTP file validation: places the challenge file under the web root.

use std::path::{Component, Path, PathBuf};

use log::{debug, info};
use tokio::fs;

use crate::core::error::{IssuanceError, IssuanceResult};
use crate::core::types::CertificateRecord;

pub const WELL_KNOWN_DIR: &str = ".well-known";
pub const VALIDATION_DIR: &str = "pki-validation";

/// File name and body the CA expects to fetch over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeFile {
    pub file_name: String,
    pub content: String,
}

impl ChallengeFile {
    pub fn from_record(record: &CertificateRecord, domain: &str) -> IssuanceResult<Self> {
        let (key, method) = record.validation.select_http_method(domain).ok_or_else(|| {
            IssuanceError::Challenge(format!(
                "certificate {} has no HTTP validation method",
                record.id
            ))
        })?;
        debug!("[challenge] using validation method for {key}");

        let file_name = method.file_name().ok_or_else(|| {
            IssuanceError::Challenge(format!(
                "validation URL has no file name: {}",
                method.file_validation_url_http
            ))
        })?;
        validate_file_name(file_name)?;

        Ok(Self {
            file_name: file_name.to_string(),
            content: method.file_content(),
        })
    }
}

/// The validation directory plus the directories this call had to create.
#[derive(Debug, Clone)]
pub struct ValidationDir {
    pub path: PathBuf,
    pub created: Vec<PathBuf>,
}

/// Writes the challenge file for `record` below `project_dir` and returns its absolute path.
pub async fn write_challenge_file(
    record: &CertificateRecord,
    domain: &str,
    project_dir: &Path,
) -> IssuanceResult<PathBuf> {
    let challenge = ChallengeFile::from_record(record, domain)?;
    let dir = ensure_validation_dir(project_dir).await?;

    let target = dir.path.join(&challenge.file_name);
    fs::write(&target, challenge.content.as_bytes())
        .await
        .map_err(IssuanceError::filesystem(&target))?;

    let absolute = std::path::absolute(&target).map_err(IssuanceError::filesystem(&target))?;
    info!("[challenge] wrote {}", absolute.display());
    Ok(absolute)
}

/// Ensures `<root>/.well-known/pki-validation` exists, creating only what is missing.
pub async fn ensure_validation_dir(project_dir: &Path) -> IssuanceResult<ValidationDir> {
    let root = normalize_project_root(project_dir);
    let well_known = root.join(WELL_KNOWN_DIR);
    let validation = well_known.join(VALIDATION_DIR);

    let mut created = Vec::new();
    for dir in [&well_known, &validation] {
        if create_dir_if_missing(dir).await? {
            created.push(dir.clone());
        }
    }

    Ok(ValidationDir {
        path: validation,
        created,
    })
}

async fn create_dir_if_missing(dir: &Path) -> IssuanceResult<bool> {
    let exists = fs::try_exists(dir)
        .await
        .map_err(IssuanceError::filesystem(dir))?;
    if exists {
        return Ok(false);
    }
    fs::create_dir(dir)
        .await
        .map_err(IssuanceError::filesystem(dir))?;
    debug!("[challenge] created {}", dir.display());
    Ok(true)
}

/// Strips one trailing separator, keeping a bare root intact.
fn normalize_project_root(project_dir: &Path) -> PathBuf {
    match project_dir.to_str() {
        Some(raw) if raw.len() > 1 => {
            let stripped = raw
                .strip_suffix(std::path::MAIN_SEPARATOR)
                .unwrap_or(raw);
            PathBuf::from(stripped)
        }
        _ => project_dir.to_path_buf(),
    }
}

fn validate_file_name(name: &str) -> IssuanceResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(IssuanceError::Challenge(format!(
            "validation file name must be a single path segment: {name}"
        ))),
    }
}
