use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inputs of a single issuance run, built once from the command line.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    /// Normalized (ASCII, lower-case) domain the certificate is requested for
    pub domain: String,
    /// PEM-encoded certificate signing request
    pub csr_pem: String,
}

/// Certificate object returned by ZeroSSL when issuance is requested.
/// Only `id` is used to address later calls; the rest is carried for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// ZeroSSL certificate identifier
    pub id: String,
    /// Lifecycle status (e.g. "draft", "pending_validation", "issued")
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
    /// Challenge descriptors for every supported validation method
    pub validation: ValidationInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationInfo {
    /// Non-email validation methods keyed by the domain they validate.
    #[serde(default)]
    pub other_methods: BTreeMap<String, ValidationMethod>,
}

impl ValidationInfo {
    /// Picks the validation method used for HTTP file validation.
    ///
    /// The entry keyed by `domain` wins. Otherwise the first key in lexical order
    /// that carries an HTTP validation URL is used, so the choice never depends on
    /// the order fields appeared in the API response.
    pub fn select_http_method(&self, domain: &str) -> Option<(&str, &ValidationMethod)> {
        if let Some((key, method)) = self.other_methods.get_key_value(domain)
            && method.has_http_url()
        {
            return Some((key.as_str(), method));
        }
        self.other_methods
            .iter()
            .find(|(_, method)| method.has_http_url())
            .map(|(key, method)| (key.as_str(), method))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationMethod {
    #[serde(default)]
    pub file_validation_url_http: String,
    #[serde(default)]
    pub file_validation_url_https: Option<String>,
    /// Lines of the validation file, in order
    #[serde(default)]
    pub file_validation_content: Vec<String>,
    #[serde(default)]
    pub cname_validation_p1: Option<String>,
    #[serde(default)]
    pub cname_validation_p2: Option<String>,
}

impl ValidationMethod {
    fn has_http_url(&self) -> bool {
        !self.file_validation_url_http.trim().is_empty()
    }

    /// Last path segment of the HTTP validation URL.
    pub fn file_name(&self) -> Option<&str> {
        let url = self.file_validation_url_http.trim();
        let path = url.split(['?', '#']).next().unwrap_or(url);
        path.rsplit('/').next().filter(|segment| !segment.is_empty())
    }

    /// Validation file body: content lines joined with `\n`, no trailing newline.
    pub fn file_content(&self) -> String {
        self.file_validation_content.join("\n")
    }
}

/// Response of the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationStatus {
    /// 0 while validation is pending, 1 once complete
    pub validation_completed: u8,
    /// Per-domain detail; shape varies by validation method
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ValidationStatus {
    pub fn is_complete(&self) -> bool {
        self.validation_completed == 1
    }
}

/// Issued PEM material returned by the inline download endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedCertificate {
    pub certificate_pem: String,
    pub ca_bundle_pem: String,
}

/// A file written to disk by the run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub label: String,
    pub path: String,
}
