use crate::core::error::{IssuanceError, IssuanceResult};

/// Normalizes a domain for the API: trimmed, no trailing dot, IDNA ASCII, lower-case.
pub fn normalize_domain(input: &str) -> IssuanceResult<String> {
    let trimmed = input.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(IssuanceError::Config("domain name is required".to_string()));
    }
    if trimmed.starts_with("*.") {
        return Err(IssuanceError::Config(
            "wildcard domains cannot use HTTP file validation".to_string(),
        ));
    }
    let ascii = idna::domain_to_ascii(trimmed)
        .map_err(|err| IssuanceError::Config(format!("invalid domain name: {err}")))?;
    Ok(ascii.to_lowercase())
}
