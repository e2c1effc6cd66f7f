use crate::utils::error::{ReviewError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> ReviewError {
    ReviewError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(field_name, url_str, format!("Invalid URL format: {}", e))),
    }
}

/// 端點路徑必須以 `/` 開頭，且不得含查詢字串
pub fn validate_endpoint_path(field_name: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(invalid(field_name, path, "Endpoint path must start with '/'"));
    }
    if path.contains('?') || path.contains('#') {
        return Err(invalid(
            field_name,
            path,
            "Endpoint path must not carry a query or fragment",
        ));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[String],
) -> Result<()> {
    let allowed_set: HashSet<String> = allowed_extensions
        .iter()
        .map(|ext| ext.to_ascii_lowercase())
        .collect();

    for file in files {
        let extension = std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension {
            Some(ext) if allowed_set.contains(&ext) => {}
            Some(ext) => {
                return Err(invalid(
                    field_name,
                    file,
                    format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        ext,
                        allowed_extensions.join(", ")
                    ),
                ))
            }
            None => {
                return Err(invalid(
                    field_name,
                    file,
                    "File has no extension or invalid filename",
                ))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("backend.base_url", "https://example.com").is_ok());
        assert!(validate_url("backend.base_url", "http://localhost:5000").is_ok());
        assert!(validate_url("backend.base_url", "").is_err());
        assert!(validate_url("backend.base_url", "invalid-url").is_err());
        assert!(validate_url("backend.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_endpoint_path() {
        assert!(validate_endpoint_path("backend.extract_path", "/extract").is_ok());
        assert!(validate_endpoint_path("backend.extract_path", "extract").is_err());
        assert!(validate_endpoint_path("backend.extract_path", "/extract?x=1").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("backend.timeout_seconds", 5, 1).is_ok());
        assert!(validate_positive_number("backend.timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let allowed = vec!["xtf".to_string()];
        let files = vec!["netz.xtf".to_string(), "NETZ2.XTF".to_string()];
        assert!(validate_file_extensions("files", &files, &allowed).is_ok());

        let invalid_files = vec!["netz.ifc".to_string()];
        assert!(validate_file_extensions("files", &invalid_files, &allowed).is_err());

        let no_extension = vec!["netz".to_string()];
        assert!(validate_file_extensions("files", &no_extension, &allowed).is_err());
    }
}
