use crate::utils::error::{EtlError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl Into<String>, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.into(),
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

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

/// 路徑格式正確且檔案存在
pub fn validate_existing_file(field_name: &str, path: &str) -> Result<()> {
    validate_path(field_name, path)?;
    if !Path::new(path).is_file() {
        return Err(EtlError::NotFound {
            kind: "File".to_string(),
            path: path.to_string(),
        });
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

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// 資料表名稱只允許英數字與底線，且不可以數字開頭
pub fn validate_table_name(field_name: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid(
            field_name,
            name,
            "Table names may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}
