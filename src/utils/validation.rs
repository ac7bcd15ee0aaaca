use crate::utils::error::{FolioError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn validate_scheme(field_name: &str, url_str: &str, allowed: &[&str]) -> Result<()> {
    if url_str.is_empty() {
        return Err(FolioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) if allowed.contains(&url.scheme()) => Ok(()),
        Ok(url) => Err(FolioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!(
                "Unsupported URL scheme: {}. Expected one of: {}",
                url.scheme(),
                allowed.join(", ")
            ),
        }),
        Err(e) => Err(FolioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    validate_scheme(field_name, url_str, &["http", "https"])
}

pub fn validate_ws_url(field_name: &str, url_str: &str) -> Result<()> {
    validate_scheme(field_name, url_str, &["ws", "wss"])
}

pub fn validate_positive_number<T>(field_name: &str, value: T, min_value: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min_value {
        return Err(FolioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FolioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
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
        return Err(FolioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Accepts `#rgb` and `#rrggbb` hex colors.
pub fn validate_hex_color(field_name: &str, value: &str) -> Result<()> {
    let digits = value.strip_prefix('#').unwrap_or("");
    let ok = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if !ok {
        return Err(FolioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Expected a hex color like #89b4fa".to_string(),
        });
    }
    Ok(())
}
