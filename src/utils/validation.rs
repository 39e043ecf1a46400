//! Checks for `station.toml` values. Every failure names the offending key.

use crate::utils::error::{Result, WxError};
use std::path::{Component, Path};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> WxError {
    WxError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// An absolute http(s) URL with a host; the pollers fetch these with reqwest.
pub fn http_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| invalid(field, raw, format!("not a URL ({})", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            raw,
            format!("'{}' URLs cannot be polled, use http or https", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(invalid(field, raw, "URL has no host"));
    }
    Ok(url)
}

/// The data directory. Absolute paths are fine here.
pub fn directory(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "directory name is blank"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path.escape_default(), "NUL byte in path"));
    }
    Ok(())
}

/// A file kept under the data directory.
pub fn data_file(field: &str, path: &str) -> Result<()> {
    directory(field, path)?;
    let escapes = Path::new(path).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(invalid(field, path, "must be relative to storage.data_dir without '..'"));
    }
    Ok(())
}

/// Intervals, timeouts and row limits; zero would mean "never" or "nothing".
pub fn at_least_one(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, value, "must be 1 or more"));
    }
    Ok(())
}

pub fn required_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WxError::MissingConfigError {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Latitude (`limit` 90) or longitude (`limit` 180) in decimal degrees.
pub fn coordinate(field: &str, degrees: f64, limit: f64) -> Result<()> {
    if !degrees.is_finite() || degrees.abs() > limit {
        return Err(invalid(field, degrees, format!("expected decimal degrees within ±{}", limit)));
    }
    Ok(())
}

pub fn timezone(field: &str, name: &str) -> Result<chrono_tz::Tz> {
    name.parse::<chrono_tz::Tz>()
        .map_err(|e| invalid(field, name, format!("not an IANA zone name ({})", e)))
}
