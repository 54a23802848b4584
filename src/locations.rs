//! Resource location resolution
//!
//! This module handles resolution of resource locations (URLs, file paths)
//! for WSDL documents and the documents they import.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ...)
    Url(Url),
    /// String identifier (for in-memory resources)
    String(String),
}

impl FromStr for Location {
    type Err = Error;

    /// Create a location from a string (auto-detect type)
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::Resource(format!("Invalid file URL: {}", s)))?;
                return Ok(Location::Path(path));
            }
            // Single-letter schemes are Windows drive letters
            if url.scheme().len() > 1 {
                return Ok(Location::Url(url));
            }
        }

        let path = PathBuf::from(s);
        if path.exists() || s.starts_with('/') || s.starts_with('.') {
            return Ok(Location::Path(path));
        }

        Ok(Location::String(s.to_string()))
    }
}

impl Location {
    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

/// Resolve an import location against the base URI of the importing document
///
/// Absolute URLs and absolute paths are returned unchanged. Without a base
/// the location is returned as given.
pub fn resolve_relative(base: Option<&str>, location: &str) -> String {
    if Url::parse(location).map(|u| u.scheme().len() > 1).unwrap_or(false)
        || Path::new(location).is_absolute()
    {
        return location.to_string();
    }

    let Some(base) = base else {
        return location.to_string();
    };

    if let Ok(base_url) = Url::parse(base) {
        if base_url.scheme().len() > 1 {
            return base_url
                .join(location)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| location.to_string());
        }
    }

    match Path::new(base).parent() {
        Some(dir) => dir.join(location).to_string_lossy().to_string(),
        None => location.to_string(),
    }
}
