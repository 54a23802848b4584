//! Resource loading utilities
//!
//! This module fetches WSDL documents and the documents they import.
//! Fetching and caching policy stays outside the parser: the parser only
//! talks to an [`ImportResolver`].

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use indexmap::IndexMap;
use std::fs;
use tracing::debug;

/// Fetches the text of a document referenced by an import
pub trait ImportResolver: Send + Sync {
    /// Fetch the document at an already-resolved location
    fn fetch(&self, location: &str) -> Result<String>;
}

/// Resource loader for WSDL and schema documents
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: true,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        match location {
            Location::Path(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;
                self.limits.check_xml_size(content.len())?;
                Ok(content)
            }
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(
                        "Remote resources are not allowed".to_string(),
                    ));
                }
                let content = self.load_remote(url.as_str())?;
                self.limits.check_xml_size(content.len())?;
                Ok(content)
            }
            Location::String(s) => Ok(s.clone()),
        }
    }

    #[cfg(feature = "http")]
    fn load_remote(&self, url: &str) -> Result<String> {
        debug!(url, "fetching remote document");
        ureq::get(url)
            .call()
            .map_err(|e| Error::Resource(format!("Failed to fetch '{}': {}", url, e)))?
            .into_string()
            .map_err(|e| Error::Resource(format!("Failed to read '{}': {}", url, e)))
    }

    #[cfg(not(feature = "http"))]
    fn load_remote(&self, url: &str) -> Result<String> {
        debug!(url, "remote document requested without http support");
        Err(Error::Resource(format!(
            "Fetching '{}' requires the `http` feature",
            url
        )))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportResolver for Loader {
    fn fetch(&self, location: &str) -> Result<String> {
        let location: Location = location.parse()?;
        match location {
            Location::String(s) => {
                // A bare relative name with no base resolves against the working directory
                let path = std::path::PathBuf::from(&s);
                self.load(&Location::Path(path))
            }
            other => self.load(&other),
        }
    }
}

/// In-memory resolver keyed by location
///
/// Useful when documents were fetched ahead of time or are embedded.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    documents: IndexMap<String, String>,
}

impl StaticResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under a location
    pub fn with_document(mut self, location: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents.insert(location.into(), text.into());
        self
    }
}

impl ImportResolver for StaticResolver {
    fn fetch(&self, location: &str) -> Result<String> {
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| Error::Resource(format!("No document registered for '{}'", location)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<definitions/>").unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert!(content.contains("<definitions/>"));
    }

    #[test]
    fn test_fetch_path_string() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<definitions/>").unwrap();

        let loader = Loader::new();
        let content = loader.fetch(file.path().to_str().unwrap()).unwrap();
        assert_eq!(content, "<definitions/>");
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        let large_content = "x".repeat(11 * 1024 * 1024); // 11 MB
        write!(file, "{}", large_content).unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new().with_limits(Limits::strict());
        let result = loader.load(&location);

        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_remote_disallowed() {
        let loader = Loader::new().with_allow_remote(false);
        let location: Location = "http://example.com/a.wsdl".parse().unwrap();
        assert!(matches!(loader.load(&location), Err(Error::Resource(_))));
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticResolver::new().with_document("mem://a.wsdl", "<definitions/>");
        assert_eq!(resolver.fetch("mem://a.wsdl").unwrap(), "<definitions/>");
        assert!(resolver.fetch("mem://b.wsdl").is_err());
    }
}
