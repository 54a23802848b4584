//! Configuration
//!
//! [`SoapConfig`] gathers every tunable of the crate in one serde document so
//! a deployment can load it from JSON.

use crate::client::CallOptions;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::server::ServerOptions;
use crate::transport::HttpTransportConfig;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoapConfig {
    /// Document and envelope limits
    pub limits: Limits,
    /// Server wire settings
    pub server: ServerOptions,
    /// Default client call options
    pub client: CallOptions,
    /// HTTP transport settings
    pub http: HttpTransportConfig,
}

impl SoapConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wsdl::{Style, Use};
    use std::io::Write;

    #[test]
    fn test_defaults_when_empty() {
        let config = SoapConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SoapConfig::default());
        assert_eq!(config.server.style, Style::Rpc);
        assert_eq!(config.limits, Limits::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = SoapConfig::from_json_str(
            r#"{
                "limits": {"max_href_depth": 8},
                "server": {"namespace": "urn:svc", "use": "literal"},
                "client": {"trace": true},
                "http": {"timeout_secs": 5}
            }"#,
        )
        .unwrap();
        assert_eq!(config.limits.max_href_depth, 8);
        assert_eq!(config.limits.max_import_depth, Limits::default().max_import_depth);
        assert_eq!(config.server.namespace.as_deref(), Some("urn:svc"));
        assert_eq!(config.server.use_, Use::Literal);
        assert!(config.client.trace);
        assert_eq!(config.http.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_json() {
        let err = SoapConfig::from_json_str("{limits").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"style": "document"}}}}"#).unwrap();
        let config = SoapConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.style, Style::Document);

        assert!(matches!(
            SoapConfig::from_file("/nonexistent/soapwire.json"),
            Err(Error::Io(_))
        ));
    }
}
