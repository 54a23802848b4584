//! Transports
//!
//! A [`Transport`] moves one request envelope to an endpoint and returns the
//! response bytes. Transports are looked up by the endpoint's URI scheme in
//! a [`TransportRegistry`].

use crate::error::TransportError;
use crate::limits::Limits;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use url::Url;

/// Content type of SOAP 1.1 messages
pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

/// An outbound request
#[derive(Debug, Clone, Copy)]
pub struct TransportRequest<'a> {
    /// Target URI
    pub endpoint: &'a str,
    /// Content type of `body`
    pub content_type: &'a str,
    /// SOAPAction value, unquoted
    pub soap_action: Option<&'a str>,
    /// Serialized envelope
    pub body: &'a [u8],
}

/// A response received from a transport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    /// Content type reported by the peer
    pub content_type: String,
    /// Raw response body
    pub body: Vec<u8>,
}

/// Carries a request to an endpoint and back
pub trait Transport: Send + Sync {
    /// Send a request and wait for the response
    ///
    /// A response carrying a SOAP fault must be returned as `Ok`; errors are
    /// reserved for failures where no envelope came back.
    fn send(&self, request: &TransportRequest<'_>) -> Result<TransportResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
        (**self).send(request)
    }
}

/// Transports keyed by URI scheme
#[derive(Clone, Default)]
pub struct TransportRegistry {
    transports: HashMap<String, Arc<dyn Transport>>,
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<_> = self.transports.keys().collect();
        schemes.sort();
        f.debug_struct("TransportRegistry")
            .field("schemes", &schemes)
            .finish()
    }
}

impl TransportRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in transports
    ///
    /// `http` and `https` are registered when the `http` feature is enabled.
    pub fn with_defaults() -> Self {
        Self::with_http_config(&HttpTransportConfig::default())
    }

    /// Registry with the built-in transports, HTTP set up from `config`
    pub fn with_http_config(config: &HttpTransportConfig) -> Self {
        let mut registry = Self::new();
        registry.install_http(config);
        registry
    }

    /// Register the HTTP transport for `http` and `https`
    ///
    /// Does nothing without the `http` feature.
    pub fn install_http(&mut self, config: &HttpTransportConfig) {
        #[cfg(feature = "http")]
        {
            let http: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.clone()));
            self.register("http", http.clone());
            self.register("https", http);
        }
        #[cfg(not(feature = "http"))]
        let _ = config;
    }

    /// Register a transport for a scheme, replacing any previous one
    pub fn register(&mut self, scheme: impl Into<String>, transport: Arc<dyn Transport>) {
        self.transports
            .insert(scheme.into().to_ascii_lowercase(), transport);
    }

    /// Schemes with a registered transport
    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.transports.keys().map(String::as_str)
    }

    /// Transport for an endpoint URI
    pub fn transport_for(&self, endpoint: &str) -> Result<Arc<dyn Transport>, TransportError> {
        let url = Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        self.transports
            .get(url.scheme())
            .cloned()
            .ok_or_else(|| TransportError::NoTransport(url.scheme().to_string()))
    }

    /// Send a request through the transport registered for its endpoint
    pub fn send(&self, request: &TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
        self.transport_for(request.endpoint)?.send(request)
    }
}

/// Settings of the HTTP transport
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// `User-Agent` header
    pub user_agent: String,
    /// Largest response body accepted, in bytes
    pub max_response_size: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("soapwire/{}", crate::VERSION),
            max_response_size: Limits::default().max_xml_size,
        }
    }
}

/// Blocking HTTP transport
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    max_response_size: usize,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a transport from its settings
    pub fn new(config: HttpTransportConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            max_response_size: config.max_response_size,
        }
    }
}

#[cfg(feature = "http")]
impl Transport for HttpTransport {
    fn send(&self, request: &TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
        let mut http = self
            .agent
            .post(request.endpoint)
            .set("Content-Type", request.content_type);
        if let Some(action) = request.soap_action {
            http = http.set("SOAPAction", &format!("\"{}\"", action));
        }
        tracing::debug!(endpoint = request.endpoint, bytes = request.body.len(), "HTTP POST");

        match http.send_bytes(request.body) {
            Ok(response) => read_response(response, self.max_response_size),
            // SOAP 1.1 reports faults with status 500
            Err(ureq::Error::Status(500, response)) => {
                read_response(response, self.max_response_size)
            }
            Err(ureq::Error::Status(code, response)) => Err(TransportError::Status {
                code,
                message: response.status_text().to_string(),
            }),
            Err(ureq::Error::Transport(err)) => Err(TransportError::Io(err.to_string())),
        }
    }
}

#[cfg(feature = "http")]
fn read_response(
    response: ureq::Response,
    max_size: usize,
) -> Result<TransportResponse, TransportError> {
    // the full header, since the charset parameter is needed
    let content_type = response.header("Content-Type").unwrap_or_default().to_string();
    let body = read_limited(response.into_reader(), max_size)?;
    Ok(TransportResponse { content_type, body })
}

/// Read a body, failing once it grows past `max_size` bytes
pub fn read_limited(reader: impl Read, max_size: usize) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    reader
        .take(max_size as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| TransportError::Io(e.to_string()))?;
    if body.len() > max_size {
        return Err(TransportError::ResponseTooLarge(max_size));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl Transport for Recording {
        fn send(&self, request: &TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push(request.endpoint.to_string());
            Ok(TransportResponse {
                content_type: SOAP_CONTENT_TYPE.to_string(),
                body: request.body.to_vec(),
            })
        }
    }

    fn request(endpoint: &str) -> TransportRequest<'_> {
        TransportRequest {
            endpoint,
            content_type: SOAP_CONTENT_TYPE,
            soap_action: None,
            body: b"<x/>",
        }
    }

    #[test]
    fn test_dispatch_by_scheme() {
        let recording = Arc::new(Recording::default());
        let mut registry = TransportRegistry::new();
        registry.register("MEM", recording.clone());

        let response = registry.send(&request("mem://local/calc")).unwrap();
        assert_eq!(response.body, b"<x/>");
        assert_eq!(*recording.seen.lock().unwrap(), vec!["mem://local/calc"]);
    }

    #[test]
    fn test_unknown_scheme() {
        let registry = TransportRegistry::new();
        let err = registry.send(&request("ftp://host/x")).unwrap_err();
        assert_eq!(err, TransportError::NoTransport("ftp".to_string()));
    }

    #[test]
    fn test_invalid_endpoint() {
        let registry = TransportRegistry::new();
        let err = registry.send(&request("not a uri")).unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_default_http_config() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("soapwire/"));
        assert_eq!(config.max_response_size, Limits::default().max_xml_size);
    }

    #[test]
    fn test_read_limited() {
        let body = read_limited(&b"<x/>"[..], 4).unwrap();
        assert_eq!(body, b"<x/>");

        let endless = std::io::repeat(b'a');
        let err = read_limited(endless, 1024).unwrap_err();
        assert_eq!(err, TransportError::ResponseTooLarge(1024));
    }
}
