//! Error types for soapwire
//!
//! This module defines all error types used throughout the library.
//! Parse, encode, decode and transport errors stay internal to a single
//! boundary; only [`Fault`](crate::fault::Fault) crosses the wire.

use crate::fault::Fault;
use thiserror::Error;

/// Result type alias using soapwire Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for soapwire operations
#[derive(Error, Debug)]
pub enum Error {
    /// WSDL or schema parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Native value to ValueTree/XML conversion error
    #[error("encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// XML/ValueTree to native value conversion error
    #[error("decoding error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport collaborator error
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A SOAP fault
    #[error("fault: {0}")]
    Fault(#[from] Fault),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(#[from] LimitExceeded),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// A resource limit was exceeded while processing a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{what} {actual} exceeds maximum {max}")]
pub struct LimitExceeded {
    /// What was measured
    pub what: &'static str,
    /// Observed value
    pub actual: usize,
    /// Configured maximum
    pub max: usize,
}

/// Errors raised while building a SchemaModel
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Malformed XML
    #[error("malformed XML at position {position}: {reason}")]
    Xml {
        /// Byte offset into the document
        position: usize,
        /// Reader message
        reason: String,
    },

    /// An imported document could not be fetched or parsed
    #[error("failed to import '{uri}': {reason}")]
    ImportFailed {
        /// Resolved import location
        uri: String,
        /// Why the import failed
        reason: String,
    },

    /// The root element is not a WSDL definitions or schema element
    #[error("not a WSDL document: unexpected root element '{0}'")]
    NotWsdl(String),

    /// Resource limit exceeded
    #[error("{0}")]
    Limit(#[from] LimitExceeded),
}

/// Errors raised while turning native values into a ValueTree or XML
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A required member of a complex type is absent from the native value
    #[error("required member '{member}' of type '{type_name}' is missing")]
    MissingRequiredMember {
        /// Complex type name
        type_name: String,
        /// Missing member name
        member: String,
    },

    /// The native value cannot be represented as the declared type
    #[error("cannot encode value as '{type_name}': {reason}")]
    Unencodable {
        /// Declared type
        type_name: String,
        /// Why the value does not fit
        reason: String,
    },

    /// XML writer failure
    #[error("XML write error: {0}")]
    Xml(String),
}

/// Errors raised while reading an envelope or decoding a ValueTree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The wire text does not parse as the declared type
    #[error("type mismatch: expected {expected}, found '{found}'")]
    TypeMismatch {
        /// Declared type
        expected: String,
        /// Offending wire text
        found: String,
    },

    /// The value does not have the expected structure
    #[error("unexpected shape: {0}")]
    UnexpectedShape(String),

    /// Malformed XML
    #[error("malformed XML at position {position}: {reason}")]
    Xml {
        /// Byte offset into the document
        position: usize,
        /// Reader message
        reason: String,
    },

    /// The document is not a SOAP envelope
    #[error("not a SOAP envelope: {0}")]
    NotAnEnvelope(String),

    /// The envelope uses a SOAP version other than 1.1
    #[error("unsupported envelope namespace '{0}'")]
    VersionMismatch(String),

    /// An `href` points at an id that does not exist
    #[error("unresolved reference '{0}'")]
    UnresolvedReference(String),

    /// The bytes do not fit the message's character encoding
    #[error("bad character data: {0}")]
    Charset(String),

    /// Resource limit exceeded
    #[error("{0}")]
    Limit(#[from] LimitExceeded),
}

/// Errors reported by a transport collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No transport is registered for the endpoint's URI scheme
    #[error("no transport registered for scheme '{0}'")]
    NoTransport(String),

    /// The endpoint is not a valid URI
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    /// The peer answered with a non-SOAP error status
    #[error("HTTP status {code}: {message}")]
    Status {
        /// Status code
        code: u16,
        /// Status text or body excerpt
        message: String,
    },

    /// The response body is larger than the configured maximum
    #[error("response exceeds {0} bytes")]
    ResponseTooLarge(usize),

    /// Connection or I/O failure
    #[error("{0}")]
    Io(String),
}

/// Errors raised while looking up operations in a SchemaModel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No SOAP port exposes the operation
    #[error("no operation {0} in wsdl")]
    UnknownOperation(String),

    /// A port references a binding that was never declared
    #[error("unknown binding '{0}'")]
    UnknownBinding(String),

    /// A binding references a portType that was never declared
    #[error("unknown portType '{0}'")]
    UnknownPortType(String),
}
