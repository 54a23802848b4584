//! # soapwire
//!
//! A SOAP 1.1 RPC engine built around a WSDL 1.1 model.
//!
//! ## Features
//!
//! - Streaming WSDL parser producing an immutable [`SchemaModel`]
//! - Imports (`wsdl:import`, `xsd:import`, `xsd:include`) through a pluggable resolver
//! - Value layer mapping native JSON values to SOAP-encoded or literal XML
//! - Client call pipeline for rpc/document style and encoded/literal use
//! - Server dispatch with an explicit handler registry and signature checks
//! - Fault propagation, `mustUnderstand` header handling, multi-ref decoding
//! - Pluggable transports selected by URI scheme (HTTP behind the `http` feature)
//! - UTF-8, ISO-8859-1 and US-ASCII messages, negotiated through `Content-Type`
//!
//! ## Example
//!
//! ```rust,ignore
//! use soapwire::{Client, CallOptions, Params, WsdlParser};
//! use std::sync::Arc;
//!
//! // Parse a WSDL document
//! let model = WsdlParser::new().parse_str(&std::fs::read_to_string("calc.wsdl")?)?;
//!
//! // Call an operation
//! let mut client = Client::from_model(Arc::new(model));
//! let sum = client.call("add", Params::new().named("a", 2).named("b", 3), &CallOptions::default())?;
//! assert_eq!(sum, serde_json::json!(5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules - foundation
pub mod error;
pub mod limits;

// Core modules - XML utilities
pub mod namespaces;
pub mod names;
pub mod locations;

// Core modules - resource loading
pub mod loaders;
pub mod documents;

// WSDL model and parser
pub mod wsdl;

// Values, encoding and envelopes
pub mod xsd;
pub mod value;
pub mod fault;
pub mod encoding;
pub mod envelope;

// RPC endpoints
pub mod charset;
pub mod transport;
pub mod client;
pub mod server;

// Configuration
pub mod config;

// Re-exports for convenience
pub use charset::Charset;
pub use client::{CallOptions, Client, Param, Params};
pub use config::SoapConfig;
pub use encoding::{decode, encode, Decoded, Encoder};
pub use envelope::{parse_envelope, write_fault, BodyEntry, Envelope, EnvelopeWriter, HeaderEntry};
pub use error::{Error, Result};
pub use fault::Fault;
pub use namespaces::QName;
pub use server::{MethodSignature, Server, ServerOptions};
pub use transport::{Transport, TransportRegistry};
pub use value::{Primitive, ValueTree};
pub use wsdl::{SchemaModel, Style, Use, WsdlParser};

/// Version of the soapwire library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SOAP 1.1 envelope namespace
pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.2 envelope namespace (recognized only to report a version mismatch)
pub const SOAP12_ENVELOPE_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";

/// SOAP 1.1 encoding namespace
pub const SOAP_ENCODING_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Actor URI addressing the next node on the message path
pub const SOAP_ACTOR_NEXT: &str = "http://schemas.xmlsoap.org/soap/actor/next";

/// WSDL 1.1 namespace
pub const WSDL_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/";

/// WSDL SOAP binding namespace
pub const WSDL_SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/soap/";

/// WSDL HTTP binding namespace
pub const WSDL_HTTP_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/http/";

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema 2000/10 draft namespace
pub const XSD_2000_NAMESPACE: &str = "http://www.w3.org/2000/10/XMLSchema";

/// XML Schema 1999 draft namespace
pub const XSD_1999_NAMESPACE: &str = "http://www.w3.org/1999/XMLSchema";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema instance 1999 draft namespace
pub const XSI_1999_NAMESPACE: &str = "http://www.w3.org/1999/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
