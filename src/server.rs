//! SOAP server dispatch
//!
//! A [`Server`] holds an explicit registry of method signatures and
//! handlers. Each request runs through the same stages: parse the envelope,
//! check `mustUnderstand` headers, resolve and verify the method, decode the
//! arguments, call the handler and encode its result. Any stage may end the
//! request with a [`Fault`] envelope instead.

use crate::charset::Charset;
use crate::config::SoapConfig;
use crate::encoding::{annotate, to_json, Encoder};
use crate::envelope::{parse_envelope, write_fault_in, BodyEntry, Envelope, EnvelopeWriter, HeaderEntry};
use crate::error::{DecodeError, Result, TransportError};
use crate::fault::Fault;
use crate::limits::Limits;
use crate::names::validate_ncname;
use crate::namespaces::QName;
use crate::transport::{Transport, TransportRequest, TransportResponse, SOAP_CONTENT_TYPE};
use crate::value::ValueTree;
use crate::wsdl::{OperationData, RpcOperation, RpcServiceWriter, SchemaModel, Style, Use};
use crate::xsd;
use crate::SOAP_ACTOR_NEXT;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error type handlers may return
///
/// Returning a boxed [`Fault`] sends that fault unchanged; any other error
/// becomes a `Server` fault carrying its message.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A method handler, called with the decoded arguments in signature order
pub type Handler = Arc<dyn Fn(&[JsonValue]) -> std::result::Result<JsonValue, HandlerError> + Send + Sync>;

/// A header handler, called with the decoded header value
///
/// A non-null result is echoed back as a response header of the same name.
pub type HeaderHandler =
    Arc<dyn Fn(&JsonValue) -> std::result::Result<Option<JsonValue>, HandlerError> + Send + Sync>;

/// Declared inputs and outputs of a method
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodSignature {
    /// Parameter names and types in order
    pub inputs: Vec<(String, QName)>,
    /// Result names and types in order
    pub outputs: Vec<(String, QName)>,
    /// Handler to call instead of the one registered under the method name
    pub alias: Option<String>,
    /// Namespace the method is served in
    pub namespace: Option<String>,
}

impl MethodSignature {
    /// Empty signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn input(mut self, name: impl Into<String>, type_name: QName) -> Self {
        self.inputs.push((name.into(), type_name));
        self
    }

    /// Append a result
    pub fn output(mut self, name: impl Into<String>, type_name: QName) -> Self {
        self.outputs.push((name.into(), type_name));
        self
    }

    /// Single result named `return`
    pub fn returns(self, type_name: QName) -> Self {
        self.output("return", type_name)
    }

    /// Dispatch to another handler
    pub fn alias(mut self, handler: impl Into<String>) -> Self {
        self.alias = Some(handler.into());
        self
    }

    /// Serve the method in a namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Default wire settings of a server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Namespace of response elements when the request has none
    pub namespace: Option<String>,
    /// Message style
    pub style: Style,
    /// Body use of responses
    #[serde(rename = "use")]
    pub use_: Use,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            style: Style::Rpc,
            use_: Use::Encoded,
        }
    }
}

/// Response of one request
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOutcome {
    /// Serialized response envelope
    pub body: Vec<u8>,
    /// `Content-Type` of the body
    pub content_type: String,
    /// The fault the body carries, if the request failed
    pub fault: Option<Fault>,
}

impl ServiceOutcome {
    /// Whether the response is a fault
    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

/// Body layout of a resolved request
struct Call {
    method: String,
    namespace: Option<String>,
    style: Style,
    use_: Use,
    wrapped: bool,
    members: Vec<(QName, ValueTree)>,
    operation: Option<OperationData>,
}

/// SOAP request dispatcher
#[derive(Clone, Default)]
pub struct Server {
    methods: IndexMap<String, MethodSignature>,
    handlers: HashMap<String, Handler>,
    header_handlers: HashMap<String, HeaderHandler>,
    model: Option<Arc<SchemaModel>>,
    options: ServerOptions,
    limits: Limits,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut headers: Vec<_> = self.header_handlers.keys().collect();
        headers.sort();
        f.debug_struct("Server")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("headers", &headers)
            .field("wsdl", &self.model.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl Server {
    /// Server with default options and no methods
    pub fn new() -> Self {
        Self::default()
    }

    /// Server with wire settings and limits from a configuration
    pub fn from_config(config: &SoapConfig) -> Self {
        Self::new()
            .with_options(config.server.clone())
            .with_limits(config.limits.clone())
    }

    /// Server with the given wire settings
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Take operation style and use from a WSDL
    pub fn with_model(mut self, model: Arc<SchemaModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Limits for reading requests
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Register a method with its handler
    pub fn register<F>(&mut self, name: &str, signature: MethodSignature, handler: F) -> Result<()>
    where
        F: Fn(&[JsonValue]) -> std::result::Result<JsonValue, HandlerError> + Send + Sync + 'static,
    {
        validate_ncname(name)?;
        self.methods.insert(name.to_string(), signature);
        self.handlers.insert(name.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Register a handler without a signature, as an alias target
    pub fn register_handler<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&[JsonValue]) -> std::result::Result<JsonValue, HandlerError> + Send + Sync + 'static,
    {
        validate_ncname(name)?;
        self.handlers.insert(name.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Register a handler for a header element, by local name
    pub fn register_header<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&JsonValue) -> std::result::Result<Option<JsonValue>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        validate_ncname(name)?;
        self.header_handlers.insert(name.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Registered method names
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Describe the registered methods as an rpc/encoded WSDL document
    ///
    /// The service is named `{name}Service` in namespace `urn:{name}`, with a
    /// single port at `endpoint`. Methods keep their own namespace, or the
    /// server's default one, in the binding.
    pub fn to_wsdl(&self, name: &str, endpoint: &str) -> Result<String> {
        validate_ncname(name)?;
        let mut writer = RpcServiceWriter::new(name, endpoint);
        for (method, signature) in &self.methods {
            writer = writer.operation(RpcOperation {
                name: method.clone(),
                namespace: signature
                    .namespace
                    .clone()
                    .or_else(|| self.options.namespace.clone()),
                inputs: signature.inputs.clone(),
                outputs: signature.outputs.clone(),
            });
        }
        Ok(writer.write()?)
    }

    /// Handle a request and return the response envelope
    pub fn service(&self, request: &[u8], endpoint: &str) -> Vec<u8> {
        self.dispatch(request, endpoint).body
    }

    /// Handle a request, reporting whether the response is a fault
    pub fn dispatch(&self, request: &[u8], endpoint: &str) -> ServiceOutcome {
        self.dispatch_as(request, SOAP_CONTENT_TYPE, endpoint)
    }

    /// Handle a request sent with the given `Content-Type`
    ///
    /// The response is written in the charset of the request. A charset
    /// outside UTF-8, ISO-8859-1 and US-ASCII is answered with a UTF-8 fault.
    pub fn dispatch_as(&self, request: &[u8], content_type: &str, endpoint: &str) -> ServiceOutcome {
        let (charset, result) = match Charset::from_content_type(content_type) {
            Ok(charset) => (charset, self.handle(request, charset, endpoint)),
            Err(e) => {
                debug!(content_type, error = %e, "request charset rejected");
                (
                    Charset::Utf8,
                    Err(Fault::server(
                        "Unsupported encoding, use one of ISO-8859-1, US-ASCII, UTF-8",
                    )),
                )
            }
        };
        let content_type = charset.content_type();
        match result {
            Ok(body) => ServiceOutcome {
                body,
                content_type,
                fault: None,
            },
            Err(fault) => {
                warn!(code = %fault.code, message = %fault.message, "request faulted");
                ServiceOutcome {
                    body: write_fault_in(&fault, charset),
                    content_type,
                    fault: Some(fault),
                }
            }
        }
    }

    fn handle(
        &self,
        request: &[u8],
        charset: Charset,
        endpoint: &str,
    ) -> std::result::Result<Vec<u8>, Fault> {
        let request = charset
            .decode(request)
            .map_err(|e| Fault::client(e.to_string()))?;
        let envelope = parse_envelope(&request, &self.limits).map_err(|e| match e {
            DecodeError::VersionMismatch(ns) => {
                Fault::version_mismatch(format!("unsupported envelope namespace '{}'", ns))
            }
            other => Fault::client(other.to_string()),
        })?;
        debug!(
            headers = envelope.headers.len(),
            body = envelope.body.len(),
            "request parsed"
        );

        let response_headers = self.process_headers(&envelope.headers, endpoint)?;
        let call = self.resolve(&envelope)?;
        let signature = self
            .methods
            .get(&call.method)
            .ok_or_else(|| Fault::client(format!("unhandled method '{}'", call.method)))?;
        verify(&call.members, signature)?;
        debug!(method = %call.method, "request validated");

        let args = self.decode_args(&call, signature)?;
        let handler_name = signature.alias.as_deref().unwrap_or(&call.method);
        let handler = self
            .handlers
            .get(handler_name)
            .ok_or_else(|| Fault::server(format!("no handler bound for '{}'", handler_name)))?;
        let result = handler(&args).map_err(handler_fault)?;
        info!(method = %call.method, "method dispatched");

        let mut response = Envelope::new();
        response.headers = response_headers;
        response.body = self.encode_result(&call, signature, &result)?;
        EnvelopeWriter::new(call.use_)
            .with_charset(charset)
            .write(&response)
            .map_err(|e| Fault::server(e.to_string()))
    }

    /// Reject unknown mandatory headers, then run header handlers
    fn process_headers(
        &self,
        headers: &[HeaderEntry],
        endpoint: &str,
    ) -> std::result::Result<Vec<HeaderEntry>, Fault> {
        let targets_us = |header: &HeaderEntry| match header.actor.as_deref() {
            None | Some("") | Some(SOAP_ACTOR_NEXT) => true,
            Some(actor) => actor == endpoint,
        };

        for header in headers {
            if header.must_understand
                && targets_us(header)
                && !self.header_handlers.contains_key(&header.name.local_name)
            {
                return Err(Fault::must_understand(format!(
                    "don't understand header {}",
                    header.name.local_name
                )));
            }
        }

        let mut echoed = Vec::new();
        for header in headers.iter().filter(|h| targets_us(h)) {
            let Some(handler) = self.header_handlers.get(&header.name.local_name) else {
                continue;
            };
            let value = to_json(&header.value).map_err(|e| Fault::client(e.to_string()))?;
            if let Some(result) = handler(&value).map_err(handler_fault)? {
                let encoded = Encoder::new(None)
                    .encode(&result, None)
                    .map_err(|e| Fault::server(e.to_string()))?;
                echoed.push(HeaderEntry::new(header.name.clone(), encoded));
            }
        }
        Ok(echoed)
    }

    /// Work out which method the body invokes and where its arguments are
    fn resolve(&self, envelope: &Envelope) -> std::result::Result<Call, Fault> {
        let first = envelope
            .body
            .first()
            .ok_or_else(|| Fault::client("empty request body"))?;
        let members_of = |entry: &BodyEntry| match &entry.value {
            ValueTree::Struct { members, .. } => members.clone(),
            ValueTree::Scalar { .. } => Vec::new(),
            other => vec![(entry.name.clone(), other.clone())],
        };

        let model = self.model.as_deref();
        let by_name = model.and_then(|m| m.canonical_operation_name(&first.name.local_name));
        let by_element = model.and_then(|m| m.operation_for_element(&first.name));
        let operation = by_name
            .or(by_element)
            .and_then(|name| model.and_then(|m| m.find_operation(name, None).ok()));

        let (method, style, use_, wrapped) = match &operation {
            Some(op) => (
                op.name.clone(),
                op.style,
                op.output.use_,
                op.style == Style::Rpc || op.input.wrapper.is_some(),
            ),
            None => (
                first.name.local_name.clone(),
                self.options.style,
                self.options.use_,
                true,
            ),
        };

        let members = if wrapped {
            members_of(first)
        } else {
            envelope
                .body
                .iter()
                .map(|entry| (entry.name.clone(), entry.value.clone()))
                .collect()
        };

        Ok(Call {
            method,
            namespace: first.name.namespace().map(str::to_string),
            style,
            use_,
            wrapped,
            members,
            operation,
        })
    }

    /// Decode arguments in signature order
    fn decode_args(
        &self,
        call: &Call,
        signature: &MethodSignature,
    ) -> std::result::Result<Vec<JsonValue>, Fault> {
        let model = self.model.as_deref();
        let by_name = call.style == Style::Document
            && signature.inputs.iter().all(|(name, _)| {
                call.members
                    .iter()
                    .any(|(member, _)| member.local_name == *name)
            });

        let mut args = Vec::with_capacity(call.members.len());
        for (index, (member_name, member)) in call.members.iter().enumerate() {
            let declared = if by_name {
                signature
                    .inputs
                    .iter()
                    .find(|(name, _)| *name == member_name.local_name)
            } else {
                signature.inputs.get(index)
            };
            let tree = annotate(member.clone(), declared.map(|(_, t)| t), model);
            args.push((declared.map(|(name, _)| name.as_str()), to_json(&tree)));
        }

        if by_name {
            signature
                .inputs
                .iter()
                .map(|(name, _)| {
                    args.iter()
                        .find(|(arg, _)| *arg == Some(name.as_str()))
                        .map(|(_, value)| value.clone())
                        .unwrap_or(Ok(JsonValue::Null))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Fault::client(e.to_string()))
        } else {
            args.into_iter()
                .map(|(_, value)| value)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Fault::client(e.to_string()))
        }
    }

    /// Build the response body from a handler result
    fn encode_result(
        &self,
        call: &Call,
        signature: &MethodSignature,
        result: &JsonValue,
    ) -> std::result::Result<Vec<BodyEntry>, Fault> {
        let encoder = Encoder::new(self.model.as_deref());
        let encode = |value: &JsonValue, type_name: Option<&QName>| {
            encoder
                .encode(value, type_name)
                .map_err(|e| Fault::server(e.to_string()))
        };

        let members: Vec<(QName, ValueTree)> = match signature.outputs.as_slice() {
            [] if result.is_null() => Vec::new(),
            [] => vec![(QName::local("return"), encode(result, None)?)],
            [(name, type_name)] => vec![(QName::local(name.as_str()), encode(result, Some(type_name))?)],
            outputs => {
                let values: Vec<&JsonValue> = match result {
                    JsonValue::Object(object) => outputs
                        .iter()
                        .map(|(name, _)| object.get(name).unwrap_or(&JsonValue::Null))
                        .collect(),
                    JsonValue::Array(items) if items.len() == outputs.len() => items.iter().collect(),
                    _ => {
                        return Err(Fault::server(format!(
                            "method '{}' must return {} values",
                            call.method,
                            outputs.len()
                        )))
                    }
                };
                outputs
                    .iter()
                    .zip(values)
                    .map(|((name, type_name), value)| {
                        Ok((QName::local(name.as_str()), encode(value, Some(type_name))?))
                    })
                    .collect::<std::result::Result<_, Fault>>()?
            }
        };

        if !call.wrapped {
            return Ok(members
                .into_iter()
                .map(|(name, value)| BodyEntry::new(name, value))
                .collect());
        }

        let wrapper = call
            .operation
            .as_ref()
            .and_then(|op| op.output.wrapper.clone())
            .unwrap_or_else(|| {
                let namespace = call
                    .namespace
                    .clone()
                    .or_else(|| signature.namespace.clone())
                    .or_else(|| self.options.namespace.clone());
                QName::new(namespace, format!("{}Response", call.method))
            });
        Ok(vec![BodyEntry::new(wrapper, ValueTree::structure(None, members))])
    }
}

/// Arity and soft type check of supplied members
fn verify(
    members: &[(QName, ValueTree)],
    signature: &MethodSignature,
) -> std::result::Result<(), Fault> {
    if members.len() != signature.inputs.len() {
        return Err(Fault::client("incorrect number of parameters"));
    }
    for ((member_name, member), (_, declared)) in members.iter().zip(&signature.inputs) {
        let Some(supplied) = member.type_name() else {
            continue;
        };
        if !xsd::equivalent(&supplied, declared) {
            return Err(Fault::client(format!(
                "parameter {} has type {}, which does not match signature type {}",
                member_name.local_name, supplied.local_name, declared.local_name
            )));
        }
    }
    Ok(())
}

fn handler_fault(error: HandlerError) -> Fault {
    match error.downcast::<Fault>() {
        Ok(fault) => *fault,
        Err(other) => Fault::server(other.to_string()),
    }
}

impl Transport for Server {
    fn send(
        &self,
        request: &TransportRequest<'_>,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let outcome = self.dispatch_as(request.body, request.content_type, request.endpoint);
        Ok(TransportResponse {
            content_type: outcome.content_type,
            body: outcome.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::xsd;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn calculator() -> Server {
        let mut server = Server::new();
        server
            .register(
                "add",
                MethodSignature::new()
                    .input("a", xsd("int"))
                    .input("b", xsd("int"))
                    .returns(xsd("int")),
                |args| {
                    let sum: i64 = args.iter().filter_map(JsonValue::as_i64).sum();
                    Ok(json!(sum))
                },
            )
            .unwrap();
        server
    }

    fn request(body: &str, header: &str) -> Vec<u8> {
        format!(
            r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
                xmlns:xsd="http://www.w3.org/2001/XMLSchema"
                xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                xmlns:m="urn:calc">
              <SOAP-ENV:Header>{}</SOAP-ENV:Header>
              <SOAP-ENV:Body>{}</SOAP-ENV:Body></SOAP-ENV:Envelope>"#,
            header, body
        )
        .into_bytes()
    }

    fn fault_of(server: &Server, body: &str, header: &str) -> Fault {
        server
            .dispatch(&request(body, header), "urn:here")
            .fault
            .expect("fault expected")
    }

    #[test]
    fn test_add_dispatch() {
        let server = calculator();
        let outcome = server.dispatch(
            &request(
                r#"<m:add><a xsi:type="xsd:int">2</a><b xsi:type="xsd:int">3</b></m:add>"#,
                "",
            ),
            "urn:here",
        );
        assert!(!outcome.is_fault());
        let response = parse_envelope(&outcome.body, &Limits::default()).unwrap();
        assert_eq!(response.body[0].name, QName::namespaced("urn:calc", "addResponse"));
        assert_eq!(to_json(&response.body[0].value).unwrap(), json!({"return": 5}));
    }

    #[test]
    fn test_untyped_arguments_take_signature_types() {
        let server = calculator();
        let outcome = server.dispatch(&request("<m:add><a>2</a><b>40</b></m:add>", ""), "urn:here");
        let response = parse_envelope(&outcome.body, &Limits::default()).unwrap();
        assert_eq!(to_json(&response.body[0].value).unwrap(), json!({"return": 42}));
    }

    #[test]
    fn test_arity_mismatch() {
        let server = calculator();
        let fault = fault_of(&server, r#"<m:add><a xsi:type="xsd:int">2</a></m:add>"#, "");
        assert_eq!(fault, Fault::client("incorrect number of parameters"));
    }

    #[test]
    fn test_type_mismatch() {
        let server = calculator();
        let fault = fault_of(
            &server,
            r#"<m:add><a xsi:type="xsd:string">x</a><b xsi:type="xsd:int">3</b></m:add>"#,
            "",
        );
        assert_eq!(fault.code, "Client");
        assert!(fault.message.contains("does not match"));
    }

    #[test]
    fn test_unhandled_method() {
        let server = calculator();
        let fault = fault_of(&server, "<m:divide/>", "");
        assert_eq!(fault, Fault::client("unhandled method 'divide'"));
    }

    #[test]
    fn test_must_understand_for_this_endpoint() {
        let server = calculator();
        let header = r#"<t:tx xmlns:t="urn:t" SOAP-ENV:mustUnderstand="1" SOAP-ENV:actor="urn:here">1</t:tx>"#;
        let fault = fault_of(&server, "<m:divide/>", header);
        assert_eq!(fault.code, "MustUnderstand");
        assert_eq!(fault.message, "don't understand header tx");
    }

    #[test]
    fn test_must_understand_for_other_actor_is_ignored() {
        let server = calculator();
        let header = r#"<t:tx xmlns:t="urn:t" SOAP-ENV:mustUnderstand="1" SOAP-ENV:actor="urn:elsewhere">1</t:tx>"#;
        let outcome = server.dispatch(
            &request(r#"<m:add><a>1</a><b>1</b></m:add>"#, header),
            "urn:here",
        );
        assert!(!outcome.is_fault());
    }

    #[test]
    fn test_header_handler_echoes() {
        let mut server = calculator();
        server
            .register_header("session", |value| Ok(Some(json!(format!("ack {}", value.as_str().unwrap_or(""))))))
            .unwrap();
        let header = r#"<s:session xmlns:s="urn:s" SOAP-ENV:mustUnderstand="true">abc</s:session>"#;
        let outcome = server.dispatch(&request("<m:add><a>1</a><b>1</b></m:add>", header), "urn:here");
        let response = parse_envelope(&outcome.body, &Limits::default()).unwrap();
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.headers[0].value.as_text().as_deref(), Some("ack abc"));
    }

    #[test]
    fn test_handler_errors() {
        let mut server = Server::new();
        server
            .register("fail", MethodSignature::new(), |_| Err("disk full".into()))
            .unwrap();
        server
            .register("refuse", MethodSignature::new(), |_| {
                Err(Fault::new("Quota", "over quota").with_actor("urn:q").into())
            })
            .unwrap();

        assert_eq!(fault_of(&server, "<m:fail/>", ""), Fault::server("disk full"));
        assert_eq!(
            fault_of(&server, "<m:refuse/>", ""),
            Fault::new("Quota", "over quota").with_actor("urn:q")
        );
    }

    #[test]
    fn test_alias_and_multiple_outputs() {
        let mut server = Server::new();
        server
            .register(
                "divmod",
                MethodSignature::new()
                    .input("a", xsd("int"))
                    .input("b", xsd("int"))
                    .output("quotient", xsd("int"))
                    .output("remainder", xsd("int"))
                    .alias("divide_impl"),
                |_| Ok(JsonValue::Null),
            )
            .unwrap();
        server
            .register_handler("divide_impl", |args| {
                let (a, b) = (args[0].as_i64().unwrap_or(0), args[1].as_i64().unwrap_or(1));
                Ok(json!({"quotient": a / b, "remainder": a % b}))
            })
            .unwrap();

        let outcome = server.dispatch(&request("<m:divmod><a>7</a><b>2</b></m:divmod>", ""), "urn:here");
        let response = parse_envelope(&outcome.body, &Limits::default()).unwrap();
        assert_eq!(
            to_json(&response.body[0].value).unwrap(),
            json!({"quotient": 3, "remainder": 1})
        );
    }

    #[test]
    fn test_malformed_request() {
        let server = calculator();
        let outcome = server.dispatch(b"<not-closed>", "urn:here");
        assert_eq!(outcome.fault.map(|f| f.code), Some("Client".to_string()));
    }

    #[test]
    fn test_soap12_request() {
        let server = calculator();
        let outcome = server.dispatch(
            br#"<e:Envelope xmlns:e="http://www.w3.org/2003/05/soap-envelope"><e:Body/></e:Envelope>"#,
            "urn:here",
        );
        assert_eq!(outcome.fault.map(|f| f.code), Some("VersionMismatch".to_string()));
    }

    #[test]
    fn test_invalid_method_name() {
        let mut server = Server::new();
        assert!(server
            .register("not a name", MethodSignature::new(), |_| Ok(JsonValue::Null))
            .is_err());
    }

    #[test]
    fn test_options_from_json() {
        let options: ServerOptions =
            serde_json::from_str(r#"{"style": "document", "use": "literal"}"#).unwrap();
        assert_eq!(options.style, Style::Document);
        assert_eq!(options.use_, Use::Literal);
        assert_eq!(options.namespace, None);
    }
}
