//! SOAP client
//!
//! A [`Client`] works in one of two modes. Bound to a [`SchemaModel`] it
//! resolves each operation's port, style, use and part types from the WSDL.
//! Without one it wraps positional parameters in an rpc element and relies on
//! [`CallOptions`] for everything else.

use crate::encoding::{annotate, annotate_element, decode, Decoded, Encoder};
use crate::charset::Charset;
use crate::config::SoapConfig;
use crate::envelope::{parse_envelope, BodyEntry, Envelope, EnvelopeWriter, HeaderEntry};
use crate::fault::Fault;
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::transport::{Transport, TransportRegistry, TransportRequest};
use crate::value::{Primitive, ValueTree};
use crate::wsdl::{Element, MessageData, OperationData, PartInfo, SchemaModel, Style, Use};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One call parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Native value, encoded against the declared part type
    Native(JsonValue),
    /// Prebuilt value sent as is
    Value(ValueTree),
}

impl From<JsonValue> for Param {
    fn from(value: JsonValue) -> Self {
        Param::Native(value)
    }
}

impl From<ValueTree> for Param {
    fn from(value: ValueTree) -> Self {
        Param::Value(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Native(JsonValue::from(value))
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Native(JsonValue::from(value))
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Native(JsonValue::from(value))
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Native(JsonValue::from(value))
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Native(JsonValue::from(value))
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Native(JsonValue::from(value))
    }
}

/// Ordered call parameters, each optionally named
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(Option<String>, Param)>);

impl Params {
    /// No parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional parameter
    pub fn arg(mut self, value: impl Into<Param>) -> Self {
        self.0.push((None, value.into()));
        self
    }

    /// Append a named parameter
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.0.push((Some(name.into()), value.into()));
        self
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parameter by name
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, p)| p)
    }

    /// Iterate in order
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &Param)> {
        self.0.iter().map(|(n, p)| (n.as_deref(), p))
    }

    fn all_positional(&self) -> bool {
        self.0.iter().all(|(n, _)| n.is_none())
    }
}

impl From<Vec<JsonValue>> for Params {
    fn from(values: Vec<JsonValue>) -> Self {
        Self(values.into_iter().map(|v| (None, Param::Native(v))).collect())
    }
}

impl From<Vec<ValueTree>> for Params {
    fn from(values: Vec<ValueTree>) -> Self {
        Self(values.into_iter().map(|v| (None, Param::Value(v))).collect())
    }
}

impl From<IndexMap<String, JsonValue>> for Params {
    fn from(values: IndexMap<String, JsonValue>) -> Self {
        Self(
            values
                .into_iter()
                .map(|(k, v)| (Some(k), Param::Native(v)))
                .collect(),
        )
    }
}

impl From<JsonValue> for Params {
    /// Objects give named parameters, arrays positional ones
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::new(),
            JsonValue::Object(object) => Self(
                object
                    .into_iter()
                    .map(|(k, v)| (Some(k), Param::Native(v)))
                    .collect(),
            ),
            JsonValue::Array(items) => items.into(),
            other => Self::new().arg(other),
        }
    }
}

/// Per-call settings
///
/// With a WSDL, these only fill what the operation leaves unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CallOptions {
    /// Namespace of the rpc wrapper element
    pub namespace: Option<String>,
    /// SOAPAction header
    pub soap_action: Option<String>,
    /// Message style
    pub style: Option<Style>,
    /// Body use
    #[serde(rename = "use")]
    pub use_: Option<Use>,
    /// Preferred service when several offer the operation
    pub service: Option<String>,
    /// Keep the raw request and response
    pub trace: bool,
    /// Character encoding of requests, UTF-8 when unset
    pub encoding: Option<Charset>,
}

impl CallOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wrapper namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the SOAPAction
    pub fn with_soap_action(mut self, action: impl Into<String>) -> Self {
        self.soap_action = Some(action.into());
        self
    }

    /// Set the style
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Set the use
    pub fn with_use(mut self, use_: Use) -> Self {
        self.use_ = Some(use_);
        self
    }

    /// Prefer a service by local name
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Keep wire traces
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Send requests in another character encoding
    pub fn with_encoding(mut self, encoding: Charset) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Fill unset fields from `defaults`
    fn or(&self, defaults: &CallOptions) -> CallOptions {
        CallOptions {
            namespace: self.namespace.clone().or_else(|| defaults.namespace.clone()),
            soap_action: self
                .soap_action
                .clone()
                .or_else(|| defaults.soap_action.clone()),
            style: self.style.or(defaults.style),
            use_: self.use_.or(defaults.use_),
            service: self.service.clone().or_else(|| defaults.service.clone()),
            trace: self.trace || defaults.trace,
            encoding: self.encoding.or(defaults.encoding),
        }
    }
}

fn is_empty_element(value: &ValueTree) -> bool {
    match value {
        ValueTree::Scalar {
            type_name: None,
            value: Primitive::String(text),
        } => text.trim().is_empty(),
        ValueTree::Struct { members, .. } => members.is_empty(),
        _ => false,
    }
}

/// Everything needed to send one request
struct CallPlan {
    endpoint: String,
    soap_action: Option<String>,
    use_: Use,
    body: Vec<BodyEntry>,
    operation: Option<OperationData>,
}

/// A SOAP client
pub struct Client {
    endpoint: Option<String>,
    model: Option<Arc<SchemaModel>>,
    registry: TransportRegistry,
    transport: Option<Arc<dyn Transport>>,
    headers: Vec<HeaderEntry>,
    limits: Limits,
    defaults: CallOptions,
    last_request: Option<Vec<u8>>,
    last_response: Option<Vec<u8>>,
    last_response_headers: Vec<HeaderEntry>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("wsdl", &self.model.is_some())
            .field("registry", &self.registry)
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl Client {
    fn with_parts(endpoint: Option<String>, model: Option<Arc<SchemaModel>>) -> Self {
        Self {
            endpoint,
            model,
            registry: TransportRegistry::with_defaults(),
            transport: None,
            headers: Vec::new(),
            limits: Limits::default(),
            defaults: CallOptions::default(),
            last_request: None,
            last_response: None,
            last_response_headers: Vec::new(),
        }
    }

    /// Client for a fixed endpoint without a WSDL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_parts(Some(endpoint.into()), None)
    }

    /// Client driven by a parsed WSDL
    ///
    /// Endpoints come from the port addresses unless overridden with
    /// [`with_endpoint`](Self::with_endpoint).
    pub fn from_model(model: Arc<SchemaModel>) -> Self {
        Self::with_parts(None, Some(model))
    }

    /// Override the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Send every request through this transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Select transports by scheme from this registry
    pub fn with_registry(mut self, registry: TransportRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Defaults applied to every call
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Limits for reading responses
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Take limits, call defaults and HTTP settings from a configuration
    pub fn with_config(mut self, config: &SoapConfig) -> Self {
        self.limits = config.limits.clone();
        self.defaults = config.client.clone();
        self.registry.install_http(&config.http);
        self
    }

    /// The bound model, if any
    pub fn model(&self) -> Option<&SchemaModel> {
        self.model.as_deref()
    }

    /// Send a header with every following request
    pub fn add_header(&mut self, header: HeaderEntry) {
        self.headers.push(header);
    }

    /// Drop all out-of-band headers
    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// Raw bytes of the last request, when tracing
    pub fn last_request(&self) -> Option<&[u8]> {
        self.last_request.as_deref()
    }

    /// Raw bytes of the last response, when tracing
    pub fn last_response(&self) -> Option<&[u8]> {
        self.last_response.as_deref()
    }

    /// Headers of the last response
    pub fn last_response_headers(&self) -> &[HeaderEntry] {
        &self.last_response_headers
    }

    /// Invoke an operation
    ///
    /// Returns the decoded result, unwrapped when the response carries a
    /// single value, or the fault the call ended with. Transport errors are
    /// reported as `Server` faults.
    pub fn call(
        &mut self,
        method: &str,
        params: impl Into<Params>,
        options: &CallOptions,
    ) -> Result<JsonValue, Fault> {
        let params = params.into();
        let options = options.or(&self.defaults);
        self.last_request = None;
        self.last_response = None;
        self.last_response_headers.clear();

        let plan = match self.model.clone() {
            Some(model) => self.plan_wsdl(&model, method, &params, &options)?,
            None => self.plan_direct(method, &params, &options)?,
        };

        let mut envelope = Envelope::new();
        envelope.headers = self.headers.clone();
        envelope.body = plan.body;
        let charset = options.encoding.unwrap_or_default();
        let request = EnvelopeWriter::new(plan.use_)
            .with_charset(charset)
            .write(&envelope)
            .map_err(|e| Fault::client(e.to_string()))?;
        let content_type = charset.content_type();

        debug!(
            method,
            endpoint = %plan.endpoint,
            soap_action = plan.soap_action.as_deref().unwrap_or(""),
            "sending request"
        );
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => self
                .registry
                .transport_for(&plan.endpoint)
                .map_err(|e| Fault::server(format!("transport error: {}", e)))?,
        };
        let sent = transport.send(&TransportRequest {
            endpoint: &plan.endpoint,
            content_type: &content_type,
            soap_action: plan.soap_action.as_deref(),
            body: &request,
        });
        if options.trace {
            self.last_request = Some(request);
        }
        let response = sent.map_err(|e| {
            warn!(endpoint = %plan.endpoint, error = %e, "transport failed");
            Fault::server(format!("transport error: {}", e))
        })?;
        if options.trace {
            self.last_response = Some(response.body.clone());
        }

        let response_charset = if response.content_type.is_empty() {
            Charset::Utf8
        } else {
            Charset::from_content_type(&response.content_type)
                .map_err(|e| Fault::client(format!("invalid response: {}", e)))?
        };
        let body = response_charset
            .decode(&response.body)
            .map_err(|e| Fault::client(format!("invalid response: {}", e)))?;
        let envelope = parse_envelope(&body, &self.limits)
            .map_err(|e| Fault::client(format!("invalid response: {}", e)))?;
        let fault = envelope.body_fault();
        self.last_response_headers = envelope.headers;
        if let Some(fault) = fault {
            debug!(method, code = %fault.code, "call returned fault");
            return Err(fault);
        }

        let body = match (self.model.as_deref(), plan.operation.as_ref()) {
            (Some(model), Some(operation)) => annotate_response(model, operation, envelope.body),
            _ => envelope.body,
        };
        let wrapped = plan
            .operation
            .as_ref()
            .map_or(true, |op| op.style == Style::Rpc || op.output.wrapper.is_some());
        let tree = match body.len() {
            0 => return Ok(JsonValue::Null),
            // an empty response wrapper answers a method without outputs
            1 if wrapped && is_empty_element(&body[0].value) => return Ok(JsonValue::Null),
            1 => body.into_iter().next().map(|entry| entry.value),
            _ => Some(ValueTree::structure(
                None,
                body.into_iter().map(|e| (e.name, e.value)).collect(),
            )),
        };
        let Some(tree) = tree else {
            return Ok(JsonValue::Null);
        };

        match decode(&tree, true).map_err(|e| Fault::client(e.to_string()))? {
            Decoded::Value(value) => Ok(value),
            Decoded::Fault(fault) => {
                debug!(method, code = %fault.code, "call returned fault");
                Err(fault)
            }
        }
    }

    fn plan_wsdl(
        &self,
        model: &SchemaModel,
        method: &str,
        params: &Params,
        options: &CallOptions,
    ) -> Result<CallPlan, Fault> {
        let operation = model
            .find_operation(method, options.service.as_deref())
            .map_err(|e| Fault::client(e.to_string()))?;
        let endpoint = self
            .endpoint
            .clone()
            .or_else(|| operation.endpoint.clone())
            .ok_or_else(|| Fault::client(format!("no endpoint for operation {}", operation.name)))?;

        let input = &operation.input;
        let members = bind_parts(model, &operation, params)?;
        let body = match operation.style {
            Style::Rpc => {
                let namespace = input
                    .namespace
                    .clone()
                    .or_else(|| operation.namespace.clone())
                    .or_else(|| options.namespace.clone());
                vec![BodyEntry::new(
                    QName::new(namespace, operation.name.as_str()),
                    ValueTree::structure(None, members),
                )]
            }
            Style::Document => match &input.wrapper {
                Some(wrapper) => vec![BodyEntry::new(
                    wrapper.clone(),
                    ValueTree::structure(None, members),
                )],
                None => members
                    .into_iter()
                    .map(|(name, value)| BodyEntry::new(name, value))
                    .collect(),
            },
        };

        Ok(CallPlan {
            endpoint,
            soap_action: operation
                .soap_action
                .clone()
                .filter(|a| !a.is_empty())
                .or_else(|| options.soap_action.clone()),
            use_: input.use_,
            body,
            operation: Some(operation),
        })
    }

    fn plan_direct(
        &self,
        method: &str,
        params: &Params,
        options: &CallOptions,
    ) -> Result<CallPlan, Fault> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| Fault::client("no endpoint"))?;
        let encoder = Encoder::new(None);

        let mut members = Vec::with_capacity(params.len());
        for (index, (name, param)) in params.iter().enumerate() {
            let name = name
                .map(str::to_string)
                .unwrap_or_else(|| format!("param{}", index));
            let value = match param {
                Param::Value(tree) => tree.clone(),
                Param::Native(json) => encoder
                    .encode(json, None)
                    .map_err(|e| Fault::client(e.to_string()))?,
            };
            members.push((QName::local(name), value));
        }

        let wrapper = QName::new(options.namespace.clone(), method);
        let body = match options.style.unwrap_or(Style::Rpc) {
            Style::Document if !members.is_empty() => members
                .into_iter()
                .map(|(name, value)| BodyEntry::new(name, value))
                .collect(),
            _ => vec![BodyEntry::new(wrapper, ValueTree::structure(None, members))],
        };

        Ok(CallPlan {
            endpoint,
            soap_action: options.soap_action.clone(),
            use_: options.use_.unwrap_or(Use::Encoded),
            body,
            operation: None,
        })
    }
}

/// Input parts in `parameterOrder` order
fn ordered_parts<'a>(operation: &'a OperationData) -> Vec<&'a PartInfo> {
    let parts = &operation.input.parts;
    let mut ordered: Vec<&PartInfo> = operation
        .parameter_order
        .iter()
        .filter_map(|name| parts.get(name))
        .collect();
    for part in parts.values() {
        if !ordered.iter().any(|p| p.name == part.name) {
            ordered.push(part);
        }
    }
    ordered
}

/// Schema element backing a part, for element parts and wrapper members
fn part_element<'m>(
    model: &'m SchemaModel,
    message: &MessageData,
    part: &PartInfo,
) -> Option<&'m Element> {
    if let Some(wrapper) = message.wrapper.as_ref().and_then(|w| model.elements.get(w)) {
        return model
            .element_members(wrapper)
            .into_iter()
            .find(|member| member.name.local_name == part.name);
    }
    part.element.as_ref().and_then(|e| model.elements.get(e))
}

/// Match call parameters to input parts and encode them
fn bind_parts(
    model: &SchemaModel,
    operation: &OperationData,
    params: &Params,
) -> Result<Vec<(QName, ValueTree)>, Fault> {
    let encoder = Encoder::new(Some(model));
    let parts = ordered_parts(operation);
    let positional = params.all_positional() && params.len() == parts.len();
    let style = operation.style;

    let mut members = Vec::with_capacity(parts.len());
    for (index, part) in parts.into_iter().enumerate() {
        let param = if positional {
            params.iter().nth(index).map(|(_, p)| p)
        } else {
            params.get(&part.name)
        };
        let Some(param) = param else {
            return Err(Fault::client(format!(
                "named parameter {} is not in the call parameters",
                part.name
            )));
        };

        let element = part_element(model, &operation.input, part);
        let name = match (style, element, &part.element) {
            (Style::Rpc, _, _) => QName::local(part.name.as_str()),
            (Style::Document, Some(element), _) => element.name.clone(),
            (Style::Document, None, Some(name)) => name.clone(),
            (Style::Document, None, None) => QName::local(part.name.as_str()),
        };
        let value = match param {
            Param::Value(tree) => tree.clone(),
            Param::Native(json) => match element {
                Some(element) => encoder.encode_element(json, element),
                None => encoder.encode(json, part.type_name.as_ref()),
            }
            .map_err(|e| Fault::client(e.to_string()))?,
        };
        members.push((name, value));
    }
    Ok(members)
}

/// Apply declared output types to untyped response values
fn annotate_response(
    model: &SchemaModel,
    operation: &OperationData,
    body: Vec<BodyEntry>,
) -> Vec<BodyEntry> {
    let output = &operation.output;
    let annotate_part = |part: &PartInfo, tree: ValueTree| match part_element(model, output, part)
    {
        Some(element) => annotate_element(tree, element, Some(model)),
        None => annotate(tree, part.type_name.as_ref(), Some(model)),
    };

    if let Some(wrapper) = output.wrapper.as_ref().and_then(|w| model.elements.get(w)) {
        return body
            .into_iter()
            .map(|entry| BodyEntry {
                value: annotate_element(entry.value, wrapper, Some(model)),
                name: entry.name,
            })
            .collect();
    }

    match operation.style {
        Style::Rpc => body
            .into_iter()
            .map(|entry| match entry.value {
                ValueTree::Struct { type_name, members } => {
                    let members = members
                        .into_iter()
                        .enumerate()
                        .map(|(index, (name, member))| {
                            let part = output
                                .parts
                                .get(&name.local_name)
                                .or_else(|| output.parts.get_index(index).map(|(_, p)| p));
                            let member = match part {
                                Some(part) => annotate_part(part, member),
                                None => member,
                            };
                            (name, member)
                        })
                        .collect();
                    BodyEntry {
                        name: entry.name,
                        value: ValueTree::Struct { type_name, members },
                    }
                }
                _ => entry,
            })
            .collect(),
        Style::Document => body
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let part = output
                    .parts
                    .values()
                    .find(|p| {
                        p.element.as_ref().map(|e| e.local_name.as_str())
                            == Some(entry.name.local_name.as_str())
                            || p.name == entry.name.local_name
                    })
                    .or_else(|| output.parts.get_index(index).map(|(_, p)| p));
                match part {
                    Some(part) => BodyEntry {
                        value: annotate_part(part, entry.value),
                        name: entry.name,
                    },
                    None => entry,
                }
            })
            .collect(),
    }
}
