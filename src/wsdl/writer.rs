//! WSDL generation for rpc/encoded services
//!
//! [`RpcServiceWriter`] describes a set of operations as messages, a
//! portType, an rpc/encoded SOAP binding and a single-port service. The
//! output parses back through [`WsdlParser`](super::WsdlParser).

use crate::error::EncodeError;
use crate::namespaces::QName;
use crate::{SOAP_ENCODING_NAMESPACE, WSDL_NAMESPACE, WSDL_SOAP_NAMESPACE, XSD_NAMESPACE};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

/// Transport URI of the SOAP HTTP binding
pub const SOAP_HTTP_TRANSPORT: &str = "http://schemas.xmlsoap.org/soap/http";

/// One operation to describe
#[derive(Debug, Clone, PartialEq)]
pub struct RpcOperation {
    /// Operation name
    pub name: String,
    /// Namespace of the rpc wrapper, `None` for the target namespace
    pub namespace: Option<String>,
    /// Parameter names and types in order
    pub inputs: Vec<(String, QName)>,
    /// Result names and types in order
    pub outputs: Vec<(String, QName)>,
}

/// Builds the WSDL document of one service
#[derive(Debug, Clone)]
pub struct RpcServiceWriter {
    name: String,
    endpoint: String,
    operations: Vec<RpcOperation>,
}

impl RpcServiceWriter {
    /// Describe service `name` served at `endpoint`
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            operations: Vec::new(),
        }
    }

    /// `urn:` followed by the service name
    pub fn target_namespace(&self) -> String {
        format!("urn:{}", self.name)
    }

    /// Add an operation
    pub fn operation(mut self, operation: RpcOperation) -> Self {
        self.operations.push(operation);
        self
    }

    fn prefixes(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        map.insert(XSD_NAMESPACE.to_string(), "xsd".to_string());
        map.insert(SOAP_ENCODING_NAMESPACE.to_string(), "SOAP-ENC".to_string());
        map.insert(self.target_namespace(), "tns".to_string());
        let mut next = 0;
        let types = self
            .operations
            .iter()
            .flat_map(|op| op.inputs.iter().chain(&op.outputs));
        for (_, type_name) in types {
            if let Some(namespace) = type_name.namespace().filter(|ns| !ns.is_empty()) {
                if !map.contains_key(namespace) {
                    map.insert(namespace.to_string(), format!("ns{}", next));
                    next += 1;
                }
            }
        }
        map
    }

    /// Serialize the document
    pub fn write(&self) -> Result<String, EncodeError> {
        let prefixes = self.prefixes();
        let qualify = |name: &QName| match name.namespace().and_then(|ns| prefixes.get(ns)) {
            Some(prefix) => format!("{}:{}", prefix, name.local_name),
            None => name.local_name.clone(),
        };
        let target = self.target_namespace();
        let port_type = format!("{}Port", self.name);
        let binding = format!("{}Binding", self.name);

        let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
        emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("definitions");
        root.push_attribute(("name", self.name.as_str()));
        root.push_attribute(("targetNamespace", target.as_str()));
        root.push_attribute(("xmlns", WSDL_NAMESPACE));
        root.push_attribute(("xmlns:soap", WSDL_SOAP_NAMESPACE));
        for (namespace, prefix) in &prefixes {
            root.push_attribute((format!("xmlns:{}", prefix).as_str(), namespace.as_str()));
        }
        emit(&mut w, Event::Start(root))?;

        for op in &self.operations {
            for (suffix, parts) in [("Request", &op.inputs), ("Response", &op.outputs)] {
                let name = format!("{}{}", op.name, suffix);
                open(&mut w, "message", &[("name", name.as_str())])?;
                for (part, type_name) in parts {
                    let type_name = qualify(type_name);
                    empty(&mut w, "part", &[("name", part.as_str()), ("type", type_name.as_str())])?;
                }
                close(&mut w, "message")?;
            }
        }

        open(&mut w, "portType", &[("name", port_type.as_str())])?;
        for op in &self.operations {
            let order = op
                .inputs
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            if order.is_empty() {
                open(&mut w, "operation", &[("name", op.name.as_str())])?;
            } else {
                open(
                    &mut w,
                    "operation",
                    &[("name", op.name.as_str()), ("parameterOrder", order.as_str())],
                )?;
            }
            let input = format!("tns:{}Request", op.name);
            let output = format!("tns:{}Response", op.name);
            empty(&mut w, "input", &[("message", input.as_str())])?;
            empty(&mut w, "output", &[("message", output.as_str())])?;
            close(&mut w, "operation")?;
        }
        close(&mut w, "portType")?;

        let binding_type = format!("tns:{}", port_type);
        open(
            &mut w,
            "binding",
            &[("name", binding.as_str()), ("type", binding_type.as_str())],
        )?;
        empty(
            &mut w,
            "soap:binding",
            &[("style", "rpc"), ("transport", SOAP_HTTP_TRANSPORT)],
        )?;
        for op in &self.operations {
            let namespace = op.namespace.clone().unwrap_or_else(|| target.clone());
            let action = format!("{}#{}", namespace, op.name);
            open(&mut w, "operation", &[("name", op.name.as_str())])?;
            empty(&mut w, "soap:operation", &[("soapAction", action.as_str())])?;
            for section in ["input", "output"] {
                open(&mut w, section, &[])?;
                empty(
                    &mut w,
                    "soap:body",
                    &[
                        ("use", "encoded"),
                        ("namespace", namespace.as_str()),
                        ("encodingStyle", SOAP_ENCODING_NAMESPACE),
                    ],
                )?;
                close(&mut w, section)?;
            }
            close(&mut w, "operation")?;
        }
        close(&mut w, "binding")?;

        let service = format!("{}Service", self.name);
        let port_binding = format!("tns:{}", binding);
        open(&mut w, "service", &[("name", service.as_str())])?;
        open(
            &mut w,
            "port",
            &[("name", port_type.as_str()), ("binding", port_binding.as_str())],
        )?;
        empty(&mut w, "soap:address", &[("location", self.endpoint.as_str())])?;
        close(&mut w, "port")?;
        close(&mut w, "service")?;
        close(&mut w, "definitions")?;

        String::from_utf8(w.into_inner()).map_err(|e| EncodeError::Xml(e.to_string()))
    }
}

fn element<'a>(tag: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(tag);
    for attribute in attributes {
        start.push_attribute(*attribute);
    }
    start
}

fn open(w: &mut Writer<Vec<u8>>, tag: &str, attributes: &[(&str, &str)]) -> Result<(), EncodeError> {
    emit(w, Event::Start(element(tag, attributes)))
}

fn empty(w: &mut Writer<Vec<u8>>, tag: &str, attributes: &[(&str, &str)]) -> Result<(), EncodeError> {
    emit(w, Event::Empty(element(tag, attributes)))
}

fn close(w: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), EncodeError> {
    emit(w, Event::End(BytesEnd::new(tag)))
}

fn emit(w: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), EncodeError> {
    w.write_event(event).map_err(|e| EncodeError::Xml(e.to_string()))
}
