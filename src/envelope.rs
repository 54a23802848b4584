//! SOAP 1.1 envelopes
//!
//! [`EnvelopeWriter`] serializes headers and body entries with quick-xml,
//! adding SOAP-encoding type information in encoded use. [`parse_envelope`]
//! reads an envelope back into [`ValueTree`]s, resolving multi-ref
//! `href="#id"` values along the way.

use crate::charset::Charset;
use crate::documents::{Document, Element as XmlElement};
use crate::error::{DecodeError, EncodeError};
use crate::fault::Fault;
use crate::limits::Limits;
use crate::names::strip_array_dimensions;
use crate::namespaces::QName;
use crate::value::{Primitive, ValueTree};
use crate::wsdl::Use;
use crate::xsd;
use crate::{
    SOAP12_ENVELOPE_NAMESPACE, SOAP_ENCODING_NAMESPACE, SOAP_ENVELOPE_NAMESPACE, XSD_NAMESPACE,
    XSI_1999_NAMESPACE, XSI_NAMESPACE,
};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::cell::Cell;
use std::collections::HashMap;
use tracing::trace;

/// Written when a fault cannot be serialized normally
const FALLBACK_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Server</faultcode>
      <faultstring>internal error while writing fault</faultstring>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

/// A header block
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEntry {
    /// Element name
    pub name: QName,
    /// Content
    pub value: ValueTree,
    /// `SOAP-ENV:mustUnderstand`
    pub must_understand: bool,
    /// `SOAP-ENV:actor`
    pub actor: Option<String>,
}

impl HeaderEntry {
    /// Create an optional header without actor
    pub fn new(name: QName, value: ValueTree) -> Self {
        Self {
            name,
            value,
            must_understand: false,
            actor: None,
        }
    }

    /// Mark the header as mandatory
    pub fn must_understand(mut self) -> Self {
        self.must_understand = true;
        self
    }

    /// Address the header to an actor
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// A body entry
#[derive(Debug, Clone, PartialEq)]
pub struct BodyEntry {
    /// Element name
    pub name: QName,
    /// Content
    pub value: ValueTree,
}

impl BodyEntry {
    /// Create a body entry
    pub fn new(name: QName, value: ValueTree) -> Self {
        Self { name, value }
    }
}

/// Headers and body of one SOAP message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// Header blocks
    pub headers: Vec<HeaderEntry>,
    /// Body entries, multi-ref targets excluded
    pub body: Vec<BodyEntry>,
}

impl Envelope {
    /// Create an empty envelope
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header block
    pub fn with_header(mut self, header: HeaderEntry) -> Self {
        self.headers.push(header);
        self
    }

    /// Add a body entry
    pub fn with_body(mut self, name: QName, value: ValueTree) -> Self {
        self.body.push(BodyEntry::new(name, value));
        self
    }

    /// Envelope whose body is a single fault
    pub fn fault(fault: &Fault) -> Self {
        Self::new().with_body(Fault::element_name(), fault.to_body_value())
    }

    /// The fault carried by the first body entry, if any
    pub fn body_fault(&self) -> Option<Fault> {
        let entry = self.body.first()?;
        if entry.name.local_name != "Fault" {
            return None;
        }
        match &entry.value {
            ValueTree::Struct { members, .. } => Fault::from_members(members),
            _ => None,
        }
    }
}

/// Namespace to prefix table for one envelope
struct Prefixes {
    map: IndexMap<String, String>,
    next: usize,
}

impl Prefixes {
    fn new() -> Self {
        let mut map = IndexMap::new();
        map.insert(SOAP_ENVELOPE_NAMESPACE.to_string(), "SOAP-ENV".to_string());
        map.insert(SOAP_ENCODING_NAMESPACE.to_string(), "SOAP-ENC".to_string());
        map.insert(XSD_NAMESPACE.to_string(), "xsd".to_string());
        map.insert(XSI_NAMESPACE.to_string(), "xsi".to_string());
        Self { map, next: 0 }
    }

    fn ensure(&mut self, namespace: Option<&str>) {
        let Some(namespace) = namespace.filter(|ns| !ns.is_empty()) else {
            return;
        };
        if !self.map.contains_key(namespace) {
            let prefix = format!("ns{}", self.next);
            self.next += 1;
            self.map.insert(namespace.to_string(), prefix);
        }
    }

    fn collect(&mut self, name: &QName, value: &ValueTree, encoded: bool) {
        self.ensure(name.namespace());
        match value {
            ValueTree::Scalar { type_name, .. } => {
                if encoded {
                    if let Some(type_name) = type_name {
                        self.ensure(type_name.namespace());
                    }
                }
            }
            ValueTree::Struct { type_name, members } => {
                if encoded {
                    if let Some(type_name) = type_name {
                        self.ensure(type_name.namespace());
                    }
                }
                for (member_name, member) in members {
                    self.collect(member_name, member, encoded);
                }
            }
            ValueTree::Array {
                item_type,
                item_name,
                items,
            } => {
                if encoded {
                    self.ensure(item_type.namespace());
                }
                let item_name = item_name.clone().unwrap_or_else(|| QName::local("item"));
                for item in items {
                    self.collect(&item_name, item, encoded);
                }
            }
        }
    }

    fn qualify(&self, name: &QName) -> String {
        match name.namespace().and_then(|ns| self.map.get(ns)) {
            Some(prefix) => format!("{}:{}", prefix, name.local_name),
            None => name.local_name.clone(),
        }
    }
}

/// Serializes [`Envelope`]s
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeWriter {
    use_: Use,
    charset: Charset,
}

impl EnvelopeWriter {
    /// Create a UTF-8 writer for the given use
    pub fn new(use_: Use) -> Self {
        Self {
            use_,
            charset: Charset::Utf8,
        }
    }

    /// Write in another character encoding
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    fn encoded(&self) -> bool {
        self.use_ == Use::Encoded
    }

    /// Serialize an envelope in the writer's charset
    pub fn write(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodeError> {
        let encoded = self.encoded();
        let mut prefixes = Prefixes::new();
        for header in &envelope.headers {
            prefixes.collect(&header.name, &header.value, encoded);
        }
        for entry in &envelope.body {
            prefixes.collect(&entry.name, &entry.value, encoded);
        }

        let mut writer = Writer::new(Vec::new());
        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some(self.charset.name()), None)),
        )?;

        let mut root = BytesStart::new("SOAP-ENV:Envelope");
        for (namespace, prefix) in &prefixes.map {
            root.push_attribute((format!("xmlns:{}", prefix).as_str(), namespace.as_str()));
        }
        if encoded {
            root.push_attribute(("SOAP-ENV:encodingStyle", SOAP_ENCODING_NAMESPACE));
        }
        write_event(&mut writer, Event::Start(root))?;

        if !envelope.headers.is_empty() {
            write_event(&mut writer, Event::Start(BytesStart::new("SOAP-ENV:Header")))?;
            for header in &envelope.headers {
                let mut attributes = Vec::new();
                if header.must_understand {
                    attributes.push(("SOAP-ENV:mustUnderstand".to_string(), "1".to_string()));
                }
                if let Some(actor) = &header.actor {
                    attributes.push(("SOAP-ENV:actor".to_string(), actor.clone()));
                }
                self.write_value(&mut writer, &prefixes, &header.name, &header.value, attributes)?;
            }
            write_event(&mut writer, Event::End(BytesEnd::new("SOAP-ENV:Header")))?;
        }

        write_event(&mut writer, Event::Start(BytesStart::new("SOAP-ENV:Body")))?;
        for entry in &envelope.body {
            self.write_value(&mut writer, &prefixes, &entry.name, &entry.value, Vec::new())?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new("SOAP-ENV:Body")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("SOAP-ENV:Envelope")))?;

        self.charset.encode(&writer.into_inner())
    }

    fn write_value(
        &self,
        writer: &mut Writer<Vec<u8>>,
        prefixes: &Prefixes,
        name: &QName,
        value: &ValueTree,
        mut attributes: Vec<(String, String)>,
    ) -> Result<(), EncodeError> {
        let tag = prefixes.qualify(name);
        let encoded = self.encoded();

        match value {
            ValueTree::Scalar { type_name, value } => {
                if encoded {
                    if let Some(type_name) = type_name {
                        attributes.push(("xsi:type".to_string(), prefixes.qualify(type_name)));
                    }
                }
                if matches!(value, Primitive::Null) {
                    attributes.push(("xsi:nil".to_string(), "true".to_string()));
                    return write_event(writer, Event::Empty(start(&tag, &attributes)));
                }
                let text = value.lexical(type_name.as_ref());
                if text.is_empty() {
                    return write_event(writer, Event::Empty(start(&tag, &attributes)));
                }
                write_event(writer, Event::Start(start(&tag, &attributes)))?;
                write_event(writer, Event::Text(BytesText::new(&text)))?;
                write_event(writer, Event::End(BytesEnd::new(tag.as_str())))
            }
            ValueTree::Struct { type_name, members } => {
                if encoded {
                    if let Some(type_name) = type_name {
                        attributes.push(("xsi:type".to_string(), prefixes.qualify(type_name)));
                    }
                }
                if members.is_empty() {
                    return write_event(writer, Event::Empty(start(&tag, &attributes)));
                }
                write_event(writer, Event::Start(start(&tag, &attributes)))?;
                for (member_name, member) in members {
                    self.write_value(writer, prefixes, member_name, member, Vec::new())?;
                }
                write_event(writer, Event::End(BytesEnd::new(tag.as_str())))
            }
            ValueTree::Array {
                item_type,
                item_name,
                items,
            } => {
                if encoded {
                    attributes.push(("xsi:type".to_string(), "SOAP-ENC:Array".to_string()));
                    attributes.push((
                        "SOAP-ENC:arrayType".to_string(),
                        format!("{}[{}]", prefixes.qualify(item_type), items.len()),
                    ));
                }
                if items.is_empty() {
                    return write_event(writer, Event::Empty(start(&tag, &attributes)));
                }
                let item_name = item_name.clone().unwrap_or_else(|| QName::local("item"));
                write_event(writer, Event::Start(start(&tag, &attributes)))?;
                for item in items {
                    self.write_value(writer, prefixes, &item_name, item, Vec::new())?;
                }
                write_event(writer, Event::End(BytesEnd::new(tag.as_str())))
            }
        }
    }
}

fn start<'a>(tag: &'a str, attributes: &[(String, String)]) -> BytesStart<'a> {
    let mut element = BytesStart::new(tag);
    for (key, value) in attributes {
        element.push_attribute((key.as_str(), value.as_str()));
    }
    element
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), EncodeError> {
    writer
        .write_event(event)
        .map_err(|e| EncodeError::Xml(e.to_string()))
}

/// Serialize a fault envelope, falling back to a fixed document
pub fn write_fault(fault: &Fault) -> Vec<u8> {
    write_fault_in(fault, Charset::Utf8)
}

/// Fault envelope in the given charset
pub fn write_fault_in(fault: &Fault, charset: Charset) -> Vec<u8> {
    EnvelopeWriter::new(Use::Literal)
        .with_charset(charset)
        .write(&Envelope::fault(fault))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to write fault envelope");
            FALLBACK_FAULT.as_bytes().to_vec()
        })
}

/// Parse a SOAP 1.1 envelope
pub fn parse_envelope(xml: &[u8], limits: &Limits) -> Result<Envelope, DecodeError> {
    let document = Document::parse_with_limits(xml, limits)?;
    let root = document
        .root()
        .ok_or_else(|| DecodeError::NotAnEnvelope("empty document".to_string()))?;

    if root.local_name() != "Envelope" {
        return Err(DecodeError::NotAnEnvelope(root.qname.to_string()));
    }
    match root.namespace() {
        Some(SOAP_ENVELOPE_NAMESPACE) => {}
        Some(SOAP12_ENVELOPE_NAMESPACE) => {
            return Err(DecodeError::VersionMismatch(
                SOAP12_ENVELOPE_NAMESPACE.to_string(),
            ))
        }
        other => {
            return Err(DecodeError::VersionMismatch(
                other.unwrap_or_default().to_string(),
            ))
        }
    }

    let body = root
        .find_child_ns(SOAP_ENVELOPE_NAMESPACE, "Body")
        .ok_or_else(|| DecodeError::NotAnEnvelope("missing Body".to_string()))?;
    let header = root.find_child_ns(SOAP_ENVELOPE_NAMESPACE, "Header");

    let mut ids = HashMap::new();
    collect_ids(body, &mut ids);
    if let Some(header) = header {
        collect_ids(header, &mut ids);
    }
    let reader = ValueReader {
        ids,
        limits,
        nodes: Cell::new(0),
    };

    let mut headers = Vec::new();
    if let Some(header) = header {
        for child in &header.children {
            let must_understand = matches!(
                child.get_attribute_ns(SOAP_ENVELOPE_NAMESPACE, "mustUnderstand"),
                Some("1") | Some("true")
            );
            headers.push(HeaderEntry {
                name: child.qname.clone(),
                value: reader.read(child, 0)?,
                must_understand,
                actor: child
                    .get_attribute_ns(SOAP_ENVELOPE_NAMESPACE, "actor")
                    .map(str::to_string),
            });
        }
    }

    let mut entries = Vec::new();
    for (index, child) in body.children.iter().enumerate() {
        // independent multi-ref elements are only reachable through href
        if index > 0 && child.get_attribute("id").is_some() {
            continue;
        }
        entries.push(BodyEntry {
            name: child.qname.clone(),
            value: reader.read(child, 0)?,
        });
    }
    trace!(headers = headers.len(), body = entries.len(), "parsed envelope");

    Ok(Envelope {
        headers,
        body: entries,
    })
}

fn collect_ids<'a>(element: &'a XmlElement, ids: &mut HashMap<String, &'a XmlElement>) {
    for child in &element.children {
        if let Some(id) = child.get_attribute("id") {
            ids.entry(id.to_string()).or_insert(child);
        }
        collect_ids(child, ids);
    }
}

struct ValueReader<'a> {
    ids: HashMap<String, &'a XmlElement>,
    limits: &'a Limits,
    // shared targets are copied at every reference, so the output can
    // outgrow the document many times over
    nodes: Cell<usize>,
}

impl<'a> ValueReader<'a> {
    fn read(&self, element: &XmlElement, depth: usize) -> Result<ValueTree, DecodeError> {
        let nodes = self.nodes.get() + 1;
        self.limits.check_value_nodes(nodes)?;
        self.nodes.set(nodes);

        if let Some(href) = element.get_attribute("href") {
            let id = href.trim_start_matches('#');
            self.limits.check_href_depth(depth + 1)?;
            let target = self
                .ids
                .get(id)
                .ok_or_else(|| DecodeError::UnresolvedReference(href.to_string()))?;
            return self.read(target, depth + 1);
        }

        let type_name = element
            .get_attribute_ns(XSI_NAMESPACE, "type")
            .or_else(|| element.get_attribute_ns(XSI_1999_NAMESPACE, "type"))
            .map(|t| element.namespaces.resolve_lenient(t));
        let nil = element
            .get_attribute_ns(XSI_NAMESPACE, "nil")
            .or_else(|| element.get_attribute_ns(XSI_1999_NAMESPACE, "null"));
        if matches!(nil, Some("true") | Some("1")) {
            return Ok(ValueTree::null(type_name));
        }

        let array_type = element.get_attribute_ns(SOAP_ENCODING_NAMESPACE, "arrayType");
        let is_array = array_type.is_some()
            || type_name
                .as_ref()
                .map(|t| t.is_in(SOAP_ENCODING_NAMESPACE) && t.local_name == "Array")
                .unwrap_or(false);

        if is_array {
            let item_type = array_type
                .map(|value| {
                    let (reference, _) = strip_array_dimensions(value.trim());
                    element.namespaces.resolve_lenient(reference)
                })
                .unwrap_or_else(|| xsd::xsd(xsd::XSD_ANY_TYPE));
            let items = element
                .children
                .iter()
                .map(|child| self.read(child, depth))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ValueTree::Array {
                item_type,
                item_name: element.children.first().map(|child| child.qname.clone()),
                items,
            });
        }

        if !element.children.is_empty() {
            let members = element
                .children
                .iter()
                .map(|child| Ok((child.qname.clone(), self.read(child, depth)?)))
                .collect::<Result<Vec<_>, DecodeError>>()?;
            return Ok(ValueTree::Struct { type_name, members });
        }

        Ok(ValueTree::Scalar {
            type_name,
            value: Primitive::String(element.text_or_empty().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{decode, to_json, Decoded};
    use crate::xsd::xsd;
    use serde_json::json;

    fn add_request() -> Envelope {
        Envelope::new().with_body(
            QName::namespaced("urn:calc", "add"),
            ValueTree::structure(
                None,
                vec![
                    (QName::local("a"), ValueTree::int(2)),
                    (QName::local("b"), ValueTree::int(3)),
                ],
            ),
        )
    }

    #[test]
    fn test_write_encoded() {
        let bytes = EnvelopeWriter::new(Use::Encoded).write(&add_request()).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains(r#"xmlns:ns0="urn:calc""#));
        assert!(xml.contains("SOAP-ENV:encodingStyle"));
        assert!(xml.contains(r#"<a xsi:type="xsd:int">2</a>"#));
        assert!(xml.contains("<ns0:add>"));
    }

    #[test]
    fn test_write_literal_has_no_type_info() {
        let bytes = EnvelopeWriter::new(Use::Literal).write(&add_request()).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(!xml.contains("xsi:type"));
        assert!(!xml.contains("encodingStyle"));
        assert!(xml.contains("<a>2</a>"));
    }

    #[test]
    fn test_encoded_array_attributes() {
        let envelope = Envelope::new().with_body(
            QName::local("list"),
            ValueTree::array(xsd("string"), vec![ValueTree::string("x")]),
        );
        let bytes = EnvelopeWriter::new(Use::Encoded).write(&envelope).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains(r#"xsi:type="SOAP-ENC:Array""#));
        assert!(xml.contains(r#"SOAP-ENC:arrayType="xsd:string[1]""#));
        assert!(xml.contains("<item xsi:type=\"xsd:string\">x</item>"));
    }

    #[test]
    fn test_round_trip_through_wire() {
        let bytes = EnvelopeWriter::new(Use::Encoded).write(&add_request()).unwrap();
        let envelope = parse_envelope(&bytes, &Limits::default()).unwrap();
        assert_eq!(envelope.body.len(), 1);
        assert_eq!(envelope.body[0].name, QName::namespaced("urn:calc", "add"));
        assert_eq!(
            to_json(&envelope.body[0].value).unwrap(),
            json!({"a": 2, "b": 3})
        );
    }

    #[test]
    fn test_headers_round_trip() {
        let envelope = add_request().with_header(
            HeaderEntry::new(QName::namespaced("urn:h", "session"), ValueTree::string("abc"))
                .must_understand()
                .with_actor("urn:me"),
        );
        let bytes = EnvelopeWriter::new(Use::Literal).write(&envelope).unwrap();
        let parsed = parse_envelope(&bytes, &Limits::default()).unwrap();
        assert_eq!(parsed.headers.len(), 1);
        assert!(parsed.headers[0].must_understand);
        assert_eq!(parsed.headers[0].actor.as_deref(), Some("urn:me"));
    }

    #[test]
    fn test_fault_round_trip() {
        let fault = Fault::server("boom").with_actor("urn:node");
        let parsed = parse_envelope(&write_fault(&fault), &Limits::default()).unwrap();
        assert_eq!(parsed.body_fault(), Some(fault.clone()));
        match decode(&parsed.body[0].value, true).unwrap() {
            Decoded::Fault(decoded) => assert_eq!(decoded, fault),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_ref() {
        let xml = br##"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xmlns:xsd="http://www.w3.org/2001/XMLSchema">
          <SOAP-ENV:Body>
            <m:getResponse xmlns:m="urn:m"><return href="#id1"/></m:getResponse>
            <multiRef id="id1"><x xsi:type="xsd:int">7</x></multiRef>
          </SOAP-ENV:Body></SOAP-ENV:Envelope>"##;
        let envelope = parse_envelope(xml, &Limits::default()).unwrap();
        assert_eq!(envelope.body.len(), 1);
        assert_eq!(
            to_json(&envelope.body[0].value).unwrap(),
            json!({"return": {"x": 7}})
        );
    }

    #[test]
    fn test_unresolved_href() {
        let xml = br##"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
          <SOAP-ENV:Body><r href="#nope"/></SOAP-ENV:Body></SOAP-ENV:Envelope>"##;
        let err = parse_envelope(xml, &Limits::default()).unwrap_err();
        assert!(matches!(err, DecodeError::UnresolvedReference(_)));
    }

    #[test]
    fn test_soap12_is_version_mismatch() {
        let xml = br#"<e:Envelope xmlns:e="http://www.w3.org/2003/05/soap-envelope"><e:Body/></e:Envelope>"#;
        let err = parse_envelope(xml, &Limits::default()).unwrap_err();
        assert!(matches!(err, DecodeError::VersionMismatch(_)));
    }

    #[test]
    fn test_not_an_envelope() {
        let err = parse_envelope(b"<html/>", &Limits::default()).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnEnvelope(_)));
        let err = parse_envelope(b"<a><b>", &Limits::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Xml { .. }));
    }

    #[test]
    fn test_nil_value() {
        let envelope =
            Envelope::new().with_body(QName::local("v"), ValueTree::null(Some(xsd("string"))));
        let bytes = EnvelopeWriter::new(Use::Encoded).write(&envelope).unwrap();
        let parsed = parse_envelope(&bytes, &Limits::default()).unwrap();
        assert!(parsed.body[0].value.is_null());
    }
}
