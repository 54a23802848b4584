//! XML document handling
//!
//! A small namespace-aware element tree built with quick-xml. Element and
//! attribute names are resolved against the namespace scope in effect at
//! each element, and every element keeps that scope so attribute values
//! such as `xsi:type="xsd:int"` can be resolved later.

use crate::error::DecodeError;
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Element attributes (namespace declarations excluded)
    pub attributes: IndexMap<QName, String>,
    /// Character data directly inside the element
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace scope in effect for this element
    pub namespaces: NamespaceContext,
    /// Byte offset of the start tag
    pub position: usize,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
            namespaces: NamespaceContext::new(),
            position: 0,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an attribute value by local name, ignoring its namespace
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.local_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value by namespace and local name
    pub fn get_attribute_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.local_name == name && qname.is_in(namespace))
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_qname(&self, qname: &QName) -> Option<&str> {
        self.attributes.get(qname).map(|s| s.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append character data
    pub fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Text content, empty when the element has none
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|e| e.local_name() == local_name)
            .collect()
    }

    /// First child with the given namespace and local name
    pub fn find_child_ns(&self, namespace: &str, local_name: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|e| e.local_name() == local_name && e.qname.is_in(namespace))
    }
}

/// XML Document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self, DecodeError> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes with default limits
    pub fn parse(xml: &[u8]) -> Result<Self, DecodeError> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from bytes
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> Result<Self, DecodeError> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);

        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    let scope = element_stack.last().map(|p| &p.namespaces);
                    let element = Self::parse_element(&e, scope, position, limits)?;
                    element_stack.push(element);
                }
                Ok(Event::End(_)) => {
                    if let Some(mut current) = element_stack.pop() {
                        if !current.children.is_empty()
                            && current.text.as_deref().map(|t| t.trim().is_empty()) == Some(true)
                        {
                            current.text = None;
                        }
                        match element_stack.last_mut() {
                            Some(parent) => parent.add_child(current),
                            None => doc.root = Some(current),
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    let scope = element_stack.last().map(|p| &p.namespaces);
                    let element = Self::parse_element(&e, scope, position, limits)?;
                    match element_stack.last_mut() {
                        Some(parent) => parent.add_child(element),
                        None => doc.root = Some(element),
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e.unescape().map_err(|err| DecodeError::Xml {
                            position: reader.buffer_position(),
                            reason: format!("Failed to unescape text: {}", err),
                        })?;
                        current.push_text(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let raw = e.into_inner();
                        current.push_text(&String::from_utf8_lossy(&raw));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DecodeError::Xml {
                        position: reader.buffer_position(),
                        reason: e.to_string(),
                    })
                }
                _ => {} // Ignore comments, processing instructions, declarations
            }
            buf.clear();
        }

        if !element_stack.is_empty() {
            return Err(DecodeError::Xml {
                position: reader.buffer_position(),
                reason: "unexpected end of document".to_string(),
            });
        }

        Ok(doc)
    }

    /// Parse element from BytesStart event
    fn parse_element(
        start: &BytesStart,
        parent_scope: Option<&NamespaceContext>,
        position: usize,
        limits: &Limits,
    ) -> Result<Element, DecodeError> {
        let xml_error = |reason: String| DecodeError::Xml { position, reason };

        let name_bytes = start.name();
        let name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| xml_error(format!("Invalid element name: {}", e)))?;

        let mut scope = parent_scope.map(|s| s.child()).unwrap_or_default();
        let mut raw_attributes = Vec::new();

        for attr_result in start.attributes() {
            let attr =
                attr_result.map_err(|e| xml_error(format!("Failed to parse attribute: {}", e)))?;
            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| xml_error(format!("Invalid attribute name: {}", e)))?
                .to_string();
            let attr_value = attr
                .unescape_value()
                .map_err(|e| xml_error(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if !scope.declare(&attr_name, &attr_value) {
                raw_attributes.push((attr_name, attr_value));
            }
        }
        limits.check_attributes(raw_attributes.len())?;

        let mut element = Element::new(scope.resolve_lenient(name));
        for (attr_name, attr_value) in raw_attributes {
            element
                .attributes
                .insert(scope.resolve_attribute(&attr_name), attr_value);
        }
        element.namespaces = scope;
        element.position = position;

        Ok(element)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_whitespace_text_preserved_on_leaves() {
        let xml = "<root>\n  <a>  padded  </a>\n</root>";
        let root = Document::from_string(xml).unwrap().root.unwrap();
        assert_eq!(root.text, None);
        assert_eq!(root.children[0].text.as_deref(), Some("  padded  "));
    }

    #[test]
    fn test_namespaces_resolved() {
        let xml = r#"<e:Envelope xmlns:e="urn:env" xmlns:xsi="urn:xsi">
            <e:Body><m xmlns="urn:m" xsi:type="t:x" plain="1"/></e:Body>
        </e:Envelope>"#;
        let root = Document::from_string(xml).unwrap().root.unwrap();
        assert_eq!(root.qname, QName::namespaced("urn:env", "Envelope"));

        let body = &root.children[0];
        assert_eq!(body.qname, QName::namespaced("urn:env", "Body"));

        let m = &body.children[0];
        assert_eq!(m.qname, QName::namespaced("urn:m", "m"));
        assert_eq!(m.get_attribute_ns("urn:xsi", "type"), Some("t:x"));
        assert_eq!(m.get_attribute_qname(&QName::local("plain")), Some("1"));
        assert_eq!(m.namespaces.get_namespace("e"), Some("urn:env"));
    }

    #[test]
    fn test_cdata_and_entities() {
        let xml = r#"<r><a><![CDATA[<b>]]></a><c>x &amp; y</c></r>"#;
        let root = Document::from_string(xml).unwrap().root.unwrap();
        assert_eq!(root.children[0].text.as_deref(), Some("<b>"));
        assert_eq!(root.children[1].text.as_deref(), Some("x & y"));
    }

    #[test]
    fn test_malformed_xml() {
        let result = Document::from_string("<a><b></a>");
        assert!(matches!(result, Err(DecodeError::Xml { .. })));
    }

    #[test]
    fn test_unclosed_document() {
        let result = Document::from_string("<a><b/>");
        assert!(matches!(result, Err(DecodeError::Xml { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let mut limits = Limits::default();
        limits.max_xml_depth = 2;
        let result = Document::parse_with_limits(b"<a><b><c/></b></a>", &limits);
        assert!(matches!(result, Err(DecodeError::Limit(_))));
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<root><child1/><child2/><child1/></root>"#;
        let root = Document::from_string(xml).unwrap().root.unwrap();
        assert_eq!(root.find_children("child1").len(), 2);
    }
}
