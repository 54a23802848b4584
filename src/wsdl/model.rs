//! WSDL object model
//!
//! A [`SchemaModel`] is built once by [`WsdlParser`](super::WsdlParser) and
//! is read-only afterwards. All maps preserve document order so lookups
//! that pick "the first match" are deterministic.

use crate::namespaces::QName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binding style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Parameters wrapped in an operation-named element
    Rpc,
    /// Parameters emitted directly as body children
    Document,
}

/// Body encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Use {
    /// SOAP section 5 encoding with `xsi:type` annotations
    Encoded,
    /// Plain schema-shaped XML
    Literal,
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rpc" => Ok(Style::Rpc),
            "document" => Ok(Style::Document),
            other => Err(format!("unknown style '{}'", other)),
        }
    }
}

impl FromStr for Use {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encoded" => Ok(Use::Encoded),
            "literal" => Ok(Use::Literal),
            other => Err(format!("unknown use '{}'", other)),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Style::Rpc => "rpc",
            Style::Document => "document",
        })
    }
}

impl fmt::Display for Use {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Use::Encoded => "encoded",
            Use::Literal => "literal",
        })
    }
}

/// Shape of a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Named members
    Struct,
    /// Repeated items of one type
    Array,
    /// Alias of a simple type
    Scalar,
}

/// Content model compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// `xsd:sequence`
    Sequence,
    /// `xsd:all`
    All,
    /// `xsd:choice`
    Choice,
    /// No compositor seen
    None,
}

/// How a type derives from its base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Derivation {
    /// `extension`: base members followed by own members
    Extension,
    /// `restriction`: own members replace the base members
    Restriction,
}

/// An attribute declared on a complex type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    /// Attribute name (or referenced name)
    pub name: QName,
    /// Declared type
    pub type_name: Option<QName>,
    /// `wsdl:arrayType` value, resolved
    pub array_type: Option<QName>,
}

/// A schema element, either top-level or a member of a complex type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    /// Element name
    pub name: QName,
    /// Declared type, `None` for anonymous types
    pub type_name: Option<QName>,
    /// `ref` target when the element was declared by reference
    pub reference: Option<QName>,
    /// Whether the element has complex content
    pub is_complex: bool,
    /// Members of an anonymous complex type
    pub nested_elements: IndexMap<String, Element>,
    /// `minOccurs`
    pub min_occurs: u32,
    /// `maxOccurs`, `None` when unbounded
    pub max_occurs: Option<u32>,
    /// `nillable`
    pub nillable: bool,
}

impl Element {
    /// Create an element with default occurrence constraints
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_name: None,
            reference: None,
            is_complex: false,
            nested_elements: IndexMap::new(),
            min_occurs: 1,
            max_occurs: Some(1),
            nillable: false,
        }
    }

    /// Whether a value must be supplied for this element
    pub fn is_required(&self) -> bool {
        self.min_occurs > 0 && !self.nillable
    }

    /// Whether the element may repeat
    pub fn is_repeated(&self) -> bool {
        self.max_occurs.map(|max| max > 1).unwrap_or(true)
    }
}

/// A named complex type (or simple type alias)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexType {
    /// Type name
    pub name: QName,
    /// Struct, Array or Scalar alias
    pub kind: TypeKind,
    /// Compositor of the content model
    pub order: Order,
    /// Members in declaration order
    pub elements: Vec<Element>,
    /// Item type when `kind` is Array
    pub array_item_type: Option<QName>,
    /// Base type from `extension`/`restriction`
    pub base_type: Option<QName>,
    /// How the base type is derived
    pub derivation: Option<Derivation>,
    /// Declared attributes, keyed by local name
    pub attributes: IndexMap<String, Attribute>,
    /// Enumeration facet values of a scalar alias
    pub enumeration: Vec<String>,
}

impl ComplexType {
    /// Create an empty struct type
    pub fn new(name: QName) -> Self {
        Self {
            name,
            kind: TypeKind::Struct,
            order: Order::None,
            elements: Vec::new(),
            array_item_type: None,
            base_type: None,
            derivation: None,
            attributes: IndexMap::new(),
            enumeration: Vec::new(),
        }
    }

    /// Member by local name
    pub fn element(&self, local_name: &str) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| e.name.local_name == local_name)
    }
}

/// A message part
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    /// Part name
    pub name: String,
    /// `type` attribute
    pub type_name: Option<QName>,
    /// `element` attribute
    pub element: Option<QName>,
}

/// A WSDL message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Message name
    pub name: QName,
    /// Parts in declaration order
    pub parts: IndexMap<String, Part>,
}

/// Reference from a portType operation to a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRef {
    /// Optional `name` attribute
    pub name: Option<String>,
    /// Referenced message
    pub message: QName,
}

/// An abstract operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortTypeOperation {
    /// Operation name
    pub name: String,
    /// `parameterOrder`, split on whitespace
    pub parameter_order: Vec<String>,
    /// Input message
    pub input: Option<MessageRef>,
    /// Output message
    pub output: Option<MessageRef>,
    /// Fault messages
    pub faults: Vec<MessageRef>,
    /// `wsdl:documentation` text
    pub documentation: Option<String>,
}

/// A WSDL portType
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortType {
    /// portType name
    pub name: QName,
    /// Operations by name
    pub operations: IndexMap<String, PortTypeOperation>,
    /// `wsdl:documentation` text
    pub documentation: Option<String>,
}

/// `soap:body` settings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BodyBinding {
    /// `use`
    pub use_: Option<Use>,
    /// `namespace`
    pub namespace: Option<String>,
    /// `encodingStyle`
    pub encoding_style: Option<String>,
    /// `parts`, restricting which message parts go in the body
    pub parts: Option<Vec<String>>,
}

/// `soap:header` or `soap:headerfault` settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderBinding {
    /// Message carrying the header
    pub message: QName,
    /// Part of that message
    pub part: String,
    /// `use`
    pub use_: Option<Use>,
    /// `namespace`
    pub namespace: Option<String>,
    /// `encodingStyle`
    pub encoding_style: Option<String>,
    /// Nested `soap:headerfault` bindings
    pub header_faults: Vec<HeaderBinding>,
}

/// Input or output section of a binding operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageBinding {
    /// `soap:body`
    pub body: BodyBinding,
    /// `soap:header` entries
    pub headers: Vec<HeaderBinding>,
}

/// `soap:fault` settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultBinding {
    /// Fault name
    pub name: String,
    /// `use`
    pub use_: Option<Use>,
    /// `namespace`
    pub namespace: Option<String>,
}

/// A concrete operation within a binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingOperation {
    /// Operation name
    pub name: String,
    /// `soapAction`
    pub soap_action: Option<String>,
    /// Operation style, defaulting to the binding style
    pub style: Option<Style>,
    /// Input section
    pub input: MessageBinding,
    /// Output section
    pub output: MessageBinding,
    /// Fault sections
    pub faults: Vec<FaultBinding>,
    /// `http:operation location`
    pub http_location: Option<String>,
}

impl BindingOperation {
    /// Create an operation with empty sections
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            soap_action: None,
            style: None,
            input: MessageBinding::default(),
            output: MessageBinding::default(),
            faults: Vec::new(),
            http_location: None,
        }
    }
}

/// Protocol of a binding or port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// SOAP binding
    Soap,
    /// HTTP GET/POST binding
    Http,
}

/// A WSDL binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    /// Binding name
    pub name: QName,
    /// Bound portType
    pub port_type: QName,
    /// SOAP or HTTP
    pub kind: BindingKind,
    /// Default style for operations
    pub style: Style,
    /// `soap:binding transport`
    pub transport: Option<String>,
    /// `http:binding verb`
    pub http_verb: Option<String>,
    /// Operations by name
    pub operations: IndexMap<String, BindingOperation>,
}

/// A service port
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Port {
    /// Port name
    pub name: String,
    /// Binding used by the port
    pub binding: QName,
    /// Endpoint address
    pub address: Option<String>,
    /// SOAP or HTTP, from the address element's namespace
    pub kind: BindingKind,
    /// `wsdl:documentation` text
    pub documentation: Option<String>,
}

/// A WSDL service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    /// Service name
    pub name: QName,
    /// Ports by name
    pub ports: IndexMap<String, Port>,
    /// `wsdl:documentation` text
    pub documentation: Option<String>,
}

/// The parsed WSDL document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaModel {
    /// `definitions targetNamespace`
    pub target_namespace: Option<String>,
    /// Every `xmlns:*` prefix seen, first declaration wins
    pub namespaces: IndexMap<String, String>,
    /// XML-Schema namespace used by the types section
    pub xsd_namespace: String,
    /// Complex types and simple type aliases
    pub complex_types: IndexMap<QName, ComplexType>,
    /// Top-level elements
    pub elements: IndexMap<QName, Element>,
    /// Messages
    pub messages: IndexMap<QName, Message>,
    /// Port types
    pub port_types: IndexMap<QName, PortType>,
    /// Bindings
    pub bindings: IndexMap<QName, Binding>,
    /// Services
    pub services: IndexMap<QName, Service>,
    /// Imported documents: import key to resolved location
    pub imports: IndexMap<String, String>,
}

impl Default for SchemaModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self {
            target_namespace: None,
            namespaces: IndexMap::new(),
            xsd_namespace: crate::XSD_NAMESPACE.to_string(),
            complex_types: IndexMap::new(),
            elements: IndexMap::new(),
            messages: IndexMap::new(),
            port_types: IndexMap::new(),
            bindings: IndexMap::new(),
            services: IndexMap::new(),
            imports: IndexMap::new(),
        }
    }

    /// Namespace bound to a prefix in the document
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(|s| s.as_str())
    }

    /// First prefix bound to a namespace in the document
    pub fn prefix_for_namespace(&self, namespace: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(_, ns)| ns.as_str() == namespace)
            .map(|(prefix, _)| prefix.as_str())
    }

    /// Names of every operation exposed by a SOAP binding, deduplicated
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for binding in self.bindings.values() {
            if binding.kind != BindingKind::Soap {
                continue;
            }
            for name in binding.operations.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Find a complex type by local name when the namespace is unknown
    pub fn complex_type_by_local(&self, local_name: &str) -> Option<&ComplexType> {
        self.complex_types
            .values()
            .find(|t| t.name.local_name == local_name)
    }
}
