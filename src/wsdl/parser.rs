//! Streaming WSDL parser
//!
//! [`WsdlParser`] consumes [`XmlEvent`]s left to right and builds a
//! [`SchemaModel`]. All in-progress state lives in an explicit
//! [`ParserContext`]: the ancestry of open tags, the namespace scopes, the
//! WSDL section being populated and a stack of schema frames. Entities are
//! built on the context and attached to the model when their end tag is
//! seen. Imports are parsed recursively into the same model.

use super::events::{XmlEvent, XmlEventReader};
use super::model::{
    Attribute, Binding, BindingKind, BindingOperation, BodyBinding, ComplexType, Derivation,
    Element, FaultBinding, HeaderBinding, Message, MessageBinding, MessageRef, Order, Part, Port,
    PortType, PortTypeOperation, SchemaModel, Service, Style, TypeKind, Use,
};
use super::resolve;
use crate::error::ParseError;
use crate::limits::Limits;
use crate::loaders::ImportResolver;
use crate::locations::resolve_relative;
use crate::names::{split_qname, strip_array_dimensions};
use crate::namespaces::{NamespaceContext, QName};
use crate::xsd;
use crate::{SOAP_ENCODING_NAMESPACE, WSDL_HTTP_NAMESPACE, WSDL_NAMESPACE, WSDL_SOAP_NAMESPACE};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// WSDL section currently being populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    None,
    Types,
    Message,
    PortType,
    Binding,
    Service,
}

/// Input/output/fault section of a binding operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Input,
    Output,
    Fault,
}

/// One open element of the schema section
#[derive(Debug)]
enum SchemaFrame {
    Schema {
        target_namespace: Option<String>,
        qualified: bool,
    },
    ComplexType {
        ty: ComplexType,
        named: bool,
        array_marker: bool,
    },
    SimpleType {
        ty: ComplexType,
        named: bool,
    },
    Element {
        element: Element,
        top_level: bool,
    },
    Other,
}

/// Attributes of one start tag, names resolved
struct Attrs {
    items: Vec<(QName, String)>,
}

impl Attrs {
    /// Unqualified attribute by local name
    fn get(&self, local: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(name, _)| name.namespace.is_none() && name.local_name == local)
            .map(|(_, value)| value.as_str())
    }

    /// Namespaced attribute
    fn get_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(name, _)| name.is_in(namespace) && name.local_name == local)
            .map(|(_, value)| value.as_str())
    }
}

/// Mutable state of a single document pass
struct ParserContext {
    base_uri: Option<String>,
    import_depth: usize,
    status: Status,
    element_stack: Vec<QName>,
    scopes: Vec<NamespaceContext>,
    target_namespace: Option<String>,
    schema_stack: Vec<SchemaFrame>,
    message: Option<Message>,
    port_type: Option<PortType>,
    port_type_operation: Option<PortTypeOperation>,
    binding: Option<Binding>,
    binding_operation: Option<BindingOperation>,
    binding_section: Option<Section>,
    service: Option<Service>,
    port: Option<Port>,
    documentation: Option<String>,
}

impl ParserContext {
    fn new(base_uri: Option<String>, import_depth: usize) -> Self {
        Self {
            base_uri,
            import_depth,
            status: Status::None,
            element_stack: Vec::new(),
            scopes: Vec::new(),
            target_namespace: None,
            schema_stack: Vec::new(),
            message: None,
            port_type: None,
            port_type_operation: None,
            binding: None,
            binding_operation: None,
            binding_section: None,
            service: None,
            port: None,
            documentation: None,
        }
    }

    fn scope(&self) -> Option<&NamespaceContext> {
        self.scopes.last()
    }

    /// Resolve a QName-valued attribute, keeping unknown prefixes
    fn resolve_ref(&self, value: &str) -> QName {
        let value = value.trim();
        match self.scope() {
            Some(scope) => {
                if let (Some(prefix), _) = split_qname(value) {
                    if scope.get_namespace(prefix).is_none() {
                        debug!(prefix, value, "unresolved namespace prefix kept as-is");
                    }
                }
                scope.resolve_lenient(value)
            }
            None => QName::local(value),
        }
    }

    /// Resolve a SOAP-encoded array type reference such as `xsd:string[]`
    fn resolve_array_type(&self, value: &str) -> QName {
        let (reference, _) = strip_array_dimensions(value.trim());
        self.resolve_ref(reference)
    }

    fn qualify(&self, local: &str) -> QName {
        QName::new(self.target_namespace.clone(), local)
    }

    fn schema_namespace(&self) -> Option<String> {
        self.schema_stack
            .iter()
            .rev()
            .find_map(|frame| match frame {
                SchemaFrame::Schema {
                    target_namespace, ..
                } => Some(target_namespace.clone()),
                _ => None,
            })
            .unwrap_or_else(|| self.target_namespace.clone())
    }

    fn schema_qualified(&self) -> bool {
        self.schema_stack.iter().rev().any(|frame| {
            matches!(
                frame,
                SchemaFrame::Schema {
                    qualified: true,
                    ..
                }
            )
        })
    }

    /// Innermost frame that is not `Other`
    fn container_mut(&mut self) -> Option<&mut SchemaFrame> {
        self.schema_stack
            .iter_mut()
            .rev()
            .find(|frame| !matches!(frame, SchemaFrame::Other))
    }

    fn container(&self) -> Option<&SchemaFrame> {
        self.schema_stack
            .iter()
            .rev()
            .find(|frame| !matches!(frame, SchemaFrame::Other))
    }

    fn parent_local(&self) -> Option<&str> {
        self.element_stack.last().map(|q| q.local_name.as_str())
    }

    fn section_mut(&mut self) -> Option<&mut MessageBinding> {
        let section = self.binding_section?;
        let operation = self.binding_operation.as_mut()?;
        match section {
            Section::Input => Some(&mut operation.input),
            Section::Output => Some(&mut operation.output),
            Section::Fault => None,
        }
    }
}

/// WSDL 1.1 parser
#[derive(Clone, Default)]
pub struct WsdlParser {
    resolver: Option<Arc<dyn ImportResolver>>,
    limits: Limits,
    base_uri: Option<String>,
}

impl std::fmt::Debug for WsdlParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsdlParser")
            .field("has_resolver", &self.resolver.is_some())
            .field("limits", &self.limits)
            .field("base_uri", &self.base_uri)
            .finish()
    }
}

impl WsdlParser {
    /// Create a parser without an import resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resolver used to fetch imported documents
    pub fn with_resolver(mut self, resolver: Arc<dyn ImportResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the base URI relative imports are resolved against
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Parse a WSDL document held in memory
    pub fn parse_str(&self, xml: &str) -> Result<SchemaModel, ParseError> {
        self.limits.check_xml_size(xml.len())?;
        let events = XmlEventReader::with_limits(xml.as_bytes(), self.limits.clone());
        self.parse(events, SchemaModel::new())
    }

    /// Fetch a WSDL document through the resolver and parse it
    ///
    /// The location becomes the base URI for relative imports.
    pub fn parse_location(&self, location: &str) -> Result<SchemaModel, ParseError> {
        let location = resolve_relative(self.base_uri.as_deref(), location);
        let text = self.fetch(&location)?;
        let parser = self.clone().with_base_uri(location);
        parser.parse_str(&text)
    }

    /// Parse an event stream on top of an existing model
    ///
    /// The base model is consumed and a new, fully resolved model is returned.
    pub fn parse<I>(&self, events: I, base: SchemaModel) -> Result<SchemaModel, ParseError>
    where
        I: IntoIterator<Item = Result<XmlEvent, ParseError>>,
    {
        let mut model = base;
        self.parse_into(events, &mut model, self.base_uri.clone(), 0)?;
        resolve::resolve_model(&mut model);
        debug!(
            types = model.complex_types.len(),
            messages = model.messages.len(),
            bindings = model.bindings.len(),
            services = model.services.len(),
            "parsed WSDL model"
        );
        Ok(model)
    }

    fn fetch(&self, uri: &str) -> Result<String, ParseError> {
        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| ParseError::ImportFailed {
                uri: uri.to_string(),
                reason: "no import resolver configured".to_string(),
            })?;
        let text = resolver.fetch(uri).map_err(|e| ParseError::ImportFailed {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        self.limits.check_xml_size(text.len())?;
        Ok(text)
    }

    fn parse_into<I>(
        &self,
        events: I,
        model: &mut SchemaModel,
        base_uri: Option<String>,
        import_depth: usize,
    ) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = Result<XmlEvent, ParseError>>,
    {
        let mut ctx = ParserContext::new(base_uri, import_depth);
        for event in events {
            match event? {
                XmlEvent::Start {
                    name, attributes, ..
                } => self.start_element(&mut ctx, model, &name, attributes)?,
                XmlEvent::End { .. } => self.end_element(&mut ctx, model),
                XmlEvent::Text(text) => {
                    if let Some(documentation) = ctx.documentation.as_mut() {
                        documentation.push_str(&text);
                    }
                }
            }
        }
        Ok(())
    }

    fn start_element(
        &self,
        ctx: &mut ParserContext,
        model: &mut SchemaModel,
        raw_name: &str,
        raw_attributes: Vec<(String, String)>,
    ) -> Result<(), ParseError> {
        let mut scope = ctx.scope().cloned().unwrap_or_default();
        let mut plain = Vec::new();
        for (key, value) in raw_attributes {
            if scope.declare(&key, &value) {
                if let Some(prefix) = key.strip_prefix("xmlns:") {
                    model
                        .namespaces
                        .entry(prefix.to_string())
                        .or_insert_with(|| value.clone());
                }
            } else {
                plain.push((key, value));
            }
        }
        let attrs = Attrs {
            items: plain
                .into_iter()
                .map(|(key, value)| (scope.resolve_attribute(&key), value))
                .collect(),
        };
        let qname = scope.resolve_lenient(raw_name);
        ctx.scopes.push(scope);

        if ctx.element_stack.is_empty() {
            if qname.is_in(WSDL_NAMESPACE) && qname.local_name == "definitions" {
                // handled below
            } else if is_schema_element(&qname, "schema") {
                ctx.status = Status::Types;
            } else {
                return Err(ParseError::NotWsdl(qname.to_string()));
            }
        }

        trace!(element = %qname, status = ?ctx.status, "start");
        let namespace = qname.namespace.clone().unwrap_or_default();
        let local = qname.local_name.as_str();

        if namespace == WSDL_NAMESPACE {
            self.wsdl_start(ctx, model, local, &attrs)?;
        } else if ctx.status == Status::Types && xsd::is_schema_namespace(&namespace) {
            if local == "schema" {
                model.xsd_namespace = namespace.clone();
            }
            self.schema_start(ctx, model, local, &attrs)?;
        } else if namespace == WSDL_SOAP_NAMESPACE {
            soap_start(ctx, local, &attrs);
        } else if namespace == WSDL_HTTP_NAMESPACE {
            http_start(ctx, local, &attrs);
        }

        ctx.element_stack.push(qname);
        Ok(())
    }

    fn end_element(&self, ctx: &mut ParserContext, model: &mut SchemaModel) {
        let Some(qname) = ctx.element_stack.pop() else {
            return;
        };
        let namespace = qname.namespace.clone().unwrap_or_default();

        if namespace == WSDL_NAMESPACE {
            wsdl_end(ctx, model, &qname.local_name);
        } else if ctx.status == Status::Types && xsd::is_schema_namespace(&namespace) {
            schema_end(ctx, model);
        }
        ctx.scopes.pop();
    }

    fn wsdl_start(
        &self,
        ctx: &mut ParserContext,
        model: &mut SchemaModel,
        local: &str,
        attrs: &Attrs,
    ) -> Result<(), ParseError> {
        match local {
            "definitions" => {
                ctx.target_namespace = attrs.get("targetNamespace").map(str::to_string);
                if ctx.import_depth == 0 {
                    model.target_namespace = ctx.target_namespace.clone();
                }
            }
            "import" => {
                if let Some(location) = attrs.get("location") {
                    let key = attrs.get("namespace").unwrap_or_default().to_string();
                    self.import_document(ctx, model, key, location)?;
                }
            }
            "documentation" => ctx.documentation = Some(String::new()),
            "types" => ctx.status = Status::Types,
            "message" => {
                ctx.status = Status::Message;
                ctx.message = Some(Message {
                    name: ctx.qualify(attrs.get("name").unwrap_or_default()),
                    parts: Default::default(),
                });
            }
            "part" if ctx.status == Status::Message => {
                let part = Part {
                    name: attrs.get("name").unwrap_or_default().to_string(),
                    type_name: attrs.get("type").map(|t| ctx.resolve_ref(t)),
                    element: attrs.get("element").map(|e| ctx.resolve_ref(e)),
                };
                if let Some(message) = ctx.message.as_mut() {
                    message.parts.insert(part.name.clone(), part);
                }
            }
            "portType" => {
                ctx.status = Status::PortType;
                ctx.port_type = Some(PortType {
                    name: ctx.qualify(attrs.get("name").unwrap_or_default()),
                    operations: Default::default(),
                    documentation: None,
                });
            }
            "binding" => {
                ctx.status = Status::Binding;
                ctx.binding = Some(Binding {
                    name: ctx.qualify(attrs.get("name").unwrap_or_default()),
                    port_type: ctx.resolve_ref(attrs.get("type").unwrap_or_default()),
                    kind: BindingKind::Soap,
                    style: Style::Document,
                    transport: None,
                    http_verb: None,
                    operations: Default::default(),
                });
            }
            "service" => {
                ctx.status = Status::Service;
                ctx.service = Some(Service {
                    name: ctx.qualify(attrs.get("name").unwrap_or_default()),
                    ports: Default::default(),
                    documentation: None,
                });
            }
            "operation" => {
                let name = attrs.get("name").unwrap_or_default().to_string();
                match ctx.status {
                    Status::PortType => {
                        ctx.port_type_operation = Some(PortTypeOperation {
                            name,
                            parameter_order: attrs
                                .get("parameterOrder")
                                .map(|order| order.split_whitespace().map(str::to_string).collect())
                                .unwrap_or_default(),
                            input: None,
                            output: None,
                            faults: Vec::new(),
                            documentation: None,
                        });
                    }
                    Status::Binding => ctx.binding_operation = Some(BindingOperation::new(name)),
                    _ => {}
                }
            }
            "input" | "output" | "fault" => match ctx.status {
                Status::PortType => {
                    let Some(message) = attrs.get("message") else {
                        return Ok(());
                    };
                    let reference = MessageRef {
                        name: attrs.get("name").map(str::to_string),
                        message: ctx.resolve_ref(message),
                    };
                    if let Some(operation) = ctx.port_type_operation.as_mut() {
                        match local {
                            "input" => operation.input = Some(reference),
                            "output" => operation.output = Some(reference),
                            _ => operation.faults.push(reference),
                        }
                    }
                }
                Status::Binding => {
                    ctx.binding_section = Some(match local {
                        "input" => Section::Input,
                        "output" => Section::Output,
                        _ => Section::Fault,
                    });
                }
                _ => {}
            },
            "port" if ctx.status == Status::Service => {
                ctx.port = Some(Port {
                    name: attrs.get("name").unwrap_or_default().to_string(),
                    binding: ctx.resolve_ref(attrs.get("binding").unwrap_or_default()),
                    address: None,
                    kind: BindingKind::Soap,
                    documentation: None,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn schema_start(
        &self,
        ctx: &mut ParserContext,
        model: &mut SchemaModel,
        local: &str,
        attrs: &Attrs,
    ) -> Result<(), ParseError> {
        let frame = match local {
            "schema" => SchemaFrame::Schema {
                target_namespace: attrs
                    .get("targetNamespace")
                    .map(str::to_string)
                    .or_else(|| ctx.target_namespace.clone()),
                qualified: attrs.get("elementFormDefault") == Some("qualified"),
            },
            "import" | "include" => {
                if let Some(location) = attrs.get("schemaLocation") {
                    let key = match (local, attrs.get("namespace")) {
                        ("import", Some(namespace)) => namespace.to_string(),
                        _ => String::new(),
                    };
                    self.import_document(ctx, model, key, location)?;
                }
                SchemaFrame::Other
            }
            "complexType" => {
                let top_level = matches!(ctx.container(), Some(SchemaFrame::Schema { .. }));
                match (top_level, attrs.get("name")) {
                    (true, Some(name)) => SchemaFrame::ComplexType {
                        ty: ComplexType::new(QName::new(ctx.schema_namespace(), name)),
                        named: true,
                        array_marker: false,
                    },
                    _ => SchemaFrame::ComplexType {
                        ty: ComplexType::new(QName::local("")),
                        named: false,
                        array_marker: false,
                    },
                }
            }
            "simpleType" => {
                let top_level = matches!(ctx.container(), Some(SchemaFrame::Schema { .. }));
                let name = attrs.get("name").filter(|_| top_level);
                let mut ty = ComplexType::new(QName::new(ctx.schema_namespace(), name.unwrap_or("")));
                ty.kind = TypeKind::Scalar;
                SchemaFrame::SimpleType {
                    ty,
                    named: name.is_some(),
                }
            }
            "element" => element_frame(ctx, attrs),
            "sequence" | "all" | "choice" => {
                let order = match local {
                    "sequence" => Order::Sequence,
                    "all" => Order::All,
                    _ => Order::Choice,
                };
                if let Some(SchemaFrame::ComplexType { ty, .. }) = ctx.container_mut() {
                    if ty.order == Order::None {
                        ty.order = order;
                    }
                }
                SchemaFrame::Other
            }
            "extension" | "restriction" => {
                if let Some(base) = attrs.get("base") {
                    let base = ctx.resolve_ref(base);
                    let derivation = if local == "extension" {
                        Derivation::Extension
                    } else {
                        Derivation::Restriction
                    };
                    let simple_content = ctx.parent_local() == Some("simpleContent");
                    match ctx.container_mut() {
                        Some(SchemaFrame::ComplexType {
                            ty, array_marker, ..
                        }) => {
                            if base.is_in(SOAP_ENCODING_NAMESPACE) && base.local_name == "Array" {
                                *array_marker = true;
                                ty.kind = TypeKind::Array;
                            } else if simple_content || xsd::is_primitive(&base) {
                                ty.kind = TypeKind::Scalar;
                            }
                            ty.base_type = Some(base);
                            ty.derivation = Some(derivation);
                        }
                        Some(SchemaFrame::SimpleType { ty, .. }) => {
                            ty.base_type = Some(base);
                            ty.derivation = Some(Derivation::Restriction);
                        }
                        _ => {}
                    }
                }
                SchemaFrame::Other
            }
            "enumeration" => {
                if let (Some(value), Some(SchemaFrame::SimpleType { ty, .. })) =
                    (attrs.get("value"), ctx.container_mut())
                {
                    ty.enumeration.push(value.to_string());
                }
                SchemaFrame::Other
            }
            "attribute" => {
                attribute_start(ctx, attrs);
                SchemaFrame::Other
            }
            _ => SchemaFrame::Other,
        };
        ctx.schema_stack.push(frame);
        Ok(())
    }

    fn import_document(
        &self,
        ctx: &ParserContext,
        model: &mut SchemaModel,
        key: String,
        location: &str,
    ) -> Result<(), ParseError> {
        let uri = resolve_relative(ctx.base_uri.as_deref(), location);
        let key = if key.is_empty() { uri.clone() } else { key };
        if model.imports.contains_key(&key) {
            debug!(key = %key, uri = %uri, "import already processed");
            return Ok(());
        }
        self.limits.check_import_depth(ctx.import_depth + 1)?;
        model.imports.insert(key, uri.clone());

        info!(uri = %uri, depth = ctx.import_depth + 1, "importing document");
        let text = self.fetch(&uri)?;
        let events = XmlEventReader::with_limits(text.as_bytes(), self.limits.clone());
        self.parse_into(events, model, Some(uri.clone()), ctx.import_depth + 1)
            .map_err(|e| match e {
                ParseError::ImportFailed { .. } | ParseError::Limit(_) => e,
                other => ParseError::ImportFailed {
                    uri,
                    reason: other.to_string(),
                },
            })
    }
}

fn is_schema_element(qname: &QName, local: &str) -> bool {
    qname.local_name == local && qname.namespace().map(xsd::is_schema_namespace).unwrap_or(false)
}

fn parse_use(value: Option<&str>) -> Option<Use> {
    let value = value?;
    match value.parse() {
        Ok(use_) => Some(use_),
        Err(reason) => {
            warn!(%reason, "ignoring unknown use");
            None
        }
    }
}

fn parse_style(value: Option<&str>) -> Option<Style> {
    let value = value?;
    match value.parse() {
        Ok(style) => Some(style),
        Err(reason) => {
            warn!(%reason, "ignoring unknown style");
            None
        }
    }
}

fn element_frame(ctx: &ParserContext, attrs: &Attrs) -> SchemaFrame {
    let top_level = match ctx.container() {
        Some(SchemaFrame::Schema { .. }) => true,
        Some(SchemaFrame::ComplexType { .. }) => false,
        _ => return SchemaFrame::Other,
    };

    let reference = attrs.get("ref").map(|r| ctx.resolve_ref(r));
    let name = match (&reference, attrs.get("name")) {
        (Some(reference), _) => reference.clone(),
        (None, Some(name)) => {
            let qualified = top_level
                || attrs.get("form") == Some("qualified")
                || (attrs.get("form").is_none() && ctx.schema_qualified());
            if qualified {
                QName::new(ctx.schema_namespace(), name)
            } else {
                QName::local(name)
            }
        }
        (None, None) => return SchemaFrame::Other,
    };

    let mut element = Element::new(name);
    element.reference = reference;
    element.type_name = attrs.get("type").map(|t| ctx.resolve_ref(t));
    element.is_complex = element
        .type_name
        .as_ref()
        .map(|t| !xsd::is_primitive(t))
        .unwrap_or(false);
    element.min_occurs = attrs
        .get("minOccurs")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1);
    element.max_occurs = match attrs.get("maxOccurs").map(str::trim) {
        Some("unbounded") => None,
        Some(value) => Some(value.parse().unwrap_or(1)),
        None => Some(1),
    };
    element.nillable = matches!(attrs.get("nillable"), Some("true") | Some("1"));

    SchemaFrame::Element { element, top_level }
}

fn attribute_start(ctx: &mut ParserContext, attrs: &Attrs) {
    let name = match (attrs.get("ref"), attrs.get("name")) {
        (Some(reference), _) => ctx.resolve_ref(reference),
        (None, Some(name)) => QName::local(name),
        (None, None) => return,
    };
    let array_type = attrs
        .get_ns(WSDL_NAMESPACE, "arrayType")
        .map(|value| ctx.resolve_array_type(value));
    let type_name = attrs.get("type").map(|t| ctx.resolve_ref(t));

    if let Some(SchemaFrame::ComplexType {
        ty, array_marker, ..
    }) = ctx.container_mut()
    {
        if let Some(item) = &array_type {
            *array_marker = true;
            ty.kind = TypeKind::Array;
            ty.array_item_type = Some(item.clone());
        }
        ty.attributes.insert(
            name.local_name.clone(),
            Attribute {
                name,
                type_name,
                array_type,
            },
        );
    }
}

fn schema_end(ctx: &mut ParserContext, model: &mut SchemaModel) {
    let Some(frame) = ctx.schema_stack.pop() else {
        return;
    };

    match frame {
        SchemaFrame::ComplexType {
            mut ty,
            named,
            array_marker,
        } => {
            if named {
                detect_array(&mut ty, array_marker);
                trace!(name = %ty.name, kind = ?ty.kind, "complexType");
                model.complex_types.insert(ty.name.clone(), ty);
            } else if let Some(SchemaFrame::Element { element, .. }) = ctx.container_mut() {
                element.is_complex = true;
                if ty.elements.is_empty() {
                    if element.type_name.is_none() {
                        element.type_name = ty.base_type.clone();
                    }
                } else {
                    element.nested_elements = ty
                        .elements
                        .into_iter()
                        .map(|member| (member.name.local_name.clone(), member))
                        .collect();
                }
            }
        }
        SchemaFrame::SimpleType { ty, named } => {
            if named {
                model.complex_types.insert(ty.name.clone(), ty);
            } else if let Some(SchemaFrame::Element { element, .. }) = ctx.container_mut() {
                if element.type_name.is_none() {
                    element.type_name = ty.base_type;
                }
            }
        }
        SchemaFrame::Element { element, top_level } => {
            if top_level {
                model.elements.insert(element.name.clone(), element);
            } else if let Some(SchemaFrame::ComplexType { ty, .. }) = ctx.container_mut() {
                ty.elements.push(element);
            }
        }
        SchemaFrame::Schema { .. } | SchemaFrame::Other => {}
    }
}

/// Decide the final kind of a complex type when it closes
///
/// An explicit SOAP-ENC array marker always wins. Otherwise a sequence
/// holding exactly one member is the wire convention for an array of that
/// member's type; more than one member makes it a struct.
fn detect_array(ty: &mut ComplexType, array_marker: bool) {
    if array_marker {
        ty.kind = TypeKind::Array;
        if ty.array_item_type.is_none() && ty.elements.len() == 1 {
            ty.array_item_type = ty.elements[0].type_name.clone();
        }
        return;
    }
    if ty.kind != TypeKind::Struct || ty.base_type.is_some() {
        return;
    }
    if ty.order == Order::Sequence && ty.elements.len() == 1 {
        if let Some(item) = ty.elements[0].type_name.clone() {
            ty.kind = TypeKind::Array;
            ty.array_item_type = Some(item);
        }
    }
}

fn soap_start(ctx: &mut ParserContext, local: &str, attrs: &Attrs) {
    match local {
        "binding" => {
            if let Some(binding) = ctx.binding.as_mut() {
                if let Some(style) = parse_style(attrs.get("style")) {
                    binding.style = style;
                }
                binding.transport = attrs.get("transport").map(str::to_string);
            }
        }
        "operation" => {
            if let Some(operation) = ctx.binding_operation.as_mut() {
                operation.soap_action = attrs.get("soapAction").map(str::to_string);
                operation.style = parse_style(attrs.get("style"));
            }
        }
        "body" => {
            let body = BodyBinding {
                use_: parse_use(attrs.get("use")),
                namespace: attrs.get("namespace").map(str::to_string),
                encoding_style: attrs.get("encodingStyle").map(str::to_string),
                parts: attrs
                    .get("parts")
                    .map(|parts| parts.split_whitespace().map(str::to_string).collect()),
            };
            if let Some(section) = ctx.section_mut() {
                section.body = body;
            }
        }
        "header" | "headerfault" => {
            let header = HeaderBinding {
                message: ctx.resolve_ref(attrs.get("message").unwrap_or_default()),
                part: attrs.get("part").unwrap_or_default().to_string(),
                use_: parse_use(attrs.get("use")),
                namespace: attrs.get("namespace").map(str::to_string),
                encoding_style: attrs.get("encodingStyle").map(str::to_string),
                header_faults: Vec::new(),
            };
            let is_fault = local == "headerfault";
            if let Some(section) = ctx.section_mut() {
                if is_fault {
                    if let Some(last) = section.headers.last_mut() {
                        last.header_faults.push(header);
                    }
                } else {
                    section.headers.push(header);
                }
            }
        }
        "fault" => {
            if let Some(operation) = ctx.binding_operation.as_mut() {
                operation.faults.push(FaultBinding {
                    name: attrs.get("name").unwrap_or_default().to_string(),
                    use_: parse_use(attrs.get("use")),
                    namespace: attrs.get("namespace").map(str::to_string),
                });
            }
        }
        "address" => {
            if let Some(port) = ctx.port.as_mut() {
                port.address = attrs.get("location").map(str::to_string);
                port.kind = BindingKind::Soap;
            }
        }
        _ => {}
    }
}

fn http_start(ctx: &mut ParserContext, local: &str, attrs: &Attrs) {
    match local {
        "binding" => {
            if let Some(binding) = ctx.binding.as_mut() {
                binding.kind = BindingKind::Http;
                binding.http_verb = attrs.get("verb").map(str::to_string);
            }
        }
        "operation" => {
            if let Some(operation) = ctx.binding_operation.as_mut() {
                operation.http_location = attrs.get("location").map(str::to_string);
            }
        }
        "address" => {
            if let Some(port) = ctx.port.as_mut() {
                port.address = attrs.get("location").map(str::to_string);
                port.kind = BindingKind::Http;
            }
        }
        _ => {}
    }
}

fn wsdl_end(ctx: &mut ParserContext, model: &mut SchemaModel, local: &str) {
    match local {
        "documentation" => attach_documentation(ctx),
        "types" => ctx.status = Status::None,
        "message" => {
            if let Some(message) = ctx.message.take() {
                model.messages.insert(message.name.clone(), message);
            }
            ctx.status = Status::None;
        }
        "operation" => match ctx.status {
            Status::PortType => {
                if let (Some(operation), Some(port_type)) =
                    (ctx.port_type_operation.take(), ctx.port_type.as_mut())
                {
                    port_type
                        .operations
                        .insert(operation.name.clone(), operation);
                }
            }
            Status::Binding => {
                if let (Some(operation), Some(binding)) =
                    (ctx.binding_operation.take(), ctx.binding.as_mut())
                {
                    binding.operations.insert(operation.name.clone(), operation);
                }
            }
            _ => {}
        },
        "input" | "output" | "fault" if ctx.status == Status::Binding => {
            ctx.binding_section = None;
        }
        "portType" => {
            if let Some(port_type) = ctx.port_type.take() {
                model.port_types.insert(port_type.name.clone(), port_type);
            }
            ctx.status = Status::None;
        }
        "binding" => {
            if let Some(binding) = ctx.binding.take() {
                model.bindings.insert(binding.name.clone(), binding);
            }
            ctx.status = Status::None;
        }
        "port" => {
            if let (Some(port), Some(service)) = (ctx.port.take(), ctx.service.as_mut()) {
                service.ports.insert(port.name.clone(), port);
            }
        }
        "service" => {
            if let Some(service) = ctx.service.take() {
                model.services.insert(service.name.clone(), service);
            }
            ctx.status = Status::None;
        }
        _ => {}
    }
}

/// Hand collected documentation text to the innermost open entity
fn attach_documentation(ctx: &mut ParserContext) {
    let Some(text) = ctx.documentation.take() else {
        return;
    };
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let slot = match ctx.status {
        Status::PortType => match ctx.port_type_operation.as_mut() {
            Some(operation) => Some(&mut operation.documentation),
            None => ctx.port_type.as_mut().map(|p| &mut p.documentation),
        },
        Status::Service => match ctx.port.as_mut() {
            Some(port) => Some(&mut port.documentation),
            None => ctx.service.as_mut().map(|s| &mut s.documentation),
        },
        _ => None,
    };
    if let Some(slot) = slot {
        *slot = Some(text.to_string());
    }
}
