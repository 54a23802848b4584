//! Queries over a parsed model
//!
//! These are the questions the client and server ask of a WSDL: which port
//! serves an operation, what its input and output messages look like, and
//! what shape a named type has.

use super::model::{
    BindingKind, Element, HeaderBinding, MessageBinding, MessageRef, Port, SchemaModel, Service,
    Style, TypeKind, Use,
};
use crate::error::LookupError;
use crate::namespaces::QName;
use crate::xsd;
use crate::SOAP_ENCODING_NAMESPACE;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// One parameter of a message, after wrapper expansion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartInfo {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub type_name: Option<QName>,
    /// Declared element
    pub element: Option<QName>,
}

/// Everything needed to encode or decode one direction of an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageData {
    /// Abstract message, if the portType names one
    pub message: Option<QName>,
    /// Effective use
    #[serde(rename = "use")]
    pub use_: Use,
    /// `soap:body namespace`
    pub namespace: Option<String>,
    /// Parameters in order
    pub parts: IndexMap<String, PartInfo>,
    /// Header bindings
    pub headers: Vec<HeaderBinding>,
    /// Wrapper element of a wrapped document/literal message
    pub wrapper: Option<QName>,
}

/// A fully resolved operation on one port
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationData {
    /// Operation name
    pub name: String,
    /// Service the port belongs to
    pub service: QName,
    /// Port name
    pub port: String,
    /// Endpoint address of the port
    pub endpoint: Option<String>,
    /// Effective style
    pub style: Style,
    /// `soapAction`
    pub soap_action: Option<String>,
    /// Namespace of the rpc wrapper element
    pub namespace: Option<String>,
    /// `parameterOrder`
    pub parameter_order: Vec<String>,
    /// Documentation of the abstract operation
    pub documentation: Option<String>,
    /// Request message
    pub input: MessageData,
    /// Response message
    pub output: MessageData,
}

/// Resolved shape of a declared type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape<'a> {
    /// Built-in primitive (aliases are resolved to their primitive)
    Scalar(QName),
    /// Ordered members
    Struct {
        /// Type tag, `None` for anonymous types
        type_name: Option<QName>,
        /// Members in declaration order
        members: Vec<&'a Element>,
    },
    /// Repeated items
    Array {
        /// Item type
        item_type: QName,
        /// Item element name, when the schema declares one
        item_name: Option<QName>,
    },
    /// The type is not declared in the model
    Unknown,
}

impl SchemaModel {
    /// Find the first SOAP port whose binding implements an operation
    ///
    /// Ports of the named service are searched first. Within the search
    /// order the first match wins, so the answer only depends on document
    /// order.
    pub fn port_for_operation(
        &self,
        operation: &str,
        service: Option<&str>,
    ) -> Result<(&Service, &Port), LookupError> {
        let operation = self
            .canonical_operation_name(operation)
            .unwrap_or(operation);
        let preferred = self
            .services
            .values()
            .filter(|s| service.map(|name| s.name.local_name == name).unwrap_or(false));
        let others = self
            .services
            .values()
            .filter(|s| !service.map(|name| s.name.local_name == name).unwrap_or(false));

        for candidate in preferred.chain(others) {
            for port in candidate.ports.values() {
                if port.kind != BindingKind::Soap {
                    continue;
                }
                let Some(binding) = self.bindings.get(&port.binding) else {
                    continue;
                };
                if binding.kind == BindingKind::Soap && binding.operations.contains_key(operation)
                {
                    return Ok((candidate, port));
                }
            }
        }
        Err(LookupError::UnknownOperation(operation.to_string()))
    }

    /// Resolve an operation on a port into its wire description
    pub fn operation_data(
        &self,
        service: &Service,
        port: &Port,
        operation: &str,
    ) -> Result<OperationData, LookupError> {
        let binding = self
            .bindings
            .get(&port.binding)
            .ok_or_else(|| LookupError::UnknownBinding(port.binding.to_string()))?;
        let binding_operation = binding
            .operations
            .get(operation)
            .ok_or_else(|| LookupError::UnknownOperation(operation.to_string()))?;
        let port_type = self
            .port_types
            .get(&binding.port_type)
            .ok_or_else(|| LookupError::UnknownPortType(binding.port_type.to_string()))?;
        let abstract_operation = port_type
            .operations
            .get(operation)
            .ok_or_else(|| LookupError::UnknownOperation(operation.to_string()))?;

        let style = binding_operation.style.unwrap_or(binding.style);
        let namespace = binding_operation
            .input
            .body
            .namespace
            .clone()
            .or_else(|| self.target_namespace.clone());

        Ok(OperationData {
            name: operation.to_string(),
            service: service.name.clone(),
            port: port.name.clone(),
            endpoint: port.address.clone(),
            style,
            soap_action: binding_operation.soap_action.clone(),
            namespace,
            parameter_order: abstract_operation.parameter_order.clone(),
            documentation: abstract_operation.documentation.clone(),
            input: self.message_data(
                abstract_operation.input.as_ref(),
                &binding_operation.input,
                style,
            ),
            output: self.message_data(
                abstract_operation.output.as_ref(),
                &binding_operation.output,
                style,
            ),
        })
    }

    /// Shortcut for [`port_for_operation`](Self::port_for_operation) followed
    /// by [`operation_data`](Self::operation_data)
    pub fn find_operation(
        &self,
        operation: &str,
        service: Option<&str>,
    ) -> Result<OperationData, LookupError> {
        let (service, port) = self.port_for_operation(operation, service)?;
        let operation = self
            .canonical_operation_name(operation)
            .unwrap_or(operation);
        self.operation_data(service, port, operation)
    }

    fn message_data(
        &self,
        reference: Option<&MessageRef>,
        binding: &MessageBinding,
        style: Style,
    ) -> MessageData {
        let use_ = binding.body.use_.unwrap_or(match style {
            Style::Rpc => Use::Encoded,
            Style::Document => Use::Literal,
        });
        let message = reference.map(|r| r.message.clone());
        let declared = message.as_ref().and_then(|name| self.messages.get(name));

        let mut parts: IndexMap<String, PartInfo> = declared
            .map(|m| {
                m.parts
                    .values()
                    .filter(|part| {
                        binding
                            .body
                            .parts
                            .as_ref()
                            .map(|names| names.contains(&part.name))
                            .unwrap_or(true)
                    })
                    .map(|part| {
                        (
                            part.name.clone(),
                            PartInfo {
                                name: part.name.clone(),
                                type_name: part.type_name.clone(),
                                element: part.element.clone(),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut wrapper = None;
        if style == Style::Document && parts.len() == 1 {
            if let Some(element_name) = parts
                .get("parameters")
                .and_then(|part| part.element.clone())
            {
                if let Some(element) = self.elements.get(&element_name) {
                    parts = self
                        .element_members(element)
                        .into_iter()
                        .map(|member| {
                            (
                                member.name.local_name.clone(),
                                PartInfo {
                                    name: member.name.local_name.clone(),
                                    type_name: member.type_name.clone(),
                                    element: Some(member.name.clone()),
                                },
                            )
                        })
                        .collect();
                    wrapper = Some(element_name);
                }
            }
        }

        MessageData {
            message,
            use_,
            namespace: binding.body.namespace.clone(),
            parts,
            headers: binding.headers.clone(),
            wrapper,
        }
    }

    /// Members of an element's complex content
    pub fn element_members<'a>(&'a self, element: &'a Element) -> Vec<&'a Element> {
        if !element.nested_elements.is_empty() {
            return element.nested_elements.values().collect();
        }
        match element.type_name.as_ref().map(|t| self.schema_type(t)) {
            Some(TypeShape::Struct { members, .. }) => members,
            _ => Vec::new(),
        }
    }

    /// Shape of a named type
    pub fn schema_type(&self, type_name: &QName) -> TypeShape<'_> {
        if xsd::is_primitive(type_name) {
            return TypeShape::Scalar(type_name.clone());
        }
        if type_name.is_in(SOAP_ENCODING_NAMESPACE) && type_name.local_name == "Array" {
            return TypeShape::Array {
                item_type: xsd::xsd(xsd::XSD_ANY_TYPE),
                item_name: None,
            };
        }

        let Some(ty) = self.complex_types.get(type_name).or_else(|| {
            // prefixes the parser could not resolve end up as the namespace
            if self.namespace_for_prefix(type_name.namespace().unwrap_or_default()).is_some()
                || type_name.namespace.is_none()
            {
                self.complex_type_by_local(&type_name.local_name)
            } else {
                None
            }
        }) else {
            return TypeShape::Unknown;
        };

        match ty.kind {
            TypeKind::Scalar => TypeShape::Scalar(self.primitive_of(&ty.name)),
            TypeKind::Array => TypeShape::Array {
                item_type: ty
                    .array_item_type
                    .clone()
                    .unwrap_or_else(|| xsd::xsd(xsd::XSD_ANY_TYPE)),
                item_name: match ty.elements.as_slice() {
                    [only] => Some(only.name.clone()),
                    _ => None,
                },
            },
            TypeKind::Struct => TypeShape::Struct {
                type_name: Some(ty.name.clone()),
                members: ty.elements.iter().collect(),
            },
        }
    }

    /// Innermost item type of a possibly nested array type, with its depth
    ///
    /// `ArrayOfArrayOfInt` yields `(xsd:int, 2)`. Non-array types yield
    /// themselves at depth 0. Cyclic item types stop at the first repeat.
    pub fn deepest_array_type(&self, type_name: &QName) -> (QName, usize) {
        let mut seen = HashSet::new();
        let mut current = type_name.clone();
        let mut depth = 0;
        while seen.insert(current.clone()) {
            match self.schema_type(&current) {
                TypeShape::Array { item_type, .. } => {
                    depth += 1;
                    current = item_type;
                }
                _ => break,
            }
        }
        (current, depth)
    }

    /// Shape of an element's content
    pub fn element_shape<'a>(&'a self, element: &'a Element) -> TypeShape<'a> {
        if !element.nested_elements.is_empty() {
            return TypeShape::Struct {
                type_name: None,
                members: element.nested_elements.values().collect(),
            };
        }
        match &element.type_name {
            Some(type_name) => self.schema_type(type_name),
            None => TypeShape::Unknown,
        }
    }

    /// Follow scalar aliases down to a built-in type, `xsd:string` if none
    fn primitive_of(&self, type_name: &QName) -> QName {
        let mut seen = HashSet::new();
        let mut current = type_name.clone();
        while seen.insert(current.clone()) {
            if xsd::is_primitive(&current) {
                return current;
            }
            match self
                .complex_types
                .get(&current)
                .and_then(|ty| ty.base_type.clone())
            {
                Some(base) => current = base,
                None => break,
            }
        }
        xsd::xsd(xsd::XSD_STRING)
    }

    /// Operation whose input is the given top-level element
    pub fn operation_for_element(&self, element: &QName) -> Option<&str> {
        for binding in self.bindings.values() {
            if binding.kind != BindingKind::Soap {
                continue;
            }
            let Some(port_type) = self.port_types.get(&binding.port_type) else {
                continue;
            };
            for (name, operation) in &port_type.operations {
                let matches = operation
                    .input
                    .as_ref()
                    .and_then(|input| self.messages.get(&input.message))
                    .map(|message| {
                        message
                            .parts
                            .values()
                            .any(|part| part.element.as_ref() == Some(element))
                    })
                    .unwrap_or(false);
                if matches && binding.operations.contains_key(name) {
                    return Some(name);
                }
            }
        }
        None
    }

    /// Operation name as declared, matched case-insensitively
    pub fn canonical_operation_name(&self, name: &str) -> Option<&str> {
        let names = self.operation_names();
        names
            .iter()
            .find(|n| **n == name)
            .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(name)))
            .copied()
    }
}
