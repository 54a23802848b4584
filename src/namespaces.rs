//! XML namespace handling
//!
//! This module provides qualified names (QNames) and scoped namespace
//! prefix mappings used by the WSDL parser and the envelope reader.

use crate::error::{Error, Result};
use crate::names::split_qname;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
///
/// The namespace is normally a URI. When a document references a prefix
/// that was never declared, the raw prefix is kept in its place so the
/// reference can still be reported and compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Parse Clark notation (`{namespace}local` or `local`)
    pub fn from_clark(text: &str) -> Self {
        if let Some(rest) = text.strip_prefix('{') {
            if let Some((ns, local)) = rest.split_once('}') {
                return Self::namespaced(ns, local);
            }
        }
        Self::local(text)
    }

    /// Namespace as a string slice
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Whether this name lives in the given namespace
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Namespace context for resolving prefixes
///
/// A context holds every binding in scope at one point of a document;
/// [`NamespaceContext::child`] derives the scope of a nested element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a nested scope that inherits every binding of this one
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        // xmlns="" undeclares the default namespace
        self.default_namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
    }

    /// Apply an attribute if it is a namespace declaration
    ///
    /// Returns true when the attribute was `xmlns` or `xmlns:*`.
    pub fn declare(&mut self, attribute: &str, value: &str) -> bool {
        if attribute == "xmlns" {
            self.set_default_namespace(value);
            true
        } else if let Some(prefix) = attribute.strip_prefix("xmlns:") {
            self.add_prefix(prefix, value);
            true
        } else {
            false
        }
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(crate::XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Find a prefix bound to a namespace
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        let mut found: Vec<&str> = self
            .prefixes
            .iter()
            .filter(|(_, ns)| ns.as_str() == namespace)
            .map(|(p, _)| p.as_str())
            .collect();
        found.sort_unstable();
        found.first().copied()
    }

    /// Resolve a prefixed name to a QName
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        match split_qname(prefixed_name) {
            (Some(prefix), local) => {
                let namespace = self
                    .get_namespace(prefix)
                    .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
                Ok(QName::namespaced(namespace, local))
            }
            (None, local) => Ok(QName::new(self.default_namespace.clone(), local)),
        }
    }

    /// Resolve a prefixed name, keeping an undeclared prefix as the namespace
    pub fn resolve_lenient(&self, prefixed_name: &str) -> QName {
        match split_qname(prefixed_name.trim()) {
            (Some(prefix), local) => match self.get_namespace(prefix) {
                Some(namespace) => QName::namespaced(namespace, local),
                None => QName::namespaced(prefix, local),
            },
            (None, local) => QName::new(self.default_namespace.clone(), local),
        }
    }

    /// Resolve an attribute name; unprefixed attributes are in no namespace
    pub fn resolve_attribute(&self, raw_name: &str) -> QName {
        match split_qname(raw_name) {
            (Some(_), _) => self.resolve_lenient(raw_name),
            (None, local) => QName::local(local),
        }
    }

    /// Iterate over declared prefixes
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
    }

    #[test]
    fn test_qname_to_string() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_qname_from_clark() {
        assert_eq!(
            QName::from_clark("{urn:a}b"),
            QName::namespaced("urn:a", "b")
        );
        assert_eq!(QName::from_clark("b"), QName::local("b"));
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xsd", "http://www.w3.org/2001/XMLSchema");
        ctx.set_default_namespace("http://example.com");

        assert_eq!(
            ctx.get_namespace("xsd"),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));
        assert_eq!(
            ctx.prefix_for("http://www.w3.org/2001/XMLSchema"),
            Some("xsd")
        );
    }

    #[test]
    fn test_declare_and_child_scope() {
        let mut outer = NamespaceContext::new();
        assert!(outer.declare("xmlns:tns", "urn:outer"));
        assert!(!outer.declare("name", "value"));

        let mut inner = outer.child();
        inner.declare("xmlns:tns", "urn:inner");
        assert_eq!(outer.get_namespace("tns"), Some("urn:outer"));
        assert_eq!(inner.get_namespace("tns"), Some("urn:inner"));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xsd", "http://www.w3.org/2001/XMLSchema");

        let qname = ctx.resolve("xsd:element").unwrap();
        assert_eq!(
            qname.namespace,
            Some("http://www.w3.org/2001/XMLSchema".to_string())
        );
        assert_eq!(qname.local_name, "element");
        assert!(ctx.resolve("nope:element").is_err());
    }

    #[test]
    fn test_resolve_lenient_keeps_unknown_prefix() {
        let ctx = NamespaceContext::new();
        let qname = ctx.resolve_lenient("typens:Thing");
        assert_eq!(qname, QName::namespaced("typens", "Thing"));
    }

    #[test]
    fn test_resolve_attribute_ignores_default_namespace() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace("urn:default");
        assert_eq!(ctx.resolve_attribute("name"), QName::local("name"));
        assert_eq!(
            ctx.resolve_lenient("name"),
            QName::namespaced("urn:default", "name")
        );
    }
}
