//! XML-Schema primitive type map
//!
//! Maps built-in type names to the native class used to encode and decode
//! them, and decides when two type names are compatible.

use crate::namespaces::QName;
use crate::{SOAP_ENCODING_NAMESPACE, XSD_1999_NAMESPACE, XSD_2000_NAMESPACE, XSD_NAMESPACE};

/// String type
pub const XSD_STRING: &str = "string";
/// Boolean type
pub const XSD_BOOLEAN: &str = "boolean";
/// Decimal type
pub const XSD_DECIMAL: &str = "decimal";
/// 32-bit integer type
pub const XSD_INT: &str = "int";
/// 64-bit integer type
pub const XSD_LONG: &str = "long";
/// Unsigned 64-bit integer type
pub const XSD_UNSIGNED_LONG: &str = "unsignedLong";
/// Single precision float
pub const XSD_FLOAT: &str = "float";
/// Double precision float
pub const XSD_DOUBLE: &str = "double";
/// Base64 binary
pub const XSD_BASE64_BINARY: &str = "base64Binary";
/// Hex binary
pub const XSD_HEX_BINARY: &str = "hexBinary";
/// Any type
pub const XSD_ANY_TYPE: &str = "anyType";

/// Native representation class of a primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeClass {
    /// Text
    String,
    /// Whole number
    Integer,
    /// Floating point number
    Float,
    /// Arbitrary precision decimal
    Decimal,
    /// Boolean
    Boolean,
    /// Binary data (base64 or hex on the wire)
    Binary,
}

/// Whether a namespace is one of the XML-Schema namespaces
pub fn is_schema_namespace(namespace: &str) -> bool {
    matches!(
        namespace,
        XSD_NAMESPACE | XSD_1999_NAMESPACE | XSD_2000_NAMESPACE
    )
}

/// Build a QName in the 2001 XML-Schema namespace
pub fn xsd(local: &str) -> QName {
    QName::namespaced(XSD_NAMESPACE, local)
}

/// Native class for a built-in type, `None` when the type is not primitive
pub fn native_class(type_name: &QName) -> Option<NativeClass> {
    let namespace = type_name.namespace()?;
    if !is_schema_namespace(namespace) && namespace != SOAP_ENCODING_NAMESPACE {
        return None;
    }
    class_of_local(&type_name.local_name)
}

fn class_of_local(local: &str) -> Option<NativeClass> {
    let class = match local {
        "string" | "normalizedString" | "token" | "language" | "Name" | "NCName" | "ID"
        | "IDREF" | "IDREFS" | "ENTITY" | "ENTITIES" | "NMTOKEN" | "NMTOKENS" | "anyURI"
        | "QName" | "NOTATION" | "duration" | "dateTime" | "time" | "date" | "gYearMonth"
        | "gYear" | "gMonthDay" | "gDay" | "gMonth" | "timeInstant" | "anySimpleType" => {
            NativeClass::String
        }
        "int" | "integer" | "long" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
        | "unsignedInt" | "unsignedShort" | "unsignedByte" => NativeClass::Integer,
        "float" | "double" => NativeClass::Float,
        "decimal" => NativeClass::Decimal,
        "boolean" => NativeClass::Boolean,
        "base64Binary" | "hexBinary" | "base64" => NativeClass::Binary,
        _ => return None,
    };
    Some(class)
}

/// Whether a type is a built-in primitive
pub fn is_primitive(type_name: &QName) -> bool {
    native_class(type_name).is_some()
}

/// Whether a type is the open `anyType`
pub fn is_any_type(type_name: &QName) -> bool {
    type_name.local_name == XSD_ANY_TYPE
        && type_name.namespace().map(is_schema_namespace).unwrap_or(false)
}

/// Soft compatibility check between a supplied and a declared type
///
/// Two types conflict only when both are known primitives of different
/// native classes. Unknown or missing types are accepted.
pub fn equivalent(supplied: &QName, declared: &QName) -> bool {
    match (native_class(supplied), native_class(declared)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Whether a binary type uses hex rather than base64 lexical form
pub fn is_hex_binary(type_name: Option<&QName>) -> bool {
    type_name.map(|t| t.local_name == XSD_HEX_BINARY).unwrap_or(false)
}

/// Whether an integer type is narrow enough that values must fit in 32 bits
pub fn is_int32(type_name: &QName) -> bool {
    type_name.local_name == XSD_INT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_class() {
        assert_eq!(native_class(&xsd("int")), Some(NativeClass::Integer));
        assert_eq!(native_class(&xsd("dateTime")), Some(NativeClass::String));
        assert_eq!(native_class(&xsd("double")), Some(NativeClass::Float));
        assert_eq!(
            native_class(&QName::namespaced(SOAP_ENCODING_NAMESPACE, "base64")),
            Some(NativeClass::Binary)
        );
        assert_eq!(native_class(&QName::namespaced("urn:x", "int")), None);
        assert_eq!(native_class(&QName::local("int")), None);
    }

    #[test]
    fn test_1999_namespace_accepted() {
        let old = QName::namespaced(XSD_1999_NAMESPACE, "boolean");
        assert_eq!(native_class(&old), Some(NativeClass::Boolean));
    }

    #[test]
    fn test_equivalent() {
        assert!(equivalent(&xsd("int"), &xsd("long")));
        assert!(!equivalent(&xsd("string"), &xsd("int")));
        assert!(equivalent(&QName::namespaced("urn:t", "Thing"), &xsd("int")));
    }

    #[test]
    fn test_any_type() {
        assert!(is_any_type(&xsd("anyType")));
        assert!(!is_any_type(&QName::local("anyType")));
    }
}
