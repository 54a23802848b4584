//! In-memory SOAP values
//!
//! A [`ValueTree`] is one parameter or return value as it travels between
//! native code and the wire: a scalar, an ordered struct, or an array with
//! a declared item type. Nodes are built once and never mutated in place;
//! the builder methods consume and return values.

use crate::error::DecodeError;
use crate::namespaces::QName;
use crate::xsd::{self, NativeClass};
use crate::SOAP_ENCODING_NAMESPACE;
use base64::Engine;
use rust_decimal::Decimal;
use std::str::FromStr;

/// A primitive scalar payload
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Nil value (`xsi:nil="true"`)
    Null,
    /// Boolean
    Boolean(bool),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Arbitrary precision decimal
    Decimal(Decimal),
    /// Text, also used for wire values that have not been decoded yet
    String(String),
    /// Binary data
    Binary(Vec<u8>),
}

impl Primitive {
    /// Lexical form written to the wire
    pub fn lexical(&self, type_name: Option<&QName>) -> String {
        match self {
            Primitive::Null => String::new(),
            Primitive::Boolean(b) => b.to_string(),
            Primitive::Integer(i) => i.to_string(),
            Primitive::Float(f) => float_lexical(*f),
            Primitive::Decimal(d) => d.to_string(),
            Primitive::String(s) => s.clone(),
            Primitive::Binary(bytes) => {
                if xsd::is_hex_binary(type_name) {
                    bytes.iter().map(|b| format!("{:02X}", b)).collect()
                } else {
                    base64::engine::general_purpose::STANDARD.encode(bytes)
                }
            }
        }
    }

    /// Parse wire text as the given native class
    pub fn parse(class: NativeClass, text: &str, type_name: &QName) -> Result<Self, DecodeError> {
        let mismatch = || DecodeError::TypeMismatch {
            expected: type_name.to_string(),
            found: text.to_string(),
        };
        let trimmed = text.trim();

        match class {
            NativeClass::String => Ok(Primitive::String(text.to_string())),
            NativeClass::Integer => match trimmed.parse::<i64>() {
                Ok(i) => Ok(Primitive::Integer(i)),
                // unsignedLong and the unbounded integer types go past i64
                Err(_) => Decimal::from_str(trimmed.strip_prefix('+').unwrap_or(trimmed))
                    .ok()
                    .filter(|d| d.scale() == 0)
                    .map(Primitive::Decimal)
                    .ok_or_else(mismatch),
            },
            NativeClass::Float => match trimmed {
                "INF" | "Infinity" => Ok(Primitive::Float(f64::INFINITY)),
                "-INF" | "-Infinity" => Ok(Primitive::Float(f64::NEG_INFINITY)),
                "NaN" => Ok(Primitive::Float(f64::NAN)),
                _ => trimmed
                    .parse::<f64>()
                    .map(Primitive::Float)
                    .map_err(|_| mismatch()),
            },
            NativeClass::Decimal => Decimal::from_str(trimmed)
                .map(Primitive::Decimal)
                .map_err(|_| mismatch()),
            NativeClass::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
                    Ok(Primitive::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
                    Ok(Primitive::Boolean(false))
                } else {
                    Err(mismatch())
                }
            }
            NativeClass::Binary => {
                let cleaned: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
                if xsd::is_hex_binary(Some(type_name)) {
                    parse_hex(&cleaned).map(Primitive::Binary).ok_or_else(mismatch)
                } else {
                    base64::engine::general_purpose::STANDARD
                        .decode(&cleaned)
                        .map(Primitive::Binary)
                        .map_err(|_| mismatch())
                }
            }
        }
    }
}

fn float_lexical(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "INF".to_string()
    } else if f == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        f.to_string()
    }
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

/// A single SOAP parameter or return value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTree {
    /// A primitive value with an optional XML-Schema type tag
    Scalar {
        /// Type tag, `None` for untyped wire values
        type_name: Option<QName>,
        /// Payload
        value: Primitive,
    },
    /// Ordered named members
    Struct {
        /// Complex type tag
        type_name: Option<QName>,
        /// Members in document order
        members: Vec<(QName, ValueTree)>,
    },
    /// Ordered items sharing a declared item type
    Array {
        /// Declared item type
        item_type: QName,
        /// Element name used for each item, `item` when unset
        item_name: Option<QName>,
        /// Items in order
        items: Vec<ValueTree>,
    },
}

impl ValueTree {
    /// Scalar with an explicit type
    pub fn scalar(type_name: QName, value: Primitive) -> Self {
        ValueTree::Scalar {
            type_name: Some(type_name),
            value,
        }
    }

    /// Untyped scalar holding wire text
    pub fn untyped(text: impl Into<String>) -> Self {
        ValueTree::Scalar {
            type_name: None,
            value: Primitive::String(text.into()),
        }
    }

    /// `xsd:string` scalar
    pub fn string(text: impl Into<String>) -> Self {
        Self::scalar(xsd::xsd(xsd::XSD_STRING), Primitive::String(text.into()))
    }

    /// `xsd:int` scalar
    pub fn int(value: i64) -> Self {
        Self::scalar(xsd::xsd(xsd::XSD_INT), Primitive::Integer(value))
    }

    /// `xsd:boolean` scalar
    pub fn boolean(value: bool) -> Self {
        Self::scalar(xsd::xsd(xsd::XSD_BOOLEAN), Primitive::Boolean(value))
    }

    /// Nil value
    pub fn null(type_name: Option<QName>) -> Self {
        ValueTree::Scalar {
            type_name,
            value: Primitive::Null,
        }
    }

    /// Struct from members
    pub fn structure(type_name: Option<QName>, members: Vec<(QName, ValueTree)>) -> Self {
        ValueTree::Struct { type_name, members }
    }

    /// Array from items
    pub fn array(item_type: QName, items: Vec<ValueTree>) -> Self {
        ValueTree::Array {
            item_type,
            item_name: None,
            items,
        }
    }

    /// Type tag of a scalar or struct; arrays report `SOAP-ENC:Array`
    pub fn type_name(&self) -> Option<QName> {
        match self {
            ValueTree::Scalar { type_name, .. } | ValueTree::Struct { type_name, .. } => {
                type_name.clone()
            }
            ValueTree::Array { .. } => Some(QName::namespaced(SOAP_ENCODING_NAMESPACE, "Array")),
        }
    }

    /// Replace the type tag of a scalar or struct
    pub fn with_type(self, new_type: QName) -> Self {
        match self {
            ValueTree::Scalar { value, .. } => ValueTree::Scalar {
                type_name: Some(new_type),
                value,
            },
            ValueTree::Struct { members, .. } => ValueTree::Struct {
                type_name: Some(new_type),
                members,
            },
            array => array,
        }
    }

    /// Whether the value is nil
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            ValueTree::Scalar {
                value: Primitive::Null,
                ..
            }
        )
    }

    /// First struct member with the given local name
    pub fn member(&self, local_name: &str) -> Option<&ValueTree> {
        match self {
            ValueTree::Struct { members, .. } => members
                .iter()
                .find(|(name, _)| name.local_name == local_name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Lexical text of a scalar
    pub fn as_text(&self) -> Option<String> {
        match self {
            ValueTree::Scalar { type_name, value } => Some(value.lexical(type_name.as_ref())),
            _ => None,
        }
    }

    /// Number of members or items; scalars count as zero
    pub fn len(&self) -> usize {
        match self {
            ValueTree::Scalar { .. } => 0,
            ValueTree::Struct { members, .. } => members.len(),
            ValueTree::Array { items, .. } => items.len(),
        }
    }

    /// Whether an aggregate has no members or items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::xsd;

    #[test]
    fn test_lexical_forms() {
        assert_eq!(Primitive::Boolean(true).lexical(None), "true");
        assert_eq!(Primitive::Integer(-7).lexical(None), "-7");
        assert_eq!(Primitive::Float(f64::INFINITY).lexical(None), "INF");
        assert_eq!(Primitive::Float(1.5).lexical(None), "1.5");
        assert_eq!(Primitive::Binary(b"hi".to_vec()).lexical(None), "aGk=");
        assert_eq!(
            Primitive::Binary(vec![0x0a, 0xff]).lexical(Some(&xsd("hexBinary"))),
            "0AFF"
        );
    }

    #[test]
    fn test_parse_integer() {
        let parsed = Primitive::parse(NativeClass::Integer, " 42 ", &xsd("int")).unwrap();
        assert_eq!(parsed, Primitive::Integer(42));

        let err = Primitive::parse(NativeClass::Integer, "abc", &xsd("int")).unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_boolean_case_insensitive() {
        let t = xsd("boolean");
        assert_eq!(
            Primitive::parse(NativeClass::Boolean, "TRUE", &t).unwrap(),
            Primitive::Boolean(true)
        );
        assert_eq!(
            Primitive::parse(NativeClass::Boolean, "0", &t).unwrap(),
            Primitive::Boolean(false)
        );
        assert!(Primitive::parse(NativeClass::Boolean, "yes", &t).is_err());
    }

    #[test]
    fn test_parse_binary() {
        let parsed =
            Primitive::parse(NativeClass::Binary, "aG\n k=", &xsd("base64Binary")).unwrap();
        assert_eq!(parsed, Primitive::Binary(b"hi".to_vec()));

        let parsed = Primitive::parse(NativeClass::Binary, "0aFF", &xsd("hexBinary")).unwrap();
        assert_eq!(parsed, Primitive::Binary(vec![0x0a, 0xff]));
        assert!(Primitive::parse(NativeClass::Binary, "0", &xsd("hexBinary")).is_err());
    }

    #[test]
    fn test_parse_decimal_and_float() {
        let parsed = Primitive::parse(NativeClass::Decimal, "12.50", &xsd("decimal")).unwrap();
        assert_eq!(parsed, Primitive::Decimal(Decimal::new(1250, 2)));

        let parsed = Primitive::parse(NativeClass::Float, "-INF", &xsd("double")).unwrap();
        assert_eq!(parsed, Primitive::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn test_member_lookup() {
        let value = ValueTree::structure(
            None,
            vec![
                (QName::local("a"), ValueTree::int(1)),
                (QName::local("b"), ValueTree::string("x")),
            ],
        );
        assert_eq!(value.member("b"), Some(&ValueTree::string("x")));
        assert_eq!(value.member("c"), None);
        assert_eq!(value.len(), 2);
    }

    #[test]
    fn test_with_type() {
        let value = ValueTree::untyped("5").with_type(xsd("int"));
        assert_eq!(value.type_name(), Some(xsd("int")));
        assert_eq!(value.as_text().as_deref(), Some("5"));
    }
}
