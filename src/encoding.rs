//! Native value encoding and decoding
//!
//! Native values are `serde_json::Value`s. [`Encoder`] turns them into
//! [`ValueTree`]s, shaped by a declared type when a [`SchemaModel`] knows
//! it and inferred from the JSON value otherwise. [`decode`] goes the other
//! way and recognizes encoded faults.

use crate::error::{DecodeError, EncodeError};
use crate::fault::Fault;
use crate::namespaces::QName;
use crate::value::{Primitive, ValueTree};
use crate::wsdl::{Element, SchemaModel, TypeShape};
use crate::xsd::{self, NativeClass};
use base64::Engine;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashSet;
use std::str::FromStr;

/// Outcome of decoding a value
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A regular value
    Value(JsonValue),
    /// The value had the fault shape
    Fault(Fault),
}

impl Decoded {
    /// Turn a decoded fault into an error
    pub fn into_result(self) -> Result<JsonValue, Fault> {
        match self {
            Decoded::Value(value) => Ok(value),
            Decoded::Fault(fault) => Err(fault),
        }
    }
}

/// Encode a native value, see [`Encoder::encode`]
pub fn encode(
    value: &JsonValue,
    declared: Option<&QName>,
    model: Option<&SchemaModel>,
) -> Result<ValueTree, EncodeError> {
    Encoder::new(model).encode(value, declared)
}

/// Native to [`ValueTree`] encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder<'m> {
    model: Option<&'m SchemaModel>,
}

impl<'m> Encoder<'m> {
    /// Create an encoder, optionally backed by a model for declared types
    pub fn new(model: Option<&'m SchemaModel>) -> Self {
        Self { model }
    }

    fn shape(&self, type_name: &QName) -> TypeShape<'m> {
        match self.model {
            Some(model) => model.schema_type(type_name),
            None if xsd::is_primitive(type_name) => TypeShape::Scalar(type_name.clone()),
            None => TypeShape::Unknown,
        }
    }

    /// Encode a value against a declared type
    ///
    /// Without a declared type, or when the type is `anyType`, the shape and
    /// type tags are inferred from the JSON value itself.
    pub fn encode(
        &self,
        value: &JsonValue,
        declared: Option<&QName>,
    ) -> Result<ValueTree, EncodeError> {
        let Some(declared) = declared.filter(|t| !xsd::is_any_type(t)) else {
            return infer(value);
        };

        match self.shape(declared) {
            TypeShape::Scalar(primitive) => encode_scalar(value, declared, &primitive),
            TypeShape::Struct { type_name, members } => {
                self.encode_struct(value, type_name.as_ref(), &members)
            }
            TypeShape::Array {
                item_type,
                item_name,
            } => self.encode_array(value, declared, &item_type, item_name),
            TypeShape::Unknown => Ok(match infer(value)? {
                tree @ ValueTree::Struct { .. } => tree.with_type(declared.clone()),
                tree => tree,
            }),
        }
    }

    /// Encode a value for a schema element, honoring anonymous content
    pub fn encode_element(
        &self,
        value: &JsonValue,
        element: &Element,
    ) -> Result<ValueTree, EncodeError> {
        if !element.nested_elements.is_empty() {
            let members: Vec<&Element> = element.nested_elements.values().collect();
            return self.encode_struct(value, None, &members);
        }
        self.encode(value, element.type_name.as_ref())
    }

    fn encode_struct(
        &self,
        value: &JsonValue,
        type_name: Option<&QName>,
        members: &[&Element],
    ) -> Result<ValueTree, EncodeError> {
        let object = match value {
            JsonValue::Null => return Ok(ValueTree::null(type_name.cloned())),
            JsonValue::Object(object) => object,
            other => {
                return Err(EncodeError::Unencodable {
                    type_name: type_name.map(|t| t.to_string()).unwrap_or_default(),
                    reason: format!("expected an object, got {}", json_kind(other)),
                })
            }
        };

        if members.is_empty() {
            return Ok(match infer_object(object)? {
                ValueTree::Struct { members, .. } => {
                    ValueTree::structure(type_name.cloned(), members)
                }
                tree => tree,
            });
        }

        let mut encoded = Vec::with_capacity(members.len());
        for member in members {
            let key = member.name.local_name.as_str();
            match object.get(key) {
                None => {
                    if member.is_required() {
                        return Err(EncodeError::MissingRequiredMember {
                            type_name: type_name.map(|t| t.to_string()).unwrap_or_default(),
                            member: key.to_string(),
                        });
                    }
                }
                Some(JsonValue::Null) => {
                    encoded.push((member.name.clone(), ValueTree::null(member.type_name.clone())));
                }
                Some(JsonValue::Array(items))
                    if member.is_repeated() && !self.is_array_element(member) =>
                {
                    for item in items {
                        encoded.push((member.name.clone(), self.encode_element(item, member)?));
                    }
                }
                Some(item) => encoded.push((member.name.clone(), self.encode_element(item, member)?)),
            }
        }

        for (key, item) in object {
            if !members.iter().any(|m| &m.name.local_name == key) {
                encoded.push((QName::local(key.as_str()), infer(item)?));
            }
        }

        Ok(ValueTree::structure(type_name.cloned(), encoded))
    }

    fn is_array_element(&self, element: &Element) -> bool {
        element.nested_elements.is_empty()
            && matches!(
                element.type_name.as_ref().map(|t| self.shape(t)),
                Some(TypeShape::Array { .. })
            )
    }

    fn encode_array(
        &self,
        value: &JsonValue,
        declared: &QName,
        item_type: &QName,
        item_name: Option<QName>,
    ) -> Result<ValueTree, EncodeError> {
        match value {
            JsonValue::Null => Ok(ValueTree::null(Some(declared.clone()))),
            JsonValue::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.encode(item, Some(item_type)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ValueTree::Array {
                    item_type: item_type.clone(),
                    item_name,
                    items,
                })
            }
            // a one-member sequence may really be a struct
            JsonValue::Object(object) => {
                let mut members = Vec::with_capacity(object.len());
                for (key, item) in object {
                    let matches_item = item_name
                        .as_ref()
                        .map(|name| &name.local_name == key)
                        .unwrap_or(false);
                    let name = match (&item_name, matches_item) {
                        (Some(name), true) => name.clone(),
                        _ => QName::local(key.as_str()),
                    };
                    match (item, matches_item) {
                        (JsonValue::Array(repeated), true) => {
                            for entry in repeated {
                                members.push((name.clone(), self.encode(entry, Some(item_type))?));
                            }
                        }
                        (single, true) => members.push((name, self.encode(single, Some(item_type))?)),
                        (other, false) => members.push((name, infer(other)?)),
                    }
                }
                Ok(ValueTree::structure(Some(declared.clone()), members))
            }
            other => Err(EncodeError::Unencodable {
                type_name: declared.to_string(),
                reason: format!("expected an array, got {}", json_kind(other)),
            }),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Encode a scalar, coercing the JSON value to the primitive's class
fn encode_scalar(
    value: &JsonValue,
    tag: &QName,
    primitive: &QName,
) -> Result<ValueTree, EncodeError> {
    if value.is_null() {
        return Ok(ValueTree::null(Some(tag.clone())));
    }
    let class = xsd::native_class(primitive).unwrap_or(NativeClass::String);
    let unencodable = |reason: String| EncodeError::Unencodable {
        type_name: tag.to_string(),
        reason,
    };
    let from_text = |text: &str| {
        Primitive::parse(class, text, primitive).map_err(|e| unencodable(e.to_string()))
    };

    let payload = match (class, value) {
        (_, JsonValue::Array(_)) | (_, JsonValue::Object(_)) if class != NativeClass::Binary => {
            return Err(unencodable(format!("{} is not a scalar", json_kind(value))))
        }
        (NativeClass::String, JsonValue::String(s)) => Primitive::String(s.clone()),
        (NativeClass::String, other) => Primitive::String(other.to_string()),
        (NativeClass::Integer, JsonValue::Number(n)) => match n.as_i64() {
            Some(i) => Primitive::Integer(i),
            None if n.is_u64() => n
                .as_u64()
                .map(|u| Primitive::Decimal(Decimal::from(u)))
                .ok_or_else(|| unencodable(format!("{} is not an integer", n)))?,
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Primitive::Integer(f as i64)
                }
                _ => return Err(unencodable(format!("{} is not an integer", n))),
            },
        },
        (NativeClass::Integer, JsonValue::Bool(b)) => Primitive::Integer(i64::from(*b)),
        (NativeClass::Float, JsonValue::Number(n)) => match n.as_f64() {
            Some(f) => Primitive::Float(f),
            None => return Err(unencodable(format!("{} is not a number", n))),
        },
        (NativeClass::Decimal, JsonValue::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map(Primitive::Decimal)
            .map_err(|e| unencodable(e.to_string()))?,
        (NativeClass::Boolean, JsonValue::Bool(b)) => Primitive::Boolean(*b),
        (NativeClass::Boolean, JsonValue::Number(n)) => match n.as_i64() {
            Some(0) => Primitive::Boolean(false),
            Some(1) => Primitive::Boolean(true),
            _ => return Err(unencodable(format!("{} is not a boolean", n))),
        },
        (NativeClass::Binary, JsonValue::String(s)) => {
            match base64::engine::general_purpose::STANDARD.decode(s.trim()) {
                Ok(bytes) => Primitive::Binary(bytes),
                Err(_) => from_text(s)?,
            }
        }
        (NativeClass::Binary, JsonValue::Array(items)) => Primitive::Binary(
            items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| unencodable("byte arrays must hold values 0-255".to_string()))?,
        ),
        (_, JsonValue::String(s)) => from_text(s)?,
        (_, other) => return Err(unencodable(format!("cannot encode {}", json_kind(other)))),
    };

    if let Primitive::Integer(i) = payload {
        if xsd::is_int32(primitive) && i32::try_from(i).is_err() {
            return Err(unencodable(format!("{} does not fit in xsd:int", i)));
        }
    }
    Ok(ValueTree::scalar(tag.clone(), payload))
}

/// Infer a value tree from the JSON value alone
pub fn infer(value: &JsonValue) -> Result<ValueTree, EncodeError> {
    Ok(match value {
        JsonValue::Null => ValueTree::null(None),
        JsonValue::Bool(b) => ValueTree::boolean(*b),
        JsonValue::Number(n) => infer_number(n)?,
        JsonValue::String(s) => ValueTree::string(s.as_str()),
        JsonValue::Array(items) => {
            let items = items.iter().map(infer).collect::<Result<Vec<_>, _>>()?;
            let item_type = common_type(&items);
            ValueTree::Array {
                item_type,
                item_name: None,
                items,
            }
        }
        JsonValue::Object(object) => infer_object(object)?,
    })
}

fn infer_object(object: &Map<String, JsonValue>) -> Result<ValueTree, EncodeError> {
    let members = object
        .iter()
        .map(|(key, item)| Ok((QName::local(key.as_str()), infer(item)?)))
        .collect::<Result<Vec<_>, EncodeError>>()?;
    Ok(ValueTree::structure(None, members))
}

fn infer_number(n: &Number) -> Result<ValueTree, EncodeError> {
    if let Some(i) = n.as_i64() {
        let type_name = if i32::try_from(i).is_ok() {
            xsd::XSD_INT
        } else {
            xsd::XSD_LONG
        };
        return Ok(ValueTree::scalar(xsd::xsd(type_name), Primitive::Integer(i)));
    }
    if let Some(u) = n.as_u64() {
        return Ok(ValueTree::scalar(
            xsd::xsd(xsd::XSD_UNSIGNED_LONG),
            Primitive::Decimal(Decimal::from(u)),
        ));
    }
    let f = n.as_f64().ok_or_else(|| EncodeError::Unencodable {
        type_name: xsd::XSD_FLOAT.to_string(),
        reason: format!("{} is not representable", n),
    })?;
    Ok(ValueTree::scalar(xsd::xsd(xsd::XSD_FLOAT), Primitive::Float(f)))
}

/// Shared type of array items, `anyType` when they differ or there are none
fn common_type(items: &[ValueTree]) -> QName {
    let any = xsd::xsd(xsd::XSD_ANY_TYPE);
    let mut types = items.iter().map(|item| item.type_name());
    let Some(Some(first)) = types.next() else {
        return any;
    };
    if types.all(|t| t.as_ref() == Some(&first)) {
        first
    } else {
        any
    }
}

/// Decode a value tree
///
/// A struct with the fault shape decodes to [`Decoded::Fault`] whatever the
/// value of `shift`. Otherwise, when `shift` is set and the top-level
/// aggregate holds exactly one member, that member is returned on its own.
pub fn decode(tree: &ValueTree, shift: bool) -> Result<Decoded, DecodeError> {
    if let ValueTree::Struct { members, .. } = tree {
        if let Some(fault) = Fault::from_members(members) {
            return Ok(Decoded::Fault(fault));
        }
    }

    if shift {
        match tree {
            ValueTree::Struct { members, .. } if members.len() == 1 => {
                return to_json(&members[0].1).map(Decoded::Value);
            }
            ValueTree::Array { items, .. } if items.len() == 1 => {
                return to_json(&items[0]).map(Decoded::Value);
            }
            _ => {}
        }
    }
    to_json(tree).map(Decoded::Value)
}

/// Convert a value tree to JSON without fault detection or shifting
pub fn to_json(tree: &ValueTree) -> Result<JsonValue, DecodeError> {
    match tree {
        ValueTree::Scalar { type_name, value } => scalar_to_json(type_name.as_ref(), value),
        ValueTree::Struct { members, .. } => {
            let mut object = Map::new();
            let mut collapsed = HashSet::new();
            for (name, member) in members {
                let decoded = to_json(member)?;
                let key = &name.local_name;
                match object.get_mut(key) {
                    None => {
                        object.insert(key.clone(), decoded);
                    }
                    Some(JsonValue::Array(repeated)) if collapsed.contains(key) => {
                        repeated.push(decoded)
                    }
                    Some(existing) => {
                        let first = existing.take();
                        *existing = JsonValue::Array(vec![first, decoded]);
                        collapsed.insert(key.clone());
                    }
                }
            }
            Ok(JsonValue::Object(object))
        }
        ValueTree::Array { items, .. } => items
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
    }
}

fn scalar_to_json(type_name: Option<&QName>, value: &Primitive) -> Result<JsonValue, DecodeError> {
    Ok(match value {
        Primitive::Null => JsonValue::Null,
        Primitive::Boolean(b) => JsonValue::Bool(*b),
        Primitive::Integer(i) => JsonValue::from(*i),
        Primitive::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(value.lexical(None))),
        Primitive::Decimal(d) => decimal_to_json(d),
        Primitive::Binary(bytes) => {
            JsonValue::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        Primitive::String(text) => {
            let class = type_name.and_then(xsd::native_class);
            match (class, type_name) {
                (Some(class), Some(type_name)) if class != NativeClass::String => {
                    let parsed = Primitive::parse(class, text, type_name)?;
                    return scalar_to_json(Some(type_name), &parsed);
                }
                _ => JsonValue::String(text.clone()),
            }
        }
    })
}

fn decimal_to_json(d: &Decimal) -> JsonValue {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return JsonValue::from(i);
        }
        if let Some(u) = d.to_u64() {
            return JsonValue::from(u);
        }
        return JsonValue::String(d.trunc().to_string());
    }
    d.to_f64()
        .and_then(Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(d.to_string()))
}

/// Fill in missing type tags from a declared type
///
/// Wire values decoded from literal messages carry no `xsi:type`; this
/// applies the declared schema types so scalars decode to the right native
/// class. A struct read where an array is declared becomes that array.
pub fn annotate(tree: ValueTree, hint: Option<&QName>, model: Option<&SchemaModel>) -> ValueTree {
    let Some(hint) = hint.filter(|t| !xsd::is_any_type(t)) else {
        return tree;
    };
    let shape = match model {
        Some(model) => model.schema_type(hint),
        None if xsd::is_primitive(hint) => TypeShape::Scalar(hint.clone()),
        None => TypeShape::Unknown,
    };

    match (tree, shape) {
        (
            ValueTree::Scalar {
                type_name: None,
                value,
            },
            TypeShape::Scalar(primitive),
        ) => ValueTree::Scalar {
            type_name: Some(primitive),
            value,
        },
        (ValueTree::Struct { type_name, members }, TypeShape::Struct { members: declared, .. }) => {
            let members = members
                .into_iter()
                .map(|(name, member)| {
                    let annotated = match declared
                        .iter()
                        .find(|d| d.name.local_name == name.local_name)
                    {
                        Some(element) => annotate_element(member, element, model),
                        None => member,
                    };
                    (name, annotated)
                })
                .collect();
            ValueTree::Struct {
                type_name: type_name.or_else(|| Some(hint.clone())),
                members,
            }
        }
        (
            ValueTree::Struct { members, .. },
            TypeShape::Array {
                item_type,
                item_name,
            },
        ) => {
            let item_name = item_name.or_else(|| members.first().map(|(name, _)| name.clone()));
            let items = members
                .into_iter()
                .map(|(_, item)| annotate(item, Some(&item_type), model))
                .collect();
            ValueTree::Array {
                item_type,
                item_name,
                items,
            }
        }
        (
            ValueTree::Scalar {
                type_name: None,
                value: Primitive::String(text),
            },
            TypeShape::Array {
                item_type,
                item_name,
            },
        ) if text.trim().is_empty() => ValueTree::Array {
            item_type,
            item_name,
            items: Vec::new(),
        },
        (
            ValueTree::Array {
                item_type,
                item_name,
                items,
            },
            TypeShape::Array {
                item_type: declared_item,
                ..
            },
        ) => {
            let item_hint = if xsd::is_any_type(&item_type) {
                declared_item.clone()
            } else {
                item_type.clone()
            };
            ValueTree::Array {
                item_type: item_hint.clone(),
                item_name,
                items: items
                    .into_iter()
                    .map(|item| annotate(item, Some(&item_hint), model))
                    .collect(),
            }
        }
        (tree, _) => tree,
    }
}

/// [`annotate`] against a schema element, honoring anonymous content
pub fn annotate_element(tree: ValueTree, element: &Element, model: Option<&SchemaModel>) -> ValueTree {
    if element.nested_elements.is_empty() {
        return annotate(tree, element.type_name.as_ref(), model);
    }
    match tree {
        ValueTree::Struct { type_name, members } => ValueTree::Struct {
            type_name,
            members: members
                .into_iter()
                .map(|(name, member)| {
                    let annotated = match element.nested_elements.get(&name.local_name) {
                        Some(nested) => annotate_element(member, nested, model),
                        None => member,
                    };
                    (name, annotated)
                })
                .collect(),
        },
        other => other,
    }
}
