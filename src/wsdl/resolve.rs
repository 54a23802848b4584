//! Post-parse resolution
//!
//! Runs once after every document (imports included) has been read:
//! element references are filled in from their targets and type
//! inheritance is flattened until nothing changes.

use super::model::{ComplexType, Derivation, Element, SchemaModel, TypeKind};
use crate::namespaces::QName;
use crate::xsd;
use tracing::{debug, warn};

pub(crate) fn resolve_model(model: &mut SchemaModel) {
    resolve_references(model);
    resolve_inheritance(model);
    refresh_complex_flags(model);
}

fn resolve_references(model: &mut SchemaModel) {
    let targets = model.elements.clone();
    let fill = |element: &mut Element| {
        let Some(reference) = &element.reference else {
            return;
        };
        match targets.get(reference) {
            Some(target) => {
                if element.type_name.is_none() {
                    element.type_name = target.type_name.clone();
                }
                if element.nested_elements.is_empty() {
                    element.nested_elements = target.nested_elements.clone();
                }
                element.is_complex |= target.is_complex;
            }
            None => debug!(reference = %reference, "element reference target not found"),
        }
    };

    for ty in model.complex_types.values_mut() {
        ty.elements.iter_mut().for_each(fill);
    }
    for element in model.elements.values_mut() {
        element.nested_elements.values_mut().for_each(fill);
    }
}

/// Flatten base types into their derived types
///
/// A type is merged only once its own base is final, so chains of any
/// length converge; whatever is left when a pass makes no progress has a
/// cyclic or missing base.
fn resolve_inheritance(model: &mut SchemaModel) {
    let mut pending: Vec<QName> = model
        .complex_types
        .values()
        .filter(|ty| {
            ty.base_type
                .as_ref()
                .map(|base| model.complex_types.contains_key(base))
                .unwrap_or(false)
        })
        .map(|ty| ty.name.clone())
        .collect();

    loop {
        let before = pending.len();
        let mut still_pending = Vec::new();

        for name in &pending {
            let Some(base_name) = model
                .complex_types
                .get(name)
                .and_then(|ty| ty.base_type.clone())
            else {
                continue;
            };
            if pending.contains(&base_name) {
                still_pending.push(name.clone());
                continue;
            }
            let Some(base) = model.complex_types.get(&base_name).cloned() else {
                continue;
            };
            if let Some(ty) = model.complex_types.get_mut(name) {
                inherit(ty, &base);
            }
        }

        if still_pending.is_empty() || still_pending.len() == before {
            pending = still_pending;
            break;
        }
        pending = still_pending;
    }

    for name in pending {
        warn!(type_name = %name, "unresolved type inheritance, base is cyclic or missing");
    }
}

fn inherit(ty: &mut ComplexType, base: &ComplexType) {
    match base.kind {
        TypeKind::Array if ty.kind != TypeKind::Scalar => {
            ty.kind = TypeKind::Array;
            if ty.array_item_type.is_none() {
                ty.array_item_type = base.array_item_type.clone();
            }
        }
        TypeKind::Scalar => ty.kind = TypeKind::Scalar,
        _ => {}
    }

    match ty.derivation {
        Some(Derivation::Restriction) => {
            if ty.elements.is_empty() {
                ty.elements = base.elements.clone();
            }
        }
        _ => {
            let own = std::mem::take(&mut ty.elements);
            let mut merged: Vec<Element> = base
                .elements
                .iter()
                .filter(|inherited| {
                    !own.iter()
                        .any(|e| e.name.local_name == inherited.name.local_name)
                })
                .cloned()
                .collect();
            merged.extend(own);
            ty.elements = merged;
        }
    }

    for (key, attribute) in &base.attributes {
        ty.attributes
            .entry(key.clone())
            .or_insert_with(|| attribute.clone());
    }
    if ty.order == super::model::Order::None {
        ty.order = base.order;
    }
}

fn refresh_complex_flags(model: &mut SchemaModel) {
    let scalar_aliases: Vec<QName> = model
        .complex_types
        .values()
        .filter(|ty| ty.kind == TypeKind::Scalar)
        .map(|ty| ty.name.clone())
        .collect();
    let update = |element: &mut Element| {
        if let Some(type_name) = &element.type_name {
            if element.nested_elements.is_empty()
                && (xsd::is_primitive(type_name) || scalar_aliases.contains(type_name))
            {
                element.is_complex = false;
            }
        }
    };

    for ty in model.complex_types.values_mut() {
        ty.elements.iter_mut().for_each(update);
    }
    for element in model.elements.values_mut() {
        update(element);
        element.nested_elements.values_mut().for_each(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::xsd;

    fn named(local: &str) -> QName {
        QName::namespaced("urn:t", local)
    }

    fn member(local: &str, type_local: &str) -> Element {
        let mut element = Element::new(QName::local(local));
        element.type_name = Some(xsd(type_local));
        element
    }

    fn derived(local: &str, base: &str, derivation: Derivation, own: Vec<Element>) -> ComplexType {
        let mut ty = ComplexType::new(named(local));
        ty.base_type = Some(named(base));
        ty.derivation = Some(derivation);
        ty.elements = own;
        ty
    }

    fn insert(model: &mut SchemaModel, ty: ComplexType) {
        model.complex_types.insert(ty.name.clone(), ty);
    }

    #[test]
    fn test_extension_chain_resolves_transitively() {
        let mut model = SchemaModel::new();
        // declared out of order on purpose
        insert(
            &mut model,
            derived("C", "B", Derivation::Extension, vec![member("c", "int")]),
        );
        insert(
            &mut model,
            derived("B", "A", Derivation::Extension, vec![member("b", "int")]),
        );
        let mut a = ComplexType::new(named("A"));
        a.elements = vec![member("a", "int")];
        insert(&mut model, a);

        resolve_model(&mut model);

        let names: Vec<_> = model.complex_types[&named("C")]
            .elements
            .iter()
            .map(|e| e.name.local_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_restriction_keeps_own_members() {
        let mut model = SchemaModel::new();
        let mut base = ComplexType::new(named("Base"));
        base.elements = vec![member("x", "int"), member("y", "int")];
        insert(&mut model, base);
        insert(
            &mut model,
            derived("R", "Base", Derivation::Restriction, vec![member("x", "int")]),
        );

        resolve_model(&mut model);
        assert_eq!(model.complex_types[&named("R")].elements.len(), 1);
    }

    #[test]
    fn test_array_kind_inherited() {
        let mut model = SchemaModel::new();
        let mut base = ComplexType::new(named("Ints"));
        base.kind = TypeKind::Array;
        base.array_item_type = Some(xsd("int"));
        insert(&mut model, base);
        insert(
            &mut model,
            derived("MoreInts", "Ints", Derivation::Restriction, vec![]),
        );

        resolve_model(&mut model);
        let ty = &model.complex_types[&named("MoreInts")];
        assert_eq!(ty.kind, TypeKind::Array);
        assert_eq!(ty.array_item_type, Some(xsd("int")));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut model = SchemaModel::new();
        insert(&mut model, derived("P", "Q", Derivation::Extension, vec![]));
        insert(&mut model, derived("Q", "P", Derivation::Extension, vec![]));
        resolve_model(&mut model);
        assert!(model.complex_types[&named("P")].elements.is_empty());
    }

    #[test]
    fn test_element_reference_filled() {
        let mut model = SchemaModel::new();
        let mut target = Element::new(named("note"));
        target.type_name = Some(xsd("string"));
        model.elements.insert(target.name.clone(), target);

        let mut holder = ComplexType::new(named("Holder"));
        let mut by_ref = Element::new(named("note"));
        by_ref.reference = Some(named("note"));
        holder.elements.push(by_ref);
        insert(&mut model, holder);

        resolve_model(&mut model);
        assert_eq!(
            model.complex_types[&named("Holder")].elements[0].type_name,
            Some(xsd("string"))
        );
    }
}
