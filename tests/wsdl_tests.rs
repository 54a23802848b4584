//! WSDL loading tests against the fixture documents
//!
//! These go through the file loader so relative includes are resolved the
//! way a deployment would resolve them.

use pretty_assertions::assert_eq;
use soapwire::loaders::Loader;
use soapwire::wsdl::{SchemaModel, Style, TypeKind, TypeShape, Use, WsdlParser};
use soapwire::QName;
use std::path::PathBuf;
use std::sync::Arc;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn load(name: &str) -> SchemaModel {
    WsdlParser::new()
        .with_resolver(Arc::new(Loader::new()))
        .parse_location(fixture(name).to_str().unwrap())
        .unwrap()
}

fn calc(local: &str) -> QName {
    QName::namespaced("urn:calc", local)
}

fn xsd(local: &str) -> QName {
    QName::namespaced("http://www.w3.org/2001/XMLSchema", local)
}

#[test]
fn test_calculator_services() {
    let model = load("calculator.wsdl");
    assert_eq!(model.target_namespace.as_deref(), Some("urn:calc"));
    assert_eq!(model.services.len(), 2);
    assert_eq!(model.bindings.len(), 2);
    assert_eq!(
        model.operation_names(),
        vec!["add", "sum", "area", "divmod"]
    );
}

#[test]
fn test_first_port_in_document_order_wins() {
    let model = load("calculator.wsdl");
    let add = model.find_operation("add", None).unwrap();
    assert_eq!(add.service, calc("CalculatorService"));
    assert_eq!(add.endpoint.as_deref(), Some("mem://calculator"));
    assert_eq!(add.soap_action.as_deref(), Some("urn:calc#add"));
}

#[test]
fn test_service_preference() {
    let model = load("calculator.wsdl");
    let add = model.find_operation("add", Some("LegacyService")).unwrap();
    assert_eq!(add.port, "LegacyPort");
    assert_eq!(add.endpoint.as_deref(), Some("mem://legacy"));
    assert_eq!(add.namespace.as_deref(), Some("urn:legacy"));

    // an operation the preferred service lacks falls back to the others
    let sum = model.find_operation("sum", Some("LegacyService")).unwrap();
    assert_eq!(sum.port, "CalculatorPort");
}

#[test]
fn test_rpc_encoded_operation() {
    let model = load("calculator.wsdl");
    let divmod = model.find_operation("divmod", None).unwrap();
    assert_eq!(divmod.style, Style::Rpc);
    assert_eq!(divmod.input.use_, Use::Encoded);
    assert_eq!(divmod.parameter_order, vec!["divisor", "dividend"]);
    assert_eq!(
        divmod.output.parts.keys().collect::<Vec<_>>(),
        vec!["quotient", "remainder"]
    );
    assert_eq!(divmod.input.wrapper, None);
}

#[test]
fn test_documentation() {
    let model = load("calculator.wsdl");
    assert_eq!(
        model.services[&calc("CalculatorService")].documentation.as_deref(),
        Some("Arithmetic on integers and shapes")
    );
    assert_eq!(model.services[&calc("LegacyService")].documentation, None);
    let divmod = model.find_operation("divmod", None).unwrap();
    assert_eq!(
        divmod.documentation.as_deref(),
        Some("Integer division returning quotient and remainder")
    );
}

#[test]
fn test_array_type() {
    let model = load("calculator.wsdl");
    let array = &model.complex_types[&calc("ArrayOfInt")];
    assert_eq!(array.kind, TypeKind::Array);
    assert_eq!(array.array_item_type, Some(xsd("int")));
    assert!(matches!(
        model.schema_type(&calc("ArrayOfInt")),
        TypeShape::Array { ref item_type, .. } if *item_type == xsd("int")
    ));
}

#[test]
fn test_extension_chain_declared_out_of_order() {
    let model = load("calculator.wsdl");
    let labeled = &model.complex_types[&calc("LabeledCircle")];
    let members: Vec<&str> = labeled
        .elements
        .iter()
        .map(|e| e.name.local_name.as_str())
        .collect();
    assert_eq!(members, vec!["x", "y", "radius", "label"]);
    assert_eq!(labeled.kind, TypeKind::Struct);

    let circle = &model.complex_types[&calc("Circle")];
    assert_eq!(circle.elements.len(), 3);
}

#[test]
fn test_document_literal_with_include() {
    let model = load("doclit.wsdl");
    assert!(model
        .elements
        .contains_key(&QName::namespaced("urn:echo", "echo")));
    assert_eq!(model.imports.len(), 1);

    let echo = model.find_operation("echo", None).unwrap();
    assert_eq!(echo.name, "Echo");
    assert_eq!(echo.style, Style::Document);
    assert_eq!(echo.input.use_, Use::Literal);
    assert_eq!(
        echo.input.wrapper,
        Some(QName::namespaced("urn:echo", "echo"))
    );
    assert_eq!(
        echo.input.parts.keys().collect::<Vec<_>>(),
        vec!["text", "times"]
    );
    assert_eq!(
        echo.output.wrapper,
        Some(QName::namespaced("urn:echo", "echoResponse"))
    );
    assert_eq!(
        model.operation_for_element(&QName::namespaced("urn:echo", "echo")),
        Some("Echo")
    );
}

#[test]
fn test_missing_include_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.wsdl");
    let text = std::fs::read_to_string(fixture("doclit.wsdl"))
        .unwrap()
        .replace("echo-types.xsd", "absent.xsd");
    std::fs::write(&path, text).unwrap();

    let err = WsdlParser::new()
        .with_resolver(Arc::new(Loader::new()))
        .parse_location(path.to_str().unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("absent.xsd"));
}

#[test]
fn test_parse_is_deterministic() {
    assert_eq!(load("calculator.wsdl"), load("calculator.wsdl"));
    assert_eq!(load("doclit.wsdl"), load("doclit.wsdl"));
}

#[test]
fn test_model_serializes() {
    let model = load("calculator.wsdl");
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["target_namespace"], "urn:calc");
    assert!(json["services"].is_object());
}
