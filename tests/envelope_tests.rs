//! Envelope wire tests: fixture messages and generated values

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Map, Value as JsonValue};
use soapwire::encoding::{decode, infer, to_json, Decoded};
use soapwire::error::DecodeError;
use soapwire::limits::Limits;
use soapwire::{parse_envelope, Envelope, EnvelopeWriter, Fault, QName, Use};
use std::path::PathBuf;

fn fixture(name: &str) -> Vec<u8> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    std::fs::read(path).unwrap()
}

#[test]
fn test_fault_fixture() {
    let envelope = parse_envelope(&fixture("fault-response.xml"), &Limits::default()).unwrap();
    assert_eq!(
        envelope.body_fault(),
        Some(Fault::client("incorrect number of parameters"))
    );
}

#[test]
fn test_multi_ref_fixture() {
    let envelope = parse_envelope(&fixture("multiref-response.xml"), &Limits::default()).unwrap();
    // the multiRef target is not a body entry of its own
    assert_eq!(envelope.body.len(), 1);
    assert_eq!(
        envelope.body[0].name,
        QName::namespaced("urn:pets", "getOwnersResponse")
    );

    let owner = json!({"name": "Ada", "pets": 2});
    match decode(&envelope.body[0].value, true).unwrap() {
        Decoded::Value(value) => assert_eq!(value, json!([owner.clone(), owner])),
        Decoded::Fault(fault) => panic!("unexpected fault: {}", fault),
    }
}

#[test]
fn test_href_depth_limit() {
    let mut limits = Limits::default();
    limits.max_href_depth = 1;
    let body = r##"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
        <SOAP-ENV:Body>
          <m:r xmlns:m="urn:m"><a href="#a"/></m:r>
          <x id="a"><b href="#b"/></x>
          <y id="b">deep</y>
        </SOAP-ENV:Body></SOAP-ENV:Envelope>"##;
    assert!(parse_envelope(body.as_bytes(), &limits).is_err());
    assert!(parse_envelope(body.as_bytes(), &Limits::default()).is_ok());
}

/// Each level points twice at the next one, doubling the decoded size
fn doubling_references(levels: usize) -> String {
    let mut body = String::from(r##"<m:r xmlns:m="urn:m"><v href="#e0"/></m:r>"##);
    for i in 0..levels {
        body.push_str(&format!(
            r##"<x id="e{i}"><l href="#e{next}"/><r href="#e{next}"/></x>"##,
            i = i,
            next = i + 1
        ));
    }
    body.push_str(&format!(r#"<x id="e{}">leaf</x>"#, levels));
    format!(
        r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"><SOAP-ENV:Body>{}</SOAP-ENV:Body></SOAP-ENV:Envelope>"#,
        body
    )
}

#[test]
fn test_shared_references_are_bounded() {
    let small = doubling_references(4);
    let envelope = parse_envelope(small.as_bytes(), &Limits::default()).unwrap();
    assert_eq!(envelope.body.len(), 1);
    assert_eq!(
        to_json(&envelope.body[0].value).unwrap()["v"]["l"]["r"]["l"]["r"],
        json!("leaf")
    );

    let mut limits = Limits::default();
    limits.max_value_nodes = 10_000;
    let err = parse_envelope(doubling_references(22).as_bytes(), &limits).unwrap_err();
    assert!(matches!(err, DecodeError::Limit(_)));

    let started = std::time::Instant::now();
    let err = parse_envelope(doubling_references(30).as_bytes(), &Limits::default()).unwrap_err();
    assert!(matches!(err, DecodeError::Limit(_)));
    assert!(started.elapsed() < std::time::Duration::from_secs(20));
}

fn leaf() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        any::<i32>().prop_map(JsonValue::from),
        any::<bool>().prop_map(JsonValue::from),
        "[a-zA-Z0-9_.-]{1,12}".prop_map(JsonValue::from),
    ]
}

fn member() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        leaf(),
        prop::collection::vec(any::<i32>().prop_map(JsonValue::from), 0..4)
            .prop_map(JsonValue::Array),
        prop::collection::btree_map("[a-z][a-z0-9]{0,6}", leaf(), 1..4)
            .prop_map(|m| JsonValue::Object(m.into_iter().collect::<Map<_, _>>())),
    ]
}

fn record() -> impl Strategy<Value = JsonValue> {
    prop::collection::btree_map("[a-z][a-z0-9]{0,6}", member(), 1..5)
        .prop_map(|m| JsonValue::Object(m.into_iter().collect::<Map<_, _>>()))
}

proptest! {
    #[test]
    fn test_encoded_values_survive_the_wire(value in record()) {
        let tree = infer(&value).unwrap();
        let envelope = Envelope::new().with_body(QName::namespaced("urn:p", "value"), tree);
        let bytes = EnvelopeWriter::new(Use::Encoded).write(&envelope).unwrap();

        let parsed = parse_envelope(&bytes, &Limits::default()).unwrap();
        prop_assert_eq!(parsed.body.len(), 1);
        prop_assert_eq!(to_json(&parsed.body[0].value).unwrap(), value);
    }
}
