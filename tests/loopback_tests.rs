//! Client and server wired back to back
//!
//! The server implements `Transport`, so a client can call it without any
//! network in between. Both sides load the same fixture WSDL.

use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};
use soapwire::loaders::Loader;
use soapwire::wsdl::{SchemaModel, WsdlParser};
use soapwire::{
    CallOptions, Charset, Client, Fault, HeaderEntry, MethodSignature, Params, QName, Server, SoapConfig,
    TransportRegistry, ValueTree,
};
use std::f64::consts::PI;
use std::path::PathBuf;
use std::sync::Arc;

fn load(name: &str) -> Arc<SchemaModel> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let model = WsdlParser::new()
        .with_resolver(Arc::new(Loader::new()))
        .parse_location(path.to_str().unwrap())
        .unwrap();
    Arc::new(model)
}

fn xsd(local: &str) -> QName {
    QName::namespaced("http://www.w3.org/2001/XMLSchema", local)
}

fn calc(local: &str) -> QName {
    QName::namespaced("urn:calc", local)
}

fn int_arg(args: &[JsonValue], index: usize) -> i64 {
    args.get(index).and_then(JsonValue::as_i64).unwrap_or_default()
}

fn calculator_server(model: Arc<SchemaModel>) -> Server {
    let mut server = Server::new().with_model(model);
    server
        .register(
            "add",
            MethodSignature::new()
                .input("a", xsd("int"))
                .input("b", xsd("int"))
                .returns(xsd("int")),
            |args| Ok(json!(int_arg(args, 0) + int_arg(args, 1))),
        )
        .unwrap();
    server
        .register(
            "sum",
            MethodSignature::new()
                .input("values", calc("ArrayOfInt"))
                .returns(xsd("int")),
            |args| {
                let values = args[0].as_array().ok_or("values must be an array")?;
                Ok(json!(values.iter().filter_map(JsonValue::as_i64).sum::<i64>()))
            },
        )
        .unwrap();
    server
        .register(
            "area",
            MethodSignature::new()
                .input("shape", calc("LabeledCircle"))
                .returns(xsd("double")),
            |args| {
                let radius = args[0]["radius"].as_f64().ok_or("radius missing")?;
                Ok(json!(PI * radius * radius))
            },
        )
        .unwrap();
    server
        .register(
            "divmod",
            MethodSignature::new()
                .input("divisor", xsd("int"))
                .input("dividend", xsd("int"))
                .output("quotient", xsd("int"))
                .output("remainder", xsd("int")),
            |args| {
                let (divisor, dividend) = (int_arg(args, 0), int_arg(args, 1));
                if divisor == 0 {
                    return Err(Fault::client("division by zero")
                        .with_detail(ValueTree::int(dividend))
                        .into());
                }
                Ok(json!({"quotient": dividend / divisor, "remainder": dividend % divisor}))
            },
        )
        .unwrap();
    server
}

fn calculator_client() -> Client {
    let model = load("calculator.wsdl");
    let server = Arc::new(calculator_server(model.clone()));
    let mut registry = TransportRegistry::new();
    registry.register("mem", server);
    Client::from_model(model).with_registry(registry)
}

#[test]
fn test_rpc_encoded_add() {
    let mut client = calculator_client();
    let result = client
        .call("add", json!({"a": 40, "b": 2}), &CallOptions::default())
        .unwrap();
    assert_eq!(result, json!(42));
}

#[test]
fn test_array_parameter() {
    let mut client = calculator_client();
    let result = client
        .call("sum", json!({"values": [1, 2, 3, 4]}), &CallOptions::default())
        .unwrap();
    assert_eq!(result, json!(10));
}

#[test]
fn test_inherited_struct_parameter() {
    let mut client = calculator_client();
    let options = CallOptions::new().with_trace(true);
    let result = client
        .call(
            "area",
            json!({"shape": {"x": 0, "y": 0, "radius": 2.0, "label": "c"}}),
            &options,
        )
        .unwrap();
    let area = result.as_f64().unwrap();
    assert!((area - 4.0 * PI).abs() < 1e-9);

    let request = String::from_utf8_lossy(client.last_request().unwrap()).into_owned();
    assert!(request.contains("LabeledCircle"));
    assert!(request.find("<x").unwrap() < request.find("<label").unwrap());
}

#[test]
fn test_parameter_order_and_multiple_outputs() {
    let mut client = calculator_client();
    let result = client
        .call("divmod", Params::new().arg(5).arg(17), &CallOptions::default())
        .unwrap();
    assert_eq!(result, json!({"quotient": 3, "remainder": 2}));
}

#[test]
fn test_application_fault_reaches_client() {
    let mut client = calculator_client();
    let fault = client
        .call(
            "divmod",
            json!({"divisor": 0, "dividend": 9}),
            &CallOptions::default(),
        )
        .unwrap_err();
    assert_eq!(fault.code, "Client");
    assert_eq!(fault.message, "division by zero");
    assert!(fault.detail.is_some());
}

#[test]
fn test_preferred_service_reaches_its_port() {
    let mut client = calculator_client();
    let options = CallOptions::new()
        .with_service("LegacyService")
        .with_trace(true);
    let result = client
        .call("add", json!({"a": 1, "b": 2}), &options)
        .unwrap();
    assert_eq!(result, json!(3));

    let request = String::from_utf8_lossy(client.last_request().unwrap()).into_owned();
    assert!(request.contains("urn:legacy"));
    let response = String::from_utf8_lossy(client.last_response().unwrap()).into_owned();
    assert!(response.contains("addResponse"));
}

#[test]
fn test_unknown_mandatory_header() {
    let mut client = calculator_client();
    client.add_header(
        HeaderEntry::new(
            QName::namespaced("urn:tx", "transaction"),
            ValueTree::int(7),
        )
        .must_understand(),
    );
    let fault = client
        .call("add", json!({"a": 1, "b": 2}), &CallOptions::default())
        .unwrap_err();
    assert_eq!(fault.code, "MustUnderstand");

    client.clear_headers();
    assert!(client
        .call("add", json!({"a": 1, "b": 2}), &CallOptions::default())
        .is_ok());
}

#[test]
fn test_header_handler_reply() {
    let model = load("calculator.wsdl");
    let mut server = calculator_server(model.clone());
    server
        .register_header("session", |value| {
            Ok(Some(json!(format!("renewed {}", value.as_str().unwrap_or("")))))
        })
        .unwrap();
    let mut client = Client::from_model(model).with_transport(Arc::new(server));
    client.add_header(
        HeaderEntry::new(QName::namespaced("urn:s", "session"), ValueTree::string("s1"))
            .must_understand(),
    );

    client
        .call("add", json!({"a": 1, "b": 1}), &CallOptions::default())
        .unwrap();
    let headers = client.last_response_headers();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].name.local_name, "session");
    assert_eq!(headers[0].value.as_text().as_deref(), Some("renewed s1"));
}

#[test]
fn test_document_literal_echo() {
    let model = load("doclit.wsdl");
    let mut server = Server::new().with_model(model.clone());
    server
        .register(
            "Echo",
            MethodSignature::new()
                .input("text", xsd("string"))
                .input("times", xsd("int"))
                .output("result", xsd("string")),
            |args| {
                let text = args[0].as_str().unwrap_or_default();
                let times = args[1].as_u64().unwrap_or(1) as usize;
                Ok(json!(text.repeat(times)))
            },
        )
        .unwrap();

    let mut client = Client::from_model(model).with_transport(Arc::new(server));
    let options = CallOptions::new().with_trace(true);
    let result = client
        .call("echo", json!({"text": "ab", "times": 3}), &options)
        .unwrap();
    assert_eq!(result, json!("ababab"));

    // literal messages carry no type information
    let request = String::from_utf8_lossy(client.last_request().unwrap()).into_owned();
    assert!(!request.contains("xsi:type"));
    assert!(request.contains("urn:echo"));
}

#[test]
fn test_direct_mode_against_plain_server() {
    let mut server = Server::new();
    server
        .register(
            "concat",
            MethodSignature::new()
                .input("left", xsd("string"))
                .input("right", xsd("string"))
                .returns(xsd("string"))
                .namespace("urn:text"),
            |args| {
                Ok(json!(format!(
                    "{}{}",
                    args[0].as_str().unwrap_or_default(),
                    args[1].as_str().unwrap_or_default()
                )))
            },
        )
        .unwrap();

    let mut client = Client::new("mem://text").with_transport(Arc::new(server));
    let options = CallOptions::new().with_namespace("urn:text");
    let result = client
        .call("concat", vec![json!("foo"), json!("bar")], &options)
        .unwrap();
    assert_eq!(result, json!("foobar"));

    let fault = client
        .call("reverse", vec![json!("foo")], &options)
        .unwrap_err();
    assert_eq!(fault, Fault::client("unhandled method 'reverse'"));
}

fn health_server() -> Server {
    let mut server = Server::new();
    server
        .register(
            "ping",
            MethodSignature::new().namespace("urn:health"),
            |_| Ok(JsonValue::Null),
        )
        .unwrap();
    server
        .register(
            "add",
            MethodSignature::new()
                .input("a", xsd("int"))
                .input("b", xsd("int"))
                .returns(xsd("int")),
            |args| Ok(json!(int_arg(args, 0) + int_arg(args, 1))),
        )
        .unwrap();
    server
}

#[test]
fn test_void_method() {
    let server = Arc::new(health_server());
    let mut registry = TransportRegistry::new();
    registry.register("mem", server);
    let mut client = Client::new("mem://health").with_registry(registry);

    let options = CallOptions::new().with_namespace("urn:health").with_trace(true);
    let result = client.call("ping", Params::new(), &options).unwrap();
    assert_eq!(result, JsonValue::Null);

    let response = String::from_utf8_lossy(client.last_response().unwrap()).into_owned();
    assert!(response.contains("pingResponse"));
}

#[test]
fn test_published_wsdl_drives_a_client() {
    let server = health_server();
    let text = server.to_wsdl("Health", "mem://health").unwrap();
    let model = Arc::new(WsdlParser::new().parse_str(&text).unwrap());
    assert_eq!(
        model.operation_names(),
        server.methods().collect::<Vec<_>>()
    );

    let add = model.find_operation("add", None).unwrap();
    assert_eq!(add.endpoint.as_deref(), Some("mem://health"));
    assert_eq!(add.namespace.as_deref(), Some("urn:Health"));
    assert_eq!(add.input.parts.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(add.output.parts["return"].type_name, Some(xsd("int")));

    let mut client = Client::from_model(model).with_transport(Arc::new(server));
    let options = CallOptions::default();
    assert_eq!(
        client.call("add", json!({"a": 20, "b": 22}), &options).unwrap(),
        json!(42)
    );
    assert_eq!(client.call("ping", Params::new(), &options).unwrap(), JsonValue::Null);
}

#[test]
fn test_invalid_service_name_for_wsdl() {
    assert!(health_server().to_wsdl("not a name", "mem://x").is_err());
}

#[test]
fn test_both_ends_from_config() {
    let config = SoapConfig::from_json_str(
        r#"{
            "server": {"namespace": "urn:text"},
            "client": {"namespace": "urn:text", "trace": true}
        }"#,
    )
    .unwrap();
    let mut server = Server::from_config(&config);
    server
        .register(
            "shout",
            MethodSignature::new()
                .input("text", xsd("string"))
                .returns(xsd("string")),
            |args| Ok(json!(args[0].as_str().unwrap_or_default().to_uppercase())),
        )
        .unwrap();
    let server = Arc::new(server);

    let mut client = Client::new("mem://text")
        .with_config(&config)
        .with_transport(server.clone());
    let result = client
        .call("shout", vec![json!("hi")], &CallOptions::default())
        .unwrap();
    assert_eq!(result, json!("HI"));
    let request = String::from_utf8_lossy(client.last_request().unwrap()).into_owned();
    assert!(request.contains("urn:text"));

    let mut tight = config.clone();
    tight.limits.max_xml_size = 64;
    let mut client = Client::new("mem://text")
        .with_config(&tight)
        .with_transport(server);
    let fault = client
        .call("shout", vec![json!("hi")], &CallOptions::default())
        .unwrap_err();
    assert!(fault.message.starts_with("invalid response"));
}

fn shout_server() -> Server {
    let mut server = Server::new();
    server
        .register(
            "shout",
            MethodSignature::new()
                .input("text", xsd("string"))
                .returns(xsd("string"))
                .namespace("urn:text"),
            |args| Ok(json!(args[0].as_str().unwrap_or_default().to_uppercase())),
        )
        .unwrap();
    server
}

#[test]
fn test_latin1_round_trip() {
    let mut client = Client::new("mem://text").with_transport(Arc::new(shout_server()));
    let options = CallOptions::new()
        .with_namespace("urn:text")
        .with_encoding(Charset::Latin1)
        .with_trace(true);
    let result = client.call("shout", vec![json!("caf\u{e9} \u{20ac}")], &options).unwrap();
    assert_eq!(result, json!("CAF\u{c9} \u{20ac}"));

    let request = client.last_request().unwrap();
    assert!(request.starts_with(br#"<?xml version="1.0" encoding="ISO-8859-1"?>"#));
    assert!(request.windows(4).any(|w| w == b"caf\xe9"));
    assert!(request.windows(7).any(|w| w == b"&#8364;"));
    let response = client.last_response().unwrap();
    assert!(response.windows(4).any(|w| w == b"CAF\xc9"));
}

#[test]
fn test_unsupported_request_charset() {
    let server = shout_server();
    let request = br#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
        <SOAP-ENV:Body><ns1:shout xmlns:ns1="urn:text"><text>hi</text></ns1:shout></SOAP-ENV:Body>
    </SOAP-ENV:Envelope>"#;

    let outcome = server.dispatch_as(request, "text/xml; charset=Shift_JIS", "mem://text");
    assert_eq!(
        outcome.fault,
        Some(Fault::server(
            "Unsupported encoding, use one of ISO-8859-1, US-ASCII, UTF-8"
        ))
    );
    assert_eq!(outcome.content_type, "text/xml; charset=UTF-8");

    let outcome = server.dispatch_as(request, "text/xml; charset=us-ascii", "mem://text");
    assert!(!outcome.is_fault());
    assert_eq!(outcome.content_type, "text/xml; charset=US-ASCII");
}
