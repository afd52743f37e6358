//! Literal example scenarios a reader of the specification would check by hand:
//! one test per concrete input/output pair, as opposed to the property-based
//! laws in `src/codec.rs`.

use xmlrpc_runtime::{
    codes, parse_method_call, parse_method_response, Call, Carriage, ClientBuilder,
    DirectTransport, Registry, Signature, Value,
};

fn sample_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            "sample.add",
            |params| Ok(Value::int(params.get_int(0)? + params.get_int(1)?)),
            vec![Signature::new("int", vec!["int", "int"])],
            "Adds two integers.",
        )
        .unwrap();
    registry
}

#[test]
fn sample_add_over_direct_transport_sums_its_arguments() {
    let client = ClientBuilder::new(Carriage::direct())
        .build(DirectTransport::new(sample_registry()));

    let outcome = client
        .call(Call::new("sample.add", vec![Value::int(5), Value::int(7)]))
        .unwrap()
        .into_result();
    assert_eq!(outcome, Ok(Value::int(12)));
}

#[test]
fn sample_add_with_no_params_is_a_type_fault() {
    let client = ClientBuilder::new(Carriage::direct())
        .build(DirectTransport::new(sample_registry()));

    let outcome = client.call(Call::new("sample.add", vec![])).unwrap().into_result();
    assert_eq!(outcome.unwrap_err().code, codes::TYPE);
}

#[test]
fn nosuchmethod_is_a_no_such_method_fault_with_a_description() {
    let client = ClientBuilder::new(Carriage::direct())
        .build(DirectTransport::new(sample_registry()));

    let fault = client
        .call(Call::new("nosuchmethod", vec![]))
        .unwrap()
        .into_result()
        .unwrap_err();
    assert_eq!(fault.code, codes::NO_SUCH_METHOD);
    assert!(!fault.description.is_empty());
}

#[test]
fn array_containing_a_nil_round_trips_with_exactly_one_nil_tag() {
    let input = vec![Value::int(1), Value::string("a"), Value::nil()];
    let xml = xmlrpc_runtime::write_method_response(&Ok(Value::array(input.clone()))).unwrap();
    assert_eq!(xml.matches("<nil/>").count(), 1);

    let outcome = parse_method_response(&xml).unwrap().unwrap();
    assert_eq!(outcome.as_array().unwrap(), input.as_slice());
}

#[test]
fn a_literal_fault_response_parses_to_its_code_and_description() {
    let xml = r#"<?xml version="1.0"?>
<methodResponse>
  <fault>
    <value>
      <struct>
        <member><name>faultCode</name><value><int>7</int></value></member>
        <member><name>faultString</name><value><string>bad</string></value></member>
      </struct>
    </value>
  </fault>
</methodResponse>"#;

    let outcome = parse_method_response(xml).unwrap();
    let fault = outcome.unwrap_err();
    assert_eq!(fault.code, 7);
    assert_eq!(fault.description, "bad");
}

#[test]
fn an_untagged_value_in_a_literal_call_defaults_to_a_string_param() {
    let xml = r#"<?xml version="1.0"?><methodCall><methodName>x</methodName><params><param><value>hello</value></param></params></methodCall>"#;

    let (name, params) = parse_method_call(xml).unwrap();
    assert_eq!(name, "x");
    assert_eq!(params, vec![Value::string("hello")]);
}

#[test]
fn bytes_round_trip_through_base64_and_match_the_expected_wire_form() {
    let bytes = vec![0x00, 0x01, 0xFF];
    let xml = xmlrpc_runtime::write_method_response(&Ok(Value::bytestring(bytes.clone()))).unwrap();
    assert!(xml.contains("AAH/"));

    let outcome = parse_method_response(&xml).unwrap().unwrap();
    assert_eq!(outcome.as_bytes().unwrap(), bytes.as_slice());
}
